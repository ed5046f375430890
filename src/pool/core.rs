// 8.0 pool/core.rs: the reserve pool. holds every asset's tick table and balances,
// the pool-wide canonical total and the fee counter.
// 8.1 mutations go through apply(): every delta is checked against staged balances first,
// then all of them are written together. a failed operation leaves reserves untouched.

use super::config::PoolConfig;
use super::results::ReserveError;
use crate::config::PoolSpec;
use crate::events::{
    ConfigUpdatedEvent, Event, EventId, EventPayload, FeesCollectedEvent, OperationRejectedEvent,
};
use crate::fixed_point::{fixed_to_decimal, MathError, X128_BITS};
use crate::tick::{allocation_x128, locate_tick, AssetConfig, TickPosition};
use crate::types::{AssetId, Direction};
use primitive_types::U256;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Balances and tick table of one reserve asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetState {
    pub config: AssetConfig,
    pub native_balance: U256,
    /// native_balance rescaled to 18 digits, the only view the pricer sees.
    pub canonical_balance: U256,
}

// pending balance change: Deposit credits, Withdrawal debits
#[derive(Debug, Clone, Copy)]
pub(super) struct BalanceDelta {
    pub asset: AssetId,
    pub direction: Direction,
    pub native: U256,
    pub canonical: U256,
}

impl BalanceDelta {
    pub fn credit(asset: AssetId, native: U256, canonical: U256) -> Self {
        Self {
            asset,
            direction: Direction::Deposit,
            native,
            canonical,
        }
    }

    pub fn debit(asset: AssetId, native: U256, canonical: U256) -> Self {
        Self {
            asset,
            direction: Direction::Withdrawal,
            native,
            canonical,
        }
    }
}

// Fee counter movement of one operation, in basket units.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct FeeDelta {
    pub collected: U256,
    pub paid_out: U256,
}

pub(super) fn at_least(actual: U256, limit: U256) -> Result<(), ReserveError> {
    if actual < limit {
        return Err(ReserveError::Slippage { actual, limit });
    }
    Ok(())
}

pub(super) fn at_most(actual: U256, limit: U256) -> Result<(), ReserveError> {
    if actual > limit {
        return Err(ReserveError::Slippage { actual, limit });
    }
    Ok(())
}

/** 8.1: reserve pool. all state lives here */
#[derive(Debug)]
pub struct ReservePool {
    pub(super) config: PoolConfig,
    pub(super) assets: BTreeMap<AssetId, AssetState>,
    pub(super) total_canonical: U256,
    pub(super) fees_collected: U256,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
}

impl ReservePool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            assets: BTreeMap::new(),
            total_canonical: U256::zero(),
            fees_collected: U256::zero(),
            events: Vec::new(),
            next_event_id: 1,
        }
    }

    /// Builds an empty pool with every asset of a validated spec registered.
    pub fn from_spec(spec: &PoolSpec) -> Result<Self, ReserveError> {
        spec.validate()?;
        let mut pool = Self::new(spec.pool_config()?);
        for asset in &spec.assets {
            pool.set_asset_config(asset.id, asset.to_asset_config()?)?;
        }
        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Creates or wholesale-replaces an asset's tick table. Balances are kept.
    pub fn set_asset_config(&mut self, asset: AssetId, config: AssetConfig) -> Result<(), ReserveError> {
        if let Err(e) = config.validate(asset) {
            return Err(self.reject("set_asset_config", Some(asset), e.into()));
        }
        let tick_count = config.ticks.len();
        let created = match self.assets.get_mut(&asset) {
            Some(state) => {
                state.config = config;
                false
            }
            None => {
                self.assets.insert(
                    asset,
                    AssetState {
                        config,
                        native_balance: U256::zero(),
                        canonical_balance: U256::zero(),
                    },
                );
                true
            }
        };

        info!(%asset, created, tick_count, "asset config updated");
        self.emit_event(EventPayload::ConfigUpdated(ConfigUpdatedEvent {
            asset,
            created,
            tick_count,
        }));
        Ok(())
    }

    pub fn asset(&self, asset: AssetId) -> Option<&AssetState> {
        self.assets.get(&asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, &AssetState)> {
        self.assets.iter()
    }

    pub(super) fn state(&self, asset: AssetId) -> Result<&AssetState, ReserveError> {
        self.assets.get(&asset).ok_or(ReserveError::UnknownAsset(asset))
    }

    /// Canonical share of the pool, value × 2^128. Zero for an empty pool.
    pub fn allocation(&self, asset: AssetId) -> Result<U256, ReserveError> {
        let state = self.state(asset)?;
        Ok(allocation_x128(state.canonical_balance, self.total_canonical))
    }

    pub fn allocation_decimal(&self, asset: AssetId) -> Result<Decimal, ReserveError> {
        Ok(fixed_to_decimal(self.allocation(asset)?, X128_BITS)?)
    }

    /// Native token balance.
    pub fn balance(&self, asset: AssetId) -> Result<U256, ReserveError> {
        Ok(self.state(asset)?.native_balance)
    }

    pub fn canonical_balance(&self, asset: AssetId) -> Result<U256, ReserveError> {
        Ok(self.state(asset)?.canonical_balance)
    }

    pub fn total_reserves(&self) -> U256 {
        self.total_canonical
    }

    pub fn current_tick(&self, asset: AssetId) -> Result<TickPosition, ReserveError> {
        let state = self.state(asset)?;
        Ok(locate_tick(&state.config, state.canonical_balance, self.total_canonical))
    }

    pub fn fees_collected(&self) -> U256 {
        self.fees_collected
    }

    /// Hands the accrued fee counter to the fee ledger and zeroes it.
    pub fn collect_fees(&mut self) -> U256 {
        let amount = std::mem::take(&mut self.fees_collected);
        if !amount.is_zero() {
            info!(%amount, "fees collected");
            self.emit_event(EventPayload::FeesCollected(FeesCollectedEvent { amount }));
        }
        amount
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Checks every delta against staged balances, then commits them all at once.
    pub(super) fn apply(&mut self, deltas: &[BalanceDelta], fees: FeeDelta) -> Result<(), ReserveError> {
        let mut staged: BTreeMap<AssetId, (U256, U256)> = BTreeMap::new();
        let mut total = self.total_canonical;

        for delta in deltas {
            let (native, canonical) = match staged.get(&delta.asset) {
                Some(balances) => *balances,
                None => {
                    let state = self.state(delta.asset)?;
                    (state.native_balance, state.canonical_balance)
                }
            };
            let next = match delta.direction {
                Direction::Deposit => {
                    total = total.checked_add(delta.canonical).ok_or(MathError::Overflow)?;
                    (
                        native.checked_add(delta.native).ok_or(MathError::Overflow)?,
                        canonical.checked_add(delta.canonical).ok_or(MathError::Overflow)?,
                    )
                }
                Direction::Withdrawal => {
                    let insufficient = ReserveError::InsufficientReserve {
                        asset: delta.asset,
                        requested: delta.native,
                        available: native,
                    };
                    total = total.checked_sub(delta.canonical).ok_or(MathError::Underflow)?;
                    (
                        native.checked_sub(delta.native).ok_or(insufficient.clone())?,
                        canonical.checked_sub(delta.canonical).ok_or(insufficient)?,
                    )
                }
            };
            staged.insert(delta.asset, next);
        }

        let fees_collected = self
            .fees_collected
            .checked_sub(fees.paid_out)
            .ok_or(MathError::Underflow)?
            .checked_add(fees.collected)
            .ok_or(MathError::Overflow)?;

        for (asset, (native, canonical)) in staged {
            if let Some(state) = self.assets.get_mut(&asset) {
                state.native_balance = native;
                state.canonical_balance = canonical;
            }
        }
        self.total_canonical = total;
        self.fees_collected = fees_collected;
        Ok(())
    }

    // logs and records a rejected operation, handing the error back
    pub(super) fn reject(&mut self, operation: &str, asset: Option<AssetId>, error: ReserveError) -> ReserveError {
        warn!(operation, asset = ?asset, error = %error, "operation rejected");
        self.emit_event(EventPayload::OperationRejected(OperationRejectedEvent {
            operation: operation.to_string(),
            asset,
            reason: error.to_string(),
        }));
        error
    }

    pub(super) fn settle<T>(
        &mut self,
        operation: &str,
        asset: Option<AssetId>,
        result: Result<T, ReserveError>,
    ) -> Result<T, ReserveError> {
        result.map_err(|e| self.reject(operation, asset, e))
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), payload);
        self.next_event_id += 1;

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ReservePool {
        ReservePool::from_spec(&PoolSpec::pass_through(&[(1, 6), (2, 18)])).unwrap()
    }

    #[test]
    fn registers_assets_from_spec() {
        let pool = pool();
        assert_eq!(pool.assets().count(), 2);
        assert_eq!(pool.total_reserves(), U256::zero());
        assert_eq!(pool.allocation(AssetId(1)).unwrap(), U256::zero());
        assert_eq!(pool.events().len(), 2);
        assert!(matches!(pool.balance(AssetId(9)), Err(ReserveError::UnknownAsset(_))));
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut pool = pool();
        let e6 = U256::from(1_000_000u64);
        let e18 = U256::from(10u64).pow(U256::from(18u64));
        pool.apply(&[BalanceDelta::credit(AssetId(1), e6, e18)], FeeDelta::default())
            .unwrap();

        // the second delta overdraws, so the first must not land either
        let result = pool.apply(
            &[
                BalanceDelta::credit(AssetId(2), e18, e18),
                BalanceDelta::debit(AssetId(1), e6 + U256::one(), e18),
            ],
            FeeDelta::default(),
        );
        assert!(matches!(result, Err(ReserveError::InsufficientReserve { .. })));
        assert_eq!(pool.balance(AssetId(2)).unwrap(), U256::zero());
        assert_eq!(pool.total_reserves(), e18);
    }

    #[test]
    fn replacing_config_keeps_balances() {
        let mut pool = pool();
        let e18 = U256::from(10u64).pow(U256::from(18u64));
        pool.apply(&[BalanceDelta::credit(AssetId(2), e18, e18)], FeeDelta::default())
            .unwrap();
        let config = pool.asset(AssetId(2)).unwrap().config.clone();
        pool.set_asset_config(AssetId(2), config).unwrap();
        assert_eq!(pool.balance(AssetId(2)).unwrap(), e18);
    }

    #[test]
    fn invalid_config_rejected() {
        let mut pool = pool();
        let mut config = pool.asset(AssetId(1)).unwrap().config.clone();
        config.ticks.clear();
        assert!(matches!(
            pool.set_asset_config(AssetId(1), config),
            Err(ReserveError::Config(_))
        ));
        assert!(matches!(
            pool.events().last().map(|e| &e.payload),
            Some(EventPayload::OperationRejected(_))
        ));
    }

    #[test]
    fn event_log_is_capped() {
        let mut pool = pool();
        pool.config.max_events = 3;
        for _ in 0..5 {
            pool.fees_collected = U256::one();
            pool.collect_fees();
        }
        assert_eq!(pool.events().len(), 3);
        assert_eq!(pool.events()[0].id, EventId(5));
    }

    #[test]
    fn slippage_bounds() {
        assert!(at_least(U256::from(5u64), U256::from(5u64)).is_ok());
        assert_eq!(
            at_least(U256::from(4u64), U256::from(5u64)),
            Err(ReserveError::Slippage {
                actual: U256::from(4u64),
                limit: U256::from(5u64)
            })
        );
        assert!(at_most(U256::from(5u64), U256::from(5u64)).is_ok());
        assert_eq!(
            at_most(U256::from(6u64), U256::from(5u64)),
            Err(ReserveError::Slippage {
                actual: U256::from(6u64),
                limit: U256::from(5u64)
            })
        );
    }
}
