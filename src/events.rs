// 9.0: every state change of the reserve pool produces an event. used for audit trails,
// state reconstruction, and notifying the basket-unit ledger. EventPayload lists all kinds.
// amounts are native token units unless the field says basket units.

use crate::types::{AssetId, Direction};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, payload: EventPayload) -> Self {
        Self { id, payload }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Tick-priced events
    Minted(MintedEvent),
    Burned(BurnedEvent),
    Swapped(SwappedEvent),

    // Proportional path
    ProportionalMinted(ProportionalEvent),
    ProportionalBurned(ProportionalEvent),

    // Rebalancing
    Equalized(EqualizedEvent),

    // Administrative events
    ConfigUpdated(ConfigUpdatedEvent),
    FeesCollected(FeesCollectedEvent),

    // Rejections leave reserves untouched but are still recorded
    OperationRejected(OperationRejectedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedEvent {
    pub asset: AssetId,
    pub native_in: U256,
    pub basket_units: U256,
    pub fee: U256,
    pub ticks_crossed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnedEvent {
    pub asset: AssetId,
    pub native_out: U256,
    pub basket_units: U256,
    pub fee: U256,
    pub ticks_crossed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwappedEvent {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub native_in: U256,
    pub native_out: U256,
    pub basket_units: U256,
    pub fee: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProportionalEvent {
    pub basket_units: U256,
    pub fee: U256,
    pub legs: Vec<(AssetId, U256)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqualizedEvent {
    pub asset: AssetId,
    pub direction: Direction,
    pub native_amount: U256,
    pub basket_units: U256,
    pub bounty: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdatedEvent {
    pub asset: AssetId,
    // false when an existing asset's table was replaced
    pub created: bool,
    pub tick_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesCollectedEvent {
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRejectedEvent {
    pub operation: String,
    pub asset: Option<AssetId>,
    pub reason: String,
}
