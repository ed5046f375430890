// 2.0: shared primitives. asset ids, operation direction, step results.
// amounts are plain U256 integers: canonical reserve units (18 digits) unless a name says native.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

// Deposit raises the asset's allocation, Withdrawal lowers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Deposit => write!(f, "deposit"),
            Direction::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

// 2.1: output of a single-tick computation. `amount` is whatever the caller did not
// specify (mint, deposit, burn or withdrawal); `fee` is always in basket units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepResult {
    pub amount: U256,
    pub fee: U256,
}

impl StepResult {
    pub fn zero() -> Self {
        Self::default()
    }
}
