//! Fixed gas oracle
//!
//! Implements `GasOracle` with a constant price, for benchmarks and tests.

use async_trait::async_trait;
use primitive_types::U256;

use crate::error::Result;
use crate::ports::outbound::{GasOracle, GasPrice};

/// 1 gwei
pub const GWEI: u64 = 1_000_000_000;

/// Oracle that always reports the same tiers.
#[derive(Clone, Copy, Debug)]
pub struct FixedGasOracle {
    price: GasPrice,
}

impl FixedGasOracle {
    /// Oracle reporting `safe` and `fast` (wei).
    pub fn new(safe: U256, fast: U256) -> Self {
        Self {
            price: GasPrice { safe, fast },
        }
    }
}

impl Default for FixedGasOracle {
    fn default() -> Self {
        Self::new(U256::from(20 * GWEI), U256::from(40 * GWEI))
    }
}

#[async_trait]
impl GasOracle for FixedGasOracle {
    async fn current_price(&self) -> Result<GasPrice> {
        Ok(self.price)
    }
}
