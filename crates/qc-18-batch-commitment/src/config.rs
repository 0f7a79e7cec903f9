//! Configuration types for batch commitment
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! the defaults below.
//!
//! ```toml
//! bond_size_wei = 10000000000000000
//!
//! [network]
//! endpoint = "http://localhost:8545"
//! producer = "0x00000000000000000000000000000000000000aa"
//!
//! [gas]
//! gas_limit = 6000000
//! ledger_block_capacity = 8000000
//! usd_per_block = [100, 50]
//!
//! [batching]
//! max_roots_per_commit = 128
//! max_root_size = 32000
//! submission_timeout_secs = 60
//! block_reference_depth = 7
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::domain::{Address, TRANSACTION_SIZE};
use crate::error::{BatchCommitmentError, Result};

/// 0.01 ether
pub const DEFAULT_BOND_SIZE_WEI: u64 = 10_000_000_000_000_000;

/// Runtime configuration for the commit-chain producer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitChainConfig {
    /// Base-ledger connection and producer identity
    pub network: NetworkConfig,

    /// Gas limits and pricing
    pub gas: GasConfig,

    /// Bond attached to every commitment (wei)
    pub bond_size_wei: BondSize,

    /// Chunking, batching and submission
    pub batching: BatchingConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Bond in wei, defaulting to [`DEFAULT_BOND_SIZE_WEI`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BondSize(pub u64);

impl Default for BondSize {
    fn default() -> Self {
        Self(DEFAULT_BOND_SIZE_WEI)
    }
}

/// Base-ledger connection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base-ledger RPC endpoint.
    ///
    /// Reserved for a networked [`CommitmentSink`](crate::CommitmentSink)
    /// adapter; the in-memory sink never reads it.
    pub endpoint: String,

    /// Producer account, 0x-prefixed hex
    pub producer: String,

    /// Fee token account, 0x-prefixed hex
    pub fee_token: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8545".to_string(),
            producer: format!("0x{}", "00".repeat(20)),
            fee_token: format!("0x{}", "00".repeat(20)),
        }
    }
}

/// Gas limits and pricing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Gas limit per submitted transaction
    pub gas_limit: u64,

    /// Gas capacity of one base-ledger block
    pub ledger_block_capacity: u64,

    /// Prices (USD) per base-ledger block to estimate cost at
    pub usd_per_block: Vec<u64>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gas_limit: crate::DEFAULT_GAS_LIMIT,
            ledger_block_capacity: crate::DEFAULT_LEDGER_BLOCK_CAPACITY,
            usd_per_block: vec![100, 50],
        }
    }
}

/// Chunking, batching and submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Roots per commitment
    pub max_roots_per_commit: usize,

    /// Byte bound per chunk
    pub max_root_size: usize,

    /// Packed transaction width
    pub transaction_size: usize,

    /// Batches produced ahead of the submitter
    pub max_in_flight_batches: usize,

    /// Budget for each sink call
    pub submission_timeout_secs: u64,

    /// Blocks behind head used as the commitment anchor
    pub block_reference_depth: u64,

    /// Verify every aggregate before publishing it
    pub verify_aggregates: bool,

    /// Bisect failing aggregates to name the bad signatures
    pub isolate_invalid: bool,

    /// Sequence number of the first batch
    pub first_sequence: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_roots_per_commit: crate::DEFAULT_MAX_ROOTS_PER_COMMIT,
            max_root_size: crate::DEFAULT_MAX_ROOT_SIZE,
            transaction_size: TRANSACTION_SIZE,
            max_in_flight_batches: 4,
            submission_timeout_secs: 60,
            block_reference_depth: 7,
            verify_aggregates: true,
            isolate_invalid: true,
            first_sequence: 1,
        }
    }
}

impl BatchingConfig {
    /// Submission budget as a duration
    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}

/// Log output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CommitChainConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// * `InvalidConfig` if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            BatchCommitmentError::InvalidConfig(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BatchCommitmentError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Bond as a 256-bit amount
    pub fn bond(&self) -> U256 {
        U256::from(self.bond_size_wei.0)
    }

    /// Producer account
    pub fn producer(&self) -> Result<Address> {
        parse_address("network.producer", &self.network.producer)
    }

    /// Fee token account
    pub fn fee_token(&self) -> Result<Address> {
        parse_address("network.fee_token", &self.network.fee_token)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let batching = &self.batching;
        if batching.max_roots_per_commit == 0 {
            return Err(invalid("batching.max_roots_per_commit must be non-zero"));
        }
        if batching.transaction_size != TRANSACTION_SIZE {
            return Err(BatchCommitmentError::InvalidConfig(format!(
                "batching.transaction_size must be {} (fixed record layout), got {}",
                TRANSACTION_SIZE, batching.transaction_size
            )));
        }
        if batching.max_root_size < batching.transaction_size {
            return Err(invalid(
                "batching.max_root_size must hold at least one transaction",
            ));
        }
        if batching.max_in_flight_batches == 0 {
            return Err(invalid("batching.max_in_flight_batches must be non-zero"));
        }
        if batching.submission_timeout_secs == 0 {
            return Err(invalid("batching.submission_timeout_secs must be non-zero"));
        }
        if self.gas.gas_limit == 0 {
            return Err(invalid("gas.gas_limit must be non-zero"));
        }
        if self.gas.ledger_block_capacity == 0 {
            return Err(invalid("gas.ledger_block_capacity must be non-zero"));
        }
        self.producer()?;
        self.fee_token()?;
        Ok(())
    }
}

fn invalid(message: &str) -> BatchCommitmentError {
    BatchCommitmentError::InvalidConfig(message.to_string())
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(digits)
        .map_err(|e| BatchCommitmentError::InvalidConfig(format!("{}: {}", field, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        BatchCommitmentError::InvalidConfig(format!(
            "{}: expected 20 bytes, got {}",
            field,
            b.len()
        ))
    })
}
