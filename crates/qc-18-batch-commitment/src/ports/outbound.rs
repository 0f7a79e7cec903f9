//! Outbound ports (driven side - SPI)

use async_trait::async_trait;
use primitive_types::U256;
use rayon::prelude::*;

use crate::domain::{
    AggregateSignature, Address, BlockReference, BlsPublicKey, BlsSignature, KeyPair,
    PackedTransaction, RejectionReason, Root, SignedTransaction,
};
use crate::error::{BatchCommitmentError, Result};

/// Port: Base-ledger contract that accepts root publications and commitments
#[async_trait]
pub trait CommitmentSink: Send + Sync {
    /// Block `depth` blocks behind the current head
    async fn latest_block(&self, depth: u64) -> Result<BlockReference>;

    /// Bond every commitment must carry
    async fn minimum_bond(&self) -> Result<U256>;

    /// Publish a root with its chunk payload and aggregate signature
    async fn publish_root(&self, publication: &RootPublication) -> Result<SinkReceipt>;

    /// Commit a batch of published roots
    async fn submit(&self, request: &SubmitRequest) -> Result<SinkReceipt>;
}

/// Port: Gas price source, consulted once per session
#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Current price tiers
    async fn current_price(&self) -> Result<GasPrice>;
}

/// Port: Signature scheme used to cover the transactions of a root.
///
/// Synchronous: every method is CPU-bound and runs on rayon workers.
pub trait SignatureProvider: Send + Sync {
    /// One-time setup; a no-op for schemes that need none
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Fresh signing key
    fn generate_key_pair(&self) -> Result<KeyPair>;

    /// Sign a message
    fn sign(&self, message: &[u8], key_pair: &KeyPair) -> BlsSignature;

    /// Fold signatures into one aggregate
    fn aggregate(&self, signatures: &[BlsSignature]) -> Result<AggregateSignature>;

    /// Proof that the caller holds the secret half of `key_pair`
    fn prove_possession(&self, key_pair: &KeyPair) -> BlsSignature;

    /// Check a proof of possession; keys from outside the process must pass
    /// this before their signatures are aggregated
    fn verify_possession(&self, public_key: &BlsPublicKey, proof: &BlsSignature) -> bool;

    /// Check an aggregate against the `(public key, message)` pairs it covers.
    /// Assumes every key's possession was verified.
    fn verify_aggregate(
        &self,
        aggregate: &AggregateSignature,
        pairs: &[(BlsPublicKey, &[u8])],
    ) -> bool;

    /// Bytes carried in a root publication
    fn to_wire_format(&self, aggregate: &AggregateSignature) -> Vec<u8>;

    /// Positions of the signatures that fail individually
    fn isolate_invalid(&self, items: &[SignedTransaction]) -> Vec<usize>;

    /// Sign indexed transactions in parallel; signer `index % signers.len()`
    /// signs the transaction at input position `index`.
    ///
    /// # Errors
    /// * `InvalidKeyMaterial` if there is something to sign but no signer
    fn sign_all(
        &self,
        transactions: Vec<(usize, PackedTransaction)>,
        signers: &[KeyPair],
    ) -> Result<Vec<(usize, SignedTransaction)>> {
        if signers.is_empty() && !transactions.is_empty() {
            return Err(BatchCommitmentError::InvalidKeyMaterial(
                "no signing keys supplied".into(),
            ));
        }

        Ok(transactions
            .into_par_iter()
            .map(|(index, transaction)| {
                let signer = &signers[index % signers.len()];
                let signed = SignedTransaction {
                    signature: self.sign(transaction.as_bytes(), signer),
                    public_key: signer.public_key(),
                    transaction,
                };
                (index, signed)
            })
            .collect())
    }
}

/// Gas price tiers reported by an oracle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasPrice {
    /// Price expected to confirm within a few blocks
    pub safe: U256,
    /// Price expected to confirm in the next block
    pub fast: U256,
}

/// Transaction parameters applied to every sink call of a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmissionOverrides {
    /// Gas limit per transaction
    pub gas_limit: u64,
    /// Gas price (wei)
    pub gas_price: U256,
}

/// A root and the data needed to publish it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootPublication {
    /// Committed root
    pub root: Root,
    /// Global root index
    pub root_index: usize,
    /// Producer account
    pub producer: Address,
    /// Token in which the root's fees are paid
    pub fee_token: Address,
    /// Concatenated chunk transactions
    pub payload: Vec<u8>,
    /// Aggregate signature wire bytes
    pub aggregate_signature: Vec<u8>,
    /// Session transaction parameters
    pub overrides: SubmissionOverrides,
}

/// A commitment submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Anchor block
    pub block: BlockReference,
    /// Commitment slot
    pub sequence: u64,
    /// Roots in production order
    pub roots: Vec<Root>,
    /// Attached bond
    pub bond: U256,
    /// Session transaction parameters
    pub overrides: SubmissionOverrides,
}

/// Sink answer to a publication or submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Whether the call was accepted
    pub accepted: bool,
    /// Gas consumed
    pub gas_used: u64,
    /// Set when `accepted` is false
    pub reason: Option<RejectionReason>,
}

impl SinkReceipt {
    /// Accepted answer
    pub fn accepted(gas_used: u64) -> Self {
        Self {
            accepted: true,
            gas_used,
            reason: None,
        }
    }

    /// Rejected answer
    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            accepted: false,
            gas_used: 0,
            reason: Some(reason),
        }
    }
}
