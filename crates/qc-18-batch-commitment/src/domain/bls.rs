//! # BLS Signature Aggregation (BLS12-381)
//!
//! Per-transaction signatures are folded into one aggregate per root so the
//! base ledger verifies a single signature instead of thousands.
//!
//! ## Implementation Details
//!
//! - Signatures are on G1 (48 bytes compressed)
//! - Public keys are on G2 (96 bytes compressed)
//!
//! This uses blst's `min_sig` variant for smaller signatures. Aggregation is
//! a commutative group sum, so it is computed as a parallel reduction.
//!
//! Verification groups public keys by identical message before the pairing
//! check: `n` signers of the same bytes cost one pairing, not `n`. That
//! grouping is only sound for keys whose proof of possession has been
//! checked ([`verify_possession`]); otherwise a rogue key chosen as a
//! function of honest keys can forge an aggregate. Keys held as a
//! [`KeyPair`] are possessed by construction.
//!
//! An aggregate that fails verification does not say which contributor is
//! bad. [`isolate_invalid`] bisects to find out when the caller asks.

use std::collections::HashMap;
use std::fmt;

use blst::min_sig::{
    AggregatePublicKey, AggregateSignature as BlstAggregate, PublicKey, SecretKey, Signature,
};
use blst::BLST_ERROR;
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;

use super::entities::{AggregateSignature, BlsPublicKey, BlsSignature, SignedTransaction};
use crate::error::{BatchCommitmentError, Result};

/// Domain Separation Tag for `min_sig` (signatures on G1), proof-of-possession scheme
pub const DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_POP_";

/// Domain Separation Tag for proofs of possession
pub const POP_DST: &[u8] = b"BLS_POP_BLS12381G1_XMD:SHA-256_SSWU_RO_POP_";

/// Minimum input keying material accepted by `key_gen`
const IKM_SIZE: usize = 32;

/// A BLS signing key and its public key.
pub struct KeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl KeyPair {
    /// Fresh key pair from a cryptographic RNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut ikm = [0u8; IKM_SIZE];
        rng.fill_bytes(&mut ikm);
        Self::from_seed(&ikm)
    }

    /// Deterministic key pair from input keying material (at least 32 bytes).
    pub fn from_seed(ikm: &[u8]) -> Result<Self> {
        let secret = SecretKey::key_gen(ikm, &[]).map_err(|e| {
            BatchCommitmentError::InvalidKeyMaterial(format!("key generation failed: {:?}", e))
        })?;
        let public = BlsPublicKey {
            bytes: secret.sk_to_pk().to_bytes(),
        };
        Ok(Self { secret, public })
    }

    /// Public half
    pub fn public_key(&self) -> BlsPublicKey {
        self.public
    }

    /// Sign `message` under [`DST`].
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature {
            bytes: self.secret.sign(message, DST, &[]).to_bytes(),
        }
    }

    /// Proof of possession: a signature over the public key under [`POP_DST`].
    pub fn prove_possession(&self) -> BlsSignature {
        BlsSignature {
            bytes: self.secret.sign(&self.public.bytes, POP_DST, &[]).to_bytes(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(&self.public.bytes[..8]))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Verify a single signature.
pub fn verify(message: &[u8], signature: &BlsSignature, public_key: &BlsPublicKey) -> bool {
    let Ok(sig) = Signature::from_bytes(&signature.bytes) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_bytes(&public_key.bytes) else {
        return false;
    };

    sig.verify(true, message, DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
}

/// Check that the holder of `public_key` also holds its secret key.
///
/// Required for every externally supplied key before it takes part in
/// [`verify_aggregate`].
pub fn verify_possession(public_key: &BlsPublicKey, proof: &BlsSignature) -> bool {
    let Ok(sig) = Signature::from_bytes(&proof.bytes) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_bytes(&public_key.bytes) else {
        return false;
    };

    sig.verify(true, &public_key.bytes, POP_DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
}

fn parse_signature(signature: &BlsSignature) -> Result<BlstAggregate> {
    let sig = Signature::from_bytes(&signature.bytes).map_err(|e| {
        BatchCommitmentError::InvalidKeyMaterial(format!("signature does not decode: {:?}", e))
    })?;
    Ok(BlstAggregate::from_signature(&sig))
}

/// Sum signatures into one aggregate.
///
/// Order-independent: any permutation of `signatures` gives the same bytes.
///
/// # Errors
/// * `EmptyAggregation` if the input list is empty
/// * `InvalidKeyMaterial` if any signature does not decode to a G1 point
pub fn aggregate(signatures: &[BlsSignature]) -> Result<AggregateSignature> {
    let summed = signatures
        .par_iter()
        .map(parse_signature)
        .try_reduce_with(|mut acc, next| {
            acc.add_aggregate(&next);
            Ok(acc)
        })
        .ok_or(BatchCommitmentError::EmptyAggregation)??;

    Ok(AggregateSignature {
        signature: BlsSignature {
            bytes: summed.to_signature().to_bytes(),
        },
        count: signatures.len(),
    })
}

/// Verify an aggregate against the `(public key, message)` pairs it covers.
///
/// Every key must have passed [`verify_possession`] (or come from a local
/// [`KeyPair`]); signers of a shared message are checked as one summed key.
///
/// Returns `false` for malformed keys or signatures, or if `pairs` is empty.
pub fn verify_aggregate(aggregate: &AggregateSignature, pairs: &[(BlsPublicKey, &[u8])]) -> bool {
    if pairs.is_empty() || pairs.len() != aggregate.count {
        return false;
    }

    let Ok(sig) = Signature::from_bytes(&aggregate.signature.bytes) else {
        return false;
    };

    // Group keys by message, preserving first-seen order
    let mut order: Vec<&[u8]> = Vec::new();
    let mut groups: HashMap<&[u8], Vec<PublicKey>> = HashMap::new();
    for &(public_key, message) in pairs {
        let Ok(pk) = PublicKey::from_bytes(&public_key.bytes) else {
            return false;
        };
        groups
            .entry(message)
            .or_insert_with(|| {
                order.push(message);
                Vec::new()
            })
            .push(pk);
    }

    let mut keys = Vec::with_capacity(order.len());
    for message in &order {
        let group = &groups[message];
        let refs: Vec<&PublicKey> = group.iter().collect();
        let Ok(combined) = AggregatePublicKey::aggregate(&refs, true) else {
            return false;
        };
        keys.push(combined.to_public_key());
    }
    let key_refs: Vec<&PublicKey> = keys.iter().collect();

    sig.aggregate_verify(true, &order, DST, &key_refs, true) == BLST_ERROR::BLST_SUCCESS
}

/// Wire form of an aggregate as carried in a root publication.
pub fn to_wire_format(aggregate: &AggregateSignature) -> Vec<u8> {
    aggregate.signature.bytes.to_vec()
}

/// Aggregate the signatures of a run of signed transactions.
pub fn aggregate_signed(items: &[SignedTransaction]) -> Result<AggregateSignature> {
    let signatures: Vec<BlsSignature> = items.iter().map(|item| item.signature).collect();
    aggregate(&signatures)
}

/// Verify an aggregate over a run of signed transactions.
pub fn verify_signed(aggregate: &AggregateSignature, items: &[SignedTransaction]) -> bool {
    let pairs: Vec<(BlsPublicKey, &[u8])> = items
        .iter()
        .map(|item| (item.public_key, item.transaction.as_bytes()))
        .collect();
    verify_aggregate(aggregate, &pairs)
}

/// Positions (within `items`) of the signatures that do not verify.
///
/// Bisects: a half whose aggregate verifies is cleared in one pairing check,
/// so a single bad signature among `n` costs `O(log n)` checks.
pub fn isolate_invalid(items: &[SignedTransaction]) -> Vec<usize> {
    let mut invalid = Vec::new();
    bisect(items, 0, &mut invalid);
    invalid
}

fn bisect(items: &[SignedTransaction], offset: usize, invalid: &mut Vec<usize>) {
    if items.is_empty() {
        return;
    }

    if items.len() == 1 {
        let item = &items[0];
        if !verify(item.transaction.as_bytes(), &item.signature, &item.public_key) {
            invalid.push(offset);
        }
        return;
    }

    let passes = aggregate_signed(items)
        .map(|agg| verify_signed(&agg, items))
        .unwrap_or(false);
    if passes {
        return;
    }

    let mid = items.len() / 2;
    bisect(&items[..mid], offset, invalid);
    bisect(&items[mid..], offset + mid, invalid);
}
