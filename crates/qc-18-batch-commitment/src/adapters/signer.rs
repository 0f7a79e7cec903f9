//! BLS Signature Provider
//!
//! Implements the `SignatureProvider` port with blst `min_sig`.

use rand::rngs::OsRng;

use crate::domain::bls;
use crate::domain::{AggregateSignature, BlsPublicKey, BlsSignature, KeyPair, SignedTransaction};
use crate::error::Result;
use crate::ports::outbound::SignatureProvider;

/// BLS12-381 provider (signatures on G1, keys on G2).
#[derive(Debug, Default, Clone, Copy)]
pub struct BlsSignatureProvider;

impl BlsSignatureProvider {
    /// Create a provider
    pub fn new() -> Self {
        Self
    }
}

impl SignatureProvider for BlsSignatureProvider {
    fn generate_key_pair(&self) -> Result<KeyPair> {
        KeyPair::generate(&mut OsRng)
    }

    fn sign(&self, message: &[u8], key_pair: &KeyPair) -> BlsSignature {
        key_pair.sign(message)
    }

    fn prove_possession(&self, key_pair: &KeyPair) -> BlsSignature {
        key_pair.prove_possession()
    }

    fn verify_possession(&self, public_key: &BlsPublicKey, proof: &BlsSignature) -> bool {
        bls::verify_possession(public_key, proof)
    }

    fn aggregate(&self, signatures: &[BlsSignature]) -> Result<AggregateSignature> {
        bls::aggregate(signatures)
    }

    fn verify_aggregate(
        &self,
        aggregate: &AggregateSignature,
        pairs: &[(BlsPublicKey, &[u8])],
    ) -> bool {
        bls::verify_aggregate(aggregate, pairs)
    }

    fn to_wire_format(&self, aggregate: &AggregateSignature) -> Vec<u8> {
        bls::to_wire_format(aggregate)
    }

    fn isolate_invalid(&self, items: &[SignedTransaction]) -> Vec<usize> {
        bls::isolate_invalid(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PackedTransaction;

    #[test]
    fn test_sign_all_round_robin() {
        let provider = BlsSignatureProvider::new();
        let signers = vec![
            KeyPair::from_seed(&[1u8; 32]).unwrap(),
            KeyPair::from_seed(&[2u8; 32]).unwrap(),
        ];
        // Input position 2 was dropped upstream
        let txs: Vec<(usize, PackedTransaction)> = [0usize, 1, 3, 4, 5]
            .into_iter()
            .map(|i| (i, PackedTransaction::from_raw(vec![i as u8; 24])))
            .collect();

        let signed = provider.sign_all(txs.clone(), &signers).unwrap();

        assert_eq!(signed.len(), 5);
        for ((index, item), (expected_index, tx)) in signed.iter().zip(&txs) {
            assert_eq!(index, expected_index);
            assert_eq!(&item.transaction, tx);
            assert_eq!(item.public_key, signers[index % 2].public_key());
        }

        let items: Vec<SignedTransaction> = signed.into_iter().map(|(_, s)| s).collect();
        let agg = provider
            .aggregate(&items.iter().map(|s| s.signature).collect::<Vec<_>>())
            .unwrap();
        assert!(bls::verify_signed(&agg, &items));
    }

    #[test]
    fn test_sign_all_requires_signers() {
        let provider = BlsSignatureProvider::new();
        let one = vec![(0, PackedTransaction::from_raw(vec![0; 24]))];
        assert!(provider.sign_all(one, &[]).is_err());
        assert!(provider.sign_all(vec![], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_generated_key_signs() {
        let provider = BlsSignatureProvider::new();
        provider.initialize().unwrap();
        let kp = provider.generate_key_pair().unwrap();
        let sig = provider.sign(b"root", &kp);
        assert!(bls::verify(b"root", &sig, &kp.public_key()));
    }

    #[test]
    fn test_possession_round_trip_through_provider() {
        let provider = BlsSignatureProvider::new();
        let kp = provider.generate_key_pair().unwrap();
        let stranger = provider.generate_key_pair().unwrap();

        let proof = provider.prove_possession(&kp);
        assert!(provider.verify_possession(&kp.public_key(), &proof));
        assert!(!provider.verify_possession(&stranger.public_key(), &proof));
    }
}
