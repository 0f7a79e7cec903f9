//! # Transaction Encoder
//!
//! Packs a [`Transfer`] into the fixed 24-byte record committed on the
//! base ledger. The layout is part of the sink contract and must not move.

use primitive_types::U256;

use super::entities::{Metadata, PackedTransaction, Transfer, TRANSACTION_SIZE};
use crate::error::{BatchCommitmentError, Result};

/// Packed metadata width
pub const METADATA_SIZE: usize = 8;

/// Sender / receiver identifier slot width
pub const OWNER_ID_SIZE: usize = 4;

/// Amount slot width
pub const AMOUNT_SIZE: usize = 4;

const FROM_OFFSET: usize = METADATA_SIZE;
const TO_OFFSET: usize = FROM_OFFSET + OWNER_ID_SIZE;
const TRANSFER_OFFSET: usize = TO_OFFSET + OWNER_ID_SIZE;
const CHANGE_OFFSET: usize = TRANSFER_OFFSET + AMOUNT_SIZE;

const _: () = assert!(CHANGE_OFFSET + AMOUNT_SIZE == TRANSACTION_SIZE);

/// Encode a transfer into its packed record.
///
/// # Errors
/// * `EncodingOverflow` if an identifier is wider than 4 bytes or an amount
///   needs more than 32 bits
pub fn encode(transfer: &Transfer) -> Result<PackedTransaction> {
    let mut out = Vec::with_capacity(TRANSACTION_SIZE);

    encode_metadata(&mut out, &transfer.metadata);
    write_identifier(&mut out, "from", &transfer.from)?;
    write_identifier(&mut out, "to", &transfer.to)?;
    write_amount(&mut out, "transfer_amount", transfer.transfer_amount)?;
    write_amount(&mut out, "change_amount", transfer.change_amount)?;

    debug_assert_eq!(out.len(), TRANSACTION_SIZE);
    Ok(PackedTransaction::new(out))
}

/// Decode a packed record.
///
/// Identifiers come back at full slot width (leading zero bytes kept), so
/// `encode(&decode(bytes)?)` reproduces `bytes` exactly.
pub fn decode(bytes: &[u8]) -> Result<Transfer> {
    if bytes.len() != TRANSACTION_SIZE {
        return Err(BatchCommitmentError::MalformedTransaction {
            expected: TRANSACTION_SIZE,
            actual: bytes.len(),
        });
    }

    let metadata = Metadata {
        block_height: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        root_index: bytes[4],
        transaction_index: u16::from_be_bytes([bytes[5], bytes[6]]),
        output_index: bytes[7],
    };

    Ok(Transfer {
        metadata,
        from: bytes[FROM_OFFSET..TO_OFFSET].to_vec(),
        to: bytes[TO_OFFSET..TRANSFER_OFFSET].to_vec(),
        transfer_amount: U256::from_big_endian(&bytes[TRANSFER_OFFSET..CHANGE_OFFSET]),
        change_amount: U256::from_big_endian(&bytes[CHANGE_OFFSET..]),
    })
}

fn encode_metadata(out: &mut Vec<u8>, metadata: &Metadata) {
    out.extend_from_slice(&metadata.block_height.to_be_bytes());
    out.push(metadata.root_index);
    out.extend_from_slice(&metadata.transaction_index.to_be_bytes());
    out.push(metadata.output_index);
}

fn write_identifier(out: &mut Vec<u8>, field: &'static str, id: &[u8]) -> Result<()> {
    if id.len() > OWNER_ID_SIZE {
        return Err(BatchCommitmentError::EncodingOverflow {
            field,
            width: OWNER_ID_SIZE,
            actual: id.len(),
        });
    }
    out.extend(std::iter::repeat(0u8).take(OWNER_ID_SIZE - id.len()));
    out.extend_from_slice(id);
    Ok(())
}

fn write_amount(out: &mut Vec<u8>, field: &'static str, amount: U256) -> Result<()> {
    let bits = amount.bits();
    if bits > AMOUNT_SIZE * 8 {
        return Err(BatchCommitmentError::EncodingOverflow {
            field,
            width: AMOUNT_SIZE,
            actual: bits.div_ceil(8),
        });
    }
    out.extend_from_slice(&amount.low_u32().to_be_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn benchmark_transfer() -> Transfer {
        Transfer {
            metadata: Metadata::default(),
            from: vec![0xde, 0xad, 0xbe],
            to: vec![0xde, 0xad, 0xbe],
            transfer_amount: U256::from(0xaabbccddu32),
            change_amount: U256::from(0xaabbccddu32),
        }
    }

    #[test]
    fn test_encode_fixed_length() {
        let packed = encode(&benchmark_transfer()).unwrap();
        assert_eq!(packed.len(), TRANSACTION_SIZE);
    }

    #[test]
    fn test_encode_layout() {
        let transfer = Transfer {
            metadata: Metadata {
                block_height: 0x01020304,
                root_index: 0x05,
                transaction_index: 0x0607,
                output_index: 0x08,
            },
            ..benchmark_transfer()
        };
        let packed = encode(&transfer).unwrap();

        assert_eq!(
            packed.as_bytes(),
            &[
                0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // metadata
                0x00, 0xde, 0xad, 0xbe, // from (left padded)
                0x00, 0xde, 0xad, 0xbe, // to
                0xaa, 0xbb, 0xcc, 0xdd, // transfer amount
                0xaa, 0xbb, 0xcc, 0xdd, // change amount
            ]
        );
    }

    #[test]
    fn test_encode_deterministic() {
        let a = encode(&benchmark_transfer()).unwrap();
        let b = encode(&benchmark_transfer()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identifier_overflow() {
        let transfer = Transfer {
            to: vec![1, 2, 3, 4, 5],
            ..benchmark_transfer()
        };
        assert_eq!(
            encode(&transfer),
            Err(BatchCommitmentError::EncodingOverflow {
                field: "to",
                width: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn test_amount_overflow() {
        let transfer = Transfer {
            change_amount: U256::from(u32::MAX as u64 + 1),
            ..benchmark_transfer()
        };
        assert_eq!(
            encode(&transfer),
            Err(BatchCommitmentError::EncodingOverflow {
                field: "change_amount",
                width: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn test_amount_at_slot_limit() {
        let transfer = Transfer {
            transfer_amount: U256::from(u32::MAX),
            ..benchmark_transfer()
        };
        assert!(encode(&transfer).is_ok());
    }

    #[test]
    fn test_decode_restores_fields() {
        let packed = encode(&benchmark_transfer()).unwrap();
        let decoded = decode(packed.as_bytes()).unwrap();

        assert_eq!(decoded.from, vec![0x00, 0xde, 0xad, 0xbe]);
        assert_eq!(decoded.transfer_amount, U256::from(0xaabbccddu32));
        assert_eq!(encode(&decoded).unwrap(), packed);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            decode(&[0u8; 23]).unwrap_err(),
            BatchCommitmentError::MalformedTransaction {
                expected: 24,
                actual: 23
            }
        );
    }
}
