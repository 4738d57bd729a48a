//! Block header codec and hash rule dispatch
//!
//! All supported chains share the 80-byte little-endian header layout;
//! what differs is which hash algorithm runs over those bytes. The
//! selection lives in `HeaderHashRule` so a chain description stays
//! declarative.

use crate::error::{ChainError, Result};
use crate::hashes;
use crate::params::{HeaderHash, HeaderHashRule};
use crate::stream::{DataStream, DataWriter};
use crate::types::{BlockHeader, ByteString, Hash32};

/// Serialized size of the common header layout
pub const HEADER_SIZE: usize = 80;

/// Serialize a header into the common 80-byte layout
pub fn header_to_bytes(header: &BlockHeader) -> ByteString {
    let mut w = DataWriter::new();
    w.write_i32(header.version);
    w.write_bytes(&header.prev_block_hash);
    w.write_bytes(&header.merkle_root);
    w.write_u32(header.timestamp);
    w.write_u32(header.bits);
    w.write_u32(header.nonce);
    w.into_bytes()
}

/// Parse the common 80-byte layout
///
/// The height is positional, not serialized; callers attach it.
pub fn header_from_bytes(bytes: &[u8]) -> Result<BlockHeader> {
    if bytes.len() != HEADER_SIZE {
        return Err(ChainError::Serialization(format!(
            "Header record must be {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }
    let mut s = DataStream::new(bytes);
    Ok(BlockHeader {
        version: s.read_i32()?,
        prev_block_hash: s.read_hash32()?,
        merkle_root: s.read_hash32()?,
        timestamp: s.read_u32()?,
        bits: s.read_u32()?,
        nonce: s.read_u32()?,
        height: None,
    })
}

/// Run one hash algorithm over serialized header bytes
pub fn algorithm_hash(algorithm: HeaderHash, bytes: &[u8]) -> Result<Hash32> {
    match algorithm {
        HeaderHash::Sha256d => Ok(hashes::sha256d(bytes)),
        HeaderHash::Scrypt => hashes::scrypt_pow_hash(bytes),
    }
}

/// Select and run the algorithm a rule names for a block version
pub fn hash_with_rule(rule: &HeaderHashRule, version: i32, bytes: &[u8]) -> Result<Hash32> {
    let algorithm = match rule {
        HeaderHashRule::Fixed(algorithm) => *algorithm,
        HeaderHashRule::VersionThreshold {
            threshold,
            above,
            below,
        } => {
            if version > *threshold {
                *above
            } else {
                *below
            }
        }
        HeaderHashRule::VersionTable(table) => table
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, algorithm)| *algorithm)
            .ok_or(ChainError::UnknownAlgorithm(version))?,
    };
    algorithm_hash(algorithm, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 2,
            prev_block_hash: [0x11; 32],
            merkle_root: [0x22; 32],
            timestamp: 1317972665,
            bits: 0x1e0ffff0,
            nonce: 2084524493,
            height: None,
        }
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let bytes = header_to_bytes(&header);
        assert_eq!(bytes.len(), HEADER_SIZE);
        let parsed = header_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let bytes = header_to_bytes(&sample_header());
        assert_eq!(&bytes[0..4], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[4..36], &[0x11; 32]);
        assert_eq!(&bytes[36..68], &[0x22; 32]);
        assert_eq!(&bytes[72..76], &[0xf0, 0xff, 0x0f, 0x1e]);
    }

    #[test]
    fn test_header_wrong_length_rejected() {
        assert!(header_from_bytes(&[0u8; 79]).is_err());
        assert!(header_from_bytes(&[0u8; 81]).is_err());
    }

    #[test]
    fn test_version_threshold_dispatch() {
        let rule = HeaderHashRule::VersionThreshold {
            threshold: 6,
            above: HeaderHash::Sha256d,
            below: HeaderHash::Scrypt,
        };
        let bytes = header_to_bytes(&sample_header());
        let above = hash_with_rule(&rule, 7, &bytes).unwrap();
        assert_eq!(above, hashes::sha256d(&bytes));
        let below = hash_with_rule(&rule, 6, &bytes).unwrap();
        assert_eq!(below, hashes::scrypt_pow_hash(&bytes).unwrap());
    }

    #[test]
    fn test_version_table_unlisted_version_is_fatal() {
        static TABLE: &[(i32, HeaderHash)] = &[(1, HeaderHash::Sha256d), (2, HeaderHash::Scrypt)];
        let rule = HeaderHashRule::VersionTable(TABLE);
        let bytes = header_to_bytes(&sample_header());
        assert!(hash_with_rule(&rule, 1, &bytes).is_ok());
        match hash_with_rule(&rule, 3, &bytes) {
            Err(ChainError::UnknownAlgorithm(3)) => {}
            other => panic!("expected UnknownAlgorithm(3), got {:?}", other),
        }
    }
}
