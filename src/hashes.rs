//! Hash primitives and hash/hex conversions
//!
//! All 32-byte hashes are kept in wire byte order. Display hex is the
//! reversed byte sequence, matching the convention block explorers use.

use crate::error::{ChainError, Result};
use crate::types::Hash32;
use num_bigint::BigUint;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA256
pub fn sha256(data: &[u8]) -> Hash32 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Double SHA256, the default header and transaction hash
pub fn sha256d(data: &[u8]) -> Hash32 {
    sha256(&sha256(data))
}

/// RIPEMD160 of SHA256, used for addresses and script hashes
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// Scrypt proof-of-work hash (N=1024, r=1, p=1)
///
/// The 80-byte serialized header is both password and salt.
pub fn scrypt_pow_hash(data: &[u8]) -> Result<Hash32> {
    let params = scrypt::Params::new(10, 1, 1, 32)
        .map_err(|e| ChainError::ConsensusViolation(format!("Invalid scrypt parameters: {}", e)))?;
    let mut out = [0u8; 32];
    scrypt::scrypt(data, data, &params, &mut out)
        .map_err(|e| ChainError::ConsensusViolation(format!("Scrypt hashing failed: {}", e)))?;
    Ok(out)
}

/// Display hex of a wire-order hash (byte-reversed)
pub fn hash_to_hex(hash: &Hash32) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Parse display hex back into a wire-order hash
pub fn hash_from_hex(s: &str) -> Result<Hash32> {
    let bytes = hex::decode(s)
        .map_err(|e| ChainError::Serialization(format!("Invalid hash hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(ChainError::Serialization(format!(
            "Hash hex must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out.reverse();
    Ok(out)
}

/// Numeric value of a hash for target comparisons
pub fn hash_to_uint(hash: &Hash32) -> BigUint {
    BigUint::from_bytes_le(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256d_empty() {
        let digest = sha256d(b"");
        assert_eq!(
            hex::encode(digest),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_hash160_genesis_pubkey() {
        let pubkey = hex::decode(
            "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb6\
             49f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f",
        )
        .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "62e907b15cbf27d5425399ebf6f0fb50ebb88f18"
        );
    }

    #[test]
    fn test_hash_hex_round_trip() {
        let display = "000000000003ba27aa200b1cecaad478d2b00432346c3f1f3986da1afd33e506";
        let wire = hash_from_hex(display).unwrap();
        assert_eq!(wire[31], 0x00);
        assert_eq!(wire[0], 0x06);
        assert_eq!(hash_to_hex(&wire), display);
    }

    #[test]
    fn test_hash_from_hex_rejects_short() {
        assert!(hash_from_hex("abcd").is_err());
    }

    #[test]
    fn test_hash_to_uint_ordering() {
        let mut low = [0u8; 32];
        low[0] = 1;
        let mut high = [0u8; 32];
        high[31] = 1;
        assert!(hash_to_uint(&low) < hash_to_uint(&high));
    }

    #[test]
    fn test_scrypt_pow_hash_length() {
        let data = [0u8; 80];
        let hash = scrypt_pow_hash(&data).unwrap();
        assert_eq!(hash.len(), 32);
    }
}
