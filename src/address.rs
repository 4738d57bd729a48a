//! Base58check address encoding

use crate::error::{ChainError, Result};
use crate::hashes::{hash160, sha256d};
use crate::types::ByteString;

/// Payload followed by the first four bytes of its double SHA256
pub fn encode_base58check_raw(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    let checksum = sha256d(&data);
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

pub fn decode_base58check_raw(s: &str) -> Result<ByteString> {
    let data = bs58::decode(s)
        .into_vec()
        .map_err(|e| ChainError::Serialization(format!("Invalid base58: {}", e)))?;
    if data.len() < 5 {
        return Err(ChainError::Serialization(format!(
            "Base58check payload too short: {} bytes",
            data.len()
        )));
    }
    let (body, checksum) = data.split_at(data.len() - 4);
    let expected = sha256d(body);
    if checksum != &expected[..4] {
        return Err(ChainError::Serialization(
            "Base58check checksum mismatch".to_string(),
        ));
    }
    Ok(body.to_vec())
}

/// Version byte, payload, then the checksum
pub fn encode_base58check(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(version);
    data.extend_from_slice(payload);
    encode_base58check_raw(&data)
}

pub fn decode_base58check(s: &str) -> Result<(u8, ByteString)> {
    let body = decode_base58check_raw(s)?;
    Ok((body[0], body[1..].to_vec()))
}

pub fn hash160_to_address(h160: &[u8; 20], version: u8) -> String {
    encode_base58check(version, h160)
}

pub fn address_to_hash160(addr: &str) -> Result<(u8, [u8; 20])> {
    let (version, body) = decode_base58check(addr)?;
    if body.len() != 20 {
        return Err(ChainError::Serialization(format!(
            "Address payload must be 20 bytes, got {}",
            body.len()
        )));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&body);
    Ok((version, out))
}

/// Address of a public key under the given p2pkh version byte
pub fn pubkey_to_address(pubkey: &[u8], version: u8) -> String {
    hash160_to_address(&hash160(pubkey), version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_pubkey_address() {
        let pubkey = hex::decode(
            "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb6\
             49f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f",
        )
        .unwrap();
        assert_eq!(
            pubkey_to_address(&pubkey, 0),
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
        );
    }

    #[test]
    fn test_base58check_round_trip() {
        let h160 = [0x42u8; 20];
        let addr = hash160_to_address(&h160, 30);
        let (version, decoded) = address_to_hash160(&addr).unwrap();
        assert_eq!(version, 30);
        assert_eq!(decoded, h160);
    }

    #[test]
    fn test_checksum_rejected() {
        let addr = hash160_to_address(&[7u8; 20], 0);
        let mut corrupted = addr.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert!(decode_base58check(&corrupted).is_err());
    }

    #[test]
    fn test_known_address_version() {
        let (version, _) = address_to_hash160("1446oU3z268EeFgfcwJv6X2VBXHfoYxfuD").unwrap();
        assert_eq!(version, 0);
        let (version, _) = address_to_hash160("3MqemPAHZDGLr537QBvU7i4dRFY3Xvad7X").unwrap();
        assert_eq!(version, 5);
    }
}
