//! Tagged signer keys: parsing, re-encoding and public key resolution
//!
//! Signature scripts carry each signer either as a plain public key or
//! as an extended form that still needs derivation: a BIP32 xpub plus a
//! two-level path (tag 0xff), a legacy 64-byte master public key plus
//! path (tag 0xfe), or an address-only stub (tag 0xfd) for keys the
//! wallet knows nothing about. Re-encoding a parsed key reproduces the
//! original bytes exactly.

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1};
use sha2::Sha512;

use crate::address;
use crate::error::{ChainError, Result};
use crate::hashes::{hash160, sha256d};
use crate::params::ChainParams;
use crate::types::{ByteString, SignerKey, Xpub};

pub const TAG_BIP32: u8 = 0xff;
pub const TAG_LEGACY: u8 = 0xfe;
pub const TAG_ADDRESS: u8 = 0xfd;

/// Serialized xpub length: version, depth, fingerprint, child number,
/// chain code, compressed public key.
pub const XPUB_SIZE: usize = 4 + 1 + 4 + 4 + 32 + 33;

type HmacSha512 = Hmac<Sha512>;

impl Xpub {
    /// Decode the 78-byte extended key payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Xpub> {
        if bytes.len() != XPUB_SIZE {
            return Err(ChainError::Serialization(format!(
                "Extended key must be {} bytes, got {}",
                XPUB_SIZE,
                bytes.len()
            )));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[0..4]);
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&bytes[5..9]);
        let mut child_number = [0u8; 4];
        child_number.copy_from_slice(&bytes[9..13]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&bytes[13..45]);
        Ok(Xpub {
            version,
            depth: bytes[4],
            fingerprint,
            child_number: u32::from_be_bytes(child_number),
            chain_code,
            pubkey: bytes[45..78].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> ByteString {
        let mut out = Vec::with_capacity(XPUB_SIZE);
        out.extend_from_slice(&self.version);
        out.push(self.depth);
        out.extend_from_slice(&self.fingerprint);
        out.extend_from_slice(&self.child_number.to_be_bytes());
        out.extend_from_slice(&self.chain_code);
        out.extend_from_slice(&self.pubkey);
        out
    }

    /// Base58check display form ("xpub..." under Bitcoin's version).
    pub fn to_base58(&self) -> String {
        address::encode_base58check_raw(&self.to_bytes())
    }

    pub fn from_base58(s: &str) -> Result<Xpub> {
        Xpub::from_bytes(&address::decode_base58check_raw(s)?)
    }

    /// Non-hardened public derivation of the child xpub at `path`.
    ///
    /// The child records its own depth, the fingerprint of its direct
    /// parent and the final child number, so the result matches what a
    /// cosigning wallet would serialize for the same node.
    pub fn derive(&self, path: &[u16; 2]) -> Result<Xpub> {
        let secp = Secp256k1::verification_only();
        let mut parent = PublicKey::from_slice(&self.pubkey)?;
        let mut chain_code = self.chain_code;
        let mut fingerprint = [0u8; 4];
        for &step in path {
            fingerprint.copy_from_slice(&hash160(&parent.serialize())[..4]);
            let (child, code) = ckd_pub(&secp, &parent, &chain_code, step as u32)?;
            parent = child;
            chain_code = code;
        }
        Ok(Xpub {
            version: self.version,
            depth: self.depth + path.len() as u8,
            fingerprint,
            child_number: path[1] as u32,
            chain_code,
            pubkey: parent.serialize().to_vec(),
        })
    }
}

/// Parse one signer key from its script-push bytes
pub fn parse_signer_key(bytes: &[u8]) -> Result<SignerKey> {
    if bytes.is_empty() {
        return Err(ChainError::Serialization("Empty signer key".to_string()));
    }
    match bytes[0] {
        0x02 | 0x03 => {
            if bytes.len() != 33 {
                return Err(ChainError::Serialization(format!(
                    "Compressed public key must be 33 bytes, got {}",
                    bytes.len()
                )));
            }
            Ok(SignerKey::Plain(bytes.to_vec()))
        }
        0x04 => {
            if bytes.len() != 65 {
                return Err(ChainError::Serialization(format!(
                    "Uncompressed public key must be 65 bytes, got {}",
                    bytes.len()
                )));
            }
            Ok(SignerKey::Plain(bytes.to_vec()))
        }
        TAG_BIP32 => {
            if bytes.len() != 1 + XPUB_SIZE + 4 {
                return Err(ChainError::Serialization(format!(
                    "BIP32 signer key must be {} bytes, got {}",
                    1 + XPUB_SIZE + 4,
                    bytes.len()
                )));
            }
            let xpub = Xpub::from_bytes(&bytes[1..1 + XPUB_SIZE])?;
            Ok(SignerKey::Bip32 {
                xpub,
                path: parse_path(&bytes[1 + XPUB_SIZE..]),
            })
        }
        TAG_LEGACY => {
            if bytes.len() != 1 + 64 + 4 {
                return Err(ChainError::Serialization(format!(
                    "Legacy signer key must be 69 bytes, got {}",
                    bytes.len()
                )));
            }
            Ok(SignerKey::Legacy {
                mpk: bytes[1..65].to_vec(),
                path: parse_path(&bytes[65..]),
            })
        }
        TAG_ADDRESS => {
            if bytes.len() != 22 {
                return Err(ChainError::Serialization(format!(
                    "Address-only signer key must be 22 bytes, got {}",
                    bytes.len()
                )));
            }
            let mut h160 = [0u8; 20];
            h160.copy_from_slice(&bytes[2..22]);
            Ok(SignerKey::AddressOnly {
                version: bytes[1],
                hash160: h160,
            })
        }
        tag => Err(ChainError::Serialization(format!(
            "Unrecognized signer key tag {:#04x}",
            tag
        ))),
    }
}

fn parse_path(bytes: &[u8]) -> [u16; 2] {
    [
        u16::from_le_bytes([bytes[0], bytes[1]]),
        u16::from_le_bytes([bytes[2], bytes[3]]),
    ]
}

/// Exact inverse of [`parse_signer_key`]
pub fn encode_signer_key(key: &SignerKey) -> ByteString {
    match key {
        SignerKey::Plain(pubkey) => pubkey.clone(),
        SignerKey::Bip32 { xpub, path } => {
            let mut out = Vec::with_capacity(1 + XPUB_SIZE + 4);
            out.push(TAG_BIP32);
            out.extend_from_slice(&xpub.to_bytes());
            out.extend_from_slice(&path[0].to_le_bytes());
            out.extend_from_slice(&path[1].to_le_bytes());
            out
        }
        SignerKey::Legacy { mpk, path } => {
            let mut out = Vec::with_capacity(1 + 64 + 4);
            out.push(TAG_LEGACY);
            out.extend_from_slice(mpk);
            out.extend_from_slice(&path[0].to_le_bytes());
            out.extend_from_slice(&path[1].to_le_bytes());
            out
        }
        SignerKey::AddressOnly { version, hash160 } => {
            let mut out = Vec::with_capacity(22);
            out.push(TAG_ADDRESS);
            out.push(*version);
            out.extend_from_slice(hash160);
            out
        }
    }
}

/// One round of public BIP32 child key derivation
fn ckd_pub(
    secp: &Secp256k1<secp256k1::VerifyOnly>,
    parent: &PublicKey,
    chain_code: &[u8; 32],
    child_number: u32,
) -> Result<(PublicKey, [u8; 32])> {
    let mut mac = HmacSha512::new_from_slice(chain_code)
        .map_err(|_| ChainError::KeyDerivation("Invalid HMAC key length".to_string()))?;
    mac.update(&parent.serialize());
    mac.update(&child_number.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let mut tweak = [0u8; 32];
    tweak.copy_from_slice(&digest[..32]);
    let tweak = Scalar::from_be_bytes(tweak)
        .map_err(|_| ChainError::KeyDerivation("Child tweak out of range".to_string()))?;
    let child = parent.add_exp_tweak(secp, &tweak)?;

    let mut next_code = [0u8; 32];
    next_code.copy_from_slice(&digest[32..]);
    Ok((child, next_code))
}

/// Derive the compressed public key at `path` below an xpub
///
/// Path elements are applied in order; both levels are non-hardened by
/// construction (they fit in a u16).
pub fn derive_bip32_pubkey(xpub: &Xpub, path: &[u16; 2]) -> Result<ByteString> {
    Ok(xpub.derive(path)?.pubkey)
}

/// Derive the uncompressed public key from a legacy master public key
///
/// The tweak is the double SHA256 of `"{n}:{for_change}:"` followed by
/// the raw 64-byte master key, added to the master point.
pub fn derive_legacy_pubkey(mpk: &[u8], path: &[u16; 2]) -> Result<ByteString> {
    if mpk.len() != 64 {
        return Err(ChainError::KeyDerivation(format!(
            "Master public key must be 64 bytes, got {}",
            mpk.len()
        )));
    }
    let for_change = path[0];
    let n = path[1];
    let mut data = format!("{}:{}:", n, for_change).into_bytes();
    data.extend_from_slice(mpk);
    let z = sha256d(&data);

    let mut master_bytes = Vec::with_capacity(65);
    master_bytes.push(0x04);
    master_bytes.extend_from_slice(mpk);
    let master = PublicKey::from_slice(&master_bytes)?;

    let secp = Secp256k1::verification_only();
    let tweak = Scalar::from_be_bytes(z)
        .map_err(|_| ChainError::KeyDerivation("Derivation tweak out of range".to_string()))?;
    let child = master.add_exp_tweak(&secp, &tweak)?;
    Ok(child.serialize_uncompressed().to_vec())
}

/// Resolve a signer key to its public key and address
///
/// Address-only keys resolve to `None` and the address built from their
/// embedded version byte; every other form yields the (derived) public
/// key and its p2pkh address under the chain's version byte.
pub fn resolve(key: &SignerKey, params: &ChainParams) -> Result<(Option<ByteString>, String)> {
    match key {
        SignerKey::Plain(pubkey) => {
            let addr = address::pubkey_to_address(pubkey, params.p2pkh_version);
            Ok((Some(pubkey.clone()), addr))
        }
        SignerKey::Bip32 { xpub, path } => {
            let pubkey = derive_bip32_pubkey(xpub, path)?;
            let addr = address::pubkey_to_address(&pubkey, params.p2pkh_version);
            Ok((Some(pubkey), addr))
        }
        SignerKey::Legacy { mpk, path } => {
            let pubkey = derive_legacy_pubkey(mpk, path)?;
            let addr = address::pubkey_to_address(&pubkey, params.p2pkh_version);
            Ok((Some(pubkey), addr))
        }
        SignerKey::AddressOnly { version, hash160 } => {
            Ok((None, address::hash160_to_address(hash160, *version)))
        }
    }
}

/// Address-only key for an input that knows its address but none of
/// its public keys
pub fn address_stub(addr: &str) -> Result<SignerKey> {
    let (version, h160) = address::address_to_hash160(addr)?;
    Ok(SignerKey::AddressOnly {
        version,
        hash160: h160,
    })
}
