//! Chain capability contract: per-chain parameters and behavior
//!
//! Every verification and codec entry point takes the capability (or
//! its params) as an explicit argument; there is no global active
//! chain. Shared behavior lives in free functions the per-chain impls
//! call, so a chain overrides only what actually differs.

use crate::difficulty::RetargetContext;
use crate::error::{ChainError, Result};
use crate::headers;
use crate::types::{BlockHeader, ByteString, Hash32};
use num_bigint::BigUint;

/// Header hash algorithms the engine can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderHash {
    Sha256d,
    Scrypt,
}

/// How a chain selects its header hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderHashRule {
    Fixed(HeaderHash),
    /// Block versions above `threshold` hash with `above`, the rest
    /// with `below`.
    VersionThreshold {
        threshold: i32,
        above: HeaderHash,
        below: HeaderHash,
    },
    /// Explicit version map; an unlisted version has no algorithm and
    /// is fatal for that header.
    VersionTable(&'static [(i32, HeaderHash)]),
}

/// Proof-of-work verification parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowParams {
    /// Compact bits of the easiest allowed target.
    pub max_bits: u32,
    /// Blocks per difficulty period.
    pub retarget_interval: u64,
    /// Intended seconds per difficulty period.
    pub target_timespan: u64,
    /// Algorithm hashed against the target; linkage hashing may differ.
    pub hash: HeaderHash,
}

/// Chain-dependent transaction fields outside the common layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxExtra {
    /// 4-byte little-endian timestamp between version and input count.
    Timestamp,
    /// Variable-length message after lock time, present from
    /// `min_version` on.
    TrailingMessage { min_version: i32 },
}

/// Numeric parameters of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// BIP44-style account index.
    pub chain_index: u32,
    pub coin_name: &'static str,
    /// Ticker code, unique across the registry.
    pub code: &'static str,
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
    pub wif_version: u8,
    pub ext_pub_version: [u8; 4],
    pub ext_prv_version: [u8; 4],
    pub message_magic: &'static str,
    pub dust_threshold: u64,
    pub min_relay_fee: u64,
    pub recommended_fee: u64,
    pub coinbase_maturity: u64,
    /// Headers per verification group.
    pub chunk_size: u64,
    /// Stored header record size in bytes.
    pub header_size: usize,
    pub pow: Option<PowParams>,
    pub hash_rule: HeaderHashRule,
    /// Extras in stream order.
    pub tx_extras: &'static [TxExtra],
}

impl ChainParams {
    pub fn has_timestamp_extra(&self) -> bool {
        self.tx_extras
            .iter()
            .any(|e| matches!(e, TxExtra::Timestamp))
    }

    pub fn trailing_message_min_version(&self) -> Option<i32> {
        self.tx_extras.iter().find_map(|e| match e {
            TxExtra::TrailingMessage { min_version } => Some(*min_version),
            _ => None,
        })
    }
}

/// Capabilities of one chain
pub trait ChainSpec: Send + Sync {
    fn params(&self) -> &'static ChainParams;

    /// Chain hash of a header, used for linkage and display.
    fn hash_header(&self, header: &BlockHeader) -> Result<Hash32> {
        let bytes = self.header_to_bytes(header)?;
        headers::hash_with_rule(&self.params().hash_rule, header.version, &bytes)
    }

    fn header_to_bytes(&self, header: &BlockHeader) -> Result<ByteString> {
        Ok(headers::header_to_bytes(header))
    }

    fn header_from_bytes(&self, bytes: &[u8]) -> Result<BlockHeader> {
        headers::header_from_bytes(bytes)
    }

    /// Expected compact bits and expanded target at a height.
    ///
    /// Chains that do not verify proof of work keep this default.
    fn difficulty_target(&self, _height: u64, _ctx: &RetargetContext) -> Result<(u32, BigUint)> {
        Err(ChainError::ConsensusViolation(format!(
            "{} does not verify difficulty",
            self.params().code
        )))
    }
}
