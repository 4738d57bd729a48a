//! Core wallet-facing types shared by every supported chain

use serde::{Deserialize, Serialize};

/// Hash type: 256-bit hash in wire byte order
pub type Hash32 = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Block header in the common 80-byte layout
///
/// `height` is bookkeeping filled in by the store and verifier;
/// it is never part of the wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash32,
    pub merkle_root: Hash32,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    #[serde(skip)]
    pub height: Option<u64>,
}

/// Deserialized BIP32 extended public key (78-byte payload)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Xpub {
    pub version: [u8; 4],
    pub depth: u8,
    pub fingerprint: [u8; 4],
    pub child_number: u32,
    pub chain_code: [u8; 32],
    /// Compressed public key, 33 bytes.
    pub pubkey: ByteString,
}

/// Identity of a signer slot, decoded once at parse time
///
/// The wire forms are: a plain public key (leading byte 0x02/0x03/0x04),
/// a BIP32 xpub plus a two-level derivation path (tag 0xff), a legacy
/// 64-byte master public key plus path (tag 0xfe), or an address stub
/// carrying only a version byte and hash160 (tag 0xfd). Re-encoding a
/// parsed key reproduces the original bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignerKey {
    Plain(ByteString),
    Bip32 { xpub: Xpub, path: [u16; 2] },
    Legacy { mpk: ByteString, path: [u16; 2] },
    AddressOnly { version: u8, hash160: [u8; 20] },
}

/// Classified output locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputScript {
    /// Pay-to-pubkey-hash or pay-to-script-hash, held as a base58check address.
    Address(String),
    /// Bare pay-to-pubkey.
    Pubkey(ByteString),
    /// Anything that matches no known template; raw bytes preserved verbatim.
    Raw(ByteString),
}

/// Transaction input with its resolved signing metadata
///
/// `signer_keys`, `pubkeys` and `signatures` are parallel vectors, one
/// entry per key slot. Signatures are DER bytes without the trailing
/// hashtype byte. Inputs whose script could not be matched to a known
/// template carry no metadata and round-trip `script_sig` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prevout_hash: Hash32,
    pub prevout_n: u32,
    pub script_sig: ByteString,
    pub sequence: u32,
    pub address: Option<String>,
    pub num_sig: usize,
    pub signer_keys: Vec<SignerKey>,
    pub pubkeys: Vec<Option<ByteString>>,
    pub signatures: Vec<Option<ByteString>>,
    pub redeem_script: Option<ByteString>,
}

impl TxInput {
    pub fn new(prevout_hash: Hash32, prevout_n: u32) -> Self {
        TxInput {
            prevout_hash,
            prevout_n,
            script_sig: Vec::new(),
            sequence: 0xffffffff,
            address: None,
            num_sig: 0,
            signer_keys: Vec::new(),
            pubkeys: Vec::new(),
            signatures: Vec::new(),
            redeem_script: None,
        }
    }

    /// Coinbase inputs spend the all-zero outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.prevout_hash == [0u8; 32]
    }

    pub fn has_metadata(&self) -> bool {
        self.num_sig > 0 || !self.signer_keys.is_empty()
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script: OutputScript,
}

/// Transaction with chain-dependent extras
///
/// `timestamp` is the 4-byte field some chains splice in after the
/// version; `message` is the trailing variable-length field some chains
/// append after the lock time. `raw` caches the last full serialization
/// and is cleared by any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
    pub timestamp: Option<u32>,
    pub message: Option<ByteString>,
    pub raw: Option<ByteString>,
}
