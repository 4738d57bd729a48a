//! # Chainkey
//!
//! Chain abstraction and verification engine for multi-chain wallets.
//!
//! Everything a wallet backend needs to speak to a family of
//! Bitcoin-derived chains lives here: per-chain capability contracts,
//! a registry that constructs chains and switches the active one at
//! runtime, SPV header storage with chunked proof-of-work
//! verification, a transaction codec that understands per-chain wire
//! extras, and a multisig signing engine built on BIP32 extended keys.
//!
//! ## Architecture
//!
//! - [`params::ChainParams`] and [`params::ChainSpec`] form the capability
//!   contract every supported chain implements
//! - [`registry::ChainRegistry`] discovers the built-in chains and tracks
//!   which one is active
//! - [`store::HeaderStore`] persists headers and verifies downloaded
//!   chunks against each chain's hashing and difficulty rules
//! - [`transaction`] parses, serializes and introspects wallet
//!   transactions, including partially signed multisig spends
//! - [`sign`] fills key slots with ECDSA signatures and merges
//!   co-signer copies of the same transaction
//!
//! ## Usage
//!
//! ```rust
//! use chainkey::registry::ChainRegistry;
//! use chainkey::transaction::SerializePurpose;
//! use chainkey::types::{OutputScript, Transaction, TxOutput};
//!
//! let mut registry = ChainRegistry::discover().unwrap();
//! let chain = registry.set_active("BTC").unwrap();
//! assert_eq!(chain.params().coin_name, "Bitcoin");
//!
//! let tx = Transaction::from_io(
//!     vec![],
//!     vec![TxOutput {
//!         value: 50_000,
//!         script: OutputScript::Address("1446oU3z268EeFgfcwJv6X2VBXHfoYxfuD".to_string()),
//!     }],
//! );
//! let raw = tx.serialize(chain.params(), SerializePurpose::Finalize).unwrap();
//! assert!(!raw.is_empty());
//! ```

pub mod types;
pub mod stream;
pub mod hashes;
pub mod address;
pub mod script;
pub mod keys;
pub mod params;
pub mod difficulty;
pub mod headers;
pub mod store;
pub mod transaction;
pub mod sign;
pub mod chains;
pub mod registry;
pub mod error;

// Re-export commonly used types
pub use error::{ChainError, Result};
pub use params::{ChainParams, ChainSpec};
pub use registry::ChainRegistry;
pub use types::*;
