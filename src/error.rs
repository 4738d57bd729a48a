//! Error types for chain verification, transaction parsing and signing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Consensus rule violation: {0}")]
    ConsensusViolation(String),

    #[error("Malformed script: {0}")]
    MalformedScript(String),

    #[error("No header hash algorithm for block version {0}")]
    UnknownAlgorithm(i32),

    #[error("Required stored data absent: {0}")]
    StorageAbsent(String),

    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Duplicate chain code: {0}")]
    DuplicateChain(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Elliptic curve error: {0}")]
    Secp(#[from] secp256k1::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
