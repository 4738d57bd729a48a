//! Clam chain capabilities
//!
//! Transactions carry a timestamp, and from version 2 a trailing
//! "speech" message after the lock time.

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule, TxExtra};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 23,
    coin_name: "Clam",
    code: "CLAM",
    p2pkh_version: 137,
    p2sh_version: 13,
    wif_version: 133,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Clam Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 10000,
    recommended_fee: 50000,
    coinbase_maturity: 500,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[
        TxExtra::Timestamp,
        TxExtra::TrailingMessage { min_version: 2 },
    ],
};

pub struct Clam;

impl ChainSpec for Clam {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
