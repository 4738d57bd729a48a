//! Blackcoin chain capabilities
//!
//! Early blocks hash with scrypt; from block version 7 the chain
//! switched to double SHA256. Transactions carry a timestamp.

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule, TxExtra};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 10,
    coin_name: "Blackcoin",
    code: "BLK",
    p2pkh_version: 25,
    p2sh_version: 85,
    wif_version: 153,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "BlackCoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 10000,
    recommended_fee: 50000,
    coinbase_maturity: 500,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::VersionThreshold {
        threshold: 6,
        above: HeaderHash::Sha256d,
        below: HeaderHash::Scrypt,
    },
    tx_extras: &[TxExtra::Timestamp],
};

pub struct Blackcoin;

impl ChainSpec for Blackcoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
