//! Peercoin chain capabilities
//!
//! Transactions carry a timestamp between version and input count.

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule, TxExtra};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 6,
    coin_name: "Peercoin",
    code: "PPC",
    p2pkh_version: 55,
    p2sh_version: 117,
    wif_version: 128,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "PPCoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 10000,
    recommended_fee: 50000,
    coinbase_maturity: 500,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[TxExtra::Timestamp],
};

pub struct Peercoin;

impl ChainSpec for Peercoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
