//! Dogecoin chain capabilities

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 3,
    coin_name: "Dogecoin",
    code: "DOGE",
    p2pkh_version: 30,
    p2sh_version: 22,
    wif_version: 158,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Dogecoin Signed Message:\n",
    dust_threshold: 1000000,
    min_relay_fee: 1000000,
    recommended_fee: 1000000,
    coinbase_maturity: 240,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Dogecoin;

impl ChainSpec for Dogecoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
