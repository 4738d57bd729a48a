//! Viacoin chain capabilities

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 14,
    coin_name: "Viacoin",
    code: "VIA",
    p2pkh_version: 71,
    p2sh_version: 33,
    wif_version: 199,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Viacoin Signed Message:\n",
    dust_threshold: 0,
    min_relay_fee: 100000,
    recommended_fee: 100000,
    coinbase_maturity: 3600,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Viacoin;

impl ChainSpec for Viacoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
