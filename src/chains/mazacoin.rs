//! Mazacoin chain capabilities

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 13,
    coin_name: "Mazacoin",
    code: "MAZA",
    p2pkh_version: 50,
    p2sh_version: 9,
    wif_version: 224,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Mazacoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 10000,
    recommended_fee: 50000,
    coinbase_maturity: 100,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Mazacoin;

impl ChainSpec for Mazacoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
