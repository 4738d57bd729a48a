//! Namecoin chain capabilities

use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 7,
    coin_name: "Namecoin",
    code: "NMC",
    p2pkh_version: 52,
    p2sh_version: 13,
    wif_version: 180,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Bitcoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 100000,
    recommended_fee: 500000,
    coinbase_maturity: 100,
    chunk_size: 2016,
    header_size: 80,
    pow: None,
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Namecoin;

impl ChainSpec for Namecoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }
}
