//! Bitcoin chain capabilities

use num_bigint::BigUint;

use crate::difficulty::{bitcoin_retarget, RetargetContext};
use crate::error::Result;
use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule, PowParams};

const POW: PowParams = PowParams {
    max_bits: 0x1d00ffff,
    retarget_interval: 2016,
    // Two weeks.
    target_timespan: 14 * 24 * 60 * 60,
    hash: HeaderHash::Sha256d,
};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 0,
    coin_name: "Bitcoin",
    code: "BTC",
    p2pkh_version: 0,
    p2sh_version: 5,
    wif_version: 128,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Bitcoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 1000,
    recommended_fee: 50000,
    coinbase_maturity: 100,
    chunk_size: 2016,
    header_size: 80,
    pow: Some(POW),
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Bitcoin;

impl ChainSpec for Bitcoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }

    fn difficulty_target(&self, height: u64, ctx: &RetargetContext) -> Result<(u32, BigUint)> {
        bitcoin_retarget(&POW, height, ctx)
    }
}
