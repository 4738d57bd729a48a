//! Litecoin chain capabilities
//!
//! Headers link and display by double SHA256; only the proof-of-work
//! comparison runs scrypt.

use num_bigint::BigUint;

use crate::difficulty::{bitcoin_retarget, RetargetContext};
use crate::error::Result;
use crate::params::{ChainParams, ChainSpec, HeaderHash, HeaderHashRule, PowParams};

const POW: PowParams = PowParams {
    max_bits: 0x1e0ffff0,
    retarget_interval: 2016,
    // Three and a half days.
    target_timespan: 84 * 60 * 60,
    hash: HeaderHash::Scrypt,
};

pub static PARAMS: ChainParams = ChainParams {
    chain_index: 2,
    coin_name: "Litecoin",
    code: "LTC",
    p2pkh_version: 48,
    p2sh_version: 5,
    wif_version: 176,
    ext_pub_version: [0x04, 0x88, 0xb2, 0x1e],
    ext_prv_version: [0x04, 0x88, 0xad, 0xe4],
    message_magic: "Litecoin Signed Message:\n",
    dust_threshold: 5430,
    min_relay_fee: 100000,
    recommended_fee: 100000,
    coinbase_maturity: 100,
    chunk_size: 2016,
    header_size: 80,
    pow: Some(POW),
    hash_rule: HeaderHashRule::Fixed(HeaderHash::Sha256d),
    tx_extras: &[],
};

pub struct Litecoin;

impl ChainSpec for Litecoin {
    fn params(&self) -> &'static ChainParams {
        &PARAMS
    }

    fn difficulty_target(&self, height: u64, ctx: &RetargetContext) -> Result<(u32, BigUint)> {
        bitcoin_retarget(&POW, height, ctx)
    }
}
