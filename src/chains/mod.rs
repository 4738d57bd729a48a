//! Built-in chain capability implementations
//!
//! One module per chain, each exporting its `PARAMS` constant and a
//! unit struct implementing [`ChainSpec`](crate::params::ChainSpec).
//! The descriptor table here is what `ChainRegistry::discover` loads.

pub mod bitcoin;
pub mod blackcoin;
pub mod clam;
pub mod dogecoin;
pub mod litecoin;
pub mod mazacoin;
pub mod namecoin;
pub mod peercoin;
pub mod viacoin;

use std::sync::Arc;

use crate::registry::ChainDescriptor;

/// Descriptors for every chain compiled into the crate
pub fn builtin_descriptors() -> Vec<ChainDescriptor> {
    vec![
        ChainDescriptor::new(&bitcoin::PARAMS, || Arc::new(bitcoin::Bitcoin)),
        ChainDescriptor::new(&blackcoin::PARAMS, || Arc::new(blackcoin::Blackcoin)),
        ChainDescriptor::new(&clam::PARAMS, || Arc::new(clam::Clam)),
        ChainDescriptor::new(&dogecoin::PARAMS, || Arc::new(dogecoin::Dogecoin)),
        ChainDescriptor::new(&litecoin::PARAMS, || Arc::new(litecoin::Litecoin)),
        ChainDescriptor::new(&mazacoin::PARAMS, || Arc::new(mazacoin::Mazacoin)),
        ChainDescriptor::new(&namecoin::PARAMS, || Arc::new(namecoin::Namecoin)),
        ChainDescriptor::new(&peercoin::PARAMS, || Arc::new(peercoin::Peercoin)),
        ChainDescriptor::new(&viacoin::PARAMS, || Arc::new(viacoin::Viacoin)),
    ]
}
