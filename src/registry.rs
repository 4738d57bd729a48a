//! Chain registry: the table of supported chains and the active switch
//!
//! The registry is an explicit value owned by the caller; nothing here
//! is process-global. Components that need chain behavior receive the
//! capability as an argument, and the registry is only the place where
//! codes resolve to instances and where interested parties hear about
//! activation changes. The engine is synchronous by contract, so the
//! caller serializes access.

use std::sync::Arc;

use crate::chains;
use crate::error::{ChainError, Result};
use crate::params::{ChainParams, ChainSpec};

pub type SubscriptionId = u64;

type ActivationCallback = Box<dyn FnMut(&Arc<dyn ChainSpec>) -> Result<()> + Send>;

/// One entry in the registry's startup table
pub struct ChainDescriptor {
    pub chain_index: u32,
    pub coin_name: &'static str,
    /// Ticker code, unique across the table.
    pub code: &'static str,
    constructor: fn() -> Arc<dyn ChainSpec>,
}

impl ChainDescriptor {
    pub fn new(params: &'static ChainParams, constructor: fn() -> Arc<dyn ChainSpec>) -> Self {
        ChainDescriptor {
            chain_index: params.chain_index,
            coin_name: params.coin_name,
            code: params.code,
            constructor,
        }
    }

    pub fn construct(&self) -> Arc<dyn ChainSpec> {
        (self.constructor)()
    }
}

impl std::fmt::Debug for ChainDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainDescriptor")
            .field("chain_index", &self.chain_index)
            .field("coin_name", &self.coin_name)
            .field("code", &self.code)
            .finish()
    }
}

/// Registry of known chains with an active slot and subscriber bus
pub struct ChainRegistry {
    descriptors: Vec<ChainDescriptor>,
    active: Option<Arc<dyn ChainSpec>>,
    subscribers: Vec<(SubscriptionId, ActivationCallback)>,
    next_subscription: SubscriptionId,
}

impl ChainRegistry {
    /// Build the registry from the built-in chain table.
    pub fn discover() -> Result<Self> {
        Self::with_descriptors(chains::builtin_descriptors())
    }

    /// Build a registry from an explicit table.
    ///
    /// A duplicate ticker code is a startup error: every later lookup
    /// would silently shadow one of the entries.
    pub fn with_descriptors(descriptors: Vec<ChainDescriptor>) -> Result<Self> {
        for (i, descriptor) in descriptors.iter().enumerate() {
            if descriptors[..i].iter().any(|d| d.code == descriptor.code) {
                return Err(ChainError::DuplicateChain(descriptor.code.to_string()));
            }
        }
        Ok(ChainRegistry {
            descriptors,
            active: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.descriptors.iter().any(|d| d.code == code)
    }

    pub fn descriptors(&self) -> &[ChainDescriptor] {
        &self.descriptors
    }

    /// Fresh instance for a code, without touching the active slot.
    pub fn instance(&self, code: &str) -> Option<Arc<dyn ChainSpec>> {
        self.descriptors
            .iter()
            .find(|d| d.code == code)
            .map(|d| d.construct())
    }

    /// The active chain, `None` before the first activation.
    pub fn active(&self) -> Option<Arc<dyn ChainSpec>> {
        self.active.clone()
    }

    /// Activate a chain by code and notify subscribers
    ///
    /// Unknown codes are rejected before any chain state changes. When
    /// the code is already active the live instance is reused.
    /// Subscribers run in subscription order; a subscriber error is
    /// logged and does not fail the activation.
    pub fn set_active(&mut self, code: &str) -> Result<Arc<dyn ChainSpec>> {
        if !self.is_known(code) {
            return Err(ChainError::UnknownChain(code.to_string()));
        }
        let chain = match &self.active {
            Some(active) if active.params().code == code => active.clone(),
            _ => match self.instance(code) {
                Some(chain) => chain,
                None => return Err(ChainError::UnknownChain(code.to_string())),
            },
        };
        self.active = Some(chain.clone());
        log::info!("Active chain set to {}", code);

        for (id, callback) in self.subscribers.iter_mut() {
            if let Err(e) = callback(&chain) {
                log::warn!("Chain activation subscriber {} failed: {}", id, e);
            }
        }
        Ok(chain)
    }

    /// Register a callback for activation events.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Arc<dyn ChainSpec>) -> Result<()> + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Drop a subscription; returns whether the id was present.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }
}
