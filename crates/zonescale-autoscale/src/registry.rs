//! Enforcement registry: at most one live decision engine per workload.
//!
//! The registry is owned by whoever drives the scaling loop; there is no
//! process-wide instance. It does not serialize calls into an endpoint:
//! holding `&mut DecisionEngine` is what guarantees a single caller.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use thiserror::Error;
use tracing::info;

use zonescale_core::CooldownWindows;

use crate::engine::DecisionEngine;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("enforcement endpoint already exists for workload: {0}")]
    AlreadyExists(String),

    #[error("no enforcement endpoint for workload: {0}")]
    NotFound(String),
}

/// Live enforcement endpoints keyed by workload id.
#[derive(Debug, Default)]
pub struct EnforcementRegistry {
    endpoints: HashMap<String, DecisionEngine>,
}

impl EnforcementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the endpoint for `workload`.
    ///
    /// Fails if one is already live; destroy it first to start over.
    pub fn create(
        &mut self,
        workload: &str,
        cooldown: CooldownWindows,
    ) -> Result<&mut DecisionEngine, RegistryError> {
        match self.endpoints.entry(workload.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyExists(workload.to_string())),
            Entry::Vacant(slot) => {
                info!(%workload, "enforcement endpoint created");
                Ok(slot.insert(DecisionEngine::new(workload, cooldown)))
            }
        }
    }

    /// Remove and return the endpoint for `workload`.
    pub fn destroy(&mut self, workload: &str) -> Result<DecisionEngine, RegistryError> {
        let engine = self
            .endpoints
            .remove(workload)
            .ok_or_else(|| RegistryError::NotFound(workload.to_string()))?;
        info!(%workload, "enforcement endpoint destroyed");
        Ok(engine)
    }

    pub fn get(&self, workload: &str) -> Option<&DecisionEngine> {
        self.endpoints.get(workload)
    }

    pub fn get_mut(&mut self, workload: &str) -> Option<&mut DecisionEngine> {
        self.endpoints.get_mut(workload)
    }

    pub fn contains(&self, workload: &str) -> bool {
        self.endpoints.contains_key(workload)
    }

    /// Workload ids with a live endpoint, sorted.
    pub fn workloads(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
