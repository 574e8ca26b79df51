use super::OwnershipProvider;
use crate::{Principal, ResourceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Every provider must grant.
    All,
    /// One granting provider is enough.
    Any,
}

/// Ordered list of providers combined under [`CompositeMode`].
///
/// Providers run in order and evaluation stops as soon as the outcome is
/// known. An empty list denies in both modes.
#[derive(Clone)]
pub struct CompositeOwnershipProvider {
    providers: Vec<Arc<dyn OwnershipProvider>>,
    mode: CompositeMode,
}

impl CompositeOwnershipProvider {
    pub fn new(providers: Vec<Arc<dyn OwnershipProvider>>, mode: CompositeMode) -> Self {
        Self { providers, mode }
    }

    pub fn all(providers: Vec<Arc<dyn OwnershipProvider>>) -> Self {
        Self::new(providers, CompositeMode::All)
    }

    pub fn any(providers: Vec<Arc<dyn OwnershipProvider>>) -> Self {
        Self::new(providers, CompositeMode::Any)
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl OwnershipProvider for CompositeOwnershipProvider {
    async fn check(
        &self,
        principal: &dyn Principal,
        resource_type: &str,
        resource_id: &ResourceId,
    ) -> bool {
        if self.providers.is_empty() {
            return false;
        }
        for provider in &self.providers {
            let granted = provider.check(principal, resource_type, resource_id).await;
            match (self.mode, granted) {
                (CompositeMode::Any, true) => return true,
                (CompositeMode::All, false) => return false,
                _ => {}
            }
        }
        // All providers ran: ALL saw only grants, ANY saw only denials.
        self.mode == CompositeMode::All
    }
}
