//! Broker adapters module

pub mod angel;
pub mod types;

use crate::config::Config;
use crate::db::models::{BrokerDefinition, ConnectionRecord, CredentialMap};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use types::{BrokerSession, OrderRequest, TradingResource};

/// Contract every broker implementation must fulfil.
///
/// Variants are keyed by the catalog slug; adding a broker means registering
/// a new implementation, never touching the dispatch logic.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Catalog slug this adapter serves (e.g. "ANGEL_ONE")
    fn slug(&self) -> &'static str;

    /// Exchange submitted credentials for a broker session
    async fn connect(
        &self,
        broker: &BrokerDefinition,
        credentials: &CredentialMap,
    ) -> Result<BrokerSession>;

    /// Remote logout step, for brokers that have one
    async fn logout(&self, broker: &BrokerDefinition, record: &ConnectionRecord) -> Result<Value>;

    /// Fetch a read-only trading resource
    async fn fetch(
        &self,
        resource: TradingResource,
        broker: &BrokerDefinition,
        record: &ConnectionRecord,
    ) -> Result<Value>;

    /// Place a new order
    async fn place_order(
        &self,
        broker: &BrokerDefinition,
        record: &ConnectionRecord,
        order: &OrderRequest,
    ) -> Result<Value>;
}

/// Broker registry mapping catalog slugs to adapter implementations,
/// resolved once at startup.
pub struct BrokerRegistry {
    adapters: HashMap<String, Arc<dyn BrokerAdapter>>,
}

impl BrokerRegistry {
    /// Create a registry with all supported brokers
    pub fn new(config: &Config) -> Self {
        let mut registry = Self {
            adapters: HashMap::new(),
        };
        registry.register(Arc::new(angel::AngelOneAdapter::new(
            config.angel_api_url.clone(),
        )));
        registry
    }

    /// Empty registry (tests)
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn BrokerAdapter>) {
        self.adapters.insert(adapter.slug().to_string(), adapter);
    }

    /// Get the adapter for a slug, if one is registered
    pub fn get(&self, slug: &str) -> Option<Arc<dyn BrokerAdapter>> {
        self.adapters.get(slug).cloned()
    }

    /// Get the adapter for a slug or fail with UnsupportedBroker
    pub fn resolve(&self, slug: &str) -> Result<Arc<dyn BrokerAdapter>> {
        self.get(slug)
            .ok_or_else(|| AppError::UnsupportedBroker(slug.to_string()))
    }
}
