//! BrokerHub: multi-broker trading account aggregation service.
//!
//! Users link their accounts at third-party trading brokers, and the
//! service manages the credential, session, and connection lifecycle
//! for each (user, broker) pair. Broker integrations are polymorphic
//! behind [`brokers::BrokerAdapter`]; Angel One ships in-tree.

pub mod api;
pub mod brokers;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
