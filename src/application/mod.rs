//! Application layer containing the workflow orchestration.
//!
//! This module defines the `MarketplaceEngine`, the single entry point for
//! every workflow transition. Each operation runs inside one [`scope::Scope`]
//! under the engine's write gate; notifications leave through a spawned
//! `tokio` task once the scope has committed.

pub mod engine;
pub mod job_requests;
pub mod jobs;
pub mod ledger;
pub mod notifications;
pub mod projects;
pub mod proposals;
pub mod scope;
pub mod withdrawals;

#[cfg(test)]
pub(crate) mod test_support;
