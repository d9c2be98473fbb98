//! Client directory - the external service that owns the practice roster.
//!
//! The pipeline only needs two things from it:
//!
//! - [`ClientLinker`] links one client email to the practice
//! - [`RosterSource`] lists the emails already linked
//!
//! [`HttpClientDirectory`] implements both against the practice backend.

pub mod http;

use async_trait::async_trait;

use crate::error::LinkResult;
use crate::models::LinkOutcome;
use crate::validation::Roster;

pub use http::HttpClientDirectory;

/// Links a single client email to the current practice.
///
/// An `Err` is recorded on the row and never aborts the batch.
#[async_trait]
pub trait ClientLinker: Send + Sync {
    async fn link(&self, email: &str) -> LinkResult<LinkOutcome>;
}

/// Supplies the emails already connected to the practice.
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_roster(&self) -> LinkResult<Roster>;
}
