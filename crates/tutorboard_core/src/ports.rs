//! crates/tutorboard_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the booking client's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the HTTP transport behind the marketplace API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{BookingConfirmation, CreditBalance, Session, Teacher};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the transport underneath.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),

    /// The server refused the operation and said why. The message is shown
    /// to the user as-is (e.g. "insufficient credits", "slot no longer
    /// available").
    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait MarketplaceService: Send + Sync {
    /// Lists every teacher with a public profile.
    async fn list_teachers(&self) -> PortResult<Vec<Teacher>>;

    /// Lists open sessions whose start falls inside `[from, to)`, optionally
    /// narrowed to a single teacher.
    ///
    /// The request asks the server for open sessions only. Callers still
    /// re-filter the result, because the contract does not guarantee it.
    async fn list_open_sessions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        teacher_id: Option<Uuid>,
    ) -> PortResult<Vec<Session>>;

    /// Fetches the student's current credit balance.
    async fn credit_balance(&self) -> PortResult<CreditBalance>;

    /// Creates a booking for one open session. Races with other students are
    /// resolved server-side; a loss comes back as `PortError::Rejected`.
    async fn create_booking(&self, session_id: Uuid) -> PortResult<BookingConfirmation>;
}

/// The caller-supplied authentication capability.
///
/// Handed to adapters explicitly instead of being read from ambient global
/// state, so everything downstream stays testable in isolation.
pub trait AuthContext: Send + Sync {
    /// The bearer token to attach to API requests, if the user is logged in.
    fn bearer_token(&self) -> Option<String>;

    /// Whether a login is present at all.
    fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }
}
