//! crates/tutorboard_core/src/domain.rs
//!
//! Defines the pure, core data structures for the booking client.
//! These structs are independent of any wire format or UI concern.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle status of a session slot as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Booked,
    Cancelled,
}

/// A single bookable time slot offered by one teacher.
///
/// Sessions are immutable on this side between refreshes. The selection
/// logic only ever re-fetches the list; it never edits a session in place.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Cost to book, in credits. Always positive.
    pub price_credits: u32,
    /// Populated by the server only after a successful booking.
    pub meeting_link: Option<String>,
}

/// A teacher profile as shown in the picker.
#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub bio: String,
    pub rating_avg: f32,
    pub rating_count: u32,
    pub followers_count: u32,
    pub avatar_url: Option<String>,
}

// Display only. The server is authoritative for affordability when a
// booking is actually submitted.
#[derive(Debug, Clone, Copy)]
pub struct CreditBalance {
    pub balance: i64,
}

/// Server confirmation of a created booking. The embedded session is the
/// server's copy, with `meeting_link` possibly filled in.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub booking_id: Uuid,
    pub session: Session,
}
