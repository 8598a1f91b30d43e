//! services/booking/src/adapters/auth.rs
//!
//! The config-backed `AuthContext` implementation. The token is handed in
//! at construction; nothing here reads ambient global state, which keeps
//! the adapters testable in isolation.

use tutorboard_core::ports::AuthContext;

/// An `AuthContext` over a bearer token loaded once at startup.
#[derive(Clone)]
pub struct StaticTokenAuth {
    token: Option<String>,
}

impl StaticTokenAuth {
    /// Creates a new `StaticTokenAuth`. `None` means not logged in.
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AuthContext for StaticTokenAuth {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
