pub mod flow;
pub mod state;

// Re-export the entry point to make it easily accessible to the binary.
pub use flow::run;
pub use state::{AppState, BrowseState};
