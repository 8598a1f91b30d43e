pub mod auth;
pub mod http;

pub use auth::StaticTokenAuth;
pub use http::HttpMarketplaceAdapter;
