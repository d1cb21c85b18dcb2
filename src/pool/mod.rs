mod manager;
mod oauth;
mod project;
mod store;

pub use manager::{ProjectLease, TokenManager};
pub use oauth::{DEFAULT_EXPIRES_IN_SECS, refresh_access_token};
pub use project::{EXPIRY_SKEW_SECS, Project};
pub use store::{LoadedPool, OauthConfig, TokenFile, TokenStore};
