mod client;
mod endpoints;

pub use client::{AntigravityClient, MODEL_LIST_TIMEOUT, UPSTREAM_USER_AGENT};
pub use endpoints::UpstreamEndpoints;
