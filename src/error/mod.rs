mod gateway;
mod oauth;

pub use gateway::{ApiErrorBody, ApiErrorObject, GatewayError};
pub use oauth::OauthError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
