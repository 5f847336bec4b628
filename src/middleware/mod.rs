pub mod auth;
pub mod error_handler;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    hash_api_key, verify_api_key, ApiKeyAuth, AuthenticatedCustomer, API_KEY_HEADER,
    CUSTOMER_ID_HEADER,
};
pub use rate_limit::{InMemoryRateLimiter, RateLimit, RateLimitDecision, RateLimiter};
pub use request_id::RequestId;
