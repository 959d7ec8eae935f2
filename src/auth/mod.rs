//! Authentication module
//!
//! Password hashing, JWT issuing and verification, the request extractor
//! that resolves the calling user, and per-client rate limiting.

pub mod handlers;
mod extractor;
mod password;
mod rate_limit;
mod service;

pub use extractor::{bearer_token, AuthenticatedUser};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, Claims};
pub use rate_limit::{RateLimiter, RateLimitConfig};
