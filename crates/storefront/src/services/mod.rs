//! Business logic services for the storefront.
//!
//! - `auth` - Sign-up, sign-in and sign-out against the backend auth service
//! - `session_context` - Per-request user/profile view and its single writer

pub mod auth;
pub mod session_context;
