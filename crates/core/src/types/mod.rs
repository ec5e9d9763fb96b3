//! Domain types for the marketplace.
//!
//! This module provides type-safe wrappers for the concepts that cross the
//! backend boundary: identities, credentials, money and roles.

pub mod email;
pub mod id;
pub mod password;
pub mod price;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use password::{Password, PasswordError};
pub use price::{Currency, Price, PriceError};
pub use role::{Role, RoleError};
