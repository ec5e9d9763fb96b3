//! Marketplace Core - Shared domain types.
//!
//! This crate provides the types shared by the marketplace components:
//! - `storefront` - Server-rendered marketplace site
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no session handling. Everything that talks to the backend lives
//! in the storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, passwords, prices and profile roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
