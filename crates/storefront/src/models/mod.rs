//! Types kept in the server-side session.

pub mod session;
