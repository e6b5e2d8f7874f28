//! Request processing behind the HTTP handlers.

pub mod error;
pub mod permits;
