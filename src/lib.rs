//! Filedesk Backend Library
//!
//! Stateless session tokens, the permission-gated account store, and the
//! thin HTTP surface over them. The binary in `main.rs` only wires these up.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod settings;
