//! propdesk — offline-capable real-estate CRM backend.
//!
//! The library exposes every subsystem for embedding and tests; the binary
//! wires them together behind the HTTP gateway.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod migrate;
pub mod offline;
pub mod records;
