//! Backend service clients

pub mod client;
pub mod codebase_context;
pub mod language_context;
pub mod suggestion;
pub mod terraform;

pub use client::ServiceClient;
