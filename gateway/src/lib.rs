//! Terragate Gateway Library
//!
//! Core modules for the terraform generation gateway.

pub mod archive;
pub mod clients;
pub mod config;
pub mod errors;
pub mod health;
pub mod logs;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod utils;
