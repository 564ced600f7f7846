//! Push-triggered deployment agent
//!
//! Receives signed push notifications over HTTP and synchronizes a local
//! working tree with the pushed branch.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod notify;
pub mod server;
pub mod storage;
pub mod utils;
pub mod webhook;
