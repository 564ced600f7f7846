//! Local HTTP server

pub mod handlers;
pub mod responses;
pub mod serve;
pub mod state;
