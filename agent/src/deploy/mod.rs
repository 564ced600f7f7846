//! Deployment module

pub mod command;
pub mod executor;
pub mod fsm;
pub mod git;
pub mod journal;
