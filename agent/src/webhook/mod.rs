//! Inbound push notification handling: authentication, parsing and branch
//! selection. Nothing in this module touches the filesystem.

pub mod filter;
pub mod payload;
pub mod signature;
