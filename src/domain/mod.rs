//! Domain layer for the custom bouncer
//!
//! Plain data: the bouncer configuration and the logging plan derived from it.

pub mod models;
