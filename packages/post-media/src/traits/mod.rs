//! Core trait abstractions.
//!
//! These are the seams where callers inject capabilities (HTTP, time) and
//! where each upstream source plugs into the chain.

pub mod clock;
pub mod http;
pub mod strategy;
