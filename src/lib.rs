//! Framekeeper: preservation transcoding with frame-level verification.
//!
//! One source asset is taken per invocation through probe, parameter
//! resolution, encode, clamped frame-digest comparison and policy
//! conformance, and its files are then moved to the location its outcome
//! calls for. Every decision lands in an append-only [`audit::AuditLog`].

pub mod audit;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod resolver;
