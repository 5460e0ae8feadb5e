//! Gatekeeper Server
//!
//! Permission catalog administration and grant resolution for role-based
//! access control.

pub mod config;
pub mod db;
pub mod permissions;
