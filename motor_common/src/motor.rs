//! Motor domain types shared between the control core and its hosts.
//!
//! - [`error`] - Sticky fault bitmask.
//! - [`config`] - Persistent motor parameters.
//! - [`types`] - Values exchanged with the power stage.

pub mod config;
pub mod error;
pub mod types;
