//! timeledger-domain
//!
//! Pure record types consumed by the time-value engine (rows, month keys, frequencies).
//! No I/O, no logging, no storage. Only data types and the invariants they carry.

pub mod common;
pub mod month;
pub mod rows;

pub use common::*;
pub use month::*;
pub use rows::*;
