//! Decoders for the locale-specific encodings AEMET uses in its JSON records.
//!
//! Everything in here is pure: no I/O, no shared state. The services in
//! [`crate::sites`] and [`crate::observations`] compose these into their
//! record pipelines.

pub mod coordinates;
pub mod date_chunks;
pub mod decimal;
pub mod error;
pub mod hours;
pub mod sentinels;
