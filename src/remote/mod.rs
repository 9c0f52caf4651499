//! Access to the AEMET OpenData REST API.
//!
//! Every AEMET resource answers with a small envelope pointing at two further
//! URLs, one for the data and one for its metadata. [`client::RemoteClient`]
//! hides that indirection and the rate-limit back-off behind a single `call`.

pub mod client;
pub mod error;
pub mod transport;
