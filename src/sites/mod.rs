//! The AEMET station inventory: typed catalog, refresh service, reverse
//! geocoding and proximity search.

pub mod catalog;
pub mod error;
pub mod geocoder;
pub mod proximity;
pub mod service;
