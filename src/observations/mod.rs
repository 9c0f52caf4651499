//! Daily climatology retrieval and the completeness check built on it.

pub mod completeness;
pub mod frame;
pub mod service;
