//! ASN (Autonomous System Number) lookup service

pub mod service;

pub use service::AsnStore;
