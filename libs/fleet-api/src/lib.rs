//! Rancher v1 API wire models
//!
//! Only the fields crane reads or writes are typed. Everything else on a
//! launch configuration is carried through untouched so an upgrade request
//! never drops settings the operator configured in Rancher.

pub mod models;

pub use models::*;
