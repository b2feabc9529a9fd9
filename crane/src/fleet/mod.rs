//! Fleet-control platform (Rancher v1 API)

pub mod client;
pub mod models;
pub mod payload;
