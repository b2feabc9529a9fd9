//! crane
//!
//! Rolling upgrades of Rancher stacks from CI, with deployment history
//! read from the project's Git repository.

pub mod announce;
pub mod app;
pub mod cli;
pub mod commit;
pub mod deploy;
pub mod errors;
pub mod fleet;
pub mod logs;
