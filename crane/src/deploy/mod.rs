//! Deployment orchestration

pub mod classifier;
pub mod fsm;
pub mod orchestrator;
pub mod settle;
pub mod versions;
