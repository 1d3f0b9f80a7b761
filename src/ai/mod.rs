//! Scripted opponent: greedy summons and weakest-first targeting.

pub mod policy;

pub use policy::{AiAgent, AiConfig, AiDecision, TargetStrategy};
