//! Auralis Core - live mixing engine and automatic soundcheck

pub mod audio;
pub mod config;
pub mod types;
pub mod effect;
pub mod engine;
pub mod routing;
pub mod soundcheck;

pub use types::*;
