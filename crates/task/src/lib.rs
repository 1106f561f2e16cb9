//! Shared task-spawn primitives for the compilation coordinator.
//!
//! This crate centralizes task classification and reactor-safe spawn
//! helpers used by the coordinator and its compilation workers.

mod class;
mod spawn;

pub use class::TaskClass;
pub use spawn::{spawn, spawn_blocking};
