//! Persistence of the agent's own settings (not of curve data).

pub mod config;
