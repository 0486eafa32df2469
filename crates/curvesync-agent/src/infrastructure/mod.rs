//! Infrastructure layer: transports, configuration, and the UI bridge.

pub mod storage;
pub mod transport;
pub mod ui_bridge;
