//! Wire-level codecs shared by both transports.
//!
//! The protocol is deliberately minimal: line-oriented UTF-8 frames with no
//! length prefix, no checksum, and no version field.  Changing it means
//! changing a header token.

pub mod points;
pub mod wire;
