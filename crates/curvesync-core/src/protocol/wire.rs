//! Request/response tokens of the rendezvous protocol.
//!
//! Frames are newline-terminated UTF-8 lines:
//!
//! ```text
//! C: GET_SELECTED_GRAPHS\n          C: GET_GRAPHS\n
//! S: SELECTED_GRAPHS_DATA\n         S: GRAPHS_DATA\n
//! S: <count>\n                      S: <count>\n
//! S: <name>\n   (count times)       S: <name>\n<serialized-points>\n  (count times)
//! ```
//!
//! An unknown or empty request gets no response frame; the server simply
//! closes the connection.  This module only builds and parses lines; the
//! async framing (reads under timeout) belongs to the transport layer.

use thiserror::Error;

use crate::domain::curve::CurveDescriptor;
use crate::protocol::points::serialize_points;

/// Request line asking for full curve definitions.
pub const REQ_GRAPHS: &str = "GET_GRAPHS";
/// Request line asking only for the visible curve names.
pub const REQ_SELECTED_GRAPHS: &str = "GET_SELECTED_GRAPHS";
/// Response header preceding full curve definitions.
pub const RESP_GRAPHS: &str = "GRAPHS_DATA";
/// Response header preceding visible curve names.
pub const RESP_SELECTED_GRAPHS: &str = "SELECTED_GRAPHS_DATA";

/// Errors produced while interpreting protocol lines.
///
/// On the client side these all collapse into "this peer yielded nothing";
/// they are never fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown request line: {0:?}")]
    UnknownRequest(String),
    #[error("malformed count line: {0:?}")]
    MalformedCount(String),
    #[error("unexpected response header: {0:?}")]
    UnexpectedHeader(String),
}

/// A parsed peer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Full curve definitions (`GET_GRAPHS`).
    Graphs,
    /// Visible curve names only (`GET_SELECTED_GRAPHS`).
    SelectedGraphs,
}

impl Request {
    /// Parses one request line (already stripped of its newline).
    pub fn parse(line: &str) -> Result<Self, WireError> {
        match line {
            REQ_GRAPHS => Ok(Request::Graphs),
            REQ_SELECTED_GRAPHS => Ok(Request::SelectedGraphs),
            other => Err(WireError::UnknownRequest(other.to_string())),
        }
    }

    pub fn as_line(&self) -> &'static str {
        match self {
            Request::Graphs => REQ_GRAPHS,
            Request::SelectedGraphs => REQ_SELECTED_GRAPHS,
        }
    }
}

/// Builds the complete `SELECTED_GRAPHS_DATA` response frame.
pub fn encode_selected_response(names: &[String]) -> String {
    let mut frame = String::new();
    frame.push_str(RESP_SELECTED_GRAPHS);
    frame.push('\n');
    frame.push_str(&names.len().to_string());
    frame.push('\n');
    for name in names {
        frame.push_str(name);
        frame.push('\n');
    }
    frame
}

/// Builds the complete `GRAPHS_DATA` response frame.
pub fn encode_graphs_response(curves: &[CurveDescriptor]) -> String {
    let mut frame = String::new();
    frame.push_str(RESP_GRAPHS);
    frame.push('\n');
    frame.push_str(&curves.len().to_string());
    frame.push('\n');
    for curve in curves {
        frame.push_str(&curve.name);
        frame.push('\n');
        frame.push_str(&serialize_points(curve.points()));
        frame.push('\n');
    }
    frame
}

/// Parses the count line that follows a response header.
pub fn parse_count(line: &str) -> Result<usize, WireError> {
    line.trim()
        .parse::<usize>()
        .map_err(|_| WireError::MalformedCount(line.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
