//! Integration tests for the rendezvous protocol frames.
//!
//! These tests exercise the codec the way the transports do: the serving
//! side builds a complete response frame, the fetching side walks it line by
//! line — header, count, then the per-curve lines — and rebuilds the typed
//! values.  No sockets are involved; the framing logic itself is the unit
//! under test.

use curvesync_core::protocol::wire::{
    self, encode_graphs_response, encode_selected_response, parse_count,
};
use curvesync_core::{deserialize_points, CurveDescriptor, Point, Request};

/// Walks a `GRAPHS_DATA` frame the way the client-side reader does.
fn decode_graphs_frame(frame: &str) -> Option<Vec<CurveDescriptor>> {
    let mut lines = frame.lines();
    if lines.next()? != wire::RESP_GRAPHS {
        return None;
    }
    let count = parse_count(lines.next()?).ok()?;
    let mut curves = Vec::with_capacity(count);
    for _ in 0..count {
        let name = lines.next()?;
        let points = deserialize_points(lines.next()?);
        curves.push(CurveDescriptor::from_points(name, points, 2.0));
    }
    Some(curves)
}

fn decode_selected_frame(frame: &str) -> Option<Vec<String>> {
    let mut lines = frame.lines();
    if lines.next()? != wire::RESP_SELECTED_GRAPHS {
        return None;
    }
    let count = parse_count(lines.next()?).ok()?;
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        names.push(lines.next()?.to_string());
    }
    Some(names)
}

#[test]
fn test_selected_frame_round_trip() {
    let names = vec![
        "sine".to_string(),
        "user curve 1".to_string(),
        "parabola".to_string(),
    ];

    let frame = encode_selected_response(&names);
    let decoded = decode_selected_frame(&frame).expect("frame must decode");

    assert_eq!(decoded, names);
}

#[test]
fn test_selected_frame_round_trip_empty() {
    let frame = encode_selected_response(&[]);
    assert_eq!(decode_selected_frame(&frame), Some(Vec::new()));
}

#[test]
fn test_graphs_frame_round_trip() {
    let curves = vec![
        CurveDescriptor::from_points(
            "line",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            2.0,
        ),
        CurveDescriptor::from_points(
            "steps",
            vec![
                Point::new(-1.5, 2.0),
                Point::new(0.25, -3.0),
                Point::new(4.0, 0.5),
            ],
            2.0,
        ),
    ];

    let frame = encode_graphs_response(&curves);
    let decoded = decode_graphs_frame(&frame).expect("frame must decode");

    assert_eq!(decoded, curves);
}

#[test]
fn test_graphs_frame_with_empty_curve_round_trips() {
    let curves = vec![CurveDescriptor::new("placeholder")];
    let frame = encode_graphs_response(&curves);
    let decoded = decode_graphs_frame(&frame).expect("frame must decode");

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].name, "placeholder");
    assert!(decoded[0].is_empty());
}

#[test]
fn test_truncated_frame_yields_nothing() {
    // Header claims two curves but only one name line follows: the fetching
    // side must treat the whole peer contribution as absent, not panic.
    let frame = "GRAPHS_DATA\n2\nlonely\n0:0\n";
    assert_eq!(decode_graphs_frame(frame), None);
}

#[test]
fn test_non_numeric_count_yields_nothing() {
    let frame = "SELECTED_GRAPHS_DATA\nmany\nsine\n";
    assert_eq!(decode_selected_frame(frame), None);
}

#[test]
fn test_wrong_header_yields_nothing() {
    let frame = "TOTALLY_DIFFERENT\n1\nsine\n";
    assert_eq!(decode_selected_frame(frame), None);
    assert_eq!(decode_graphs_frame(frame), None);
}

#[test]
fn test_request_tokens_are_stable() {
    // The protocol has no version field; these tokens are the compatibility
    // contract between instances.
    assert_eq!(Request::Graphs.as_line(), "GET_GRAPHS");
    assert_eq!(Request::SelectedGraphs.as_line(), "GET_SELECTED_GRAPHS");
}
