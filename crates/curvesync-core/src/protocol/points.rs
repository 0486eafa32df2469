//! Point text codec: `"x1:y1;x2:y2;...;xn:yn"`.
//!
//! The format is locale-invariant (Rust's `f64` Display, `.` decimal point)
//! and forgiving on input: an unparsable fragment is skipped rather than
//! aborting the whole list, matching the producing side's tolerance.  The
//! decoded list is normalized with the same duplicate-x last-wins rule the
//! curve entity applies, so `deserialize(serialize(p))` reproduces `p` once
//! `p` itself is normalized.

use tracing::debug;

use crate::domain::curve::{normalize_points, Point};

/// Encodes points as `x:y` pairs joined by `;`.  An empty slice encodes as
/// the empty string.
pub fn serialize_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{}:{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(";")
}

/// Decodes point text, skipping fragments that are not exactly `x:y` with
/// two parsable floats.  The result is sorted by x with duplicate-x entries
/// collapsed to the last value written.
pub fn deserialize_points(data: &str) -> Vec<Point> {
    let mut raw = Vec::new();
    for part in data.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((x_text, y_text)) = part.split_once(':') else {
            debug!("skipping point fragment without separator: {part:?}");
            continue;
        };
        match (x_text.trim().parse::<f64>(), y_text.trim().parse::<f64>()) {
            (Ok(x), Ok(y)) => raw.push(Point::new(x, y)),
            _ => debug!("skipping unparsable point fragment: {part:?}"),
        }
    }
    normalize_points(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_empty_is_empty_string() {
        assert_eq!(serialize_points(&[]), "");
    }

    #[test]
    fn test_serialize_joins_with_semicolons() {
        let points = vec![Point::new(1.0, 2.0), Point::new(3.5, -4.25)];
        assert_eq!(serialize_points(&points), "1:2;3.5:-4.25");
    }

    #[test]
    fn test_deserialize_empty_string_yields_no_points() {
        assert!(deserialize_points("").is_empty());
        assert!(deserialize_points("   ").is_empty());
    }

    #[test]
    fn test_round_trip_preserves_normalized_list() {
        let points = vec![
            Point::new(-2.5, 1.0),
            Point::new(0.0, 0.0),
            Point::new(1e-3, 42.125),
        ];
        let decoded = deserialize_points(&serialize_points(&points));
        assert_eq!(decoded, points);
    }

    #[test]
    fn test_deserialize_sorts_by_x() {
        let decoded = deserialize_points("3:1;1:2;2:3");
        let xs: Vec<f64> = decoded.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_deserialize_duplicate_x_last_wins() {
        let decoded = deserialize_points("1:10;2:20;1:99");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], Point::new(1.0, 99.0));
    }

    #[test]
    fn test_deserialize_skips_unparsable_fragments() {
        let decoded = deserialize_points("1:2;garbage;3:oops;4:5");
        assert_eq!(decoded, vec![Point::new(1.0, 2.0), Point::new(4.0, 5.0)]);
    }

    #[test]
    fn test_deserialize_skips_fragment_without_separator() {
        let decoded = deserialize_points("1:2;34;5:6");
        assert_eq!(decoded, vec![Point::new(1.0, 2.0), Point::new(5.0, 6.0)]);
    }

    #[test]
    fn test_deserialize_tolerates_trailing_separator() {
        let decoded = deserialize_points("1:2;");
        assert_eq!(decoded, vec![Point::new(1.0, 2.0)]);
    }

    #[test]
    fn test_round_trip_negative_and_fractional() {
        let points = vec![Point::new(-0.125, -1000.5), Point::new(7.75, 0.0)];
        assert_eq!(deserialize_points(&serialize_points(&points)), points);
    }
}
