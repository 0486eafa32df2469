//! User-authored curve entities.
//!
//! A [`CurveDescriptor`] is the unit of state exchanged between instances:
//! a named, x-sorted list of sample points plus the IDW interpolation power
//! the rendering engine uses to evaluate it.  The descriptor owns its data;
//! any copy that crosses the instance boundary is a value copy, never a
//! shared reference.
//!
//! # Duplicate-x rule
//!
//! Two points whose x coordinates differ by less than [`X_EPSILON`] are the
//! same sample; the value written last wins.  The rule is applied both when
//! a user adds points interactively and when a point list is rebuilt from
//! wire text, so producer and consumer always agree on the final list.

use serde::{Deserialize, Serialize};

/// Two x coordinates closer than this are considered the same sample.
pub const X_EPSILON: f64 = 1e-10;

/// Default IDW interpolation power assigned to new curves.
pub const DEFAULT_POWER: f64 = 2.0;

/// A single curve sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A named, user-authored curve.
///
/// The point list is kept sorted by x with duplicate-x entries collapsed to
/// the last value written; the private field plus normalizing constructors
/// make that invariant impossible to break from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDescriptor {
    /// Unique key within an instance, and the merge key across instances.
    pub name: String,
    points: Vec<Point>,
    /// IDW interpolation power used by the rendering collaborator.
    #[serde(default = "default_power")]
    pub power: f64,
}

fn default_power() -> f64 {
    DEFAULT_POWER
}

impl CurveDescriptor {
    /// Creates an empty curve with the default interpolation power.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            power: DEFAULT_POWER,
        }
    }

    /// Builds a curve from raw points, normalizing them: sorted by x,
    /// duplicate-x entries collapsed to the last value in input order.
    pub fn from_points(name: impl Into<String>, points: Vec<Point>, power: f64) -> Self {
        Self {
            name: name.into(),
            points: normalize_points(points),
            power,
        }
    }

    /// Adds one point, replacing any existing point at (nearly) the same x.
    pub fn add_point(&mut self, x: f64, y: f64) {
        self.points.retain(|p| (p.x - x).abs() >= X_EPSILON);
        self.points.push(Point::new(x, y));
        sort_by_x(&mut self.points);
    }

    /// The normalized point list, sorted by x.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Applies the duplicate-x last-wins rule and sorts by x.
pub(crate) fn normalize_points(raw: Vec<Point>) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::with_capacity(raw.len());
    for p in raw {
        points.retain(|q| (q.x - p.x).abs() >= X_EPSILON);
        points.push(p);
    }
    sort_by_x(&mut points);
    points
}

fn sort_by_x(points: &mut [Point]) {
    // NaN x coordinates have no meaningful order; treat them as equal so the
    // sort stays total.
    points.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_curve_is_empty_with_default_power() {
        let curve = CurveDescriptor::new("sine");
        assert_eq!(curve.name, "sine");
        assert!(curve.is_empty());
        assert_eq!(curve.power, DEFAULT_POWER);
    }

    #[test]
    fn test_from_points_sorts_by_x() {
        let curve = CurveDescriptor::from_points(
            "c",
            vec![Point::new(3.0, 1.0), Point::new(1.0, 2.0), Point::new(2.0, 3.0)],
            2.0,
        );
        let xs: Vec<f64> = curve.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_points_collapses_duplicate_x_last_wins() {
        let curve = CurveDescriptor::from_points(
            "c",
            vec![Point::new(1.0, 10.0), Point::new(2.0, 20.0), Point::new(1.0, 99.0)],
            2.0,
        );
        assert_eq!(curve.point_count(), 2);
        assert_eq!(curve.points()[0], Point::new(1.0, 99.0));
    }

    #[test]
    fn test_add_point_replaces_nearly_equal_x() {
        let mut curve = CurveDescriptor::new("c");
        curve.add_point(1.0, 5.0);
        curve.add_point(1.0 + X_EPSILON / 2.0, 7.0);

        assert_eq!(curve.point_count(), 1);
        assert_eq!(curve.points()[0].y, 7.0);
    }

    #[test]
    fn test_add_point_keeps_list_sorted() {
        let mut curve = CurveDescriptor::new("c");
        curve.add_point(5.0, 0.0);
        curve.add_point(-1.0, 0.0);
        curve.add_point(2.0, 0.0);

        let xs: Vec<f64> = curve.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![-1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_distinct_x_beyond_epsilon_are_kept() {
        let mut curve = CurveDescriptor::new("c");
        curve.add_point(1.0, 5.0);
        curve.add_point(1.0 + 1e-9, 7.0);
        assert_eq!(curve.point_count(), 2);
    }

    #[test]
    fn test_serde_round_trip_via_toml() {
        let curve = CurveDescriptor::from_points(
            "parabola",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 4.0)],
            3.0,
        );
        let text = toml::to_string(&curve).expect("serialize");
        let restored: CurveDescriptor = toml::from_str(&text).expect("deserialize");
        assert_eq!(restored, curve);
    }

    #[test]
    fn test_serde_missing_power_defaults() {
        let text = "name = \"c\"\npoints = []\n";
        let curve: CurveDescriptor = toml::from_str(text).expect("deserialize");
        assert_eq!(curve.power, DEFAULT_POWER);
    }
}
