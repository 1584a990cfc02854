//! Geometric primitives shared by the topology builder and the solvers.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Divisor applied to the largest bounding span to obtain the zero geometric tolerance.
pub const ZERO_TOLERANCE_DIVISOR: f64 = 1.0e5;

/// Position in three dimensional space measured in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Coordinate along `axis` (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Mutable coordinate along `axis` (0 = X, 1 = Y, 2 = Z).
    pub fn axis_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }

    /// Whether `other` lies within `tolerance` of this point.
    #[must_use]
    pub fn coincides_with(&self, other: &Point, tolerance: f64) -> bool {
        self.distance_to(other) <= tolerance
    }

    /// Return the point moved by `displacement`.
    #[must_use]
    pub fn translated(self, displacement: Displacement) -> Self {
        Self::from(self.to_vector() + displacement.to_vector())
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Cartesian vector representing a three dimensional force in newtons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Force component acting along the global X axis.
    pub x: f64,
    /// Force component acting along the global Y axis.
    pub y: f64,
    /// Force component acting along the global Z axis.
    pub z: f64,
}

impl Force {
    /// Create a [`Force`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the force into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Component along `axis` (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Mutable component along `axis` (0 = X, 1 = Y, 2 = Z).
    pub fn axis_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl From<Vector3<f64>> for Force {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Force> for Vector3<f64> {
    fn from(value: Force) -> Self {
        value.to_vector()
    }
}

/// Translation vector describing node displacement in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Displacement component along the global X axis.
    pub x: f64,
    /// Displacement component along the global Y axis.
    pub y: f64,
    /// Displacement component along the global Z axis.
    pub z: f64,
}

impl Displacement {
    /// Create a [`Displacement`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the displacement into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Displacement carrying `from` onto `to`.
    #[must_use]
    pub fn between(from: Point, to: Point) -> Self {
        Self::from(to.to_vector() - from.to_vector())
    }
}

impl From<Vector3<f64>> for Displacement {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Displacement> for Vector3<f64> {
    fn from(value: Displacement) -> Self {
        value.to_vector()
    }
}

/// Straight segment between two points, the current geometry of an element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// First end point.
    pub start: Point,
    /// Second end point.
    pub end: Point,
}

impl Line {
    /// Create a [`Line`] from its end points.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Unit vector pointing from `start` to `end`, or `None` for a degenerate segment.
    #[must_use]
    pub fn direction(&self) -> Option<Vector3<f64>> {
        let delta = self.end.to_vector() - self.start.to_vector();
        let length = delta.norm();
        (length > 0.0).then(|| delta / length)
    }
}

/// Largest axis-aligned extent of a point cloud. Returns `0.0` for an empty set.
#[must_use]
pub fn max_span<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a Point>,
{
    let mut lower = [f64::INFINITY; 3];
    let mut upper = [f64::NEG_INFINITY; 3];
    let mut any = false;
    for point in points {
        any = true;
        for axis in 0..3 {
            lower[axis] = lower[axis].min(point.axis(axis));
            upper[axis] = upper[axis].max(point.axis(axis));
        }
    }
    if !any {
        return 0.0;
    }
    (0..3).map(|axis| upper[axis] - lower[axis]).fold(0.0, f64::max)
}

/// Tolerance below which two points are considered the same node.
#[must_use]
pub fn zero_geometric_tolerance<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a Point>,
{
    max_span(points) / ZERO_TOLERANCE_DIVISOR
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use tensegrix::point;
///
/// let origin = point(0.0, 0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Convenience helper for creating [`Force`] instances.
///
/// # Examples
/// ```
/// use tensegrix::force;
///
/// let load = force(1.0, 0.0, -5.0);
/// assert_eq!(load.z, -5.0);
/// ```
#[must_use]
pub const fn force(x: f64, y: f64, z: f64) -> Force {
    Force::new(x, y, z)
}

/// Convenience helper for creating [`Line`] instances from raw coordinates.
///
/// # Examples
/// ```
/// use tensegrix::{line, point};
///
/// let segment = line(point(0.0, 0.0, 0.0), point(3.0, 4.0, 0.0));
/// assert_eq!(segment.length(), 5.0);
/// ```
#[must_use]
pub const fn line(start: Point, end: Point) -> Line {
    Line::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn axis_accessors_follow_xyz_order() {
        let mut p = point(1.0, 2.0, 3.0);
        assert_eq!([p.axis(0), p.axis(1), p.axis(2)], [1.0, 2.0, 3.0]);
        *p.axis_mut(2) += 1.0;
        assert_eq!(p.z, 4.0);
    }

    #[test]
    fn translation_moves_point() {
        let moved = point(1.0, 1.0, 1.0).translated(Displacement::new(0.5, 0.0, -1.0));
        assert_eq!(moved, point(1.5, 1.0, 0.0));
        assert_eq!(
            Displacement::between(point(1.0, 1.0, 1.0), moved),
            Displacement::new(0.5, 0.0, -1.0)
        );
    }

    #[test]
    fn degenerate_line_has_no_direction() {
        let p = point(1.0, 2.0, 3.0);
        assert!(line(p, p).direction().is_none());
        let direction = line(p, point(1.0, 2.0, 5.0)).direction().expect("non-degenerate");
        assert_eq!(direction, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn span_is_the_largest_axis_extent() {
        let points = [point(-2.0, 0.0, 0.0), point(2.0, 1.0, 0.5), point(0.0, -1.0, 0.0)];
        assert_eq!(max_span(&points), 4.0);
        assert_eq!(zero_geometric_tolerance(&points), 4.0e-5);
        assert_eq!(max_span(&Vec::<Point>::new()), 0.0);
    }
}
