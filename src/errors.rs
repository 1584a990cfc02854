//! Error types produced while building or analysing structures.

use thiserror::Error;

use crate::geometry::Point;

/// Error returned when a truss cannot be assembled from the supplied geometry.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    /// Returned when no element is supplied.
    #[error("a structure needs at least one element")]
    NoElements,
    /// Returned when the supplied properties for an element are not physically meaningful.
    #[error("element {element} has invalid properties: {source}")]
    InvalidElementProperties {
        /// Position of the offending element in the input list.
        element: usize,
        /// Description of the invalid property.
        #[source]
        source: ElementPropertyError,
    },
    /// Returned when both ends of an element collapse onto the same node.
    #[error("element {0} has zero length at the current geometric tolerance")]
    ZeroLengthElement(usize),
    /// Returned when an element end point matches no node of the canonical list.
    #[error("end point {point:?} of element {element} matches no node")]
    UnresolvedEndpoint {
        /// Position of the offending element in the input list.
        element: usize,
        /// End point that could not be resolved.
        point: Point,
    },
}

/// Error returned when element properties are rejected.
///
/// The variants describe the reason the supplied value is rejected so callers can
/// present actionable feedback to users.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ElementPropertyError {
    /// Returned when the cross-sectional area is zero or negative.
    #[error("area must be positive (received {0})")]
    NonPositiveArea(f64),
    /// Returned when the second moment of area is negative.
    #[error("inertia must not be negative (received {0})")]
    NegativeInertia(f64),
    /// Returned when a Young modulus is negative.
    #[error("Young modulus must not be negative (received {0})")]
    NegativeYoungModulus(f64),
    /// Returned when the element is neither stiff in tension nor in compression.
    #[error("element has no stiffness in tension nor in compression")]
    NoStiffness,
    /// Returned when a yield strength is negative.
    #[error("yield strength must not be negative (received {0})")]
    NegativeYieldStrength(f64),
    /// Returned when the mass density is negative.
    #[error("density must not be negative (received {0})")]
    NegativeDensity(f64),
    /// Returned when the free length is zero or negative.
    #[error("free length must be positive (received {0})")]
    NonPositiveFreeLength(f64),
    /// Returned when the buckling length factor is zero or negative.
    #[error("buckling factor must be positive (received {0})")]
    NonPositiveBucklingFactor(f64),
}

/// Error returned when editing a [`Truss`](crate::Truss) with invalid indices.
///
/// # Examples
///
/// ```
/// use tensegrix::{force, line, point, Builder, CrossSection, BilinearMaterial, Element, TrussEditError};
///
/// let element = Element::bar(
///     line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
///     CrossSection::new(0.01, 1.0e-6),
///     BilinearMaterial::symmetric(200.0e9, 250.0e6),
/// );
/// let mut truss = Builder::new().build(vec![element], None, &[]).expect("valid geometry");
/// let error = truss
///     .set_load(42, force(0.0, 0.0, -1.0))
///     .expect_err("unknown node is rejected");
/// assert_eq!(error, TrussEditError::UnknownNode(42));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum TrussEditError {
    /// Returned when a node cannot be found in the truss.
    #[error("node {0} does not exist in this truss")]
    UnknownNode(usize),
    /// Returned when an element cannot be found in the truss.
    #[error("element {0} does not exist in this truss")]
    UnknownElement(usize),
    /// Returned when the supplied element properties are invalid.
    #[error("{0}")]
    InvalidElementProperties(ElementPropertyError),
}

/// Error returned when an analysis cannot be carried out.
#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    /// Returned when the flattened load vector does not hold three entries per node.
    #[error("expected {expected} load components (3 per node), received {found}")]
    LoadLength {
        /// Required number of entries.
        expected: usize,
        /// Supplied number of entries.
        found: usize,
    },
    /// Returned when the free length changes do not hold one entry per element.
    #[error("expected {expected} free length changes (1 per element), received {found}")]
    PrestressLength {
        /// Required number of entries.
        expected: usize,
        /// Supplied number of entries.
        found: usize,
    },
    /// Returned when point masses are given but not one per node.
    #[error("expected {expected} point masses (1 per node), received {found}")]
    PointMassLength {
        /// Required number of entries.
        expected: usize,
        /// Supplied number of entries.
        found: usize,
    },
    /// Returned when a prestress change makes a free length non-positive.
    #[error("element {element} would get a non-positive free length ({free_length})")]
    NonPositiveFreeLength {
        /// Index of the element.
        element: usize,
        /// Resulting free length.
        free_length: f64,
    },
    /// Returned when a solver setting that must be positive is not.
    #[error("solver setting `{setting}` must be positive and finite, received {value}")]
    NonPositiveSetting {
        /// Name of the setting.
        setting: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// Returned when a matrix argument does not have the expected shape.
    #[error("expected a matrix with {expected} columns, received {found}")]
    ShapeMismatch {
        /// Required number of columns.
        expected: usize,
        /// Supplied number of columns.
        found: usize,
    },
    /// Returned when the structure has no free degree of freedom to solve for.
    #[error("structure has no free degree of freedom")]
    NoFreeDof,
    /// Returned when the stiffness matrix cannot be inverted.
    #[error("stiffness matrix is singular; check supports, mechanisms and prestress")]
    SingularStiffness,
    /// Returned when the singular value decomposition does not converge.
    #[error("singular value decomposition of a {rows}x{cols} matrix did not converge")]
    SvdDidNotConverge {
        /// Number of rows of the factorized matrix.
        rows: usize,
        /// Number of columns of the factorized matrix.
        cols: usize,
    },
    /// Returned when the mass matrix is not positive definite on the free DOFs.
    #[error("mass matrix is not positive definite; every free node needs a mass")]
    SingularMass,
}
