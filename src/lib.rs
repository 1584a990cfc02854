#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

/// Topology construction from raw element lines
mod builder;
/// Nonlinear equilibrium solver
mod dynamic_relaxation;
/// Elements, sections and materials
mod element;
/// Equilibrium and stiffness matrices
mod equilibrium;
/// Error types
mod errors;
/// JSON input and report records
mod exchange;
/// Points, lines, forces and displacements
mod geometry;
/// Linear displacement method
mod linear;
/// Sparse self-stress bases
mod localize;
/// Natural frequencies and mode shapes
mod modal;
/// Nodes and supports
mod node;
/// Singular value analysis of the equilibrium matrix
mod svd;
/// The structural model
mod truss;

pub use builder::Builder;
pub use dynamic_relaxation::DynamicRelaxation;
pub use element::{BilinearMaterial, BucklingLaw, CrossSection, Element, ElementKind};
pub use equilibrium::equilibrium_matrix;
pub use errors::{BuildError, ElementPropertyError, SolveError, TrussEditError};
pub use exchange::{
    AnalysisSettings, ElementInput, ElementReport, ModalReport, NodeReport, PointLoad,
    StructureInput, SvdReport, TrussReport,
};
pub use geometry::{
    force, line, max_span, point, zero_geometric_tolerance, Displacement, Force, Line, Point,
    ZERO_TOLERANCE_DIVISOR,
};
pub use linear::LinearDM;
pub use localize::SelfStressModes;
pub use modal::{MassMatrixOption, Modal, ModalResult};
pub use node::{Node, Support};
pub use svd::{Svd, SvdResult};
pub use truss::Truss;
