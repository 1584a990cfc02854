//! Serializable input and result records made of plain arrays and scalars.
//!
//! These records are the boundary used by the command line tool and by any
//! host that drives the analyses through JSON.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::dynamic_relaxation::DynamicRelaxation;
use crate::element::{BilinearMaterial, BucklingLaw, CrossSection, Element, ElementKind};
use crate::errors::BuildError;
use crate::geometry::{line, Force, Point};
use crate::modal::{MassMatrixOption, ModalResult};
use crate::node::Support;
use crate::svd::{Svd, SvdResult};
use crate::truss::Truss;

/// Buckling length factor of a pinned element.
fn default_kb() -> f64 {
    1.0
}

/// Rank tolerance of the singular value analysis.
fn default_svd_rtol() -> f64 {
    Svd::DEFAULT_RTOL
}

/// Clamping tolerance of the localized modes.
fn default_localize_atol() -> f64 {
    1.0e-6
}

/// Description of one element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementInput {
    /// First end point.
    pub start: Point,
    /// Second end point.
    pub end: Point,
    /// Role of the element.
    #[serde(default)]
    pub kind: ElementKind,
    /// Cross section.
    pub cross_section: CrossSection,
    /// Material.
    pub material: BilinearMaterial,
    /// Buckling law; the default of the element kind when omitted.
    #[serde(default)]
    pub buckling: Option<BucklingLaw>,
    /// Buckling length factor.
    #[serde(default = "default_kb")]
    pub kb: f64,
    /// Unstrained length; the distance between the end points when omitted.
    #[serde(default)]
    pub free_length: Option<f64>,
}

impl ElementInput {
    /// Convert into an [`Element`].
    #[must_use]
    pub fn to_element(&self) -> Element {
        let geometry = line(self.start, self.end);
        let element = match self.kind {
            ElementKind::Bar => Element::bar(geometry, self.cross_section, self.material),
            ElementKind::Cable => Element::cable(geometry, self.cross_section, self.material),
            ElementKind::Strut => Element::strut(geometry, self.cross_section, self.material),
        };
        let buckling = self.buckling.unwrap_or(element.buckling);
        let element = element.with_buckling(buckling, self.kb);
        match self.free_length {
            Some(free_length) => element.with_free_length(free_length),
            None => element,
        }
    }
}

/// A load applied at the node located at `point`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    /// Location of the loaded node.
    pub point: Point,
    /// Applied force.
    pub force: Force,
}

/// Parameters of the analyses run on a structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Dynamic relaxation settings.
    pub dynamic_relaxation: DynamicRelaxation,
    /// Relative threshold on singular values.
    pub svd_rtol: f64,
    /// Entries of localized self-stress modes below this are zero.
    pub localize_atol: f64,
    /// Mass matrix used by the modal analysis.
    pub mass_matrix: MassMatrixOption,
    /// Point masses, empty or one per node.
    pub point_masses: Vec<f64>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            dynamic_relaxation: DynamicRelaxation::default(),
            svd_rtol: default_svd_rtol(),
            localize_atol: default_localize_atol(),
            mass_matrix: MassMatrixOption::default(),
            point_masses: Vec::new(),
        }
    }
}

/// Complete description of a structure and its loading.
///
/// # Examples
///
/// ```
/// use tensegrix::StructureInput;
///
/// let input = StructureInput::from_json(r#"{
///     "elements": [{
///         "start": {"x": 0.0, "y": 0.0, "z": 0.0},
///         "end": {"x": 1.0, "y": 0.0, "z": 0.0},
///         "kind": "Cable",
///         "cross_section": {"area": 1.0e-4, "inertia": 0.0},
///         "material": {"young_tension": 1.0e11, "young_compression": 1.0e11,
///                      "yield_tension": 5.0e8, "yield_compression": 5.0e8}
///     }],
///     "supports": [{"point": {"x": 0.0, "y": 0.0, "z": 0.0}, "is_free": [false, false, false]}]
/// }"#).expect("valid json");
/// let mut truss = input.build().expect("valid geometry");
/// assert_eq!(truss.node_count(), 2);
/// assert_eq!(input.load_vector(&mut truss), vec![0.0; 6]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureInput {
    /// Elements of the structure.
    pub elements: Vec<ElementInput>,
    /// Optional node list fixing the node indexation.
    #[serde(default)]
    pub points: Option<Vec<Point>>,
    /// Support conditions.
    #[serde(default)]
    pub supports: Vec<Support>,
    /// Loads added to the structure before solving.
    #[serde(default)]
    pub loads: Vec<PointLoad>,
    /// Free length changes, empty or one per element.
    #[serde(default)]
    pub free_length_deltas: Vec<f64>,
    /// Analysis parameters.
    #[serde(default)]
    pub settings: AnalysisSettings,
}

impl StructureInput {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] describing malformed input.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Build the truss described by this input.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for inconsistent geometry or properties.
    pub fn build(&self) -> Result<Truss, BuildError> {
        let elements = self.elements.iter().map(ElementInput::to_element).collect();
        Builder::new().build(elements, self.points.clone(), &self.supports)
    }

    /// Flattened load increments (three per node). Loads located at no node
    /// are reported as warnings of `truss`.
    pub fn load_vector(&self, truss: &mut Truss) -> Vec<f64> {
        let mut loads = vec![0.0; 3 * truss.node_count()];
        for load in &self.loads {
            match truss.find_node(&load.point) {
                Some(node) => {
                    loads[3 * node] += load.force.x;
                    loads[3 * node + 1] += load.force.y;
                    loads[3 * node + 2] += load.force.z;
                }
                None => truss.push_warning(format!(
                    "load at ({}, {}, {}) matches no node and was ignored",
                    load.point.x, load.point.y, load.point.z
                )),
            }
        }
        loads
    }

    /// Free length increments, zero for every element when none are given.
    #[must_use]
    pub fn free_length_vector(&self, truss: &Truss) -> Vec<f64> {
        if self.free_length_deltas.is_empty() {
            vec![0.0; truss.element_count()]
        } else {
            self.free_length_deltas.clone()
        }
    }
}

/// State of one node after an analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Node index.
    pub idx: usize,
    /// Current coordinates.
    pub coordinates: [f64; 3],
    /// Free directions.
    pub is_free: [bool; 3],
    /// Displacement from the initial geometry.
    pub displacement: [f64; 3],
    /// Applied load.
    pub loads: [f64; 3],
    /// Support reactions.
    pub reactions: [f64; 3],
    /// Out of balance forces.
    pub residuals: [f64; 3],
}

/// State of one element after an analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementReport {
    /// Element index.
    pub idx: usize,
    /// Start and end node indices.
    pub end_nodes: [usize; 2],
    /// Role of the element.
    pub kind: ElementKind,
    /// Current length.
    pub length: f64,
    /// Unstrained length.
    pub free_length: f64,
    /// Axial force, tension positive.
    pub tension: f64,
    /// Admissible interval `[compression, tension]`.
    pub resistance: [f64; 2],
    /// Tension over the resistance on the same side.
    pub utilization: f64,
}

/// Result of an equilibrium analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrussReport {
    /// Whether equilibrium was reached.
    pub is_in_equilibrium: bool,
    /// Zero geometric tolerance of the structure.
    pub zero_geometric_atol: f64,
    /// Time steps of the dynamic relaxation, when it ran.
    pub n_time_step: Option<usize>,
    /// Kinetic energy resets of the dynamic relaxation, when it ran.
    pub n_ke_reset: Option<usize>,
    /// Largest residual over the free DOFs.
    pub max_residual: f64,
    /// Nodes.
    pub nodes: Vec<NodeReport>,
    /// Elements.
    pub elements: Vec<ElementReport>,
    /// Warnings raised while building and solving.
    pub warnings: Vec<String>,
}

impl TrussReport {
    /// Describe `solved`, measuring displacements from `reference`.
    #[must_use]
    pub fn new(reference: &Truss, solved: &Truss) -> Self {
        let nodes = solved
            .nodes()
            .iter()
            .map(|node| {
                let displacement = solved
                    .displacement_from(reference, node.idx)
                    .unwrap_or_default();
                NodeReport {
                    idx: node.idx,
                    coordinates: [node.coordinates.x, node.coordinates.y, node.coordinates.z],
                    is_free: node.is_free,
                    displacement: [displacement.x, displacement.y, displacement.z],
                    loads: [node.loads.x, node.loads.y, node.loads.z],
                    reactions: [node.reactions.x, node.reactions.y, node.reactions.z],
                    residuals: [node.residuals.x, node.residuals.y, node.residuals.z],
                }
            })
            .collect();
        let elements = solved
            .elements()
            .iter()
            .map(|element| {
                let (compression, tension) = element.resistance();
                ElementReport {
                    idx: element.idx,
                    end_nodes: element.end_nodes,
                    kind: element.kind,
                    length: element.length(),
                    free_length: element.free_length,
                    tension: element.tension,
                    resistance: [compression, tension],
                    utilization: element.utilization(),
                }
            })
            .collect();
        Self {
            is_in_equilibrium: solved.is_in_equilibrium(),
            zero_geometric_atol: solved.zero_geometric_atol(),
            n_time_step: None,
            n_ke_reset: None,
            max_residual: solved.max_residual(),
            nodes,
            elements,
            warnings: solved.warnings().to_vec(),
        }
    }

    /// Attach the counters of a dynamic relaxation run.
    #[must_use]
    pub fn with_counters(mut self, solver: &DynamicRelaxation) -> Self {
        self.n_time_step = Some(solver.n_time_step);
        self.n_ke_reset = Some(solver.n_ke_reset);
        self
    }
}

/// Rows of a matrix as nested vectors.
fn rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Result of the singular value analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvdReport {
    /// Rank of the equilibrium matrix.
    pub r: usize,
    /// Number of self-stress modes.
    pub s: usize,
    /// Number of mechanisms.
    pub m: usize,
    /// Non-zero singular values, descending.
    pub sr: Vec<f64>,
    /// Self-stress modes, one per row.
    pub vs_t: Vec<Vec<f64>>,
    /// Extensional modes, one per row.
    pub vr_t: Vec<Vec<f64>>,
    /// Equilibrated load patterns, one per row.
    pub ur_t: Vec<Vec<f64>>,
    /// Mechanisms, one per row.
    pub um_t: Vec<Vec<f64>>,
    /// Sparse self-stress modes, when computed.
    pub localized_vs_t: Option<Vec<Vec<f64>>>,
}

impl SvdReport {
    /// Attach localized self-stress modes.
    #[must_use]
    pub fn with_localized(mut self, localized: &DMatrix<f64>) -> Self {
        self.localized_vs_t = Some(rows(localized));
        self
    }
}

impl From<&SvdResult> for SvdReport {
    fn from(result: &SvdResult) -> Self {
        Self {
            r: result.r,
            s: result.s,
            m: result.m,
            sr: result.sr.clone(),
            vs_t: rows(&result.vs_t),
            vr_t: rows(&result.vr_t),
            ur_t: rows(&result.ur_t),
            um_t: rows(&result.um_t),
            localized_vs_t: None,
        }
    }
}

/// Result of the modal analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModalReport {
    /// Natural frequencies in hertz, ascending.
    pub frequencies: Vec<f64>,
    /// Squared angular frequencies.
    pub eigenvalues: Vec<f64>,
    /// Mass-normalized mode shapes over all DOFs, one per row.
    pub mode_shapes: Vec<Vec<f64>>,
    /// Total mass in kilograms.
    pub total_mass: f64,
}

impl From<&ModalResult> for ModalReport {
    fn from(result: &ModalResult) -> Self {
        Self {
            frequencies: result.frequencies.clone(),
            eigenvalues: result.eigenvalues.clone(),
            mode_shapes: rows(&result.mode_shapes),
            total_mass: result.total_mass,
        }
    }
}
