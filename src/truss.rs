//! The structural model: nodes, elements and their force fields.

use nalgebra::Vector3;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::errors::{SolveError, TrussEditError};
use crate::geometry::{Displacement, Force, Point};
use crate::node::Node;

/// Container for a pin-jointed structure.
///
/// Instances are produced by the [`Builder`](crate::Builder) and by the solvers,
/// which never mutate their input and return an updated copy instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Truss {
    /// Nodes in index order.
    nodes: Vec<Node>,
    /// Elements in index order.
    elements: Vec<Element>,
    /// Distance below which two points are the same node.
    zero_geometric_atol: f64,
    /// Non fatal issues met while building or solving.
    warnings: Vec<String>,
    /// Whether the last analysis reached equilibrium.
    is_in_equilibrium: bool,
}

impl Truss {
    /// Assemble a truss from wired nodes and elements and evaluate its force fields.
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        elements: Vec<Element>,
        zero_geometric_atol: f64,
        warnings: Vec<String>,
    ) -> Self {
        let mut truss = Self {
            nodes,
            elements,
            zero_geometric_atol,
            warnings,
            is_in_equilibrium: false,
        };
        truss.update_element_geometry();
        truss.update_equilibrium_fields();
        truss
    }

    /// Return the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// All nodes in index order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All elements in index order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Node with the given index.
    #[must_use]
    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    /// Element with the given index.
    #[must_use]
    pub fn element(&self, idx: usize) -> Option<&Element> {
        self.elements.get(idx)
    }

    /// Distance below which two points are considered the same node.
    #[must_use]
    pub fn zero_geometric_atol(&self) -> f64 {
        self.zero_geometric_atol
    }

    /// Warnings accumulated while building and solving.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether the last analysis reached equilibrium.
    #[must_use]
    pub fn is_in_equilibrium(&self) -> bool {
        self.is_in_equilibrium
    }

    /// Record the outcome of an analysis.
    pub(crate) fn set_in_equilibrium(&mut self, is_in_equilibrium: bool) {
        self.is_in_equilibrium = is_in_equilibrium;
    }

    /// Mutable nodes, for solvers moving coordinates.
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Mutable elements.
    pub(crate) fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    /// Record a non fatal issue.
    pub fn push_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    /// Index of the node lying within the zero tolerance of `point`.
    #[must_use]
    pub fn find_node(&self, point: &Point) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.coordinates.coincides_with(point, self.zero_geometric_atol))
    }

    /// Global indices (`3 * node + axis`) of the free degrees of freedom, in order.
    #[must_use]
    pub fn free_dofs(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .flat_map(|node| {
                (0..3)
                    .filter(|axis| node.is_free[*axis])
                    .map(move |axis| 3 * node.idx + axis)
            })
            .collect()
    }

    /// Number of free degrees of freedom.
    #[must_use]
    pub fn free_dof_count(&self) -> usize {
        self.nodes.iter().map(Node::free_dof_count).sum()
    }

    /// Replace the load applied to a node.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] when `node` is not part of this truss.
    pub fn set_load(&mut self, node: usize, load: Force) -> Result<(), TrussEditError> {
        let target = self
            .nodes
            .get_mut(node)
            .ok_or(TrussEditError::UnknownNode(node))?;
        target.loads = load;
        self.is_in_equilibrium = false;
        self.update_equilibrium_fields();
        Ok(())
    }

    /// Change the unstrained length of an element.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownElement`] when `element` is not part of this
    /// truss and [`TrussEditError::InvalidElementProperties`] for a non-positive length.
    pub fn set_free_length(
        &mut self,
        element: usize,
        free_length: f64,
    ) -> Result<(), TrussEditError> {
        let target = self
            .elements
            .get_mut(element)
            .ok_or(TrussEditError::UnknownElement(element))?;
        if free_length <= 0.0 {
            return Err(TrussEditError::InvalidElementProperties(
                crate::errors::ElementPropertyError::NonPositiveFreeLength(free_length),
            ));
        }
        target.free_length = free_length;
        target.tension = target.tension_at(target.length());
        self.is_in_equilibrium = false;
        self.update_equilibrium_fields();
        Ok(())
    }

    /// Loads flattened as `[x0, y0, z0, x1, ...]`.
    #[must_use]
    pub fn loads(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .flat_map(|node| [node.loads.x, node.loads.y, node.loads.z])
            .collect()
    }

    /// Element tensions in index order.
    #[must_use]
    pub fn tensions(&self) -> Vec<f64> {
        self.elements.iter().map(|element| element.tension).collect()
    }

    /// Displacement of a node relative to its position in `reference`.
    #[must_use]
    pub fn displacement_from(&self, reference: &Truss, node: usize) -> Option<Displacement> {
        let current = self.nodes.get(node)?;
        let initial = reference.nodes.get(node)?;
        Some(Displacement::between(initial.coordinates, current.coordinates))
    }

    /// Add load and free length increments, as done before every solve.
    pub(crate) fn apply_increments(
        &mut self,
        loads: &[f64],
        free_length_deltas: &[f64],
    ) -> Result<(), SolveError> {
        if loads.len() != 3 * self.nodes.len() {
            return Err(SolveError::LoadLength {
                expected: 3 * self.nodes.len(),
                found: loads.len(),
            });
        }
        if free_length_deltas.len() != self.elements.len() {
            return Err(SolveError::PrestressLength {
                expected: self.elements.len(),
                found: free_length_deltas.len(),
            });
        }
        for (element, delta) in self.elements.iter_mut().zip(free_length_deltas) {
            let free_length = element.free_length + delta;
            if free_length <= 0.0 {
                return Err(SolveError::NonPositiveFreeLength {
                    element: element.idx,
                    free_length,
                });
            }
            element.free_length = free_length;
        }
        for (node, load) in self.nodes.iter_mut().zip(loads.chunks_exact(3)) {
            node.loads.x += load[0];
            node.loads.y += load[1];
            node.loads.z += load[2];
        }
        Ok(())
    }

    /// Move element lines onto their nodes and recompute the tensions.
    pub(crate) fn update_element_geometry(&mut self) {
        let nodes = &self.nodes;
        for element in &mut self.elements {
            let [start, end] = element.end_nodes;
            element.update_geometry(nodes[start].coordinates, nodes[end].coordinates);
        }
    }

    /// Nodal forces resisting the current element tensions.
    pub(crate) fn resisting_forces(&self) -> Vec<Vector3<f64>> {
        let mut forces = vec![Vector3::zeros(); self.nodes.len()];
        for element in &self.elements {
            let Some(direction) = element.direction() else {
                continue;
            };
            let [start, end] = element.end_nodes;
            forces[start] -= element.tension * direction;
            forces[end] += element.tension * direction;
        }
        forces
    }

    /// Store resisting forces and derive reactions and residuals from them.
    pub(crate) fn store_resisting_forces(&mut self, forces: &[Vector3<f64>]) {
        for (node, resisting) in self.nodes.iter_mut().zip(forces) {
            node.resisting_forces = Force::from(*resisting);
            for axis in 0..3 {
                let unbalanced = node.loads.axis(axis) - resisting[axis];
                if node.is_free[axis] {
                    *node.residuals.axis_mut(axis) = unbalanced;
                    *node.reactions.axis_mut(axis) = 0.0;
                } else {
                    *node.residuals.axis_mut(axis) = 0.0;
                    *node.reactions.axis_mut(axis) = -unbalanced;
                }
            }
        }
    }

    /// Recompute resisting forces, reactions and residuals from the tensions.
    pub fn update_equilibrium_fields(&mut self) {
        let forces = self.resisting_forces();
        self.store_resisting_forces(&forces);
    }

    /// Whether every free residual satisfies `|R| <= rtol * |P| + atol`.
    #[must_use]
    pub fn satisfies_tolerance(&self, rtol: f64, atol: f64) -> bool {
        self.nodes.iter().all(|node| {
            (0..3).all(|axis| {
                !node.is_free[axis]
                    || node.residuals.axis(axis).abs()
                        <= rtol * node.loads.axis(axis).abs() + atol
            })
        })
    }

    /// Largest absolute residual over the free degrees of freedom.
    #[must_use]
    pub fn max_residual(&self) -> f64 {
        self.nodes
            .iter()
            .flat_map(|node| [node.residuals.x, node.residuals.y, node.residuals.z])
            .fold(0.0, |max, residual| max.max(residual.abs()))
    }

    /// Axes along which a net load is applied while no node is restrained.
    pub(crate) fn unbalanced_axes(&self) -> Vec<usize> {
        (0..3)
            .filter(|&axis| {
                let restrained = self.nodes.iter().any(|node| !node.is_free[axis]);
                let net: f64 = self.nodes.iter().map(|node| node.loads.axis(axis)).sum();
                let gross: f64 = self
                    .nodes
                    .iter()
                    .map(|node| node.loads.axis(axis).abs())
                    .sum();
                !restrained && gross > 0.0 && net.abs() > 1.0e-9 * gross
            })
            .collect()
    }

    /// Undirected connectivity graph: one graph node per truss node, one edge per element.
    #[must_use]
    pub fn graph(&self) -> UnGraph<usize, usize> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.elements.len());
        for node in &self.nodes {
            graph.add_node(node.idx);
        }
        for element in &self.elements {
            let [start, end] = element.end_nodes;
            graph.add_edge(NodeIndex::new(start), NodeIndex::new(end), element.idx);
        }
        graph
    }

    /// Number of disconnected parts, isolated nodes included.
    #[must_use]
    pub fn connected_components(&self) -> usize {
        petgraph::algo::connected_components(&self.graph())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::builder::Builder;
    use crate::element::{BilinearMaterial, CrossSection};
    use crate::geometry::{force, line, point};
    use crate::node::Support;

    fn two_bar_truss() -> Truss {
        let section = CrossSection::new(1.0e-3, 1.0e-8);
        let material = BilinearMaterial::symmetric(200.0e9, 250.0e6);
        let elements = vec![
            Element::bar(line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)), section, material),
            Element::bar(line(point(1.0, 0.0, 0.0), point(2.0, 0.0, 0.0)), section, material),
        ];
        let supports = [
            Support::pinned(point(0.0, 0.0, 0.0)),
            Support::new(point(1.0, 0.0, 0.0), [true, false, false]),
            Support::pinned(point(2.0, 0.0, 0.0)),
        ];
        Builder::new()
            .build(elements, None, &supports)
            .expect("valid geometry")
    }

    #[test]
    fn free_dofs_follow_node_order() {
        let truss = two_bar_truss();
        assert_eq!(truss.free_dofs(), vec![3]);
        assert_eq!(truss.free_dof_count(), 1);
    }

    #[test]
    fn edits_return_error_for_unknown_indices() {
        let mut truss = two_bar_truss();
        assert_eq!(
            truss.set_load(7, force(0.0, 0.0, 0.0)),
            Err(TrussEditError::UnknownNode(7))
        );
        assert_eq!(
            truss.set_free_length(7, 1.0),
            Err(TrussEditError::UnknownElement(7))
        );
        assert!(matches!(
            truss.set_free_length(0, 0.0),
            Err(TrussEditError::InvalidElementProperties(_))
        ));
    }

    #[test]
    fn prestress_creates_reactions_and_residuals() {
        let mut truss = two_bar_truss();
        truss.set_free_length(0, 0.999).expect("element exists");
        let tension = truss.elements()[0].tension;
        assert_relative_eq!(
            tension,
            200.0e9 * 1.0e-3 * 0.001 / 0.999,
            max_relative = 1.0e-9
        );

        let node = &truss.nodes()[1];
        assert_relative_eq!(node.residuals.x, -tension, max_relative = 1.0e-12);
        assert_eq!(node.reactions.x, 0.0);
        assert_relative_eq!(truss.nodes()[0].reactions.x, -tension, max_relative = 1.0e-12);
        assert_relative_eq!(node.reactions.y, 0.0);
        assert!(!truss.satisfies_tolerance(1.0e-4, 1.0e-6));
    }

    #[test]
    fn increments_are_validated() {
        let mut truss = two_bar_truss();
        assert_eq!(
            truss.apply_increments(&[0.0; 3], &[0.0; 2]),
            Err(SolveError::LoadLength {
                expected: 9,
                found: 3
            })
        );
        assert_eq!(
            truss.apply_increments(&[0.0; 9], &[0.0; 1]),
            Err(SolveError::PrestressLength {
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            truss.apply_increments(&[0.0; 9], &[-2.0, 0.0]),
            Err(SolveError::NonPositiveFreeLength { element: 0, .. })
        ));
    }

    #[test]
    fn unrestrained_axes_with_net_load_are_detected() {
        let mut truss = two_bar_truss();
        truss.set_load(1, force(10.0, 0.0, 0.0)).expect("node exists");
        assert!(truss.unbalanced_axes().is_empty());

        let section = CrossSection::new(1.0e-3, 0.0);
        let material = BilinearMaterial::symmetric(1.0e9, 1.0e6);
        let free = Builder::new()
            .build(
                vec![Element::bar(
                    line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
                    section,
                    material,
                )],
                None,
                &[],
            )
            .expect("valid geometry");
        let mut loaded = free.clone();
        loaded.set_load(0, force(0.0, 0.0, 5.0)).expect("node exists");
        assert_eq!(loaded.unbalanced_axes(), vec![2]);

        let mut self_balanced = free;
        self_balanced.set_load(0, force(-5.0, 0.0, 0.0)).expect("node exists");
        self_balanced.set_load(1, force(5.0, 0.0, 0.0)).expect("node exists");
        assert!(self_balanced.unbalanced_axes().is_empty());
    }

    #[test]
    fn connectivity_counts_disconnected_parts() {
        let truss = two_bar_truss();
        assert_eq!(truss.connected_components(), 1);
        assert_eq!(truss.graph().edge_count(), 2);
    }
}
