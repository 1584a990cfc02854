//! Conversion of raw element geometry into a consistent node/element topology.

use crate::element::Element;
use crate::errors::BuildError;
use crate::geometry::{zero_geometric_tolerance, Point};
use crate::node::{Node, Support};
use crate::truss::Truss;

/// Builds a [`Truss`] from element lines, optional user points and supports.
///
/// End points closer than the zero geometric tolerance (the largest bounding
/// span divided by `1e5`) are merged into a single node. Anything suspicious
/// but recoverable is reported as a warning stored in the returned truss.
///
/// # Examples
///
/// ```
/// use tensegrix::{line, point, BilinearMaterial, Builder, CrossSection, Element, Support};
///
/// let section = CrossSection::circular(0.008);
/// let steel = BilinearMaterial::symmetric(210.0e9, 355.0e6);
/// let elements = vec![
///     Element::cable(line(point(-2.0, 0.0, 0.0), point(0.0, 0.0, 0.0)), section, steel),
///     Element::cable(line(point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0)), section, steel),
/// ];
/// let supports = [
///     Support::pinned(point(-2.0, 0.0, 0.0)),
///     Support::pinned(point(2.0, 0.0, 0.0)),
/// ];
/// let truss = Builder::new().build(elements, None, &supports).expect("valid geometry");
/// assert_eq!(truss.node_count(), 3);
/// assert_eq!(truss.elements()[1].end_nodes, [1, 2]);
/// assert!(truss.warnings().is_empty());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Builder;

impl Builder {
    /// Create a builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Assemble the truss.
    ///
    /// When `points` is given its order defines the node indexation; element end
    /// points missing from it are appended after the user points.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for an empty element list, invalid element
    /// properties or an element whose ends collapse onto the same node.
    pub fn build(
        &self,
        mut elements: Vec<Element>,
        points: Option<Vec<Point>>,
        supports: &[Support],
    ) -> Result<Truss, BuildError> {
        if elements.is_empty() {
            return Err(BuildError::NoElements);
        }
        for (idx, element) in elements.iter().enumerate() {
            element
                .validate()
                .map_err(|source| BuildError::InvalidElementProperties {
                    element: idx,
                    source,
                })?;
        }

        let endpoints: Vec<Point> = elements
            .iter()
            .flat_map(|element| [element.line.start, element.line.end])
            .collect();
        let tolerance = zero_geometric_tolerance(
            endpoints
                .iter()
                .chain(points.iter().flat_map(|points| points.iter())),
        );
        let mut warnings = Vec::new();

        let (unique_endpoints, _) = deduplicate(&endpoints, tolerance);
        let canonical = match points {
            None => unique_endpoints,
            Some(points) => {
                let (mut canonical, removed) = deduplicate(&points, tolerance);
                if removed > 0 {
                    warnings.push(format!(
                        "{removed} duplicate point(s) removed from the supplied points"
                    ));
                }
                let user_count = canonical.len();
                let orphans: Vec<usize> = (0..user_count)
                    .filter(|&idx| {
                        !unique_endpoints
                            .iter()
                            .any(|end| end.coincides_with(&canonical[idx], tolerance))
                    })
                    .collect();
                for endpoint in &unique_endpoints {
                    if find(&canonical, endpoint, tolerance).is_none() {
                        canonical.push(*endpoint);
                    }
                }
                let appended = canonical.len() - user_count;
                if appended > 0 {
                    warnings.push(format!(
                        "{appended} element end point(s) missing from the supplied points were appended; node indexation changed"
                    ));
                }
                if !orphans.is_empty() {
                    warnings.push(format!(
                        "point(s) {orphans:?} are not connected to any element"
                    ));
                }
                canonical
            }
        };

        let mut nodes: Vec<Node> = canonical
            .iter()
            .enumerate()
            .map(|(idx, point)| Node::new(idx, *point))
            .collect();

        for (idx, element) in elements.iter_mut().enumerate() {
            let mut end_nodes = [0; 2];
            for (slot, point) in [element.line.start, element.line.end].iter().enumerate() {
                end_nodes[slot] = find(&canonical, point, tolerance).ok_or(
                    BuildError::UnresolvedEndpoint {
                        element: idx,
                        point: *point,
                    },
                )?;
            }
            if end_nodes[0] == end_nodes[1] {
                return Err(BuildError::ZeroLengthElement(idx));
            }
            element.idx = idx;
            element.end_nodes = end_nodes;
            if !element.free_length_is_given {
                // Merged end points must not turn into prestress.
                element.free_length = canonical[end_nodes[0]].distance_to(&canonical[end_nodes[1]]);
            }
        }

        for support in supports {
            match find(&canonical, &support.point, tolerance) {
                Some(idx) => nodes[idx].restrain(support.is_free),
                None => warnings.push(format!(
                    "support at ({}, {}, {}) matches no node and was ignored",
                    support.point.x, support.point.y, support.point.z
                )),
            }
        }

        let mut truss = Truss::from_parts(nodes, elements, tolerance, Vec::new());
        for warning in warnings {
            truss.push_warning(warning);
        }
        let parts = truss.connected_components();
        if parts > 1 {
            truss.push_warning(format!("structure is made of {parts} disconnected parts"));
        }
        log::debug!(
            "built truss with {} nodes, {} elements and {} free DOFs (tolerance {tolerance:e})",
            truss.node_count(),
            truss.element_count(),
            truss.free_dof_count()
        );
        Ok(truss)
    }
}

/// First point of `points` within `tolerance` of `target`.
fn find(points: &[Point], target: &Point, tolerance: f64) -> Option<usize> {
    points
        .iter()
        .position(|point| point.coincides_with(target, tolerance))
}

/// Drop points coinciding with an earlier one; returns the kept points and the removed count.
fn deduplicate(points: &[Point], tolerance: f64) -> (Vec<Point>, usize) {
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if find(&unique, point, tolerance).is_none() {
            unique.push(*point);
        }
    }
    let removed = points.len() - unique.len();
    (unique, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BilinearMaterial, CrossSection};
    use crate::errors::ElementPropertyError;
    use crate::geometry::{line, point};

    fn bar(start: Point, end: Point) -> Element {
        Element::bar(
            line(start, end),
            CrossSection::new(1.0e-4, 1.0e-9),
            BilinearMaterial::symmetric(200.0e9, 355.0e6),
        )
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            Builder::new().build(Vec::new(), None, &[]).err(),
            Some(BuildError::NoElements)
        );
    }

    #[test]
    fn invalid_elements_are_rejected_with_their_index() {
        let broken = Element::bar(
            line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
            CrossSection::new(-1.0, 0.0),
            BilinearMaterial::symmetric(1.0, 1.0),
        );
        let elements = vec![bar(point(0.0, 0.0, 0.0), point(0.0, 1.0, 0.0)), broken];
        assert_eq!(
            Builder::new().build(elements, None, &[]).err(),
            Some(BuildError::InvalidElementProperties {
                element: 1,
                source: ElementPropertyError::NonPositiveArea(-1.0),
            })
        );
    }

    #[test]
    fn nearby_end_points_merge_into_one_node() {
        // Span 10 m gives a tolerance of 0.1 mm.
        let elements = vec![
            bar(point(0.0, 0.0, 0.0), point(5.0, 0.0, 0.0)),
            bar(point(5.0 + 5.0e-5, 0.0, 0.0), point(10.0, 0.0, 0.0)),
            bar(point(5.0 + 2.0e-4, 0.0, 0.0), point(5.0, 1.0, 0.0)),
        ];
        let truss = Builder::new()
            .build(elements, None, &[])
            .expect("valid geometry");
        assert_eq!(truss.zero_geometric_atol(), 1.0e-4);
        assert_eq!(truss.node_count(), 5);
        assert_eq!(truss.elements()[1].end_nodes, [1, 2]);
        assert_eq!(truss.elements()[2].end_nodes, [3, 4]);
        assert_eq!(truss.element(1).map(|e| e.line.start), Some(point(5.0, 0.0, 0.0)));
    }

    #[test]
    fn merged_end_points_leave_the_structure_unstressed() {
        let elements = vec![
            bar(point(0.0, 0.0, 0.0), point(5.0, 0.0, 0.0)),
            bar(point(5.0 + 5.0e-5, 0.0, 0.0), point(10.0, 0.0, 0.0)),
        ];
        let truss = Builder::new()
            .build(elements, None, &[])
            .expect("valid geometry");
        assert_eq!(truss.node_count(), 3);
        for element in truss.elements() {
            assert_eq!(element.free_length, element.length());
            assert_eq!(element.tension, 0.0);
        }
        assert_eq!(truss.max_residual(), 0.0);
    }

    #[test]
    fn explicit_free_lengths_survive_merging() {
        let elements = vec![
            bar(point(0.0, 0.0, 0.0), point(5.0, 0.0, 0.0)),
            bar(point(5.0 + 5.0e-5, 0.0, 0.0), point(10.0, 0.0, 0.0)).with_free_length(4.999),
        ];
        let truss = Builder::new()
            .build(elements, None, &[])
            .expect("valid geometry");
        assert_eq!(truss.elements()[1].free_length, 4.999);
        assert!(truss.elements()[1].tension > 0.0);
    }

    #[test]
    fn zero_length_elements_are_rejected() {
        let elements = vec![
            bar(point(0.0, 0.0, 0.0), point(10.0, 0.0, 0.0)),
            bar(point(3.0, 0.0, 0.0), point(3.0 + 1.0e-6, 0.0, 0.0)),
        ];
        assert_eq!(
            Builder::new().build(elements, None, &[]).err(),
            Some(BuildError::ZeroLengthElement(1))
        );
    }

    #[test]
    fn user_points_define_indexation_and_produce_warnings() {
        let elements = vec![
            bar(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
            bar(point(1.0, 0.0, 0.0), point(1.0, 1.0, 0.0)),
        ];
        let points = vec![
            point(1.0, 0.0, 0.0),
            point(0.0, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
            point(5.0, 5.0, 0.0),
        ];
        let truss = Builder::new()
            .build(elements, Some(points), &[])
            .expect("valid geometry");

        assert_eq!(truss.node_count(), 4);
        assert_eq!(truss.nodes()[0].coordinates, point(1.0, 0.0, 0.0));
        assert_eq!(truss.nodes()[3].coordinates, point(1.0, 1.0, 0.0));
        assert_eq!(truss.elements()[0].end_nodes, [1, 0]);
        assert_eq!(truss.elements()[1].end_nodes, [0, 3]);

        let warnings = truss.warnings().join("\n");
        assert!(warnings.contains("duplicate"));
        assert!(warnings.contains("indexation changed"));
        assert!(warnings.contains("[2]"));
        assert!(warnings.contains("disconnected"));
    }

    #[test]
    fn supports_and_combine_and_unmatched_ones_warn() {
        let elements = vec![bar(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0))];
        let supports = [
            Support::new(point(0.0, 0.0, 0.0), [false, true, true]),
            Support::new(point(0.0, 0.0, 0.0), [true, true, false]),
            Support::pinned(point(3.0, 0.0, 0.0)),
        ];
        let truss = Builder::new()
            .build(elements, None, &supports)
            .expect("valid geometry");
        assert_eq!(truss.nodes()[0].is_free, [false, true, false]);
        assert_eq!(truss.nodes()[1].is_free, [true; 3]);
        assert_eq!(truss.warnings().len(), 1);
        assert!(truss.warnings()[0].contains("matches no node"));
    }

    #[test]
    fn topology_is_invariant_under_scaling() {
        let coordinates = [
            (point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
            (point(1.0 + 4.0e-6, 0.0, 0.0), point(1.0, 2.0, 0.0)),
            (point(1.0, 2.0, 0.0), point(0.0, 0.0, 0.0)),
        ];
        for scale in [1.0e-3, 1.0, 1.0e4] {
            let scaled = |p: Point| point(p.x * scale, p.y * scale, p.z * scale);
            let elements = coordinates
                .iter()
                .map(|(start, end)| bar(scaled(*start), scaled(*end)))
                .collect();
            let truss = Builder::new()
                .build(elements, None, &[])
                .expect("valid geometry");
            assert_eq!(truss.node_count(), 3);
            assert_eq!(truss.elements()[1].end_nodes, [1, 2]);
        }
    }
}
