//! Small displacement analysis by the direct stiffness method.

use nalgebra::{DVector, Vector3};

use crate::equilibrium::{reduce_matrix, reduce_vector, tangent_stiffness};
use crate::errors::SolveError;
use crate::geometry::{Displacement, Line};
use crate::truss::Truss;

/// Linear displacement method.
///
/// The tangent stiffness is assembled once at the initial state and the
/// displacements solve `K u = P - F0`. Tensions follow the linearized law
/// `T = T0 + k (u_end - u_start) . e`, so the result is only meaningful for
/// displacements that are small compared with the element lengths.
/// See <https://en.wikipedia.org/wiki/Direct_stiffness_method>.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearDM;

impl LinearDM {
    /// Solve `truss` after adding `loads` (three components per node) and
    /// `free_length_deltas` (one per element). The input truss is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SingularStiffness`] for a structure with a
    /// mechanism and the increment errors of [`Truss`].
    pub fn solve(
        truss: &Truss,
        loads: &[f64],
        free_length_deltas: &[f64],
    ) -> Result<Truss, SolveError> {
        let mut truss = truss.clone();
        truss.apply_increments(loads, free_length_deltas)?;
        truss.update_element_geometry();
        truss.update_equilibrium_fields();

        let free = truss.free_dofs();
        if free.is_empty() {
            truss.set_in_equilibrium(true);
            return Ok(truss);
        }

        let stiffness = tangent_stiffness(&truss);
        let unbalanced = DVector::from_iterator(
            3 * truss.node_count(),
            truss
                .nodes()
                .iter()
                .flat_map(|node| [node.residuals.x, node.residuals.y, node.residuals.z]),
        );
        let k_ff = reduce_matrix(&stiffness, &free);
        let f_f = reduce_vector(&unbalanced, &free);
        let solution = k_ff
            .lu()
            .solve(&f_f)
            .ok_or(SolveError::SingularStiffness)?;
        let mut displacements = DVector::zeros(unbalanced.len());
        for (idx, &dof) in free.iter().enumerate() {
            displacements[dof] = solution[idx];
        }
        log::debug!(
            "linear solve on {} free DOFs, largest displacement {:e} m",
            free.len(),
            displacements.amax()
        );

        let initial_forces = truss.resisting_forces();
        let nodal = |node: usize| {
            Vector3::new(
                displacements[3 * node],
                displacements[3 * node + 1],
                displacements[3 * node + 2],
            )
        };

        for element in truss.elements_mut() {
            let Some(direction) = element.direction() else {
                continue;
            };
            let [start, end] = element.end_nodes;
            let elongation = (nodal(end) - nodal(start)).dot(&direction);
            element.tension += element.working_axial_stiffness() * elongation;
        }

        let increments = &stiffness * &displacements;
        let forces: Vec<Vector3<f64>> = initial_forces
            .iter()
            .enumerate()
            .map(|(node, force)| {
                force + Vector3::new(
                    increments[3 * node],
                    increments[3 * node + 1],
                    increments[3 * node + 2],
                )
            })
            .collect();

        for node in truss.nodes_mut() {
            node.coordinates = node.coordinates.translated(Displacement::from(nodal(node.idx)));
        }
        let coordinates: Vec<_> = truss.nodes().iter().map(|node| node.coordinates).collect();
        for element in truss.elements_mut() {
            let [start, end] = element.end_nodes;
            element.line = Line::new(coordinates[start], coordinates[end]);
        }

        truss.store_resisting_forces(&forces);
        truss.set_in_equilibrium(true);
        Ok(truss)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::builder::Builder;
    use crate::element::{BilinearMaterial, CrossSection, Element};
    use crate::geometry::{line, point};
    use crate::node::Support;

    fn axial_bar(free_end: [bool; 3]) -> Truss {
        let element = Element::bar(
            line(point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0)),
            CrossSection::new(0.01, 1.0e-6),
            BilinearMaterial::symmetric(200.0e9, 250.0e6),
        );
        let supports = [
            Support::pinned(point(0.0, 0.0, 0.0)),
            Support::new(point(2.0, 0.0, 0.0), free_end),
        ];
        Builder::new()
            .build(vec![element], None, &supports)
            .expect("valid geometry")
    }

    #[test]
    fn axial_bar_matches_closed_form() {
        let truss = axial_bar([true, false, false]);
        let solved = LinearDM::solve(&truss, &[0.0, 0.0, 0.0, -1000.0, 0.0, 0.0], &[0.0])
            .expect("stable structure");

        // FL/AE
        let expected = -1000.0 * 2.0 / (0.01 * 200.0e9);
        let moved = solved.displacement_from(&truss, 1).expect("node exists");
        assert_relative_eq!(moved.x, expected, max_relative = 1.0e-9);
        assert_eq!(moved.y, 0.0);
        assert_relative_eq!(solved.elements()[0].tension, -1000.0, max_relative = 1.0e-9);
        assert_relative_eq!(solved.nodes()[0].reactions.x, 1000.0, max_relative = 1.0e-9);
        assert!(solved.nodes()[1].residuals.x.abs() < 1.0e-6);
        assert!(solved.is_in_equilibrium());
    }

    #[test]
    fn mechanisms_make_the_stiffness_singular() {
        let truss = axial_bar([true, true, false]);
        assert_eq!(
            LinearDM::solve(&truss, &[0.0, 0.0, 0.0, 0.0, -10.0, 0.0], &[0.0]),
            Err(SolveError::SingularStiffness)
        );
    }

    #[test]
    fn prestress_is_carried_by_the_initial_tension() {
        let truss = axial_bar([true, false, false]);
        let solved = LinearDM::solve(&truss, &[0.0; 6], &[-0.002]).expect("stable structure");
        // A free end lets the shortened bar contract without stress.
        assert!(solved.elements()[0].tension.abs() < 1.0e-3);
        assert_relative_eq!(solved.nodes()[1].coordinates.x, 1.998, max_relative = 1.0e-6);
    }
}
