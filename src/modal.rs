//! Natural frequencies and mode shapes of the prestressed structure.

use std::f64::consts::PI;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::equilibrium::{reduce_matrix, tangent_stiffness};
use crate::errors::SolveError;
use crate::svd::normalize_rows;
use crate::truss::Truss;

/// How element self weight is distributed in the mass matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassMatrixOption {
    /// Half of each element mass on each end node, no coupling.
    #[default]
    Lumped,
    /// Consistent mass of a linear bar: `m/6 * [[2, 1], [1, 2]]` per axis.
    Consistent,
}

/// Outcome of a modal analysis, modes sorted by increasing frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModalResult {
    /// Squared angular frequencies in rad²/s².
    pub eigenvalues: Vec<f64>,
    /// Natural frequencies in hertz.
    pub frequencies: Vec<f64>,
    /// Mass-normalized mode shapes, one row per mode and one column per global DOF.
    pub mode_shapes: DMatrix<f64>,
    /// Mass of the structure including point masses, in kilograms.
    pub total_mass: f64,
}

/// Modal analysis around the current (possibly prestressed) state.
#[derive(Clone, Copy, Debug, Default)]
pub struct Modal;

impl Modal {
    /// Solve `K phi = w² M phi` on the free DOFs and keep the `n_modes` lowest modes.
    ///
    /// `point_masses` is either empty or holds one mass per node, added on the
    /// three axes of that node.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::NoFreeDof`] when nothing can move,
    /// [`SolveError::PointMassLength`] for a mass list of the wrong length and
    /// [`SolveError::SingularMass`] when a free DOF carries no mass.
    pub fn solve(
        truss: &Truss,
        option: MassMatrixOption,
        n_modes: usize,
        point_masses: &[f64],
    ) -> Result<ModalResult, SolveError> {
        if !point_masses.is_empty() && point_masses.len() != truss.node_count() {
            return Err(SolveError::PointMassLength {
                expected: truss.node_count(),
                found: point_masses.len(),
            });
        }
        let free = truss.free_dofs();
        if free.is_empty() {
            return Err(SolveError::NoFreeDof);
        }

        let mass = mass_matrix(truss, option, point_masses);
        let total_mass = truss.elements().iter().map(|e| e.mass()).sum::<f64>()
            + point_masses.iter().sum::<f64>();
        let m_ff = reduce_matrix(&mass, &free);
        let k_ff = reduce_matrix(&tangent_stiffness(truss), &free);

        let cholesky = m_ff.cholesky().ok_or(SolveError::SingularMass)?;
        let l = cholesky.l();
        let half = l
            .solve_lower_triangular(&k_ff)
            .ok_or(SolveError::SingularMass)?;
        let standard = l
            .solve_lower_triangular(&half.transpose())
            .ok_or(SolveError::SingularMass)?;
        let standard = (&standard + standard.transpose()) * 0.5;

        let eigen = SymmetricEigen::new(standard);
        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|a, b| eigen.eigenvalues[*a].total_cmp(&eigen.eigenvalues[*b]));
        order.truncate(n_modes);

        let mut mode_shapes = DMatrix::zeros(order.len(), 3 * truss.node_count());
        let mut eigenvalues = Vec::with_capacity(order.len());
        for (row, &mode) in order.iter().enumerate() {
            let shape = l
                .tr_solve_lower_triangular(&eigen.eigenvectors.column(mode))
                .ok_or(SolveError::SingularMass)?;
            for (idx, &dof) in free.iter().enumerate() {
                mode_shapes[(row, dof)] = shape[idx];
            }
            eigenvalues.push(eigen.eigenvalues[mode]);
        }
        // Orientation only; the mass normalization is kept.
        let norms: Vec<f64> = mode_shapes.row_iter().map(|row| row.norm()).collect();
        let mut mode_shapes = normalize_rows(mode_shapes);
        for (mut row, norm) in mode_shapes.row_iter_mut().zip(norms) {
            row *= norm;
        }

        let frequencies = eigenvalues
            .iter()
            .map(|value| value.max(0.0).sqrt() / (2.0 * PI))
            .collect();
        if eigenvalues.first().is_some_and(|value| *value < 0.0) {
            log::warn!("negative eigenvalue: the structure is unstable in its current state");
        }
        log::debug!("computed {} mode(s) on {} free DOFs", eigenvalues.len(), free.len());

        Ok(ModalResult {
            eigenvalues,
            frequencies,
            mode_shapes,
            total_mass,
        })
    }
}

/// Global `3n x 3n` mass matrix.
fn mass_matrix(truss: &Truss, option: MassMatrixOption, point_masses: &[f64]) -> DMatrix<f64> {
    let dof = 3 * truss.node_count();
    let mut matrix = DMatrix::zeros(dof, dof);
    for element in truss.elements() {
        let mass = element.mass();
        let [start, end] = element.end_nodes;
        for axis in 0..3 {
            let (i, j) = (3 * start + axis, 3 * end + axis);
            match option {
                MassMatrixOption::Lumped => {
                    matrix[(i, i)] += mass / 2.0;
                    matrix[(j, j)] += mass / 2.0;
                }
                MassMatrixOption::Consistent => {
                    matrix[(i, i)] += mass / 3.0;
                    matrix[(j, j)] += mass / 3.0;
                    matrix[(i, j)] += mass / 6.0;
                    matrix[(j, i)] += mass / 6.0;
                }
            }
        }
    }
    for (node, mass) in point_masses.iter().enumerate() {
        for axis in 0..3 {
            matrix[(3 * node + axis, 3 * node + axis)] += mass;
        }
    }
    matrix
}
