//! Static and kinematic indeterminacy from the singular values of the equilibrium matrix.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::equilibrium::equilibrium_matrix;
use crate::errors::SolveError;
use crate::truss::Truss;

/// Bases of the four fundamental subspaces of the equilibrium matrix.
///
/// Row vectors are stored as matrix rows: `vs_t` is `s x elements`,
/// `vr_t` is `r x elements`, `ur_t` is `r x free DOFs` and `um_t` is
/// `m x free DOFs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvdResult {
    /// Rank of the equilibrium matrix.
    pub r: usize,
    /// Number of independent self-stress modes.
    pub s: usize,
    /// Number of independent mechanisms.
    pub m: usize,
    /// Non-zero singular values in descending order.
    pub sr: Vec<f64>,
    /// Self-stress modes: tensions in equilibrium without external load.
    pub vs_t: DMatrix<f64>,
    /// Extensional modes: tensions reachable from external loads.
    pub vr_t: DMatrix<f64>,
    /// Load patterns the structure can carry, paired with `vr_t`.
    pub ur_t: DMatrix<f64>,
    /// Mechanisms: free-DOF motions not resisted by any element.
    pub um_t: DMatrix<f64>,
}

/// Singular value analysis of the equilibrium matrix.
#[derive(Clone, Copy, Debug, Default)]
pub struct Svd;

impl Svd {
    /// Relative threshold used when the caller has no better estimate.
    pub const DEFAULT_RTOL: f64 = 1.0e-8;

    /// Classify the structure.
    ///
    /// Singular values not larger than `rtol` times the largest one are
    /// treated as zero.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SvdDidNotConverge`] when a factorization fails.
    pub fn solve(truss: &Truss, rtol: f64) -> Result<SvdResult, SolveError> {
        let a = equilibrium_matrix(truss);
        let (dofs, elements) = a.shape();
        log::debug!("singular value analysis of a {dofs}x{elements} equilibrium matrix");

        if dofs == 0 {
            return Ok(SvdResult {
                r: 0,
                s: elements,
                m: 0,
                sr: Vec::new(),
                vs_t: DMatrix::identity(elements, elements),
                vr_t: DMatrix::zeros(0, elements),
                ur_t: DMatrix::zeros(0, 0),
                um_t: DMatrix::zeros(0, 0),
            });
        }

        let (values, v_t) = right_basis(&a)?;
        let largest = values.first().copied().unwrap_or(0.0);
        let r = values
            .iter()
            .take_while(|value| largest > 0.0 && **value > rtol * largest)
            .count();
        let sr = values[..r].to_vec();

        let vr_t = v_t.rows(0, r).into_owned();
        let vs_t = normalize_rows(v_t.rows(r, elements - r).into_owned());

        let mut ur_t = DMatrix::zeros(r, dofs);
        for (i, sigma) in sr.iter().enumerate() {
            let column = &a * vr_t.row(i).transpose() / *sigma;
            ur_t.set_row(i, &column.transpose());
        }

        let (_, u_t) = right_basis(&a.transpose())?;
        let um_t = normalize_rows(u_t.rows(r, dofs - r).into_owned());

        let result = SvdResult {
            r,
            s: elements - r,
            m: dofs - r,
            sr,
            vs_t,
            vr_t,
            ur_t,
            um_t,
        };
        log::info!(
            "rank {}, {} self-stress mode(s), {} mechanism(s)",
            result.r,
            result.s,
            result.m
        );
        Ok(result)
    }
}

/// Singular values (descending) and the complete orthonormal basis of right
/// singular vectors, one per row, in the same order.
///
/// Wide matrices are padded with zero rows so that the factorization returns
/// the full null space.
pub(crate) fn right_basis(matrix: &DMatrix<f64>) -> Result<(Vec<f64>, DMatrix<f64>), SolveError> {
    let (rows, cols) = matrix.shape();
    let square = if rows < cols {
        let mut padded = DMatrix::zeros(cols, cols);
        padded.view_mut((0, 0), (rows, cols)).copy_from(matrix);
        padded
    } else {
        matrix.clone()
    };
    let max_iterations = 100 * rows.max(cols).max(1);
    let svd = square
        .try_svd_unordered(false, true, f64::EPSILON, max_iterations)
        .ok_or(SolveError::SvdDidNotConverge { rows, cols })?;
    let v_t = svd.v_t.ok_or(SolveError::SvdDidNotConverge { rows, cols })?;
    let singular_values = svd.singular_values;

    let mut order: Vec<usize> = (0..singular_values.len()).collect();
    order.sort_by(|a, b| singular_values[*b].total_cmp(&singular_values[*a]));
    let values = order.iter().map(|idx| singular_values[*idx]).collect();
    let sorted = DMatrix::from_fn(order.len(), cols, |row, col| v_t[(order[row], col)]);
    Ok((values, sorted))
}

/// Scale every row to unit length and flip it so its largest entry is positive.
pub(crate) fn normalize_rows(mut matrix: DMatrix<f64>) -> DMatrix<f64> {
    for mut row in matrix.row_iter_mut() {
        let norm = row.norm();
        if norm == 0.0 {
            continue;
        }
        row /= norm;
        let pivot = row.iter().fold(0.0_f64, |pivot, value| {
            if value.abs() > pivot.abs() {
                *value
            } else {
                pivot
            }
        });
        if pivot < 0.0 {
            row.neg_mut();
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::builder::Builder;
    use crate::element::{BilinearMaterial, CrossSection, Element};
    use crate::geometry::{line, point};
    use crate::node::Support;

    fn cable_pair() -> Truss {
        let section = CrossSection::new(1.0e-4, 0.0);
        let steel = BilinearMaterial::symmetric(200.0e9, 355.0e6);
        let elements = vec![
            Element::cable(line(point(-2.0, 0.0, 0.0), point(0.0, 0.0, 0.0)), section, steel),
            Element::cable(line(point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0)), section, steel),
        ];
        let supports = [
            Support::pinned(point(-2.0, 0.0, 0.0)),
            Support::pinned(point(2.0, 0.0, 0.0)),
        ];
        Builder::new()
            .build(elements, None, &supports)
            .expect("valid geometry")
    }

    #[test]
    fn collinear_cables_have_one_self_stress_and_two_mechanisms() {
        let result = Svd::solve(&cable_pair(), Svd::DEFAULT_RTOL).expect("factorization");
        assert_eq!((result.r, result.s, result.m), (1, 1, 2));
        assert_relative_eq!(result.sr[0], 2.0_f64.sqrt(), epsilon = 1.0e-12);
        assert_relative_eq!(result.vs_t[(0, 0)], 0.5_f64.sqrt(), epsilon = 1.0e-12);
        assert_relative_eq!(result.vs_t[(0, 1)], 0.5_f64.sqrt(), epsilon = 1.0e-12);
        assert_eq!(result.um_t.shape(), (2, 3));
        for row in result.um_t.row_iter() {
            assert_relative_eq!(row[0], 0.0, epsilon = 1.0e-12);
        }
        assert_eq!(result.ur_t.shape(), (1, 3));
        assert_relative_eq!(result.ur_t[(0, 0)].abs(), 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn structure_without_free_dofs_is_fully_self_stressed() {
        let section = CrossSection::new(1.0e-4, 0.0);
        let steel = BilinearMaterial::symmetric(200.0e9, 355.0e6);
        let elements = vec![Element::bar(
            line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
            section,
            steel,
        )];
        let supports = [
            Support::pinned(point(0.0, 0.0, 0.0)),
            Support::pinned(point(1.0, 0.0, 0.0)),
        ];
        let truss = Builder::new()
            .build(elements, None, &supports)
            .expect("valid geometry");
        let result = Svd::solve(&truss, Svd::DEFAULT_RTOL).expect("factorization");
        assert_eq!((result.r, result.s, result.m), (0, 1, 0));
        assert_eq!(result.vs_t, DMatrix::identity(1, 1));
    }

    #[test]
    fn rows_are_normalized_with_a_positive_pivot() {
        let matrix = DMatrix::from_row_slice(2, 3, &[0.0, -3.0, 1.0, 0.0, 0.0, 0.0]);
        let normalized = normalize_rows(matrix);
        assert_relative_eq!(normalized.row(0).norm(), 1.0, epsilon = 1.0e-12);
        assert!(normalized[(0, 1)] > 0.0);
        assert!(normalized[(0, 2)] < 0.0);
        assert_eq!(normalized.row(1).norm(), 0.0);
    }

    #[test]
    fn right_basis_is_complete_for_wide_matrices() {
        let matrix = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 2.0]);
        let (values, v_t) = right_basis(&matrix).expect("factorization");
        assert_eq!(values.len(), 3);
        assert_relative_eq!(values[0], 3.0, epsilon = 1.0e-12);
        assert_relative_eq!(&v_t * v_t.transpose(), DMatrix::identity(3, 3), epsilon = 1.0e-12);
    }
}
