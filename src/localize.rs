//! Rotation of a self-stress basis into modes supported by as few elements as possible.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};

use crate::errors::SolveError;
use crate::svd::{normalize_rows, right_basis};
use crate::truss::Truss;

/// Columns of the remaining subspace shorter than this cannot carry a mode.
const CANDIDATE_THRESHOLD: f64 = 1.0e-10;
/// Reweighting iterations per candidate.
const MAX_REWEIGHTINGS: usize = 50;
/// Smallest regularization of the reweighting.
const MIN_SMOOTHING: f64 = 1.0e-10;
/// Stop reweighting once no entry moves more than this.
const REWEIGHT_TOLERANCE: f64 = 1.0e-12;
/// Relative tolerance under which two L1 norms are considered equal.
const L1_TIE_TOLERANCE: f64 = 1.0e-9;

/// Sparse self-stress modes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfStressModes;

/// A localized mode and its ranking.
struct Candidate {
    /// Element whose entry was pinned to one.
    element: usize,
    /// Unit mode, not yet clamped.
    mode: DVector<f64>,
    /// Entries above the clamping tolerance.
    nonzeros: usize,
    /// L1 norm of the unit mode.
    l1: f64,
}

impl Candidate {
    /// Order by sparsity, then L1 norm, then element index.
    fn ranking(&self, other: &Self) -> Ordering {
        self.nonzeros.cmp(&other.nonzeros).then_with(|| {
            let scale = self.l1.max(other.l1).max(1.0);
            if (self.l1 - other.l1).abs() <= L1_TIE_TOLERANCE * scale {
                self.element.cmp(&other.element)
            } else {
                self.l1.total_cmp(&other.l1)
            }
        })
    }
}

impl SelfStressModes {
    /// Rotate the rows of `vs_t` (`s x elements`) into a basis of the same
    /// subspace whose rows have as few entries above `atol` as possible.
    ///
    /// Modes are extracted one at a time. Each one minimizes the L1 norm
    /// within the remaining subspace with one element forced to unit tension,
    /// trying every element and keeping the sparsest outcome. Entries below
    /// `atol` are set to exactly zero before the mode is renormalized, and the
    /// remaining subspace is deflated against the mode.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::ShapeMismatch`] when `vs_t` does not have one
    /// column per element and [`SolveError::SvdDidNotConverge`] when a
    /// deflation fails.
    pub fn localize(
        truss: &Truss,
        vs_t: &DMatrix<f64>,
        atol: f64,
    ) -> Result<DMatrix<f64>, SolveError> {
        let elements = truss.element_count();
        if vs_t.ncols() != elements {
            return Err(SolveError::ShapeMismatch {
                expected: elements,
                found: vs_t.ncols(),
            });
        }
        let modes = vs_t.nrows();
        let mut localized = DMatrix::zeros(modes, elements);
        if modes == 0 {
            return Ok(localized);
        }

        // Orthonormal basis of the input rows.
        let (_, basis) = right_basis(vs_t)?;
        let mut subspace = basis.rows(0, modes).into_owned();

        for row in 0..modes {
            let Some(best) = (0..elements)
                .filter(|&element| subspace.column(element).norm() > CANDIDATE_THRESHOLD)
                .filter_map(|element| sparsest_with_unit_entry(&subspace, element, atol))
                .min_by(Candidate::ranking)
            else {
                break;
            };
            log::debug!(
                "mode {row}: {} element(s), seeded by element {}",
                best.nonzeros,
                best.element
            );

            let clamped = best.mode.map(|value| if value.abs() < atol { 0.0 } else { value });
            localized.set_row(row, &clamped.transpose());

            if row + 1 < modes {
                let deflated = &subspace - (&subspace * &best.mode) * best.mode.transpose();
                let (_, basis) = right_basis(&deflated)?;
                subspace = basis.rows(0, subspace.nrows() - 1).into_owned();
            }
        }

        Ok(normalize_rows(localized))
    }
}

/// Unit mode of `subspace` with the smallest L1 norm among those with a
/// non-zero tension in `element`.
///
/// The L1 problem is approached by iteratively reweighted least squares: each
/// pass minimizes `sum(x_i^2 / |x_i|)` with the previous iterate, which keeps
/// every step a small symmetric positive definite solve.
fn sparsest_with_unit_entry(
    subspace: &DMatrix<f64>,
    element: usize,
    atol: f64,
) -> Option<Candidate> {
    let target: DVector<f64> = subspace.column(element).into_owned();
    let mut coefficients = &target / target.norm_squared();
    let mut mode = subspace.tr_mul(&coefficients);

    for pass in 0..MAX_REWEIGHTINGS {
        let smoothing = 0.1_f64.powi(pass as i32 + 1).max(MIN_SMOOTHING);
        let weights = mode.map(|value| 1.0 / value.abs().max(smoothing));
        let gram = subspace * DMatrix::from_diagonal(&weights) * subspace.transpose();
        let Some(solution) = gram
            .clone()
            .cholesky()
            .map(|factor| factor.solve(&target))
            .or_else(|| gram.lu().solve(&target))
        else {
            break;
        };
        let scale = target.dot(&solution);
        if scale == 0.0 || !scale.is_finite() {
            break;
        }
        coefficients = solution / scale;
        let next = subspace.tr_mul(&coefficients);
        let change = (&next - &mode).amax();
        mode = next;
        if change < REWEIGHT_TOLERANCE {
            break;
        }
    }

    let norm = mode.norm();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    mode /= norm;
    let nonzeros = mode.iter().filter(|value| value.abs() > atol).count();
    let l1 = mode.lp_norm(1);
    Some(Candidate {
        element,
        mode,
        nonzeros,
        l1,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::builder::Builder;
    use crate::element::{BilinearMaterial, CrossSection, Element};
    use crate::geometry::{line, point};
    use crate::node::Support;
    use crate::svd::Svd;

    /// Two independent pairs of collinear cables, one self-stress mode each.
    fn double_cable_pair() -> Truss {
        let section = CrossSection::new(1.0e-4, 0.0);
        let steel = BilinearMaterial::symmetric(200.0e9, 355.0e6);
        let mut elements = Vec::new();
        let mut supports = Vec::new();
        for y in [0.0, 5.0] {
            elements.push(Element::cable(
                line(point(-2.0, y, 0.0), point(0.0, y, 0.0)),
                section,
                steel,
            ));
            elements.push(Element::cable(
                line(point(0.0, y, 0.0), point(2.0, y, 0.0)),
                section,
                steel,
            ));
            supports.push(Support::pinned(point(-2.0, y, 0.0)));
            supports.push(Support::pinned(point(2.0, y, 0.0)));
        }
        Builder::new()
            .build(elements, None, &supports)
            .expect("valid geometry")
    }

    fn smeared_modes() -> DMatrix<f64> {
        let half = 0.5_f64.sqrt();
        let (sin, cos) = 30.0_f64.to_radians().sin_cos();
        let rotation = DMatrix::from_row_slice(2, 2, &[cos, -sin, sin, cos]);
        let pure = DMatrix::from_row_slice(2, 4, &[half, half, 0.0, 0.0, 0.0, 0.0, half, half]);
        rotation * pure
    }

    fn count_nonzeros(matrix: &DMatrix<f64>, row: usize, atol: f64) -> usize {
        matrix.row(row).iter().filter(|value| value.abs() > atol).count()
    }

    #[test]
    fn smeared_modes_are_split_per_cable_pair() {
        let truss = double_cable_pair();
        let smeared = smeared_modes();
        assert_eq!(count_nonzeros(&smeared, 0, 1.0e-6), 4);

        let localized = SelfStressModes::localize(&truss, &smeared, 1.0e-6).expect("localizes");
        assert_eq!(localized.shape(), (2, 4));
        let half = 0.5_f64.sqrt();
        for row in 0..2 {
            assert_eq!(count_nonzeros(&localized, row, 1.0e-6), 2);
            assert_relative_eq!(localized.row(row).norm(), 1.0, epsilon = 1.0e-9);
        }
        let first_pair = if localized[(0, 0)] != 0.0 { 0 } else { 1 };
        assert_relative_eq!(localized[(first_pair, 0)], half, epsilon = 1.0e-6);
        assert_relative_eq!(localized[(first_pair, 1)], half, epsilon = 1.0e-6);
        assert_eq!(localized[(first_pair, 2)], 0.0);
        assert_eq!(localized[(1 - first_pair, 0)], 0.0);
        assert_relative_eq!(localized[(1 - first_pair, 3)], half, epsilon = 1.0e-6);
    }

    #[test]
    fn localized_modes_stay_in_the_self_stress_subspace() {
        let truss = double_cable_pair();
        let svd = Svd::solve(&truss, Svd::DEFAULT_RTOL).expect("factorization");
        assert_eq!(svd.s, 2);
        let localized = SelfStressModes::localize(&truss, &svd.vs_t, 1.0e-6).expect("localizes");
        for row in localized.row_iter() {
            let mode = row.transpose();
            let projection = svd.vs_t.transpose() * (&svd.vs_t * &mode);
            assert_relative_eq!((mode - projection).norm(), 0.0, epsilon = 1.0e-6);
        }
        let overlap = &localized * localized.transpose();
        assert_relative_eq!(overlap, DMatrix::identity(2, 2), epsilon = 1.0e-6);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let truss = double_cable_pair();
        let smeared = smeared_modes();
        let first = SelfStressModes::localize(&truss, &smeared, 1.0e-6).expect("localizes");
        let second = SelfStressModes::localize(&truss, &smeared, 1.0e-6).expect("localizes");
        assert_eq!(first, second);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let truss = double_cable_pair();
        let wrong = DMatrix::zeros(1, 3);
        assert_eq!(
            SelfStressModes::localize(&truss, &wrong, 1.0e-6),
            Err(SolveError::ShapeMismatch {
                expected: 4,
                found: 3
            })
        );
    }
}
