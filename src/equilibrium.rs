//! Equilibrium and stiffness matrices shared by the solvers.
//!
//! Global degrees of freedom are numbered `3 * node + axis`; the free ones keep
//! that order once the fixed ones are removed.

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, Vector3};

use crate::element::Element;
use crate::truss::Truss;

/// Row of every global DOF in the free-DOF system, `None` for fixed DOFs.
pub(crate) fn free_dof_rows(truss: &Truss) -> Vec<Option<usize>> {
    let mut rows = vec![None; 3 * truss.node_count()];
    for (row, dof) in truss.free_dofs().into_iter().enumerate() {
        rows[dof] = Some(row);
    }
    rows
}

/// Equilibrium matrix mapping element tensions to resisting forces on the free DOFs.
///
/// Column `e` holds `-u` at the free DOFs of the start node and `+u` at the free
/// DOFs of the end node, `u` being the unit vector from start to end.
///
/// # Examples
///
/// ```
/// use tensegrix::{equilibrium_matrix, line, point, BilinearMaterial, Builder, CrossSection, Element, Support};
///
/// let section = CrossSection::new(1.0e-4, 0.0);
/// let steel = BilinearMaterial::symmetric(200.0e9, 355.0e6);
/// let elements = vec![
///     Element::cable(line(point(-2.0, 0.0, 0.0), point(0.0, 0.0, 0.0)), section, steel),
///     Element::cable(line(point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0)), section, steel),
/// ];
/// let supports = [Support::pinned(point(-2.0, 0.0, 0.0)), Support::pinned(point(2.0, 0.0, 0.0))];
/// let truss = Builder::new().build(elements, None, &supports).expect("valid geometry");
/// let a = equilibrium_matrix(&truss);
/// assert_eq!(a.shape(), (3, 2));
/// assert_eq!((a[(0, 0)], a[(0, 1)]), (1.0, -1.0));
/// ```
#[must_use]
pub fn equilibrium_matrix(truss: &Truss) -> DMatrix<f64> {
    let rows = free_dof_rows(truss);
    let mut matrix = DMatrix::zeros(truss.free_dof_count(), truss.element_count());
    for element in truss.elements() {
        let Some(direction) = element.direction() else {
            continue;
        };
        let [start, end] = element.end_nodes;
        for axis in 0..3 {
            if let Some(row) = rows[3 * start + axis] {
                matrix[(row, element.idx)] -= direction[axis];
            }
            if let Some(row) = rows[3 * end + axis] {
                matrix[(row, element.idx)] += direction[axis];
            }
        }
    }
    matrix
}

/// Stiffness of a single element in global coordinates.
///
/// `axial` acts along `direction`, `geometric` across it. DOFs are ordered
/// `[start x, start y, start z, end x, end y, end z]`.
pub(crate) fn element_stiffness(
    direction: &Vector3<f64>,
    axial: f64,
    geometric: f64,
) -> SMatrix<f64, 6, 6> {
    let outer = direction * direction.transpose();
    let block: Matrix3<f64> = axial * outer + geometric * (Matrix3::identity() - outer);
    let mut local = SMatrix::<f64, 6, 6>::zeros();
    local.fixed_view_mut::<3, 3>(0, 0).copy_from(&block);
    local.fixed_view_mut::<3, 3>(3, 3).copy_from(&block);
    local.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-block));
    local.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-block));
    local
}

/// Global DOFs touched by an element, in [`element_stiffness`] order.
pub(crate) fn element_dofs(element: &Element) -> [usize; 6] {
    let [start, end] = element.end_nodes;
    [
        3 * start,
        3 * start + 1,
        3 * start + 2,
        3 * end,
        3 * end + 1,
        3 * end + 2,
    ]
}

/// Assemble the `3n x 3n` stiffness matrix.
///
/// `coefficients` returns the axial and geometric stiffness of each element.
pub(crate) fn assemble_stiffness<F>(truss: &Truss, mut coefficients: F) -> DMatrix<f64>
where
    F: FnMut(&Element) -> (f64, f64),
{
    let dof = 3 * truss.node_count();
    let mut matrix = DMatrix::zeros(dof, dof);
    for element in truss.elements() {
        let Some(direction) = element.direction() else {
            continue;
        };
        let (axial, geometric) = coefficients(element);
        let local = element_stiffness(&direction, axial, geometric);
        let dof_map = element_dofs(element);
        for (row_local, global_row) in dof_map.iter().enumerate() {
            for (col_local, global_col) in dof_map.iter().enumerate() {
                matrix[(*global_row, *global_col)] += local[(row_local, col_local)];
            }
        }
    }
    matrix
}

/// Tangent stiffness at the current state: working-branch material stiffness
/// plus the geometric stiffness `T / L` of the current tensions.
pub(crate) fn tangent_stiffness(truss: &Truss) -> DMatrix<f64> {
    assemble_stiffness(truss, |element| {
        (
            element.working_axial_stiffness(),
            element.tension / element.length(),
        )
    })
}

/// Upper bound of each row of the free-DOF stiffness by Gershgorin's theorem.
///
/// Element contributions are summed in absolute value, using the stiffer
/// material branch and the magnitude of the geometric stiffness so that
/// slack and compressed members still contribute.
pub(crate) fn gershgorin_row_sums(truss: &Truss, rows: &[Option<usize>]) -> Vec<f64> {
    let mut sums = vec![0.0; truss.free_dof_count()];
    for element in truss.elements() {
        let Some(direction) = element.direction() else {
            continue;
        };
        let local = element_stiffness(
            &direction,
            element.max_axial_stiffness(),
            element.tension.abs() / element.length(),
        );
        let dof_map = element_dofs(element);
        for (row_local, global_row) in dof_map.iter().enumerate() {
            let Some(row) = rows[*global_row] else {
                continue;
            };
            sums[row] += dof_map
                .iter()
                .enumerate()
                .filter(|(col_local, global_col)| {
                    col_local / 3 == row_local / 3 || rows[**global_col].is_some()
                })
                .map(|(col_local, _)| local[(row_local, col_local)].abs())
                .sum::<f64>();
        }
    }
    sums
}

/// Restrict a square matrix to the given DOFs.
pub(crate) fn reduce_matrix(matrix: &DMatrix<f64>, dofs: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(dofs.len(), dofs.len(), |row, col| {
        matrix[(dofs[row], dofs[col])]
    })
}

/// Restrict a vector to the given DOFs.
pub(crate) fn reduce_vector(vector: &DVector<f64>, dofs: &[usize]) -> DVector<f64> {
    DVector::from_fn(dofs.len(), |row, _| vector[dofs[row]])
}
