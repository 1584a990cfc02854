//! Nonlinear static equilibrium by dynamic relaxation with kinetic damping.

use serde::{Deserialize, Serialize};

use crate::equilibrium::{free_dof_rows, gershgorin_row_sums};
use crate::errors::SolveError;
use crate::truss::Truss;

/// Settings and counters of the dynamic relaxation solver.
///
/// The structure is moved by an explicit pseudo-dynamic time integration with
/// fictitious masses sized from the tangent stiffness. Whenever the kinetic
/// energy drops, the nodes are moved back to the estimated energy peak and
/// brought to rest, which drives the structure towards static equilibrium.
///
/// # Examples
///
/// ```
/// use tensegrix::{line, point, BilinearMaterial, Builder, CrossSection, DynamicRelaxation, Element, Support};
///
/// let element = Element::bar(
///     line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)),
///     CrossSection::new(1.0e-4, 1.0e-9),
///     BilinearMaterial::symmetric(200.0e9, 355.0e6),
/// );
/// let supports = [
///     Support::pinned(point(0.0, 0.0, 0.0)),
///     Support::new(point(1.0, 0.0, 0.0), [true, false, false]),
/// ];
/// let truss = Builder::new().build(vec![element], None, &supports).expect("valid geometry");
///
/// let mut solver = DynamicRelaxation::default();
/// let loads = [0.0, 0.0, 0.0, 1000.0, 0.0, 0.0];
/// let solved = solver.solve(&truss, &loads, &[0.0]).expect("consistent input");
/// assert!(solved.is_in_equilibrium());
/// assert!((solved.elements()[0].tension - 1000.0).abs() < 0.1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicRelaxation {
    /// Pseudo time step.
    pub dt: f64,
    /// Amplification of the fictitious masses; larger values are slower but safer.
    pub mass_ampl_factor: f64,
    /// Lower bound of each fictitious mass.
    pub min_mass: f64,
    /// Ceiling on the number of time steps.
    pub max_time_step: usize,
    /// Ceiling on the number of kinetic energy resets.
    pub max_ke_reset: usize,
    /// Residual tolerance relative to the applied load.
    pub rtol: f64,
    /// Absolute residual tolerance in newtons.
    pub atol: f64,
    /// Time steps taken by the last solve.
    pub n_time_step: usize,
    /// Kinetic energy resets performed by the last solve.
    pub n_ke_reset: usize,
}

impl Default for DynamicRelaxation {
    fn default() -> Self {
        Self {
            dt: 0.01,
            mass_ampl_factor: 1.0,
            min_mass: 0.005,
            max_time_step: 10_000,
            max_ke_reset: 1_000,
            rtol: 1.0e-4,
            atol: 1.0e-6,
            n_time_step: 0,
            n_ke_reset: 0,
        }
    }
}

impl DynamicRelaxation {
    /// Find the equilibrium of `truss` after adding `loads` (three components
    /// per node) and `free_length_deltas` (one per element).
    ///
    /// The input truss is left untouched; the deformed copy is returned. Failing
    /// to converge within the step or reset ceilings is not an error: it shows
    /// as [`Truss::is_in_equilibrium`] being `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError`] when the increments do not match the truss or
    /// produce a non-positive free length, and
    /// [`SolveError::NonPositiveSetting`] for a time step or mass setting that
    /// is not strictly positive.
    pub fn solve(
        &mut self,
        truss: &Truss,
        loads: &[f64],
        free_length_deltas: &[f64],
    ) -> Result<Truss, SolveError> {
        self.validate()?;
        self.n_time_step = 0;
        self.n_ke_reset = 0;

        let mut truss = truss.clone();
        truss.apply_increments(loads, free_length_deltas)?;
        truss.update_element_geometry();
        truss.update_equilibrium_fields();

        let unbalanced = truss.unbalanced_axes();
        if !unbalanced.is_empty() {
            truss.push_warning(format!(
                "net load along axis {unbalanced:?} cannot be balanced by any support; equilibrium was not searched"
            ));
            truss.set_in_equilibrium(false);
            return Ok(truss);
        }

        let free = truss.free_dofs();
        let rows = free_dof_rows(&truss);
        let mut velocity = vec![0.0; free.len()];
        let mut previous_energy = 0.0;
        let dt = self.dt;
        log::debug!(
            "dynamic relaxation on {} free DOFs (dt = {dt}, rtol = {}, atol = {})",
            free.len(),
            self.rtol,
            self.atol
        );

        let converged = loop {
            if truss.satisfies_tolerance(self.rtol, self.atol) {
                break true;
            }
            if self.n_time_step >= self.max_time_step {
                break false;
            }

            let residuals: Vec<f64> = free
                .iter()
                .map(|dof| truss.nodes()[dof / 3].residuals.axis(dof % 3))
                .collect();
            let masses: Vec<f64> = gershgorin_row_sums(&truss, &rows)
                .into_iter()
                .map(|sum| (self.mass_ampl_factor * sum * dt * dt / 2.0).max(self.min_mass))
                .collect();

            let mut energy = 0.0;
            for (i, dof) in free.iter().enumerate() {
                velocity[i] += residuals[i] / masses[i] * dt;
                *truss.nodes_mut()[dof / 3].coordinates.axis_mut(dof % 3) += velocity[i] * dt;
                energy += 0.5 * masses[i] * velocity[i].powi(2);
            }
            self.n_time_step += 1;

            if energy < previous_energy {
                // Back to the estimated kinetic energy peak, at rest.
                for (i, dof) in free.iter().enumerate() {
                    *truss.nodes_mut()[dof / 3].coordinates.axis_mut(dof % 3) +=
                        -1.5 * dt * velocity[i] + dt * dt / 2.0 * residuals[i] / masses[i];
                    velocity[i] = 0.0;
                }
                previous_energy = 0.0;
                self.n_ke_reset += 1;
            } else {
                previous_energy = energy;
            }

            truss.update_element_geometry();
            truss.update_equilibrium_fields();

            if self.n_ke_reset > self.max_ke_reset {
                break false;
            }
        };

        truss.set_in_equilibrium(converged);
        if converged {
            log::info!(
                "equilibrium reached after {} steps and {} energy resets",
                self.n_time_step,
                self.n_ke_reset
            );
        } else {
            truss.push_warning(format!(
                "dynamic relaxation stopped without equilibrium after {} steps and {} energy resets (largest residual {:e} N)",
                self.n_time_step,
                self.n_ke_reset,
                truss.max_residual()
            ));
        }
        Ok(truss)
    }

    /// Reject settings that would give zero or infinite fictitious masses.
    fn validate(&self) -> Result<(), SolveError> {
        for (setting, value) in [
            ("dt", self.dt),
            ("mass_ampl_factor", self.mass_ampl_factor),
            ("min_mass", self.min_mass),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SolveError::NonPositiveSetting { setting, value });
            }
        }
        Ok(())
    }
}
