use anyhow::{Context, Result};
use serde::Serialize;
use tensegrix::{
    LinearDM, Modal, ModalReport, SelfStressModes, StructureInput, Svd, SvdReport, TrussReport,
};

/// Analyses to run besides dynamic relaxation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Singular value analysis of the input geometry.
    pub svd: bool,
    /// Linear displacement method on the input geometry.
    pub linear: bool,
    /// Number of modes of the equilibrium state.
    pub modal_modes: Option<usize>,
}

/// Everything computed for one structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    /// Nonlinear equilibrium found by dynamic relaxation.
    pub equilibrium: TrussReport,
    /// Linear displacement method result.
    pub linear: Option<TrussReport>,
    /// Self-stress modes and mechanisms.
    pub svd: Option<SvdReport>,
    /// Natural modes around the equilibrium.
    pub modal: Option<ModalReport>,
}

/// Build the structure, find its equilibrium and run the requested analyses.
pub fn run_analysis(input: &StructureInput, request: &AnalysisRequest) -> Result<AnalysisOutcome> {
    let mut truss = input.build().context("failed to build the structure")?;
    let loads = input.load_vector(&mut truss);
    let free_length_deltas = input.free_length_vector(&truss);

    let mut solver = input.settings.dynamic_relaxation.clone();
    let unloaded = loads.iter().all(|load| *load == 0.0)
        && free_length_deltas.iter().all(|delta| *delta == 0.0)
        && truss.tensions().iter().all(|tension| *tension == 0.0);
    let (solved, equilibrium) = if unloaded {
        // Nothing moves an unstressed, unloaded structure.
        log::info!("no load and no prestress; dynamic relaxation skipped");
        let mut report = TrussReport::new(&truss, &truss);
        report.is_in_equilibrium = truss.satisfies_tolerance(solver.rtol, solver.atol);
        (truss.clone(), report)
    } else {
        let solved = solver
            .solve(&truss, &loads, &free_length_deltas)
            .context("dynamic relaxation failed")?;
        let report = TrussReport::new(&truss, &solved).with_counters(&solver);
        (solved, report)
    };

    let linear = if request.linear {
        let result = LinearDM::solve(&truss, &loads, &free_length_deltas)
            .context("linear displacement method failed")?;
        Some(TrussReport::new(&truss, &result))
    } else {
        None
    };

    let svd = if request.svd {
        let result = Svd::solve(&truss, input.settings.svd_rtol)
            .context("singular value analysis failed")?;
        let report = SvdReport::from(&result);
        if result.s > 0 {
            let localized =
                SelfStressModes::localize(&truss, &result.vs_t, input.settings.localize_atol)
                    .context("self-stress localization failed")?;
            Some(report.with_localized(&localized))
        } else {
            Some(report)
        }
    } else {
        None
    };

    let modal = match request.modal_modes {
        Some(modes) => {
            let result = Modal::solve(
                &solved,
                input.settings.mass_matrix,
                modes,
                &input.settings.point_masses,
            )
            .context("modal analysis failed")?;
            Some(ModalReport::from(&result))
        }
        None => None,
    };

    Ok(AnalysisOutcome {
        equilibrium,
        linear,
        svd,
        modal,
    })
}
