use std::fmt::Write;

use tensegrix::TrussReport;

use crate::analysis::AnalysisOutcome;

/// Render a textual summary of the analyses.
#[must_use]
pub fn render_summary(outcome: &AnalysisOutcome) -> String {
    let mut output = String::new();

    render_truss(&mut output, "Equilibrium (dynamic relaxation)", &outcome.equilibrium);
    if let (Some(steps), Some(resets)) = (
        outcome.equilibrium.n_time_step,
        outcome.equilibrium.n_ke_reset,
    ) {
        writeln!(&mut output, "  {steps} time steps, {resets} kinetic energy resets")
            .expect("writing to string cannot fail");
    }

    if let Some(linear) = &outcome.linear {
        render_truss(&mut output, "Linear displacement method", linear);
    }

    if let Some(svd) = &outcome.svd {
        writeln!(
            &mut output,
            "\nEquilibrium matrix: rank {}, {} self-stress mode(s), {} mechanism(s)",
            svd.r, svd.s, svd.m
        )
        .expect("writing to string cannot fail");
        let modes = svd.localized_vs_t.as_ref().unwrap_or(&svd.vs_t);
        for (idx, mode) in modes.iter().enumerate() {
            let entries: Vec<String> = mode.iter().map(|value| format!("{value:+.4}")).collect();
            writeln!(&mut output, "  mode {idx}: [{}]", entries.join(", "))
                .expect("writing to string cannot fail");
        }
    }

    if let Some(modal) = &outcome.modal {
        writeln!(
            &mut output,
            "\nModal analysis (total mass {:.3} kg)",
            modal.total_mass
        )
        .expect("writing to string cannot fail");
        for (idx, frequency) in modal.frequencies.iter().enumerate() {
            writeln!(&mut output, "  mode {idx}: {frequency:.4} Hz")
                .expect("writing to string cannot fail");
        }
    }

    output
}

/// Append the node and element tables of one analysis under `title`.
fn render_truss(output: &mut String, title: &str, report: &TrussReport) {
    let status = if report.is_in_equilibrium {
        "in equilibrium"
    } else {
        "NOT in equilibrium"
    };
    writeln!(
        output,
        "{title}: {status}, largest residual {:.3e} N",
        report.max_residual
    )
    .expect("writing to string cannot fail");
    for node in &report.nodes {
        writeln!(
            output,
            "  node {}: u = ({:+.4e}, {:+.4e}, {:+.4e}) m, reaction = ({:+.2}, {:+.2}, {:+.2}) N",
            node.idx,
            node.displacement[0],
            node.displacement[1],
            node.displacement[2],
            node.reactions[0],
            node.reactions[1],
            node.reactions[2]
        )
        .expect("writing to string cannot fail");
    }
    for element in &report.elements {
        writeln!(
            output,
            "  element {} ({:?}, nodes {} -> {}): T = {:+.2} N, utilization {:.3}",
            element.idx,
            element.kind,
            element.end_nodes[0],
            element.end_nodes[1],
            element.tension,
            element.utilization
        )
        .expect("writing to string cannot fail");
    }
    for warning in &report.warnings {
        writeln!(output, "  warning: {warning}").expect("writing to string cannot fail");
    }
}
