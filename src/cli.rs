use std::path::PathBuf;

use clap::Parser;

use crate::analysis::AnalysisRequest;

/// Equilibrium, self-stress and mechanism analysis of pin-jointed structures.
#[derive(Debug, Parser)]
#[command(name = "tensegrix", version, about)]
pub struct Cli {
    /// Structure description (JSON)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Classify self-stress modes and mechanisms
    #[arg(long)]
    pub svd: bool,

    /// Also run the linear displacement method
    #[arg(long)]
    pub linear: bool,

    /// Compute the N lowest natural modes of the equilibrium state
    #[arg(long, value_name = "N")]
    pub modal: Option<usize>,

    /// Print the results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Analyses requested on the command line.
    pub fn request(&self) -> AnalysisRequest {
        AnalysisRequest {
            svd: self.svd,
            linear: self.linear,
            modal_modes: self.modal,
        }
    }
}

/// Parse the process arguments, exiting with usage on error.
pub fn parse() -> Cli {
    Cli::parse()
}
