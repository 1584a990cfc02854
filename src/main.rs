mod analysis;
mod cli;
mod report;

use std::fs;

use analysis::run_analysis;
use anyhow::{Context, Result};
use report::render_summary;
use tensegrix::StructureInput;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = cli::parse();
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let input = StructureInput::from_json(&text)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;

    let outcome = run_analysis(&input, &cli.request())?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render_summary(&outcome));
    }

    Ok(())
}
