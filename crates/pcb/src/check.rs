use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use pcb_pack::{
    does_component_violate_bounds, does_component_violate_bounds_outline, find_overlaps,
    PackOutput,
};
use std::fs;
use std::path::PathBuf;

use crate::pack::read_input;

#[derive(Args, Debug)]
#[command(about = "Check a packed result for clearance and bounds violations")]
pub struct CheckArgs {
    /// Packed output JSON
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Pack input the result came from; supplies gap, obstacles and bounds
    #[arg(short, long, value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Minimum clearance (overrides the input's)
    #[arg(long)]
    pub min_gap: Option<f64>,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let content = fs::read_to_string(&args.output)
        .with_context(|| format!("Failed to read {}", args.output.display()))?;
    let output: PackOutput = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse packed output {}", args.output.display()))?;

    let input = args.input.as_deref().map(read_input).transpose()?;
    let min_gap = args
        .min_gap
        .or(input.as_ref().map(|i| i.min_gap))
        .unwrap_or(0.0);
    let obstacles = input.as_ref().map(|i| i.obstacles.clone()).unwrap_or_default();

    let mut violations: Vec<String> = find_overlaps(&output.components, &obstacles, min_gap)
        .into_iter()
        .map(|overlap| overlap.to_string())
        .collect();

    if let Some(input) = &input {
        for component in &output.components {
            let outside = input
                .bounds
                .is_some_and(|b| does_component_violate_bounds(component, &b, min_gap))
                || input.bounds_outline.as_deref().is_some_and(|outline| {
                    does_component_violate_bounds_outline(component, outline, min_gap)
                });
            if outside {
                violations.push(format!("{} is outside the bounds", component.component_id));
            }
        }
    }

    if violations.is_empty() {
        println!(
            "{} {} components, no violations (min gap {min_gap})",
            "✓".green(),
            output.components.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("{} {violation}", "✗".red());
    }
    bail!("{} violations found", violations.len())
}
