use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pcb_pack::{pack, PackInput, PackOrderStrategy, PackOutput, PackPlacementStrategy};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
#[command(about = "Pack component footprints described by a JSON input file")]
pub struct PackArgs {
    /// Pack input JSON
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the packed JSON (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Minimum clearance between footprints
    #[arg(long)]
    pub min_gap: Option<f64>,

    /// Order in which components are placed
    #[arg(long, value_enum)]
    pub order: Option<Order>,

    /// Objective each placement minimizes
    #[arg(long, value_enum)]
    pub objective: Option<Objective>,

    /// Step budget for the whole run
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Order {
    /// Largest footprint first
    LargestToSmallest,
    /// Smallest footprint first
    SmallestToLargest,
    /// As listed in the input
    InputOrder,
}

impl From<Order> for PackOrderStrategy {
    fn from(order: Order) -> Self {
        match order {
            Order::LargestToSmallest => PackOrderStrategy::LargestToSmallest,
            Order::SmallestToLargest => PackOrderStrategy::SmallestToLargest,
            Order::InputOrder => PackOrderStrategy::InputOrder,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Objective {
    /// Sum of distances between connected pads
    SumDistance,
    /// Sum of squared distances between connected pads
    SumSquaredDistance,
    /// Shortest connection per network
    ShortestConnection,
}

impl From<Objective> for PackPlacementStrategy {
    fn from(objective: Objective) -> Self {
        match objective {
            Objective::SumDistance => PackPlacementStrategy::MinimumSumDistanceToNetwork,
            Objective::SumSquaredDistance => {
                PackPlacementStrategy::MinimumSumSquaredDistanceToNetwork
            }
            Objective::ShortestConnection => {
                PackPlacementStrategy::ShortestConnectionAlongOutline
            }
        }
    }
}

pub fn read_input(path: &Path) -> Result<PackInput> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pack input {}", path.display()))
}

fn apply_overrides(mut input: PackInput, args: &PackArgs) -> PackInput {
    if let Some(min_gap) = args.min_gap {
        input = input.with_min_gap(min_gap);
    }
    if let Some(order) = args.order {
        input = input.with_order_strategy(order.into());
    }
    if let Some(objective) = args.objective {
        input = input.with_placement_strategy(objective.into());
    }
    if let Some(max_iterations) = args.max_iterations {
        input = input.with_max_iterations(max_iterations);
    }
    input
}

fn write_output(output: &PackOutput, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    match path {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

pub fn execute(args: PackArgs) -> Result<()> {
    let input = apply_overrides(read_input(&args.input)?, &args);
    let count = input.components.len();
    log::debug!(
        "packing {} components from {}",
        count,
        args.input.display()
    );

    let output = pack(input)
        .with_context(|| format!("Failed to pack {}", args.input.display()))?;

    write_output(&output, args.output.as_deref())?;

    if let Some(path) = &args.output {
        eprintln!(
            "{} Packed {} components into {}",
            "✓".green(),
            count,
            path.display().to_string().bold()
        );
    }
    Ok(())
}
