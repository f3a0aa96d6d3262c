use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod check;
mod pack;

#[derive(Parser)]
#[command(name = "pcb")]
#[command(about = "Footprint packing for PCB layouts", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack component footprints
    #[command(alias = "p")]
    Pack(pack::PackArgs),

    /// Check a packed result for overlaps and bounds violations
    #[command(alias = "c")]
    Check(check::CheckArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug, RUST_LOG wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Pack(args) => pack::execute(args),
        Commands::Check(args) => check::execute(args),
    }
}
