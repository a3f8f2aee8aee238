use clap::Parser;
use miette::Result;
use recolour::cli::{Cli, Commands};
use recolour::output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let printer = Printer::new();

    match cli.command {
        Commands::Apply(args) => recolour::cli::apply::run(args, &printer)?,
        Commands::Watch(args) => recolour::cli::watch::run(args, &printer)?,
        Commands::Pick(args) => recolour::cli::pick::run(args, &printer)?,
        Commands::Init(args) => recolour::cli::init::run(args, &printer)?,
        Commands::Completions(args) => recolour::cli::completions::run(args)?,
    }

    Ok(())
}
