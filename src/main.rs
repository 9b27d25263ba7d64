use std::fs;

use clap::Parser;
use eyre::{Context, Result};

mod cli;
mod output;

use cli::Cli;
use output::get_formatter;
use ypp::{Interpreter, Options};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_raw {
        let raw = fs::read_to_string(&cli.file)
            .with_context(|| format!("Failed to read {}", cli.file.display()))?;
        eprintln!("--- {} ---", cli.file.display());
        eprintln!("{raw}");
    }

    let mut interpreter = Interpreter::open_with(
        &cli.file,
        Options {
            source_dir: cli.source_dir.clone(),
            render: false,
        },
    )
    .with_context(|| format!("Failed to load {}", cli.file.display()))?;

    // The engine never recovers from a directive failure; this is the one
    // layer that catches it to report and set the exit code.
    let tree = match interpreter.tree() {
        Ok(tree) => tree.clone(),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let formatter = get_formatter(&cli.format);
    let rendered = formatter.format(&tree)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
