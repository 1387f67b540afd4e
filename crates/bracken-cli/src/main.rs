#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod logging;

use std::path::PathBuf;

use bracken_core::{Bundle, CssLoader};
use clap::Parser;
use miette::{IntoDiagnostic, Result};

#[derive(Parser, Debug)]
#[command(name = "bracken")]
#[command(author, version, about = "Bundle a JavaScript entry file and its imports into one script", long_about = None)]
struct Cli {
    /// Entry file to bundle
    #[arg(default_value = "./index.js")]
    entry: String,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the working directory
    #[arg(long, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Register the CSS loader for .css imports and write the rewritten
    /// stylesheet to this path
    #[arg(long, value_name = "PATH")]
    css_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = match cli.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().into_diagnostic()?,
    };

    let mut bundle = Bundle::new(cwd);
    if let Some(css_out) = &cli.css_out {
        bundle.add_loader("css", Box::new(CssLoader::new(css_out)));
    }

    match bundle.bundle(&cli.entry) {
        Ok(code) => {
            print!("{code}");
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
