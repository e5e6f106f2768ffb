//! `tfm schema` command - XML Schema inspection

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::forms::schema::root_element_names;

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// List the elements a schema declares at top level (candidate form roots)
    Roots(RootsArgs),
}

#[derive(clap::Args, Debug)]
pub struct RootsArgs {
    /// Path to the XML Schema (.xsd)
    pub file: PathBuf,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SchemaCommands::Roots(args) => run_roots(args, global),
    }
}

fn run_roots(args: RootsArgs, global: &GlobalOpts) -> Result<()> {
    let content = std::fs::read(&args.file).into_diagnostic()?;
    let names = root_element_names(&content, args.file.parent())
        .map_err(|e| miette::miette!("unable to parse {}: {}", args.file.display(), e))?;

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&names).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&names).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => {
            for name in &names {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
