//! `tfm engine` command - rendering engines available to templates

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::forms::engine::RenderingEngineRegistry;

#[derive(Subcommand, Debug)]
pub enum EngineCommands {
    /// List rendering engines and the template extensions they accept
    List,
}

pub fn run(cmd: EngineCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EngineCommands::List => run_list(global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let registry = RenderingEngineRegistry::default();
    let engines = registry.engines();

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(engines).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(engines).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for engine in engines {
                println!("{}", engine.name);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Engine", "Extensions"]);
            for engine in engines {
                builder.push_record([engine.name.to_string(), engine.extensions.join(", ")]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto | OutputFormat::Tsv => {
            println!("{:<12} {}", style("ENGINE").bold(), style("EXTENSIONS").bold());
            for engine in engines {
                println!(
                    "{:<12} {}",
                    style(engine.name).cyan(),
                    engine
                        .extensions
                        .iter()
                        .map(|ext| format!(".{}", ext))
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
        }
    }

    Ok(())
}
