//! `tfm workflow` command - workflows offered as a form's default workflow

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{discover_project, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, WorkflowCatalog};

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List available workflow definitions
    List,
}

pub fn run(cmd: WorkflowCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WorkflowCommands::List => run_list(global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    // Workflows can be listed outside a project (global config or built-ins)
    let config = match discover_project(global) {
        Ok(project) => Config::load_for(Some(&project)),
        Err(_) => Config::load_for(None),
    };
    let catalog = WorkflowCatalog::from_config(&config.workflows);
    let definitions = catalog.definitions();

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(definitions).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(definitions).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for def in definitions {
                println!("{}", def.name);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Name", "Title", "Description"]);
            for def in definitions {
                builder.push_record([
                    def.name.as_str(),
                    def.title.as_str(),
                    def.description.as_deref().unwrap_or("-"),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto | OutputFormat::Tsv => {
            println!(
                "{:<24} {:<24} {}",
                style("NAME").bold(),
                style("TITLE").bold(),
                style("DESCRIPTION").bold()
            );
            println!("{}", "-".repeat(80));
            for def in definitions {
                println!(
                    "{:<24} {:<24} {}",
                    style(truncate_str(&def.name, 22)).cyan(),
                    truncate_str(&def.title, 22),
                    def.description.as_deref().unwrap_or("-")
                );
            }
            if !global.quiet {
                println!();
                println!("{} workflow(s) available.", style(definitions.len()).cyan());
            }
        }
    }

    Ok(())
}
