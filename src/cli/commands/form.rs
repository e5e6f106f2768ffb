//! `tfm form` command - XML form registration and inspection

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_repository, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{FsRepository, Project, UploadedFile};
use crate::forms::registry::{find_form, list_forms, RegisteredForm};
use crate::forms::{CommittedForm, CreateFormWizard, FormSession, WizardServices};

#[derive(Subcommand, Debug)]
pub enum FormCommands {
    /// Register a new form from an XML Schema
    New(NewArgs),

    /// List registered forms
    List,

    /// Show a registered form with its templates
    Show(ShowArgs),
}

/// A template file and the rendition it produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSpec {
    pub path: PathBuf,
    pub rendition_pattern: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub engine: Option<String>,
    pub mimetype: Option<String>,
}

/// Parse `FILE[:PATTERN][,key=value...]`
///
/// Keys are `title`, `description`, `engine` and `mimetype`. A drive prefix
/// such as `C:\` belongs to the file path, not the pattern separator.
fn parse_template_spec(s: &str) -> std::result::Result<TemplateSpec, String> {
    let mut parts = s.split(',');
    let head = parts.next().unwrap_or_default();

    let drive_len = drive_prefix_len(head);
    let (path, pattern) = match head[drive_len..].split_once(':') {
        Some((rest, pattern)) => (&head[..drive_len + rest.len()], Some(pattern)),
        None => (head, None),
    };
    if path.is_empty() {
        return Err("template path is empty".to_string());
    }

    let mut spec = TemplateSpec {
        path: PathBuf::from(path),
        rendition_pattern: pattern.filter(|p| !p.is_empty()).map(String::from),
        ..TemplateSpec::default()
    };

    for option in parts {
        let (key, value) = option
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", option))?;
        let value = Some(value.to_string()).filter(|v| !v.trim().is_empty());
        match key.trim() {
            "title" => spec.title = value,
            "description" => spec.description = value,
            "engine" => spec.engine = value,
            "mimetype" => spec.mimetype = value,
            other => {
                return Err(format!(
                    "unknown template option '{}' (expected title, description, engine or mimetype)",
                    other
                ))
            }
        }
    }

    Ok(spec)
}

/// Length of a Windows drive prefix (`C:\` or `C:/`), or 0
fn drive_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let is_drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    if is_drive {
        2
    } else {
        0
    }
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// XML Schema (.xsd) describing the form's instance documents
    #[arg(long, short = 's', required_unless_present = "interactive")]
    pub schema: Option<PathBuf>,

    /// Form name (default: schema file name without extension)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Form title (default: schema file name without extension)
    #[arg(long)]
    pub title: Option<String>,

    /// Form description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Root element of instance documents (default: first element the schema declares)
    #[arg(long, short = 'r')]
    pub root_element: Option<String>,

    /// Output path pattern for form instance data
    #[arg(long, short = 'o')]
    pub output_path: Option<String>,

    /// Default workflow name (see `tfm workflow list`)
    #[arg(long, short = 'w')]
    pub workflow: Option<String>,

    /// Rendering engine template with optional rendition settings, repeatable:
    /// FILE[:PATTERN][,title=..][,description=..][,engine=..][,mimetype=..]
    #[arg(long = "template", short = 't', value_parser = parse_template_spec)]
    pub templates: Vec<TemplateSpec>,

    /// Walk through the wizard interactively
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Form name
    pub name: String,
}

pub fn run(cmd: FormCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        FormCommands::New(args) => run_new(args, global),
        FormCommands::List => run_list(global),
        FormCommands::Show(args) => run_show(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config, mut repo) = open_repository(global)?;
    let wizard = CreateFormWizard::new(WizardServices::from_config(&config));
    let mut session = FormSession::new();
    wizard.init(&mut session);

    let confirmed = if args.interactive {
        prompt_form(&wizard, &mut session, &args)?
    } else {
        apply_args(&wizard, &mut session, &args)?;
        true
    };

    if !confirmed {
        wizard
            .cancel(&mut session)
            .map_err(|e| miette::miette!("{}", e))?;
        println!("{} Form creation cancelled", style("!").yellow());
        return Ok(());
    }

    let committed = wizard
        .finish(&mut session, &mut repo)
        .map_err(|e| miette::miette!("{}", e))?;

    print_created(&project, &repo, &committed, global)
}

/// Drive the wizard from command-line flags
fn apply_args(wizard: &CreateFormWizard, session: &mut FormSession, args: &NewArgs) -> Result<()> {
    let schema_path = args
        .schema
        .as_ref()
        .ok_or_else(|| miette::miette!("--schema is required"))?;

    // Step 1: schema and details
    upload_schema(wizard, session, schema_path)?;
    let roots = wizard
        .schema_root_element_choices(session)
        .map_err(|e| miette::miette!("{}", e))?;
    let root_element = match args.root_element {
        Some(ref name) if roots.contains(name) => Some(name.clone()),
        Some(ref name) => {
            return Err(miette::miette!(
                "schema declares no element named '{}' (declared: {})",
                name,
                if roots.is_empty() { "none".to_string() } else { roots.join(", ") }
            ))
        }
        None => roots.first().cloned(),
    };
    session.set_schema_root_element_name(root_element);
    session.set_form_name(args.name.clone());
    session.set_form_title(args.title.clone());
    session.set_form_description(args.description.clone());
    session.set_output_path_pattern_for_form_instance_data(args.output_path.clone());
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    // Step 2: rendering engine templates
    for spec in &args.templates {
        let file = UploadedFile::from_path(&spec.path).map_err(|e| miette::miette!("{}", e))?;
        wizard.upload_rendering_engine_template(session, file);
        session.set_rendering_engine_template_title(spec.title.clone());
        session.set_rendering_engine_template_description(spec.description.clone());
        wizard
            .set_rendering_engine_name(session, spec.engine.as_deref())
            .map_err(|e| miette::miette!("{}", e))?;
        session.set_output_path_pattern_for_rendition(spec.rendition_pattern.clone());
        session.set_mimetype_for_rendition(spec.mimetype.clone());
        wizard
            .add_selected_rendering_engine_template(session)
            .map_err(|e| miette::miette!("{}", e))?;
    }
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    // Step 3: default workflow
    if let Some(ref workflow) = args.workflow {
        let known = wizard
            .default_workflow_choices()
            .iter()
            .any(|choice| &choice.value == workflow);
        if !known {
            return Err(miette::miette!(
                "unknown workflow '{}' (see `tfm workflow list`)",
                workflow
            ));
        }
        session.set_default_workflow_name(workflow);
    }
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    Ok(())
}

/// Drive the wizard with prompts; returns false when the user declines to create the form
fn prompt_form(wizard: &CreateFormWizard, session: &mut FormSession, args: &NewArgs) -> Result<bool> {
    let theme = ColorfulTheme::default();

    // Step 1: schema and details
    println!("{} {}", style("Step 1").bold(), style("Form details").cyan());
    let mut schema_path = args.schema.clone();
    let roots = loop {
        let path = match schema_path.take() {
            Some(path) => path,
            None => PathBuf::from(
                Input::<String>::with_theme(&theme)
                    .with_prompt("Schema file")
                    .interact_text()
                    .into_diagnostic()?,
            ),
        };
        if let Err(e) = upload_schema(wizard, session, &path) {
            println!("{} {}", style("✗").red(), e);
            continue;
        }
        match wizard.schema_root_element_choices(session) {
            Ok(roots) => break roots,
            Err(e) => println!("{} {}", style("✗").red(), e),
        }
    };

    let name: String = Input::with_theme(&theme)
        .with_prompt("Name")
        .default(args.name.clone().or_else(|| session.form_name()).unwrap_or_default())
        .interact_text()
        .into_diagnostic()?;
    session.set_form_name(Some(name));

    let title: String = Input::with_theme(&theme)
        .with_prompt("Title")
        .default(args.title.clone().or_else(|| session.form_title()).unwrap_or_default())
        .interact_text()
        .into_diagnostic()?;
    session.set_form_title(Some(title));

    let description: String = Input::with_theme(&theme)
        .with_prompt("Description")
        .default(args.description.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;
    session.set_form_description(Some(description));

    if !roots.is_empty() {
        let default_idx = args
            .root_element
            .as_ref()
            .and_then(|name| roots.iter().position(|r| r == name))
            .unwrap_or(0);
        let selection = Select::with_theme(&theme)
            .with_prompt("Root element")
            .items(&roots)
            .default(default_idx)
            .interact()
            .into_diagnostic()?;
        session.set_schema_root_element_name(Some(roots[selection].clone()));
    }

    let output_path: String = Input::with_theme(&theme)
        .with_prompt("Output path for form instance data")
        .default(
            args.output_path
                .clone()
                .unwrap_or_else(|| session.output_path_pattern_for_form_instance_data().to_string()),
        )
        .interact_text()
        .into_diagnostic()?;
    session.set_output_path_pattern_for_form_instance_data(Some(output_path));
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    // Step 2: rendering engine templates
    println!();
    println!("{} {}", style("Step 2").bold(), style("Rendering engine templates").cyan());
    loop {
        print_templates(session);

        let mut actions = vec!["Add a template"];
        if !session.rendering_engine_templates().is_empty() {
            actions.push("Remove a template");
        }
        actions.push("Continue");

        let action = Select::with_theme(&theme)
            .items(&actions)
            .default(0)
            .interact()
            .into_diagnostic()?;

        match actions[action] {
            "Add a template" => {
                if let Err(e) = prompt_template(wizard, session, &theme) {
                    println!("{} {}", style("✗").red(), e);
                }
            }
            "Remove a template" => {
                let items: Vec<String> = session
                    .rendering_engine_templates()
                    .iter()
                    .map(|entry| entry.file_name.clone())
                    .collect();
                let selection = Select::with_theme(&theme)
                    .with_prompt("Template to remove")
                    .items(&items)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                if session.select_template(selection) {
                    wizard.remove_selected_rendering_engine_template(session);
                }
            }
            _ => break,
        }
    }
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    // Step 3: default workflow
    println!();
    println!("{} {}", style("Step 3").bold(), style("Default workflow").cyan());
    let choices = wizard.default_workflow_choices();
    let labels: Vec<String> = choices
        .iter()
        .map(|choice| match choice.description {
            Some(ref description) => format!("{} - {}", choice.label, description),
            None => choice.label.clone(),
        })
        .collect();
    let default_idx = args
        .workflow
        .as_ref()
        .and_then(|name| choices.iter().position(|c| &c.value == name))
        .unwrap_or(0);
    let selection = Select::with_theme(&theme)
        .with_prompt("Default workflow")
        .items(&labels)
        .default(default_idx)
        .interact()
        .into_diagnostic()?;
    session.set_default_workflow_name(&choices[selection].value);
    wizard.next(session).map_err(|e| miette::miette!("{}", e))?;

    // Review
    println!();
    print_summary(wizard, session);
    Confirm::with_theme(&theme)
        .with_prompt("Create this form?")
        .default(true)
        .interact()
        .into_diagnostic()
}

fn prompt_template(
    wizard: &CreateFormWizard,
    session: &mut FormSession,
    theme: &ColorfulTheme,
) -> Result<()> {
    let path: String = Input::with_theme(theme)
        .with_prompt("Template file")
        .interact_text()
        .into_diagnostic()?;
    let file = UploadedFile::from_path(Path::new(&path)).map_err(|e| miette::miette!("{}", e))?;
    wizard.upload_rendering_engine_template(session, file);

    let title: String = Input::with_theme(theme)
        .with_prompt("Title")
        .default(session.rendering_engine_template_title().unwrap_or_default())
        .interact_text()
        .into_diagnostic()?;
    session.set_rendering_engine_template_title(Some(title));

    let description: String = Input::with_theme(theme)
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;
    session.set_rendering_engine_template_description(Some(description));

    let engines = wizard.rendering_engine_choices();
    let guessed = wizard.rendering_engine_name(session);
    let default_idx = guessed
        .and_then(|name| engines.iter().position(|e| *e == name))
        .unwrap_or(0);
    let selection = Select::with_theme(theme)
        .with_prompt("Rendering engine")
        .items(&engines)
        .default(default_idx)
        .interact()
        .into_diagnostic()?;
    wizard
        .set_rendering_engine_name(session, Some(engines[selection]))
        .map_err(|e| miette::miette!("{}", e))?;

    let pattern: String = Input::with_theme(theme)
        .with_prompt("Output path for renditions")
        .default(session.output_path_pattern_for_rendition().to_string())
        .interact_text()
        .into_diagnostic()?;
    if pattern != session.output_path_pattern_for_rendition() {
        session.set_output_path_pattern_for_rendition(Some(pattern));
    }

    let mimetypes = wizard.mimetype_choices();
    let guess_label = match wizard.mimetype_for_rendition(session) {
        Some(mimetype) => format!("Guess from output path ({})", mimetype),
        None => "Unspecified".to_string(),
    };
    let mut items = vec![guess_label];
    items.extend(mimetypes.iter().map(|(mimetype, label)| format!("{} ({})", label, mimetype)));
    let selection = Select::with_theme(theme)
        .with_prompt("Rendition mimetype")
        .items(&items)
        .default(0)
        .max_length(12)
        .interact()
        .into_diagnostic()?;
    if selection > 0 {
        session.set_mimetype_for_rendition(Some(mimetypes[selection - 1].0.clone()));
    }

    wizard
        .add_selected_rendering_engine_template(session)
        .map_err(|e| miette::miette!("{}", e))
}

fn upload_schema(wizard: &CreateFormWizard, session: &mut FormSession, path: &Path) -> Result<()> {
    let file = UploadedFile::from_path(path).map_err(|e| miette::miette!("{}", e))?;
    wizard.upload_schema(session, file);
    Ok(())
}

fn print_templates(session: &FormSession) {
    let templates = session.rendering_engine_templates();
    if templates.is_empty() {
        println!("  {}", style("No templates added").dim());
        return;
    }
    for (idx, entry) in templates.iter().enumerate() {
        println!(
            "  {}. {} [{}] -> {}{}",
            idx + 1,
            style(&entry.file_name).cyan(),
            entry.rendering_engine,
            entry.output_path_pattern_for_rendition,
            entry
                .mimetype_for_rendition
                .as_ref()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default()
        );
    }
}

fn print_summary(wizard: &CreateFormWizard, session: &FormSession) {
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}",
        style("Name").bold(),
        style(session.form_name().unwrap_or_default()).cyan()
    );
    println!(
        "{}: {}",
        style("Title").bold(),
        session.form_title().unwrap_or_default()
    );
    if let Some(description) = session.form_description() {
        println!("{}: {}", style("Description").bold(), description);
    }
    println!(
        "{}: {}",
        style("Schema").bold(),
        session.schema_file_name().unwrap_or("-")
    );
    println!(
        "{}: {}",
        style("Root element").bold(),
        session.schema_root_element_name().unwrap_or("-")
    );
    println!(
        "{}: {}",
        style("Output path").bold(),
        session.output_path_pattern_for_form_instance_data()
    );
    println!(
        "{}: {}",
        style("Default workflow").bold(),
        wizard
            .default_workflow_definition(session)
            .map(|def| def.title.as_str())
            .unwrap_or("None")
    );
    println!("{}:", style("Templates").bold());
    print_templates(session);
    println!("{}", style("─".repeat(60)).dim());
}

fn print_created(
    project: &Project,
    repo: &FsRepository,
    committed: &CommittedForm,
    global: &GlobalOpts,
) -> Result<()> {
    println!(
        "{} Created form {}",
        style("✓").green(),
        style(&committed.name).cyan()
    );
    if global.quiet {
        return Ok(());
    }

    let folder = repo
        .path_of(&committed.folder)
        .map_err(|e| miette::miette!("{}", e))?;
    let display = folder.strip_prefix(project.root()).unwrap_or(&folder);
    println!("   {}", style(display.display()).dim());
    println!("   Node: {}", style(committed.folder).yellow());
    for template in &committed.templates {
        println!(
            "   + {}{}",
            template.file_name,
            if template.created { "" } else { " (additional rendition)" }
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (_project, _config, repo) = open_repository(global)?;
    let forms = list_forms(&repo).map_err(|e| miette::miette!("{}", e))?;

    if forms.is_empty() && !matches!(global.format, OutputFormat::Json | OutputFormat::Yaml) {
        println!("No forms found.");
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&forms).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&forms).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for form in &forms {
                println!("{}", form.name);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Name", "Title", "Schema", "Root element", "Templates", "Workflow"]);
            for form in &forms {
                builder.push_record([
                    form.name.clone(),
                    form.title.clone().unwrap_or_default(),
                    form.schema.clone(),
                    form.schema_root_element_name.clone().unwrap_or_default(),
                    form.rendering_engine_templates.len().to_string(),
                    form.default_workflow_name.clone().unwrap_or_default(),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto | OutputFormat::Tsv => {
            println!(
                "{:<20} {:<25} {:<20} {:<16} {:<9} {}",
                style("NAME").bold(),
                style("TITLE").bold(),
                style("SCHEMA").bold(),
                style("ROOT").bold(),
                style("TEMPLATES").bold(),
                style("WORKFLOW").bold()
            );
            println!("{}", "-".repeat(105));
            for form in &forms {
                println!(
                    "{:<20} {:<25} {:<20} {:<16} {:<9} {}",
                    style(truncate_str(&form.name, 18)).cyan(),
                    truncate_str(form.title.as_deref().unwrap_or("-"), 23),
                    truncate_str(&form.schema, 18),
                    truncate_str(form.schema_root_element_name.as_deref().unwrap_or("-"), 14),
                    form.rendering_engine_templates.len(),
                    form.default_workflow_name.as_deref().unwrap_or("-")
                );
            }
            if !global.quiet {
                println!();
                println!("{} form(s) found.", style(forms.len()).cyan());
            }
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, repo) = open_repository(global)?;
    let form = find_form(&repo, &args.name)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| miette::miette!("No form named '{}'", args.name))?;

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&form).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Auto | OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&form).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            println!("{}", form.node);
        }
        OutputFormat::Tsv | OutputFormat::Md => print_form(&form),
    }

    Ok(())
}

fn print_form(form: &RegisteredForm) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("Name").bold(), style(&form.name).cyan());
    println!("{}: {}", style("Node").bold(), form.node);
    println!(
        "{}: {}",
        style("Title").bold(),
        form.title.as_deref().unwrap_or("-")
    );
    if let Some(ref description) = form.description {
        println!("{}: {}", style("Description").bold(), description);
    }
    println!("{}: {}", style("Schema").bold(), form.schema);
    println!(
        "{}: {}",
        style("Root element").bold(),
        form.schema_root_element_name.as_deref().unwrap_or("-")
    );
    println!(
        "{}: {}",
        style("Output path").bold(),
        form.output_path_pattern_for_form_instance_data
    );
    println!(
        "{}: {}",
        style("Default workflow").bold(),
        form.default_workflow_name.as_deref().unwrap_or("None")
    );
    println!("{}: {} ({})", style("Created").bold(), form.created, form.creator);
    println!("{}", style("─".repeat(60)).dim());
    for template in &form.rendering_engine_templates {
        println!(
            "{} [{}]",
            style(&template.file_name).cyan(),
            template.rendering_engine
        );
        for rendition in &template.renditions {
            println!(
                "   -> {}{}",
                rendition.output_path_pattern,
                rendition
                    .mimetype
                    .as_ref()
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            );
        }
    }
}
