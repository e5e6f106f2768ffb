use clap::Parser;
use miette::Result;
use std::io;
use tfm::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => tfm::cli::commands::init::run(args, &global),
        Commands::Form(cmd) => tfm::cli::commands::form::run(cmd, &global),
        Commands::Schema(cmd) => tfm::cli::commands::schema::run(cmd, &global),
        Commands::Workflow(cmd) => tfm::cli::commands::workflow::run(cmd, &global),
        Commands::Engine(cmd) => tfm::cli::commands::engine::run(cmd, &global),
        Commands::Completions(args) => tfm::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; `TFM_LOG` overrides the level chosen by `--verbose`
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("TFM_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}
