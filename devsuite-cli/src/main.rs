//! Development Suite installer
//!
//! Detects existing installs, lets the user confirm the selection and
//! installs the rest of the suite.

mod cli;
mod commands;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SettingsCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let library_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("devsuite=debug".parse()?)
                .add_directive(format!("devsuite_core={}", library_level).parse()?)
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    tracing::info!("Starting devsuite v{}", devsuite_core::VERSION);

    let (db, mut settings) = commands::open_settings()?;

    match cli.command {
        Commands::Detect { paths } => commands::cmd_detect(&settings, &paths).await,
        Commands::Install {
            select,
            deselect,
            paths,
            yes,
        } => commands::cmd_install(&settings, &select, &deselect, &paths, yes).await,
        Commands::Settings { action } => match action {
            SettingsCommands::Show => commands::cmd_settings_show(&db, &settings),
            SettingsCommands::Set { field, value } => {
                commands::cmd_settings_set(&db, &mut settings, &field, &value)
            }
            SettingsCommands::Reset => commands::cmd_settings_reset(&db),
        },
    }
}
