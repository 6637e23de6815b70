use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devsuite_core::ItemKey;

#[derive(Parser)]
#[command(name = "devsuite")]
#[command(about = "Installs the Development Suite: VirtualBox, JDK, Developer Studio, Vagrant, Cygwin and the CDK")]
#[command(version)]
pub struct Cli {
    /// Debug logging for the installer library
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look for existing installs and show what would be installed
    Detect {
        /// Check an existing install folder (repeatable), e.g. jdk=/usr/lib/jvm/zulu-8
        #[arg(long = "path", value_name = "KEY=DIR", value_parser = parse_item_path)]
        paths: Vec<(ItemKey, PathBuf)>,
    },

    /// Detect, confirm and install the suite
    Install {
        /// Install an item that is off by default (repeatable)
        #[arg(long, value_name = "KEY")]
        select: Vec<ItemKey>,

        /// Skip an item (repeatable)
        #[arg(long, value_name = "KEY")]
        deselect: Vec<ItemKey>,

        /// Use an existing install folder (repeatable), e.g. vagrant=C:\HashiCorp\Vagrant
        #[arg(long = "path", value_name = "KEY=DIR", value_parser = parse_item_path)]
        paths: Vec<(ItemKey, PathBuf)>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or change installer settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the current settings
    Show,

    /// Change one setting
    Set {
        /// Field name, e.g. install_root or probe_timeout_secs
        field: String,

        /// New value; an empty string restores a directory default
        value: String,
    },

    /// Restore every default
    Reset,
}

/// Parse `KEY=DIR`.
pub fn parse_item_path(s: &str) -> Result<(ItemKey, PathBuf), String> {
    let (key, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=DIR, got '{}'", s))?;
    if dir.is_empty() {
        return Err(format!("no folder given for '{}'", key));
    }
    Ok((key.parse()?, PathBuf::from(dir)))
}
