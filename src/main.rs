use anyhow::Result;
use clap::{Parser, Subcommand};

use meshconsole::{cli, settings};

#[derive(Debug, Parser)]
#[command(name = "meshconsole")]
#[command(about = "Command console for a mesh-radio control backend")]
struct App {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive console (default when no subcommand is given)
    Console,
    /// Submit one command, print the resolved block, and exit
    Send {
        /// The command to submit
        #[arg(trailing_var_arg = true, required = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List stored command history, newest first
    History {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
        /// Re-render the entry at this index instead of listing
        #[arg(long)]
        replay: Option<usize>,
    },
    /// Show or change the session configuration (port, channel, timeout)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// List device ports reported by the backend
    Ports {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage application settings (~/.meshconsole/settings.toml)
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Check settings, storage and backend reachability
    Health,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the stored configuration
    Show,
    /// Set one field: port, channel or timeout
    Set { key: String, value: String },
    /// Restore defaults (auto-select port, channel 1, 180s)
    Reset,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the effective settings after all layers are merged
    Show,
    /// Write the annotated defaults to ~/.meshconsole/settings.toml
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Overwrite ~/.meshconsole/settings.toml with defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let settings = settings::load();

    match app.command.unwrap_or(Commands::Console) {
        Commands::Console => cli::run_console(&settings),
        Commands::Send { args } => {
            let command = args.join(" ");
            cli::run_send(&settings, &command)
        }
        Commands::History { format, replay } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_history(&settings, fmt, replay)
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => cli::run_config_show(&settings),
            ConfigAction::Set { key, value } => cli::run_config_set(&settings, &key, &value),
            ConfigAction::Reset => cli::run_config_reset(&settings),
        },
        Commands::Ports { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_ports(&settings, fmt)
        }
        Commands::Settings { action } => match action.unwrap_or(SettingsAction::Show) {
            SettingsAction::Show => cli::run_settings_show(),
            SettingsAction::Init { force } => cli::run_settings_init(force),
            SettingsAction::Reset => cli::run_settings_reset(),
        },
        Commands::Health => cli::run_health(&settings),
    }
}
