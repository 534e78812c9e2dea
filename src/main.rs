use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use matcher_settings::api::HttpBackend;
use matcher_settings::args::CommonArgs;
use matcher_settings::commands::{self, SettingsCommand};
use matcher_settings::config::Config;
use matcher_settings::logging;

#[derive(Debug, Parser)]
#[command(
    name = "matcher-settings",
    version,
    about = "Choose, test and save the AI provider of the matcher backend"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the interactive settings dialog (default)
    #[command(alias = "ui")]
    Tui(TuiArgs),
    #[command(flatten)]
    Settings(SettingsCommand),
}

#[derive(Debug, Args, Default)]
struct TuiArgs {
    /// Start with the dialog closed
    #[arg(long)]
    closed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.common.config_path();
    let mut config = Config::load(config_path)?;
    cli.common.apply_overrides(&mut config);

    match cli.command.unwrap_or(Commands::Tui(TuiArgs::default())) {
        Commands::Tui(args) => run_tui(config, args).await?,
        Commands::Settings(command) => {
            logging::init_cli()?;
            let backend = HttpBackend::new(&config.backend_url, config.request_timeout())?;
            commands::run(command, &backend, &config).await?;
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
async fn run_tui(mut config: Config, args: TuiArgs) -> Result<()> {
    use matcher_settings::app::App;

    let _guard = logging::init_tui(&config.log_dir())?;
    if args.closed {
        config.open_on_start = false;
    }
    let mut app = App::new(config)?;
    app.run().await
}

#[cfg(not(feature = "tui"))]
async fn run_tui(_config: Config, _args: TuiArgs) -> Result<()> {
    anyhow::bail!("This build has no TUI; use one of the subcommands (see --help).")
}
