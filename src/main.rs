use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use log::LevelFilter;

use liquidglass::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Suppresses all diagnostics except errors
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Enables verbose diagnostics; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet", global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in to Spotify in the browser
    Auth,

    /// Forget the stored session
    Logout,

    /// Show session and profile details
    Status,

    /// Print a valid access token
    Token,

    /// Control playback on the active Spotify device
    Remote {
        #[command(subcommand)]
        action: cli::RemoteAction,
    },

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_logger(cli: &Cli) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    if cli.quiet || cli.verbose > 0 {
        let level = match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Only our own modules, not the HTTP stack.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(&cli);

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Logout => cli::logout().await,
        Command::Status => cli::status().await,
        Command::Token => cli::token().await,
        Command::Remote { action } => cli::remote(action).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
