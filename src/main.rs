//! SceneTree command shell.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use scenetree::{CommandShell, Config, Session};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenetree", about = "Scene tree editing shell", version)]
struct Cli {
    /// Output in JSON format
    #[arg(short, long)]
    json: bool,

    /// Read commands from a file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Start without the sample scripts
    #[arg(long)]
    no_samples: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("scenetree=warn,scenetree_core=info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let Cli {
        json,
        script,
        no_samples,
        command,
    } = Cli::parse();

    if let Some(Commands::Completions { shell }) = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    init_tracing();

    let mut config = Config::from_env();
    if no_samples {
        config.seed_samples = false;
    }
    info!(
        history_limit = config.history_limit,
        script_service = %config.script_service,
        "starting session"
    );
    let mut shell = CommandShell::new(Session::new(config), json);

    let input: Box<dyn BufRead> = match &script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let failures = shell.run_lines(input, &mut io::stdout(), &mut io::stderr())?;
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
