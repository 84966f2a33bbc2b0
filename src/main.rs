use anyhow::Context;
use clap::{builder::PossibleValuesParser, Args, Parser, Subcommand};
use log::info;
use repodiagram::{
    config::{load_dotenv, Config, GitHubConfig, Settings},
    harvest::{GitHubHarvester, HarvestOptions},
    logging, server,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Harvest GitHub repositories and turn them into Mermaid diagrams", long_about = None)]
struct Cli {
    /// Log level
    #[arg(
        short,
        long,
        global = true,
        default_value = "info",
        env = "REPODIAGRAM_LOG",
        value_parser = PossibleValuesParser::new(logging::LEVELS)
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the harvest document of a public repository
    Harvest(HarvestArgs),
    /// Run the HTTP service
    Serve {
        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct HarvestArgs {
    /// Repository URL, e.g. https://github.com/owner/name
    url: String,

    /// Branch to list
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Skip files whose declared size exceeds this many bytes
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Allowed extensions, e.g. --ext .rs --ext .toml
    #[arg(long = "ext")]
    extensions: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Harvest(args) => {
            logging::init(&cli.log_level)?;
            harvest(args).await
        }
        Command::Serve { config } => {
            logging::init_tracing(&cli.log_level)?;
            let settings = Settings::load(config.as_deref()).context("Failed to load settings")?;
            let config = Config::from_env(settings).context("Incomplete environment")?;
            server::serve(config).await.context("Server stopped")?;
            Ok(())
        }
    }
}

async fn harvest(args: HarvestArgs) -> anyhow::Result<()> {
    load_dotenv();
    let github = GitHubConfig::from_env();
    let harvester = GitHubHarvester::with_base_urls(&github.api_base, &github.raw_base)?;

    let mut options = HarvestOptions {
        auth_token: github.token,
        ..HarvestOptions::default()
    };
    if let Some(limit) = args.max_file_size {
        options.max_file_size = limit;
    }
    if !args.extensions.is_empty() {
        options.include_extensions = Some(args.extensions.iter().cloned().collect());
    }

    info!("Harvesting {} on branch {}", args.url, args.branch);
    let document = harvester
        .harvest(&args.url, &args.branch, &options)
        .await
        .with_context(|| format!("Failed to harvest {}", args.url))?;

    info!("Collected {} files", document.files().len());
    println!("{}", document);
    Ok(())
}
