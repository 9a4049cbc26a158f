use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use version_drift::cache::SqliteCache;
use version_drift::check::check_all;
use version_drift::config::{self, Config};
use version_drift::credentials::{self, Credentials};
use version_drift::fetch::{self, FetchContext, FetchKind};
use version_drift::report;
use version_drift::resolve::resolve_with;
use version_drift::usage::{UsageContext, local_path};
use version_drift::version::Range;

#[derive(Parser)]
#[command(name = "version-drift")]
#[command(version, about = "Detect version drift between upstream releases and pinned usages")]
struct Cli {
    /// Config file [default: ./version-drift.yaml]
    #[arg(short, long, global = true, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Token used for every owner without its own `--token`
    #[arg(
        long,
        global = true,
        env = credentials::TOKEN_ENV,
        hide_env_values = true
    )]
    github_token: Option<String>,

    /// API token as OWNER=TOKEN, or TOKEN for every owner
    #[arg(long = "token", value_name = "[OWNER=]TOKEN", global = true)]
    tokens: Vec<String>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare every dependency's usages with its upstream
    Check {
        /// Ignore cached responses
        #[arg(long)]
        update: bool,
        /// Only show outdated or failed usages
        #[arg(long)]
        outdated: bool,
        /// Only check the usage with this name
        #[arg(long)]
        usage: Option<String>,
    },
    /// List all upstream versions of a dependency, newest first
    Versions {
        name: String,
        /// Version spec overriding the configured one
        #[arg(long)]
        spec: Option<String>,
        /// Ignore cached responses
        #[arg(long)]
        update: bool,
    },
    /// Print the local path a usage resolves to
    Path { name: String, usage: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = version_drift::logging::init(cli.verbose, &config::log_path());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let config =
        Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let credentials = Credentials::from_args(cli.github_token.as_deref(), &cli.tokens);

    match cli.command {
        Command::Check {
            update,
            outdated,
            usage,
        } => {
            if let Some(usage) = &usage
                && !config
                    .dependencies
                    .values()
                    .any(|dependency| dependency.usages.contains_key(usage))
            {
                anyhow::bail!("No dependency has a usage named {usage:?}");
            }

            let fetch_ctx = fetch_context(credentials.clone(), update)?;
            let usage_ctx = UsageContext::new(credentials, config.paths.clone())?;
            let results =
                check_all(&config.dependencies, usage.as_deref(), &fetch_ctx, &usage_ctx).await;

            if cli.json {
                println!("{}", report::render_json(&results)?);
            } else {
                print!("{}", report::render_text(&results, outdated));
            }
        }
        Command::Versions { name, spec, update } => {
            let dependency = config.dependency(&name)?;
            let upstream = &dependency.upstream;
            if let Some(range) = &spec
                && !matches!(upstream.kind, FetchKind::ChannelSnapshot(_))
            {
                Range::parse(range)?;
            }

            let fetch_ctx = fetch_context(credentials, update)?;
            let fetched = fetch::fetch(upstream, &fetch_ctx)
                .await
                .with_context(|| format!("Failed to fetch {name}"))?;
            let version_spec = spec.as_deref().or(upstream.version_spec.as_deref());
            let result = resolve_with(fetched, upstream.prerelease, version_spec)?;

            if cli.json {
                println!("{}", report::render_json(&result)?);
            } else {
                print!("{}", report::render_versions(&name, &result));
            }
        }
        Command::Path { name, usage } => {
            let spec = config.usage(&name, &usage)?;
            println!("{}", local_path(spec, config.paths.as_ref())?);
        }
    }
    Ok(())
}

fn fetch_context(credentials: Credentials, update: bool) -> anyhow::Result<FetchContext> {
    let db_path = config::db_path();
    let cache = SqliteCache::new(&db_path)
        .with_context(|| format!("Failed to open cache {}", db_path.display()))?;
    Ok(FetchContext::new(Arc::new(cache), credentials)?.with_update(update))
}
