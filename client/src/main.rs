mod shell;
mod transport;
mod view;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use s3browser_agent::notify::LogNotificationSink;
use s3browser_agent::{AgentConfig, AgentHost};
use s3browser_core::config::ClientConfig;
use s3browser_core::navigation::{NavigationController, NavigationOutcome};
use s3browser_core::render::present;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::shell::Shell;
use crate::transport::AgentTransport;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Usage: s3browser [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  ls [PATH]          List a directory (default: start path)");
    eprintln!("  get PATH [DEST]    Download a file");
    eprintln!("  shell              Browse interactively");
    eprintln!("  version            Print client and backend versions");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --url URL          Backend base URL (env: S3BROWSER_URL)");
    eprintln!("  --cache-dir DIR    Directory for the offline asset cache");
    eprintln!("  --no-cache         Keep the asset cache in memory only");
    eprintln!("  --version          Print version and exit");
    eprintln!("  --help             Print this help message");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List(Option<String>),
    Get { path: String, dest: Option<PathBuf> },
    Shell,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    url: Option<String>,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
    command: Command,
}

#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Help,
    PrintVersion,
    Run(Options),
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut url = None;
    let mut cache_dir = None;
    let mut no_cache = false;
    let mut rest = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Invocation::Help),
            "--version" | "-V" => return Ok(Invocation::PrintVersion),
            "--url" => url = Some(iter.next().ok_or("--url requires a value")?.clone()),
            "--cache-dir" => {
                cache_dir = Some(PathBuf::from(
                    iter.next().ok_or("--cache-dir requires a value")?,
                ))
            }
            "--no-cache" => no_cache = true,
            other if other.starts_with("--") => return Err(format!("Unknown option: {other}")),
            other => rest.push(other.to_string()),
        }
    }

    let command = match rest.as_slice() {
        [] => return Err("Missing command".to_string()),
        [cmd] if cmd == "ls" => Command::List(None),
        [cmd, path] if cmd == "ls" => Command::List(Some(path.clone())),
        [cmd, path] if cmd == "get" => Command::Get {
            path: path.clone(),
            dest: None,
        },
        [cmd, path, dest] if cmd == "get" => Command::Get {
            path: path.clone(),
            dest: Some(PathBuf::from(dest)),
        },
        [cmd] if cmd == "shell" => Command::Shell,
        [cmd] if cmd == "version" => Command::Version,
        _ => return Err(format!("Unknown command: {}", rest.join(" "))),
    };

    Ok(Invocation::Run(Options {
        url,
        cache_dir,
        no_cache,
        command,
    }))
}

fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("s3browser").join("config.json"))
}

fn load_config(url_override: Option<&str>) -> Result<ClientConfig> {
    let config = match config_file().filter(|f| f.exists()) {
        Some(file) => ClientConfig::load_from(&file)
            .with_context(|| format!("Failed to load {}", file.display()))?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_process_env();
    if let Some(url) = url_override {
        config.base_url = url.to_string();
    }
    Ok(config.validated()?)
}

fn agent_config(config: &ClientConfig, options: &Options) -> AgentConfig {
    let cache_dir = if options.no_cache {
        None
    } else {
        options
            .cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("s3browser")))
    };
    AgentConfig {
        api_prefix: config.api_prefix.clone(),
        cache_dir,
        ..Default::default()
    }
}

async fn run(options: Options) -> Result<()> {
    let config = load_config(options.url.as_deref())?;
    let base = config.parsed_base_url()?;
    info!("s3browser {} using backend {}", VERSION, base);

    let handle = AgentHost::start(
        base.clone(),
        agent_config(&config, &options),
        Arc::new(LogNotificationSink),
    )
    .await
    .context("Failed to start caching agent")?;
    let view = handle.open_view().await?;
    let transport = AgentTransport::new(handle.clone(), view, base);

    match options.command {
        Command::Version => {
            println!("client  {}", VERSION);
            println!("backend {}", transport.version_label().await);
        }
        Command::Get { path, dest } => {
            let dest = dest.unwrap_or_else(|| shell::default_destination(&path));
            let bytes = shell::download_to(&transport, &path, &dest).await?;
            println!("Saved {} ({} bytes)", dest.display(), bytes);
        }
        Command::List(path) => {
            let target = path.unwrap_or_else(|| config.start_path.clone());
            let version = transport.version_label().await;
            let controller = NavigationController::new(transport);
            if let NavigationOutcome::Failed(e) = controller.navigate(&target).await {
                bail!("Failed to list {target}: {e}");
            }
            print!("{}", view::paint(&present(&controller.state().await), &version));
        }
        Command::Shell => {
            let version = transport.version_label().await;
            let shell = Shell::new(NavigationController::new(transport), version);
            shell.run(&config.start_path).await?;
        }
    }

    handle.close_view(view).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let options = match parse_args(&args) {
        Ok(Invocation::Help) => {
            print_usage();
            return Ok(());
        }
        Ok(Invocation::PrintVersion) => {
            println!("s3browser {}", VERSION);
            return Ok(());
        }
        Ok(Invocation::Run(options)) => options,
        Err(message) => {
            eprintln!("{}", message);
            print_usage();
            std::process::exit(1);
        }
    };

    // Logs to stderr so they don't interleave with listings on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(options).await
}
