//! Interactive line-oriented browser.
//!
//! Reads one command per line from stdin and repaints the directory after
//! every navigation. Logs go to stderr, the view to stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use s3browser_core::navigation::{NavigationController, NavigationOutcome};
use s3browser_core::path;
use s3browser_core::render::{present, EntryAction};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::transport::AgentTransport;
use crate::view::{self, PendingAction};

const HELP: &str = "\
Commands:
  ls                 Repaint the current directory
  cd PATH            Open a directory (absolute or relative)
  N                  Activate row N (0 is the parent directory)
  up                 Go to the parent directory
  refresh            Reload the current directory
  get PATH [DEST]    Download a file
  status             Show caching agent status
  help               Show this help
  quit               Exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Repaint,
    Cd(String),
    Activate(usize),
    Up,
    Refresh,
    Get { path: String, dest: Option<PathBuf> },
    Status,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(ShellCommand::Repaint);
    };
    let arg = words.next();
    let parsed = match (command, arg) {
        ("ls" | "l", None) => ShellCommand::Repaint,
        ("cd", Some(target)) => ShellCommand::Cd(target.to_string()),
        ("cd", None) => ShellCommand::Cd(path::ROOT.to_string()),
        ("up" | "..", None) => ShellCommand::Up,
        ("refresh" | "r", None) => ShellCommand::Refresh,
        ("get", Some(file)) => ShellCommand::Get {
            path: file.to_string(),
            dest: words.next().map(PathBuf::from),
        },
        ("status", None) => ShellCommand::Status,
        ("help" | "?", None) => ShellCommand::Help,
        ("quit" | "exit" | "q", None) => ShellCommand::Quit,
        (n, None) if n.chars().all(|c| c.is_ascii_digit()) => ShellCommand::Activate(
            n.parse()
                .map_err(|_| format!("Row number out of range: {n}"))?,
        ),
        _ => return Err(format!("Unknown command: {}", line.trim())),
    };
    Ok(parsed)
}

/// Resolve a `cd` target against the current directory.
pub fn resolve(current: &str, target: &str) -> String {
    if target.starts_with('/') {
        return path::normalize(target);
    }
    let mut resolved = path::normalize(current);
    for segment in target.split('/').filter(|s| !s.is_empty() && *s != ".") {
        resolved = if segment == ".." {
            path::parent(&resolved)
        } else {
            path::join(&resolved, segment)
        };
    }
    resolved
}

/// Default local destination for a downloaded object.
pub fn default_destination(file: &str) -> PathBuf {
    PathBuf::from(path::file_name(file).unwrap_or_else(|| "download".to_string()))
}

pub async fn download_to(transport: &AgentTransport, file: &str, dest: &Path) -> Result<usize> {
    let data = transport.download(file).await?;
    tokio::fs::write(dest, &data)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    info!("Downloaded {} to {} ({} bytes)", file, dest.display(), data.len());
    Ok(data.len())
}

pub struct Shell {
    controller: NavigationController<AgentTransport>,
    version: String,
    pending: PendingAction,
}

impl Shell {
    pub fn new(controller: NavigationController<AgentTransport>, version: String) -> Self {
        Self {
            controller,
            version,
            pending: PendingAction::default(),
        }
    }

    async fn paint(&self) -> String {
        view::paint(&present(&self.controller.state().await), &self.version)
    }

    async fn report(&self, outcome: NavigationOutcome) -> String {
        match outcome {
            NavigationOutcome::Superseded => String::new(),
            _ => self.paint().await,
        }
    }

    /// Run one command and return the text to print.
    async fn execute(&self, command: ShellCommand) -> Result<String> {
        let text = match command {
            ShellCommand::Repaint => self.paint().await,
            ShellCommand::Cd(target) => {
                let current = self.controller.state().await.current_path;
                let outcome = self.controller.navigate(&resolve(&current, &target)).await;
                self.report(outcome).await
            }
            ShellCommand::Up => self.report(self.controller.go_to_parent().await).await,
            ShellCommand::Refresh => self.report(self.controller.refresh().await).await,
            ShellCommand::Activate(row) => {
                let model = present(&self.controller.state().await);
                let Some(action) = view::action_at(&model, row) else {
                    return Ok(format!("No row {row}"));
                };
                action.dispatch(&self.pending);
                self.perform_pending().await?
            }
            ShellCommand::Get { path, dest } => {
                let current = self.controller.state().await.current_path;
                let file = resolve(&current, &path);
                let dest = dest.unwrap_or_else(|| default_destination(&file));
                let bytes = download_to(self.controller.source(), &file, &dest).await?;
                format!("Saved {} ({} bytes)", dest.display(), bytes)
            }
            ShellCommand::Status => {
                let status = self.controller.source().handle().status().await?;
                serde_json::to_string_pretty(&status)?
            }
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Quit => String::new(),
        };
        Ok(text)
    }

    async fn perform_pending(&self) -> Result<String> {
        match self.pending.take() {
            Some(EntryAction::Navigate(target)) => {
                Ok(self.report(self.controller.navigate(&target).await).await)
            }
            Some(EntryAction::Download(file)) => {
                let dest = default_destination(&file);
                let bytes = download_to(self.controller.source(), &file, &dest).await?;
                Ok(format!("Saved {} ({} bytes)", dest.display(), bytes))
            }
            None => Ok(String::new()),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run(&self, start_path: &str) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        let first = self.report(self.controller.navigate(start_path).await).await;
        write_block(&mut stdout, &first).await?;

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                debug!("Stdin closed");
                break;
            }

            let command = match parse_line(&line) {
                Ok(command) => command,
                Err(message) => {
                    write_block(&mut stdout, &format!("{message}\n{HELP}")).await?;
                    continue;
                }
            };
            if command == ShellCommand::Quit {
                break;
            }

            let text = match self.execute(command).await {
                Ok(text) => text,
                Err(e) => format!("Error: {e:#}"),
            };
            write_block(&mut stdout, &text).await?;
        }
        Ok(())
    }
}

async fn write_block(stdout: &mut tokio::io::Stdout, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}
