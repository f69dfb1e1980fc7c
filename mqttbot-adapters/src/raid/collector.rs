//! Collectors that obtain the raw RAID listing.
//!
//! [`CommandCollector`] runs the storage utility; [`FileCollector`] replays a
//! dump saved earlier (useful on hosts without the utility). Both hand back
//! the output untouched as a [`RawOutput`].

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::CollectionError;

/// Default storage utility.
pub const DEFAULT_COMMAND: &str = "diskutil";

/// Default arguments requesting a full property-list dump.
pub const DEFAULT_ARGS: [&str; 3] = ["appleRAID", "list", "-plist"];

/// Default time a single invocation may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque bytes captured from the storage utility.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawOutput(Vec<u8>);

impl RawOutput {
    /// Wrap captured bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The captured bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for RawOutput {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Trait for obtaining the raw RAID listing.
///
/// Implementations never retry; the scheduling loop owns the cadence.
#[async_trait]
pub trait Collect: Send + Sync + Debug {
    /// Capture one full listing.
    async fn collect(&self) -> Result<RawOutput, CollectionError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// Collector that runs the storage utility as a child process.
///
/// The argument vector is fixed at build time and passed without a shell.
#[derive(Debug, Clone)]
pub struct CommandCollector {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    description: String,
}

impl CommandCollector {
    /// Create a new builder for configuring the collector.
    pub fn builder() -> CommandCollectorBuilder {
        CommandCollectorBuilder::default()
    }

    /// The invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for CommandCollector {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl Collect for CommandCollector {
    async fn collect(&self) -> Result<RawOutput, CollectionError> {
        debug!(command = %self.description, timeout = ?self.timeout, "running storage utility");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectionError::Launch {
                command: self.description.clone(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CollectionError::Io {
                command: self.description.clone(),
                source,
            })?,
            Err(_) => {
                return Err(CollectionError::Timeout {
                    command: self.description.clone(),
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(CollectionError::ExitStatus {
                command: self.description.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!(bytes = output.stdout.len(), "captured storage utility output");
        Ok(RawOutput::new(output.stdout))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for CommandCollector.
#[derive(Debug, Default)]
pub struct CommandCollectorBuilder {
    program: Option<String>,
    args: Option<Vec<String>>,
    timeout: Option<Duration>,
}

impl CommandCollectorBuilder {
    /// Set the program to run (default: "diskutil").
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Set the full argument vector (default: `appleRAID list -plist`).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Set the invocation timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the collector.
    pub fn build(self) -> CommandCollector {
        let program = self.program.unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        let args = self
            .args
            .unwrap_or_else(|| DEFAULT_ARGS.iter().map(|a| a.to_string()).collect());

        let description = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        CommandCollector {
            program,
            args,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            description,
        }
    }
}

/// Collector that replays a listing saved to a file.
#[derive(Debug, Clone)]
pub struct FileCollector {
    path: PathBuf,
    description: String,
}

impl FileCollector {
    /// Create a collector reading the given file on every cycle.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Collect for FileCollector {
    async fn collect(&self) -> Result<RawOutput, CollectionError> {
        tokio::fs::read(&self.path)
            .await
            .map(RawOutput::new)
            .map_err(|source| CollectionError::Io {
                command: self.description.clone(),
                source,
            })
    }

    fn description(&self) -> &str {
        &self.description
    }
}
