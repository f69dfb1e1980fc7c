//! Error types for adapters.

use std::time::Duration;

use thiserror::Error;

/// The raw status could not be obtained from the external command.
///
/// Terminal for the cycle: no partial result is produced.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The binary could not be started (missing, not executable, ...).
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but its output could not be fully read.
    #[error("failed to read output of `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("`{command}` exited with {status}{}", stderr_suffix(.stderr))]
    ExitStatus {
        command: String,
        status: String,
        stderr: String,
    },

    /// The process did not finish within the configured timeout.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// The captured output is not a usable RAID listing.
///
/// Only structural problems at the top level end up here; malformed fields
/// inside individual records fall back to defaults instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The buffer is not a binary or XML property list.
    #[error("malformed property list: {0}")]
    Plist(String),

    /// The property list root is not a dictionary.
    #[error("property list root is not a dictionary")]
    RootNotDictionary,

    /// The top-level container key is absent.
    #[error("missing top-level key `{0}`")]
    MissingContainer(&'static str),

    /// The top-level container key holds something other than an array.
    #[error("top-level key `{0}` is not an array")]
    ContainerNotArray(&'static str),
}

#[cfg(feature = "raid")]
impl From<plist::Error> for DecodeError {
    fn from(err: plist::Error) -> Self {
        DecodeError::Plist(err.to_string())
    }
}

/// Errors that can occur when collecting from adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Running the external command failed.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// The command output could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

#[cfg(any(feature = "nextbike", feature = "cityflitzer"))]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_message_includes_stderr() {
        let err = CollectionError::ExitStatus {
            command: "diskutil".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "  Could not find RAID\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`diskutil` exited with exit status: 1: Could not find RAID"
        );
    }

    #[test]
    fn exit_status_message_without_stderr() {
        let err = CollectionError::ExitStatus {
            command: "diskutil".to_string(),
            status: "exit status: 2".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "`diskutil` exited with exit status: 2");
    }

    #[test]
    fn adapter_error_is_transparent() {
        let err: AdapterError = DecodeError::MissingContainer("AppleRAIDSets").into();
        assert_eq!(err.to_string(), "missing top-level key `AppleRAIDSets`");

        let err: AdapterError = CollectionError::Timeout {
            command: "diskutil".to_string(),
            timeout: Duration::from_secs(30),
        }
        .into();
        assert_eq!(err.to_string(), "`diskutil` timed out after 30s");
    }
}
