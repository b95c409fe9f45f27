//! Error types for igt-telegraf
//!
//! Every variant is fatal to the whole program: the binary logs the
//! diagnostic and exits non-zero. The agent invoking us treats a non-zero
//! exit as "no sample this tick" and retries on its own schedule.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Guidance appended to failures that usually mean the tool is absent or
/// lacks privileges.
const EXEC_HINT: &str =
    "Is the intel-gpu-tools package installed, and was the process run as root (required)?";

/// igt-telegraf error types
#[derive(Error, Debug)]
pub enum Error {
    /// The telemetry binary could not be started (missing, permission denied)
    #[error("failed to launch \"{command}\": {source}\n{EXEC_HINT}")]
    Launch {
        /// Command line that failed to start
        command: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// SIGINT could not be delivered to the running child
    #[error("failed to interrupt \"{command}\": {source}")]
    Interrupt {
        /// Command line of the child
        command: String,
        /// Underlying signal error
        #[source]
        source: std::io::Error,
    },

    /// The child produced zero bytes of standard output
    #[error("no output received from \"{command}\"\n{EXEC_HINT}")]
    EmptyOutput {
        /// Command line of the child
        command: String,
    },

    /// The child's exit status indicates failure
    #[error(
        "\"{command}\" exited non-zero ({status})\n{EXEC_HINT}\nOutput: {stdout}\nErrors: {stderr}"
    )]
    ChildExit {
        /// Command line of the child
        command: String,
        /// Exit status reported by the OS
        status: ExitStatus,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// Collection exceeded the hard timeout after the interrupt was sent
    #[error("\"{command}\" did not exit within {timeout:?} of the interrupt")]
    CollectionTimeout {
        /// Command line of the child
        command: String,
        /// The collection deadline that elapsed
        timeout: Duration,
    },

    /// The child's output could not be parsed as JSON
    #[error("invalid JSON output from the telemetry tool: {source}\nOutput: {raw}")]
    MalformedJson {
        /// The unparsed output text
        raw: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Parsed JSON is not a non-empty array of sample objects
    #[error(
        "invalid JSON structure from the telemetry tool. Expected a non-empty array of samples, got: {raw}"
    )]
    UnexpectedShape {
        /// The offending JSON text
        raw: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
