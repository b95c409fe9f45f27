//! Sampler - owns the `intel_gpu_top` child for exactly one sample window
//!
//! The lifecycle is strictly sequential: spawn the tool with JSON streaming
//! output, hold the thread for half a sampling interval, deliver SIGINT so
//! the tool closes its JSON array, then collect stdout/stderr and the exit
//! status under a hard deadline. Validation failures never produce partial
//! output; every error here is fatal to the caller.
//!
//! ## Timing assumption
//!
//! [`SAMPLE_DELAY`] relies on the tool's default ~1 Hz sampling interval:
//! interrupting after 500 ms means at most one sample has been emitted. This
//! is a documented assumption, not a guarantee; it is a named constant so a
//! schema change in intel-gpu-tools has one place to land.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enrich::{enrich_sample, timestamp_ns};
use crate::error::{Error, Result};

/// The external telemetry binary, resolved through `PATH`.
pub const DEFAULT_TOOL: &str = "intel_gpu_top";

/// Argument requesting JSON-formatted continuous output.
pub const JSON_OUTPUT_ARG: &str = "-J";

/// Measurement name tag injected into every record.
pub const MEASUREMENT_NAME: &str = "intel_gpu_top";

/// How long the tool runs before the interrupt. Half the tool's assumed
/// 1-second sampling interval, so at most one sample lands in the array.
pub const SAMPLE_DELAY: Duration = Duration::from_millis(500);

/// Hard deadline on collecting output after the interrupt. An unresponsive
/// child is killed and reaped when this elapses.
pub const COLLECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Poll interval while waiting for the child to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Sampler configuration.
///
/// The binary always runs [`SamplerConfig::default`]; the fields exist so
/// tests can point the sampler at fixture scripts and shrink the timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Telemetry binary to invoke
    pub tool: String,
    /// Arguments passed to the tool
    pub args: Vec<String>,
    /// Delay between spawn and interrupt
    pub sample_delay: Duration,
    /// Deadline on collection after the interrupt
    pub collection_timeout: Duration,
    /// Measurement name injected into the record
    pub measurement_name: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            args: vec![JSON_OUTPUT_ARG.to_string()],
            sample_delay: SAMPLE_DELAY,
            collection_timeout: COLLECTION_TIMEOUT,
            measurement_name: MEASUREMENT_NAME.to_string(),
        }
    }
}

impl SamplerConfig {
    /// Command line rendered for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.tool.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Everything collected from the child once it exits.
struct Collected {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Produces one enriched, re-serialized JSON document per invocation.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    config: SamplerConfig,
}

impl Sampler {
    /// Create a sampler with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sampler with a custom configuration.
    #[must_use]
    pub fn with_config(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Get the sampler configuration.
    #[must_use]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Capture one telemetry sample and return it as a pretty-printed,
    /// enriched JSON document.
    ///
    /// Spawns the tool, waits [`SamplerConfig::sample_delay`], interrupts it,
    /// collects its output under [`SamplerConfig::collection_timeout`], then
    /// validates and enriches the first sample. The capture timestamp is
    /// taken at enrichment, not at launch.
    ///
    /// # Errors
    ///
    /// Every failure in the taxonomy ([`Error::Launch`] through
    /// [`Error::UnexpectedShape`]) propagates; none is recoverable by this
    /// crate. The child is reaped on all paths, including timeout.
    pub fn capture_sample(&self) -> Result<String> {
        let command = self.config.command_line();

        debug!(command = %command, "launching telemetry tool");
        let mut child = Command::new(&self.config.tool)
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Launch {
                command: command.clone(),
                source,
            })?;

        thread::sleep(self.config.sample_delay);

        // Graceful interrupt: the tool closes the JSON array and exits 0.
        send_interrupt(&mut child, &command)?;

        let collected = collect(child, self.config.collection_timeout, &command)?;
        debug!(status = %collected.status, bytes = collected.stdout.len(), "collected output");

        // Empty output is checked before the exit status so the parser never
        // sees empty input, matching the failure precedence downstream
        // agents have come to expect.
        if collected.stdout.is_empty() {
            return Err(Error::EmptyOutput { command });
        }
        if !collected.status.success() {
            return Err(Error::ChildExit {
                command,
                status: collected.status,
                stdout: collected.stdout,
                stderr: collected.stderr,
            });
        }

        enrich_sample(
            &collected.stdout,
            timestamp_ns(),
            &self.config.measurement_name,
        )
    }
}

/// Deliver SIGINT to the child, exactly once.
#[cfg(unix)]
fn send_interrupt(child: &mut Child, command: &str) -> Result<()> {
    // Reaped later by `collect`; the pid stays valid until then.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(Error::Interrupt {
            command: command.to_string(),
            source: std::io::Error::last_os_error(),
        })
    }
}

/// No graceful interrupt exists off unix; the tool is a Linux utility and
/// this path only keeps cross-platform builds compiling.
#[cfg(not(unix))]
fn send_interrupt(child: &mut Child, command: &str) -> Result<()> {
    child.kill().map_err(|source| Error::Interrupt {
        command: command.to_string(),
        source,
    })
}

/// Wait for the child to exit, bounded by `timeout`, then drain its pipes.
///
/// On timeout the child is killed and reaped before the error returns, so no
/// zombie outlives the invocation.
fn collect(mut child: Child, timeout: Duration, command: &str) -> Result<Collected> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(status) => {
                // One sample is far below the pipe buffer size, so the child
                // never blocked on a full pipe before exiting.
                let stdout = drain(child.stdout.take())?;
                let stderr = drain(child.stderr.take())?;
                return Ok(Collected {
                    status,
                    stdout,
                    stderr,
                });
            }
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::CollectionTimeout {
                        command: command.to_string(),
                        timeout,
                    });
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
        }
    }
}

/// Read a captured pipe to a string, tolerating non-UTF-8 bytes.
fn drain(stream: Option<impl Read>) -> Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
