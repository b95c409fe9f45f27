//! # igt-telegraf: Telegraf adapter for `intel_gpu_top`
//!
//! Runs `intel_gpu_top -J` for one sampling window, interrupts it, and
//! rewrites the first JSON sample into a single record Telegraf's JSON input
//! format can consume: the payload untouched, plus a nanosecond capture
//! `timestamp` and a fixed `measurement_name`.
//!
//! One invocation, one record, stdout only. Every failure (launch, empty
//! output, child exit, collection timeout, malformed or misshapen JSON) is
//! fatal; the invoking agent treats a non-zero exit as "no sample this tick".
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use igt_telegraf::Sampler;
//!
//! let sampler = Sampler::new();
//! let record = sampler.capture_sample()?;
//! println!("{record}");
//! # Ok::<(), igt_telegraf::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod enrich;
pub mod error;
pub mod sampler;

pub use error::{Error, Result};
pub use sampler::{Sampler, SamplerConfig};
