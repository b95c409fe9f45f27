//! Binary entry point: capture one sample, print it, or exit 1.

use igt_telegraf::Sampler;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr; stdout is reserved for the record itself.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Sampler::new().capture_sample() {
        Ok(record) => println!("{record}"),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}
