use anyhow::Result;
use barcode_join::config::{Args, EtlConfig};
use barcode_join::pipeline::Pipeline;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = EtlConfig::from(Args::parse());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Pipeline::new(config).run(&mut out)?;
    Ok(())
}
