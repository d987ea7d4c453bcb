use anyhow::{anyhow, Context, Result};
use std::{
    env, fs,
    io::{self, Read},
};
use tracing::warn;

use spotcraft::config::EngineConfig;
use spotcraft::prepare_request;

fn main() -> Result<()> {
    setup_tracing()?;

    let path = env::args().nth(1);
    let raw = read_input(path.as_deref())?;
    let cfg = EngineConfig::load()?;

    let prepared = prepare_request(&raw, &cfg)?;
    for violation in &prepared.timeline_violations {
        warn!("ad format violation: {violation}");
    }

    let rendered =
        serde_json::to_string_pretty(&prepared).context("failed to encode prepared request")?;
    println!("{rendered}");
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some("-") | None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read model output from stdin")?;
            Ok(buffer)
        }
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
        }
    }
}

fn setup_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}
