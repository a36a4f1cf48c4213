use anyhow::{Context, Result};
use serde_json::json;

use hostbridge::BridgeConfig;

use crate::cli::InspectArgs;

pub fn execute(args: InspectArgs, config: BridgeConfig) -> Result<()> {
    let raw = std::fs::read(&args.file)
        .with_context(|| format!("failed to read payload file: {}", args.file.display()))?;

    let message = config
        .codec()
        .decode(&raw)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;
    tracing::debug!(
        bytes = raw.len(),
        variant = %message.variant(),
        "decoded payload"
    );

    let report = json!({
        "kind": message.kind().as_str(),
        "variant": message.variant().tag(),
        "correlation_id": message.correlation_id().as_str(),
        "message": message,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
