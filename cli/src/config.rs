use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use hostbridge::BridgeConfig;

use crate::cli::CommonArgs;

/// App id used when neither the config file nor the flags name one
const DEFAULT_APP_ID: &str = "hostbridge-cli";

/// Load config from file
pub fn load_config(path: Option<&Path>) -> Result<Option<BridgeConfig>> {
    match path {
        Some(path) => {
            let config = BridgeConfig::load(path)
                .with_context(|| format!("failed to load config file: {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Merge file config with CLI args (CLI takes precedence)
pub fn merge_config(file: Option<BridgeConfig>, cli: &CommonArgs) -> Result<BridgeConfig> {
    let mut builder = match file {
        Some(config) => config.into_builder(),
        None => BridgeConfig::builder(DEFAULT_APP_ID),
    };

    if let Some(app_id) = &cli.app_id {
        builder = builder.app_id(app_id);
    }
    if let Some(store) = &cli.store {
        builder = builder.store_path(store);
    }
    if let Some(bytes) = cli.max_payload_bytes {
        builder = builder.max_payload_bytes(bytes);
    }
    if let Some(secs) = cli.grace_window_secs {
        builder = builder.grace_window(Duration::from_secs(secs));
    }

    builder.build().context("invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common() -> CommonArgs {
        CommonArgs {
            app_id: None,
            store: None,
            max_payload_bytes: None,
            grace_window_secs: None,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = merge_config(None, &common()).unwrap();
        assert_eq!(config.app_id(), DEFAULT_APP_ID);
        assert!(config.store_path().is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let file = BridgeConfig::from_toml_str(
            "app_id = \"wx-file\"\nstore_path = \"/tmp/file.json\"\n",
        )
        .unwrap();
        let mut cli = common();
        cli.app_id = Some("wx-flag".into());
        cli.grace_window_secs = Some(5);

        let config = merge_config(Some(file), &cli).unwrap();
        assert_eq!(config.app_id(), "wx-flag");
        assert_eq!(config.store_path(), Some(Path::new("/tmp/file.json")));
        assert_eq!(config.policy().grace_window, Duration::from_secs(5));
    }
}
