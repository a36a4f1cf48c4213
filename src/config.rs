use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::codec::{Codec, CodecLimits};
use crate::dispatch::{Registration, SupportedContent};
use crate::error::{Error, Result};
use crate::exchange::{ExchangePolicy, FileStore, MemoryStore, PendingStore};

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    app_id: String,
    universal_link: Option<String>,
    supported_content: SupportedContent,
    limits: CodecLimits,
    policy: ExchangePolicy,
    store_path: Option<PathBuf>,
}

impl BridgeConfig {
    /// Create a new builder for BridgeConfig
    pub fn builder(app_id: impl Into<String>) -> BridgeConfigBuilder {
        BridgeConfigBuilder {
            inner: Self {
                app_id: app_id.into(),
                universal_link: None,
                supported_content: SupportedContent::empty(),
                limits: CodecLimits::default(),
                policy: ExchangePolicy::default(),
                store_path: None,
            },
            inline_limit_set: false,
        }
    }

    /// Reopen this configuration for changes
    pub fn into_builder(self) -> BridgeConfigBuilder {
        BridgeConfigBuilder {
            inner: self,
            inline_limit_set: false,
        }
    }

    /// Parse a TOML document
    ///
    /// ```toml
    /// app_id = "wx1234"
    /// supported_content = ["text", "picture"]
    /// store_path = "pending.json"
    ///
    /// [codec]
    /// max_payload_bytes = 33554432
    ///
    /// [exchange]
    /// grace_window_secs = 900
    /// response_deadline_secs = 120
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {e}")))?;

        let mut builder = Self::builder(file.app_id)
            .supported_content(file.supported_content)
            .grace_window(Duration::from_secs(file.exchange.grace_window_secs));
        if let Some(bytes) = file.codec.max_payload_bytes {
            builder = builder.max_payload_bytes(bytes);
        }
        if let Some(bytes) = file.codec.inline_attachment_limit {
            builder = builder.inline_attachment_limit(bytes);
        }
        if let Some(link) = file.universal_link {
            builder = builder.universal_link(link);
        }
        if let Some(secs) = file.exchange.response_deadline_secs {
            builder = builder.response_deadline(Duration::from_secs(secs));
        }
        if let Some(path) = file.store_path {
            builder = builder.store_path(path);
        }
        builder.build()
    }

    /// Load from a TOML file
    ///
    /// A relative `store_path` is resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&text)?;
        if let (Some(store), Some(dir)) = (config.store_path.as_mut(), path.parent())
            && store.is_relative()
        {
            *store = dir.join(&*store);
        }
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn universal_link(&self) -> Option<&str> {
        self.universal_link.as_deref()
    }

    pub fn supported_content(&self) -> SupportedContent {
        self.supported_content
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn policy(&self) -> &ExchangePolicy {
        &self.policy
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Registration handed to the launcher at startup
    pub fn registration(&self) -> Result<Registration> {
        let registration = Registration::new(&self.app_id, self.supported_content)?;
        match &self.universal_link {
            Some(link) => Ok(registration.with_universal_link(link)?),
            None => Ok(registration),
        }
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.limits)
    }

    /// File store at `store_path`, or a memory store when unset
    pub fn open_store(&self) -> Box<dyn PendingStore> {
        match &self.store_path {
            Some(path) => Box::new(FileStore::new(path)),
            None => Box::new(MemoryStore::new()),
        }
    }
}

/// Builder for BridgeConfig
///
/// An inline attachment limit that was never set explicitly follows a lower
/// `max_payload_bytes` down instead of failing the build.
#[derive(Debug)]
pub struct BridgeConfigBuilder {
    inner: BridgeConfig,
    inline_limit_set: bool,
}

impl BridgeConfigBuilder {
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.inner.app_id = app_id.into();
        self
    }

    pub fn universal_link(mut self, link: impl Into<String>) -> Self {
        self.inner.universal_link = Some(link.into());
        self
    }

    pub fn supported_content(mut self, content: SupportedContent) -> Self {
        self.inner.supported_content = content;
        self
    }

    pub fn codec_limits(mut self, limits: CodecLimits) -> Self {
        self.inner.limits = limits;
        self.inline_limit_set = true;
        self
    }

    pub fn max_payload_bytes(mut self, bytes: usize) -> Self {
        self.inner.limits.max_payload_bytes = bytes;
        self
    }

    pub fn inline_attachment_limit(mut self, bytes: usize) -> Self {
        self.inner.limits.inline_attachment_limit = bytes;
        self.inline_limit_set = true;
        self
    }

    pub fn grace_window(mut self, window: Duration) -> Self {
        self.inner.policy.grace_window = window;
        self
    }

    pub fn response_deadline(mut self, deadline: Duration) -> Self {
        self.inner.policy.response_deadline = Some(deadline);
        self
    }

    pub fn store_path(mut self, path: impl AsRef<Path>) -> Self {
        self.inner.store_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<BridgeConfig> {
        let mut config = self.inner;
        if config.app_id.is_empty() {
            return Err(Error::Config("app_id must not be empty".to_string()));
        }
        if config.limits.max_payload_bytes == 0 {
            return Err(Error::Config(
                "max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        let limits = &mut config.limits;
        if limits.inline_attachment_limit > limits.max_payload_bytes && !self.inline_limit_set {
            limits.inline_attachment_limit = limits.max_payload_bytes;
        }
        if config.limits.inline_attachment_limit > config.limits.max_payload_bytes {
            return Err(Error::Config(format!(
                "inline_attachment_limit ({}) exceeds max_payload_bytes ({})",
                config.limits.inline_attachment_limit, config.limits.max_payload_bytes
            )));
        }
        Ok(config)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    app_id: String,
    universal_link: Option<String>,
    #[serde(default)]
    supported_content: SupportedContent,
    #[serde(default)]
    codec: CodecSection,
    #[serde(default)]
    exchange: ExchangeSection,
    store_path: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CodecSection {
    max_payload_bytes: Option<usize>,
    inline_attachment_limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ExchangeSection {
    grace_window_secs: u64,
    response_deadline_secs: Option<u64>,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            grace_window_secs: ExchangePolicy::default().grace_window.as_secs(),
            response_deadline_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = BridgeConfig::builder("wx123").build().unwrap();
        assert_eq!(config.app_id(), "wx123");
        assert_eq!(config.limits(), &CodecLimits::default());
        assert_eq!(config.policy().grace_window, Duration::from_secs(900));
        assert!(config.store_path().is_none());
    }

    #[test]
    fn test_builder_rejects_bad_limits() {
        assert!(BridgeConfig::builder("").build().is_err());
        assert!(
            BridgeConfig::builder("wx123")
                .max_payload_bytes(1024)
                .inline_attachment_limit(2048)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_from_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            app_id = "wx123"
            universal_link = "https://example.com/app/"
            supported_content = ["text", "pdf"]

            [codec]
            max_payload_bytes = 4096
            inline_attachment_limit = 1024

            [exchange]
            grace_window_secs = 60
            response_deadline_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(
            config.supported_content(),
            SupportedContent::TEXT | SupportedContent::PDF
        );
        assert_eq!(config.limits().max_payload_bytes, 4096);
        assert_eq!(config.limits().inline_attachment_limit, 1024);
        assert_eq!(config.policy().grace_window, Duration::from_secs(60));
        assert_eq!(
            config.policy().response_deadline,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = BridgeConfig::from_toml_str("app_id = \"wx\"\nretries = 3\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = BridgeConfig::from_toml_str("app_id = \"wx\"\n[codec]\nmax_payload_byte = 4096\n")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_small_payload_limit_lowers_default_inline_limit() {
        let config =
            BridgeConfig::from_toml_str("app_id = \"wx\"\n[codec]\nmax_payload_bytes = 4096\n")
                .unwrap();
        assert_eq!(config.limits().max_payload_bytes, 4096);
        assert_eq!(config.limits().inline_attachment_limit, 4096);

        let lowered = BridgeConfig::builder("wx123")
            .build()
            .unwrap()
            .into_builder()
            .max_payload_bytes(4096)
            .build()
            .unwrap();
        assert_eq!(lowered.limits().inline_attachment_limit, 4096);
    }

    #[test]
    fn test_codec_limits_reject_unknown_keys() {
        let err = toml::from_str::<CodecLimits>("max_payload_byte = 4096\n").unwrap_err();
        assert!(err.to_string().contains("max_payload_byte"));
    }

    #[test]
    fn test_load_resolves_relative_store_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostbridge.toml");
        std::fs::write(&path, "app_id = \"wx123\"\nstore_path = \"pending.json\"\n").unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.store_path(), Some(dir.path().join("pending.json").as_path()));
    }
}
