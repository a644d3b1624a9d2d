//! ツール設定（TOML）。
//!
//! ```toml
//! [gateway.engine]
//! binary = "/usr/local/bin/katago"
//! model = "/var/lib/katago/model.bin.gz"
//!
//! [gateway.http]
//! endpoint = "http://analysis.internal:8080/analyze"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use rbaduk_analysis::GatewayConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ToolConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_section() {
        let config: ToolConfig = toml::from_str(
            r#"
            [gateway]
            query_timeout_secs = 30

            [gateway.engine]
            binary = "/usr/local/bin/katago"
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.query_timeout_secs, 30);
        assert!(config.gateway.engine.is_some());
        assert!(config.gateway.http.is_none());
    }

    #[test]
    fn empty_config_is_fallback_only() {
        let config: ToolConfig = toml::from_str("").unwrap();
        assert!(config.gateway.engine.is_none());
        assert!(config.gateway.http.is_none());
    }
}
