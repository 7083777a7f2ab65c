//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, DispatchBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<DispatchBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<DispatchBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<DispatchBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Capabilities, PresenceState, SessionKind, ShutdownPolicy};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[scheduler]
delay_threshold_ms = 2000
tick_interval_ms = 500
shutdown_policy = "retain"

[[sessions]]
id = "alice"
kind = "log"
[sessions.contact]
id = "alice@example.com"
capabilities = 0x10
display_name = "Alice"
presence = "online"

[[sessions]]
id = "relay"
kind = "udp"
[sessions.params]
addr = "127.0.0.1:9100"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.scheduler.delay_threshold_ms, 2000);
        assert_eq!(bp.scheduler.tick_interval_ms, Some(500));
        assert_eq!(bp.scheduler.shutdown_policy, ShutdownPolicy::Retain);
        assert_eq!(bp.sessions.len(), 2);

        let contact = bp.sessions[0].contact.as_ref().unwrap();
        assert!(contact.endpoint.capabilities.contains(Capabilities::WEBCAM));
        assert_eq!(contact.presence, PresenceState::Online);
        assert_eq!(bp.sessions[1].kind, SessionKind::Udp);
        assert_eq!(bp.sessions[1].params["addr"], "127.0.0.1:9100");
    }

    #[test]
    fn test_parse_toml_defaults() {
        let bp = parse_toml("").unwrap();
        assert_eq!(bp.scheduler.delay_threshold_ms, 5000);
        assert_eq!(bp.scheduler.tick_interval_ms, None);
        assert!(bp.sessions.is_empty());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "scheduler": { "delay_threshold_ms": 100 },
            "sessions": [{ "id": "bob" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.sessions[0].kind, SessionKind::Log);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
