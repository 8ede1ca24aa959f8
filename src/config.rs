use serde::Deserialize;
use serde_json::Value;
use tower_lsp::lsp_types::DiagnosticSeverity;
use tracing::{debug, warn};
use tree_parser::{RunnerConfig, DEFAULT_DEPGRAPH_VERSION};

/// Settings sections the client may nest the config under.
const SECTIONS: &[&str] = &["maven-appraiser", "mavenAppraiser"];

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_prefer_wrapper")]
    pub prefer_wrapper: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_depgraph_version")]
    pub depgraph_version: String,
    #[serde(default)]
    pub conflict_diagnostics: ConflictDiagnosticsConfig,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            prefer_wrapper: default_prefer_wrapper(),
            extra_args: Vec::new(),
            depgraph_version: default_depgraph_version(),
            conflict_diagnostics: ConflictDiagnosticsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDiagnosticsConfig {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub severity: SeverityLevel,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Error,
    #[default]
    Warning,
    Information,
    Hint,
}

impl From<SeverityLevel> for DiagnosticSeverity {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Error => DiagnosticSeverity::ERROR,
            SeverityLevel::Warning => DiagnosticSeverity::WARNING,
            SeverityLevel::Information => DiagnosticSeverity::INFORMATION,
            SeverityLevel::Hint => DiagnosticSeverity::HINT,
        }
    }
}

fn default_executable() -> String {
    "mvn".to_string()
}

fn default_prefer_wrapper() -> bool {
    true
}

fn default_depgraph_version() -> String {
    DEFAULT_DEPGRAPH_VERSION.to_string()
}

impl UserConfig {
    /// Read `initializationOptions` or `didChangeConfiguration` settings.
    /// Invalid settings fall back to the defaults.
    pub fn from_value(value: Option<Value>) -> Self {
        let Some(mut value) = value.filter(|v| !v.is_null()) else {
            return Self::default();
        };
        for section in SECTIONS {
            if let Some(nested) = value.get_mut(*section).map(Value::take) {
                value = nested;
                break;
            }
        }
        match serde_json::from_value(value) {
            Ok(config) => {
                debug!("config {:?}", config);
                config
            }
            Err(e) => {
                warn!("invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            executable: self.executable.clone(),
            prefer_wrapper: self.prefer_wrapper,
            extra_args: self.extra_args.clone(),
            depgraph_version: self.depgraph_version.clone(),
        }
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        self.conflict_diagnostics.severity.into()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = UserConfig::from_value(None);
        assert_eq!(config, UserConfig::default());
        assert_eq!(config.executable, "mvn");
        assert!(config.prefer_wrapper);
        assert_eq!(config.severity(), DiagnosticSeverity::WARNING);
        assert_eq!(config.runner_config(), RunnerConfig::default());
    }

    #[test]
    fn test_from_initialization_options() {
        let config = UserConfig::from_value(Some(json!({
            "executable": "/opt/mvn",
            "preferWrapper": false,
            "extraArgs": ["-o", "-q"],
            "conflictDiagnostics": { "severity": "error" }
        })));
        assert_eq!(config.executable, "/opt/mvn");
        assert!(!config.prefer_wrapper);
        assert_eq!(config.extra_args, ["-o", "-q"]);
        assert_eq!(config.depgraph_version, DEFAULT_DEPGRAPH_VERSION);
        assert!(!config.conflict_diagnostics.disabled);
        assert_eq!(config.severity(), DiagnosticSeverity::ERROR);
    }

    #[test]
    fn test_nested_settings_section() {
        let config = UserConfig::from_value(Some(json!({
            "maven-appraiser": { "conflictDiagnostics": { "disabled": true } }
        })));
        assert!(config.conflict_diagnostics.disabled);
    }

    #[test]
    fn test_invalid_settings_fall_back() {
        let config = UserConfig::from_value(Some(json!({ "preferWrapper": "yes" })));
        assert_eq!(config, UserConfig::default());
    }
}
