use crate::error::{ConvertError, ConvertResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for descriptor-to-OpenAPI conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// OpenAPI specification version written into generated documents
    pub openapi_version: String,

    /// Document title; defaults to the proto package (or file name)
    pub title: Option<String>,

    /// Document version
    pub version: String,

    /// Emit `connect.error.detail` as a oneOf over the `google.rpc` error
    /// detail schemas instead of a reference to `google.protobuf.Any`
    pub override_connect_error_detail: bool,

    /// Treat unary methods marked `NO_SIDE_EFFECTS` as reachable over GET
    pub allow_get: bool,

    /// Use the protobuf JSON name (lowerCamelCase) as the property key
    pub use_json_names: bool,

    /// Output format for generated documents
    pub format: OutputFormat,

    /// Pretty print JSON output
    pub pretty_print: bool,
}

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(ConvertError::config_error(format!(
                "unknown output format `{}` (expected `json` or `yaml`)",
                other
            ))),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            openapi_version: "3.1.0".to_string(),
            title: None,
            version: "v1".to_string(),
            override_connect_error_detail: false,
            allow_get: false,
            use_json_names: true,
            format: OutputFormat::Yaml,
            pretty_print: true,
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ConvertResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a protoc-style plugin parameter string such as
    /// `allow-get,override-connect-error-detail,format=json`
    pub fn from_parameter(parameter: &str) -> ConvertResult<Self> {
        let mut config = Self::default();
        config.apply_parameter(parameter)?;
        Ok(config)
    }

    /// Apply a plugin parameter string on top of this configuration
    pub fn apply_parameter(&mut self, parameter: &str) -> ConvertResult<()> {
        for item in parameter.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (item, None),
            };

            match key {
                "allow-get" | "allow_get" => self.allow_get = parse_flag(key, value)?,
                "override-connect-error-detail" | "override_connect_error_detail" => {
                    self.override_connect_error_detail = parse_flag(key, value)?
                }
                "proto-names" | "proto_names" => self.use_json_names = !parse_flag(key, value)?,
                "format" => self.format = required_value(key, value)?.parse()?,
                "title" => self.title = Some(required_value(key, value)?.to_string()),
                "version" => self.version = required_value(key, value)?.to_string(),
                "openapi-version" | "openapi_version" => {
                    self.openapi_version = required_value(key, value)?.to_string()
                }
                other => {
                    return Err(ConvertError::config_error(format!(
                        "unknown parameter `{}`",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    /// Enable the detailed `google.rpc` error detail representation
    pub fn with_error_detail_override(mut self, enabled: bool) -> Self {
        self.override_connect_error_detail = enabled;
        self
    }

    /// Allow `NO_SIDE_EFFECTS` methods to be exposed over GET
    pub fn with_allow_get(mut self, enabled: bool) -> Self {
        self.allow_get = enabled;
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

fn parse_flag(key: &str, value: Option<&str>) -> ConvertResult<bool> {
    match value {
        None | Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConvertError::config_error(format!(
            "parameter `{}` expects a boolean, got `{}`",
            key, other
        ))),
    }
}

fn required_value<'a>(key: &str, value: Option<&'a str>) -> ConvertResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConvertError::config_error(format!("parameter `{}` requires a value", key)))
}
