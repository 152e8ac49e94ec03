/*!
Export functionality for generated OpenAPI documents.

Renders an [`OpenApiSpec`] as JSON or YAML and reads one back. Component
order is preserved in both formats.
*/

use crate::{
    config::OutputFormat,
    error::ConvertResult,
    specification::OpenApiSpec,
};
use std::fs;
use std::path::Path;

/// Export service for generated documents
pub struct OpenApiExporter;

impl OpenApiExporter {
    /// Render as JSON
    pub fn to_json(spec: &OpenApiSpec, pretty: bool) -> ConvertResult<String> {
        let content = if pretty {
            serde_json::to_string_pretty(spec)?
        } else {
            serde_json::to_string(spec)?
        };
        Ok(content)
    }

    /// Render as YAML
    pub fn to_yaml(spec: &OpenApiSpec) -> ConvertResult<String> {
        Ok(serde_yaml::to_string(spec)?)
    }

    /// Render in the given format
    pub fn render(spec: &OpenApiSpec, format: OutputFormat, pretty: bool) -> ConvertResult<String> {
        match format {
            OutputFormat::Json => Self::to_json(spec, pretty),
            OutputFormat::Yaml => Self::to_yaml(spec),
        }
    }

    /// Write a document to a file
    pub fn save_to_file<P: AsRef<Path>>(
        spec: &OpenApiSpec,
        path: P,
        format: OutputFormat,
        pretty: bool,
    ) -> ConvertResult<()> {
        let content = Self::render(spec, format, pretty)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Read a document back, picking the format from the extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConvertResult<OpenApiSpec> {
        let content = fs::read_to_string(path.as_ref())?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "json" => Ok(serde_json::from_str(&content)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
            _ => {
                // Try to detect format from content
                if content.trim_start().starts_with('{') {
                    Ok(serde_json::from_str(&content)?)
                } else {
                    Ok(serde_yaml::from_str(&content)?)
                }
            }
        }
    }
}

/// Output path for the document generated from `proto_file`, e.g.
/// `acme/v1/user.proto` becomes `<dir>/acme/v1/user.openapi.yaml`
pub fn output_path(dir: &Path, proto_file: &str, format: OutputFormat) -> std::path::PathBuf {
    let stem = proto_file.strip_suffix(".proto").unwrap_or(proto_file);
    dir.join(format!("{}.openapi.{}", stem, format.extension()))
}
