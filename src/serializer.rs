//! Serialization module for converting generated OpenAPI documents to JSON
//! or YAML and writing them out.

use crate::openapi_generator::OpenApiSpec;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to pretty-printed JSON.
///
/// JSON is the primary output format; the printed document is stable, so an
/// unchanged source tree serializes to byte-identical output across runs.
///
/// # Arguments
///
/// * `spec` - The OpenAPI document to serialize
///
/// # Returns
///
/// Returns the JSON string representation of the document.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```ignore
/// use openapi_from_routes::serializer::serialize_json;
///
/// let json = serialize_json(&spec).unwrap();
/// println!("{}", json);
/// ```
pub fn serialize_json(spec: &OpenApiSpec) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(spec).context("Failed to serialize OpenAPI document to JSON")
}

/// Serializes an OpenAPI document to YAML format.
///
/// The output is standard YAML, suitable for OpenAPI tooling that prefers
/// it over JSON. Key order matches the JSON output.
///
/// # Arguments
///
/// * `spec` - The OpenAPI document to serialize
///
/// # Returns
///
/// Returns the YAML string representation of the document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(spec: &OpenApiSpec) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(spec).context("Failed to serialize OpenAPI document to YAML")
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Missing parent directories are created first.
///
/// # Arguments
///
/// * `content` - The string content to write
/// * `path` - The file path to write to
///
/// # Returns
///
/// Returns `Ok(())` on success.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!(
        "Successfully wrote {} bytes to {}",
        content.len(),
        path.display()
    );
    Ok(())
}
