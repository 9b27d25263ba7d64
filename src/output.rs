use eyre::{Context, Result};

use ypp::Value;

use crate::cli::OutputFormat;

/// Serializes a rendered tree to one textual format.
pub trait Formatter {
    fn format(&self, tree: &Value) -> Result<String>;
}

/// Get the appropriate formatter for the given output format
pub fn get_formatter(format: &OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Yaml => Box::new(YamlFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Debug => Box::new(DebugFormatter),
    }
}

pub struct YamlFormatter;

impl Formatter for YamlFormatter {
    fn format(&self, tree: &Value) -> Result<String> {
        serde_yaml::to_string(tree).context("Failed to serialize rendered tree as YAML")
    }
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, tree: &Value) -> Result<String> {
        serde_json::to_string_pretty(tree).context("Failed to serialize rendered tree as JSON")
    }
}

pub struct DebugFormatter;

impl Formatter for DebugFormatter {
    fn format(&self, tree: &Value) -> Result<String> {
        Ok(format!("{tree:#?}"))
    }
}
