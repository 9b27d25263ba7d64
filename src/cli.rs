use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the rendered document
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// YAML (default)
    Yaml,
    /// Pretty-printed JSON
    Json,
    /// Rust debug representation of the rendered tree
    Debug,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Yaml
    }
}

/// Command-line interface for the ypp YAML preprocessor
#[derive(Parser)]
#[command(
    name = "ypp",
    about = "YAML preprocessor: modules, parameters, env lookups, and conditional blocks",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Path to the YAML config file
    pub file: PathBuf,

    /// Write rendered output to file
    #[arg(short, long, help = "Write rendered output to file")]
    pub output: Option<PathBuf>,

    /// Show original YAML before processing
    #[arg(long, help = "Show original YAML before processing")]
    pub show_raw: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "yaml", help = "Output format")]
    pub format: OutputFormat,

    /// Base directory for resolving imports (defaults to the file's directory)
    #[arg(long, help = "Base directory for resolving imports")]
    pub source_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Yaml));
    }

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["ypp", "config.ypp"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("config.ypp"));
        assert!(cli.output.is_none());
        assert!(!cli.show_raw);
        assert!(matches!(cli.format, OutputFormat::Yaml));
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "ypp",
            "config.ypp",
            "-o",
            "out.yaml",
            "--show-raw",
            "-f",
            "json",
            "--source-dir",
            "modules",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.yaml")));
        assert!(cli.show_raw);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.source_dir, Some(PathBuf::from("modules")));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["ypp"]).is_err());
    }
}
