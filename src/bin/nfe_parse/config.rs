//! Configuration module for nfeparse.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::Deserialize;

use nfe_tools::config::{DEFAULT_OUTPUT_NAME, DEFAULT_SHEET_NAME};

use crate::NfeParseArgs;

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct NfeParseConfig {
    /// Workbook file name used when the output is a directory.
    #[serde(default)]
    pub output_name: Option<String>,
    /// Worksheet name.
    #[serde(default)]
    pub sheet_name: Option<String>,
    /// Only print records without writing to file.
    #[serde(default)]
    pub print: bool,
    /// Include XML files from subdirectories.
    #[serde(default)]
    pub recurse: bool,
    /// Print verbose output.
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    nfeparse: NfeParseConfig,
}

impl NfeParseConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        match nfe_tools::config::read_user_config()? {
            Some(content) => Self::from_toml_str(&content).map_err(|e| anyhow!("Invalid user config file:\n{e}")),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.nfeparse)
            .map_err(|e| anyhow!("Failed to parse config: {e}"))
    }
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    /// Input path (file or directory).
    pub input_path: PathBuf,
    /// Output workbook file.
    pub output_file: PathBuf,
    /// Worksheet name.
    pub sheet_name: String,
    /// Only print records without writing to file.
    pub print: bool,
    /// Include XML files from subdirectories.
    pub recurse: bool,
    /// Print verbose output.
    pub verbose: bool,
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the input/output paths cannot be resolved.
    pub fn from_args(args: &NfeParseArgs) -> Result<Self> {
        Self::from_args_and_config(args, &NfeParseConfig::get_user_config()?)
    }

    /// Create config from given command line args and explicit user config.
    /// This is useful for testing without reading from the config file.
    ///
    /// # Errors
    /// Returns an error if the input/output paths cannot be resolved.
    pub fn from_args_and_config(args: &NfeParseArgs, user_config: &NfeParseConfig) -> Result<Self> {
        let input_path = nfe_tools::resolve_input_path(args.path.as_deref())?;
        let output_name = user_config.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME);
        let output_file = nfe_tools::resolve_output_file(args.output.as_deref(), &input_path, output_name)?;
        let sheet_name = user_config
            .sheet_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());

        // CLI args take priority over user config
        // Boolean flags: CLI true overrides config, otherwise use config value
        let print = args.print || user_config.print;
        let recurse = args.recurse || user_config.recurse;
        let verbose = args.verbose || user_config.verbose;

        Ok(Self {
            input_path,
            output_file,
            sheet_name,
            print,
            recurse,
            verbose,
        })
    }
}

#[cfg(test)]
mod test_nfe_parse_config {
    use super::*;

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = NfeParseConfig::from_toml_str("").expect("should parse empty config");
        assert!(config.output_name.is_none());
        assert!(config.sheet_name.is_none());
        assert!(!config.print);
        assert!(!config.recurse);
        assert!(!config.verbose);
    }

    #[test]
    fn from_toml_str_parses_nfeparse_section() {
        let toml = r#"
[nfeparse]
output_name = "faturas.xlsx"
sheet_name = "Faturas"
print = true
recurse = true
verbose = true
"#;
        let config = NfeParseConfig::from_toml_str(toml).expect("should parse config");
        assert_eq!(config.output_name.as_deref(), Some("faturas.xlsx"));
        assert_eq!(config.sheet_name.as_deref(), Some("Faturas"));
        assert!(config.print);
        assert!(config.recurse);
        assert!(config.verbose);
    }

    #[test]
    fn from_toml_str_ignores_other_sections() {
        let toml = r"
[other]
verbose = true
";
        let config = NfeParseConfig::from_toml_str(toml).expect("should parse config");
        assert!(!config.verbose);
    }

    #[test]
    fn from_toml_str_rejects_wrong_type() {
        let toml = r#"
[nfeparse]
print = "yes"
"#;
        assert!(NfeParseConfig::from_toml_str(toml).is_err());
    }
}
