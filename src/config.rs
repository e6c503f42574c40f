use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Default file name of the exported workbook.
pub const DEFAULT_OUTPUT_NAME: &str = "NFes_info.xlsx";

/// Default worksheet name.
pub const DEFAULT_SHEET_NAME: &str = "NFe";

/// Path to the user config file: `$HOME/.config/nfe-tools.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Read the user config file contents.
///
/// Returns `None` if there is no home directory or the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn read_user_config() -> Result<Option<String>> {
    let Some(path) = CONFIG_PATH.as_deref() else {
        return Ok(None);
    };
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(anyhow!("Failed to read config file {}: {error}", path.display())),
    }
}
