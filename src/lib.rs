pub mod config;
pub mod date;
pub mod nfe;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Check if the path has the given extension, ignoring case.
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Resolves the provided input path to a directory or file to an absolute path.
///
/// If `path` is `None` or empty, the current working directory is used.
/// Returns an error if the path does not exist or is not accessible.
///
/// ```rust
/// use std::path::Path;
/// use nfe_tools::resolve_input_path;
///
/// let path = Path::new("src");
/// let absolute_path = resolve_input_path(Some(path)).unwrap();
/// assert!(absolute_path.is_absolute());
/// ```
pub fn resolve_input_path(path: Option<&Path>) -> Result<PathBuf> {
    let input_path = path.map(path_to_string).unwrap_or_default().trim().to_string();

    let filepath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        PathBuf::from(input_path)
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Resolves the output workbook path.
///
/// An explicit `path` with an `.xlsx` extension is used as the file,
/// any other explicit path is treated as a directory for `file_name`.
/// Without `path`, the file is placed in the input directory,
/// or next to the input file if the input is a single file.
///
/// ```rust
/// use std::path::Path;
/// use nfe_tools::resolve_output_file;
///
/// let input = Path::new("/data/invoices");
/// let output = resolve_output_file(Some("/out/report.xlsx"), input, "NFes_info.xlsx").unwrap();
/// assert_eq!(output, Path::new("/out/report.xlsx"));
///
/// let output = resolve_output_file(Some("/out"), input, "NFes_info.xlsx").unwrap();
/// assert_eq!(output, Path::new("/out/NFes_info.xlsx"));
/// ```
pub fn resolve_output_file(path: Option<&str>, absolute_input_path: &Path, file_name: &str) -> Result<PathBuf> {
    let path = path.unwrap_or_default().trim();
    if path.is_empty() {
        let directory = if absolute_input_path.is_file() {
            absolute_input_path.parent().context("Failed to get parent directory")?
        } else {
            absolute_input_path
        };
        return Ok(directory.join(file_name));
    }

    let output = dunce::simplified(Path::new(path)).to_path_buf();
    if has_extension(&output, "xlsx") {
        Ok(output)
    } else {
        Ok(output.join(file_name))
    }
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// If the full path is within the root directory, the function returns the relative path.
/// Otherwise, it returns just the filename. If the filename cannot be determined, the
/// full path is returned.
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return full_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path.file_name().map_or_else(
                || full_path.display().to_string(),
                |name| name.to_string_lossy().to_string(),
            )
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert given path to string with invalid Unicode handling.
#[must_use]
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the directory for storing shell completions.
///
/// Uses the user-specific directory if it exists, then the global one.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let (user_dir, global_dir) = match shell {
        Shell::Bash => (home.join(".bash_completion.d"), PathBuf::from("/etc/bash_completion.d")),
        Shell::Fish => (
            home.join(".config/fish/completions"),
            PathBuf::from("/usr/share/fish/completions"),
        ),
        Shell::Zsh => (home.join(".zsh/completions"), PathBuf::from("/usr/share/zsh/site-functions")),
        Shell::Elvish => (home.join(".elvish"), home.join(".elvish")),
        Shell::PowerShell => {
            let dir = if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            };
            (dir.clone(), dir)
        }
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }
    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}
