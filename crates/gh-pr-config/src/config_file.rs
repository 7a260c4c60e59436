use std::path::{Path, PathBuf};

/// Name of the config file, looked up in the CWD and the home directory
pub const CONFIG_FILE: &str = ".gh-pr-batch.toml";

/// Load config file content from CWD first, then home directory
///
/// Searches for .gh-pr-batch.toml in:
/// 1. Current working directory
/// 2. Home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    load_config_file_from(Path::new(CONFIG_FILE), get_home_config_path().as_deref())
}

/// Read the first existing file out of a local and an optional home path
pub fn load_config_file_from(local: &Path, home: Option<&Path>) -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(local) {
        log::debug!("Loaded config from {}", local.display());
        return Some(content);
    }

    if let Some(home_config) = home {
        if let Ok(content) = std::fs::read_to_string(home_config) {
            log::debug!("Loaded config from {}", home_config.display());
            return Some(content);
        }
    }

    None
}

/// Get the path to the config file in the home directory
fn get_home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}
