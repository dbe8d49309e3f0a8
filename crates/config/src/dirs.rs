use std::{path::PathBuf, sync::RwLock};

/// Directory name under the home directory holding all skm state.
const DATA_DIR_NAME: &str = ".skills-manager";

static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);
static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the data directory for the rest of the process.
///
/// Relative paths are resolved against the current directory so that
/// links created from the skills root stay valid elsewhere.
pub fn set_data_dir(dir: PathBuf) {
    let dir = std::path::absolute(&dir).unwrap_or(dir);
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Override the config directory for the rest of the process.
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Returns the data directory (`~/.skills-manager/` unless overridden).
///
/// Falls back to `./.skills-manager` when no home directory can be found.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE.read().ok().and_then(|g| g.clone()) {
        return dir;
    }
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

/// Returns the user-global config directory (`~/.config/skm/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE.read().ok().and_then(|g| g.clone()) {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "skm").map(|d| d.config_dir().to_path_buf())
}

/// Home directory of the current user, if one can be determined.
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
