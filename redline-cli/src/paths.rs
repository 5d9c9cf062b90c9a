use std::path::{Path, PathBuf};

const APP_DIR: &str = "redline";
const CONFIG_FILE: &str = "config.yaml";

/// Per-user config location: `<config_dir>/redline/config.yaml`
///
/// - Linux: `~/.config/redline/config.yaml`
/// - macOS: `~/Library/Application Support/redline/config.yaml`
/// - Windows: `%APPDATA%\redline\config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_DIR).join(CONFIG_FILE))
}

/// Config file to load, if any.
///
/// An explicit path always wins, even when it does not exist, so a typo
/// surfaces as a load warning instead of silently using another file.
/// Otherwise the per-user file is used when present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/tmp/does-not-exist/redline.yaml");
        assert_eq!(resolve_config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }

    #[test]
    fn test_default_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("redline/config.yaml"));
        }
    }
}
