// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "LUTRIN_DATA_DIR";

/// Return the application data directory, creating it if needed.
///
/// `override_dir` (from the config file) wins, then `LUTRIN_DATA_DIR`, then
/// the XDG data home, then `~/.local/share`, then the temp directory.
pub fn data_dir(override_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let dir = resolve(override_dir, |key| std::env::var(key).ok());
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Return a subdirectory inside `base` (e.g. "captures"), creating it.
pub fn data_subdir(base: &Path, name: &str) -> std::io::Result<PathBuf> {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn resolve(override_dir: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    let set = |key: &str| env(key).filter(|v| !v.is_empty());
    if let Some(dir) = set(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = set("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("lutrin");
    }
    if let Some(home) = set("HOME") {
        return PathBuf::from(home).join(".local").join("share").join("lutrin");
    }
    std::env::temp_dir().join("lutrin")
}
