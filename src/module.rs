//! Module root discovery and package resolution
//!
//! A module is the nearest ancestor directory carrying a Gradle build
//! script. The application package comes from the manifest unless the
//! caller overrides it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::manifest_package;

/// Nearest ancestor (including `start` itself for directories) with a
/// `build.gradle` or `build.gradle.kts`.
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_file() {
        start.parent()?
    } else {
        start
    };
    loop {
        if dir.join("build.gradle.kts").is_file() || dir.join("build.gradle").is_file() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// `package` attribute of the module's AndroidManifest.xml.
pub fn module_package(module: &Path) -> Option<String> {
    for candidate in [
        module.join("src/main/AndroidManifest.xml"),
        module.join("AndroidManifest.xml"),
    ] {
        if let Ok(xml) = fs::read_to_string(&candidate) {
            if let Some(package) = manifest_package(&xml) {
                return Some(package);
            }
        }
    }
    None
}

/// Every `src/<sourceSet>/res` directory of the module, sorted so `main`
/// variants load deterministically.
pub fn res_dirs(module: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(entries) = fs::read_dir(module.join("src")) {
        for entry in entries.flatten() {
            let res = entry.path().join("res");
            if res.is_dir() {
                dirs.push(res);
            }
        }
    }
    dirs.sort();
    dirs
}
