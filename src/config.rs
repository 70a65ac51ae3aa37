use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration loaded from `rebind.toml` at the module root.
/// Every field is optional; command-line flags win over the file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    /// Application package; defaults to the manifest's `package` attribute
    #[serde(default)]
    pub package: Option<String>,

    /// Package holding the viewBinding delegate helpers
    #[serde(default)]
    pub helper_package: Option<String>,

    /// List items using at least this many distinct bindings fall back to
    /// the plain ViewBinding supertype
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    /// Descend into subdirectories when the target is a directory
    #[serde(default)]
    pub include_subdirs: bool,

    /// Only migrate files whose name matches this regular expression
    #[serde(default)]
    pub mask: Option<String>,
}

fn default_collapse_threshold() -> usize {
    3
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            package: None,
            helper_package: None,
            collapse_threshold: default_collapse_threshold(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            include_subdirs: false,
            mask: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project: ProjectConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Load `rebind.toml` from the module root. A missing file is not an
/// error; the defaults apply.
pub fn load_config(module: &Path) -> Result<Option<Config>> {
    let path = module.join("rebind.toml");
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if let Some(package) = &config.project.package {
        validate_package_name(package)?;
    }
    if let Some(package) = &config.project.helper_package {
        validate_package_name(package)?;
    }
    Ok(Some(config))
}

/// Helper package the delegates live in when the config does not name one.
pub fn default_helper_package(package: &str) -> String {
    format!("{}.viewbinding", package)
}

pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Package name cannot be empty");
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 2 {
        anyhow::bail!(
            "Package name must have at least two parts (e.g., com.example): {}",
            name
        );
    }

    for part in parts {
        if part.is_empty() {
            anyhow::bail!("Package name has empty part: {}", name);
        }
        let mut chars = part.chars();
        let first = chars.next().unwrap_or(' ');
        if !first.is_ascii_alphabetic() && first != '_' {
            anyhow::bail!(
                "Package part must start with a letter or underscore: {}",
                part
            );
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("Package part has invalid characters: {}", part);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rebind.toml"),
            r#"
[project]
package = "com.example.app"
helper_package = "com.example.core.binding"
collapse_threshold = 5

[batch]
include_subdirs = true
mask = "Activity"
"#,
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.project.package.as_deref(), Some("com.example.app"));
        assert_eq!(
            config.project.helper_package.as_deref(),
            Some("com.example.core.binding")
        );
        assert_eq!(config.project.collapse_threshold, 5);
        assert!(config.batch.include_subdirs);
        assert_eq!(config.batch.mask.as_deref(), Some("Activity"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rebind.toml"),
            "[project]\npackage = \"com.example.app\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.project.collapse_threshold, 3);
        assert!(!config.batch.include_subdirs);
        assert!(config.batch.mask.is_none());
    }

    #[test]
    fn test_invalid_package_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rebind.toml"),
            "[project]\npackage = \"1bad.name\"\n",
        )
        .unwrap();
        assert!(load_config(dir.path()).is_err());
    }

    #[test]
    fn test_validate_package_name() {
        assert!(validate_package_name("com.example.app").is_ok());
        assert!(validate_package_name("com._internal.app2").is_ok());
        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("single").is_err());
        assert!(validate_package_name("com..app").is_err());
        assert!(validate_package_name("com.1app").is_err());
        assert!(validate_package_name("com.my-app").is_err());
    }

    #[test]
    fn test_default_helper_package() {
        assert_eq!(
            default_helper_package("com.example.app"),
            "com.example.app.viewbinding"
        );
    }
}
