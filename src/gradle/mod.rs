//! Build-script migration: drop the android-extensions plugin, switch on
//! view binding, and add the parcelize plugin where files need it.

pub mod script;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::edit::{apply_edits, Edit};
use crate::migrate::full_line_span;
use crate::notify::NotificationSink;
use crate::status::{Pipeline, StatusTracker};

pub use script::{parse_script, GradleScript, ScriptDialect};

/// Matches every spelling of the legacy plugin:
/// `id("org.jetbrains.kotlin.android.extensions")`,
/// `kotlin("android.extensions")`, `id 'kotlin-android-extensions'`,
/// `apply plugin: 'kotlin-android-extensions'`.
const EXTENSIONS_PLUGIN_PATTERN: &str = r"android[.\-]extensions";

const PARCELIZE_PATTERN: &str = r"parcelize";

/// Plan the android-extensions removal and view-binding switch for one
/// script. An already-migrated script plans no edits.
pub fn plan_view_binding(script: &GradleScript, source: &str) -> Result<Vec<Edit>> {
    let plugin_re =
        Regex::new(EXTENSIONS_PLUGIN_PATTERN).context("invalid plugin pattern")?;
    let mut edits = Vec::new();

    for block in &script.blocks {
        if block.name == "androidExtensions"
            || (block.name.starts_with("configure<")
                && block.name.contains("AndroidExtensionsExtension"))
        {
            edits.push(Edit::Delete {
                span: full_line_span(source, block.span),
            });
            continue;
        }
        if block.name == "plugins" {
            for statement in &block.statements {
                if plugin_re.is_match(statement.text(source)) {
                    edits.push(Edit::Delete {
                        span: full_line_span(source, *statement),
                    });
                }
            }
        }
        if block.name == "android" && !block.span.text(source).contains("viewBinding") {
            let statement = match script.dialect {
                ScriptDialect::KotlinScript => "viewBinding.enable = true",
                ScriptDialect::Groovy => "viewBinding.enabled = true",
            };
            edits.push(Edit::Insert {
                offset: block.l_brace + 1,
                text: format!("\n    {}", statement),
            });
        }
    }

    for statement in &script.statements {
        let text = statement.text(source);
        if text.starts_with("apply") && plugin_re.is_match(text) {
            edits.push(Edit::Delete {
                span: full_line_span(source, *statement),
            });
        }
    }

    Ok(edits)
}

/// Plan adding the `kotlin-parcelize` plugin; no edits when any parcelize
/// plugin spelling is already present.
pub fn plan_parcelize(script: &GradleScript, source: &str) -> Result<Vec<Edit>> {
    let parcelize_re = Regex::new(PARCELIZE_PATTERN).context("invalid parcelize pattern")?;

    let in_plugins = script
        .block("plugins")
        .map(|b| {
            b.statements
                .iter()
                .any(|s| parcelize_re.is_match(s.text(source)))
        })
        .unwrap_or(false);
    let in_top_level = script
        .statements
        .iter()
        .any(|s| parcelize_re.is_match(s.text(source)));
    if in_plugins || in_top_level {
        return Ok(Vec::new());
    }

    if let Some(plugins) = script.block("plugins") {
        let line_start = source[..plugins.r_brace]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let text = match script.dialect {
            ScriptDialect::KotlinScript => "    id(\"kotlin-parcelize\")\n",
            ScriptDialect::Groovy => "    id 'kotlin-parcelize'\n",
        };
        return Ok(vec![Edit::Insert {
            offset: line_start,
            text: text.to_string(),
        }]);
    }

    // Groovy apply-style script: append after the last apply line
    let last_apply = script
        .statements
        .iter()
        .filter(|s| s.text(source).starts_with("apply"))
        .last();
    if let Some(statement) = last_apply {
        let line = full_line_span(source, *statement);
        return Ok(vec![Edit::Insert {
            offset: line.end,
            text: "apply plugin: 'kotlin-parcelize'\n".to_string(),
        }]);
    }
    Ok(Vec::new())
}

/// `build.gradle.kts` wins over `build.gradle` when a module has both.
pub fn locate_build_script(module: &Path) -> Option<(PathBuf, ScriptDialect)> {
    let kts = module.join("build.gradle.kts");
    if kts.is_file() {
        return Some((kts, ScriptDialect::KotlinScript));
    }
    let groovy = module.join("build.gradle");
    if groovy.is_file() {
        return Some((groovy, ScriptDialect::Groovy));
    }
    None
}

/// Run one build-script pipeline for a module, gated by the tracker so it
/// happens once per batch. Failures revert the gate and notify; they never
/// abort the surrounding batch.
pub fn migrate_build_script(
    module: &Path,
    pipeline: Pipeline,
    tracker: &StatusTracker,
    sink: &dyn NotificationSink,
    dry_run: bool,
) -> Result<()> {
    if !tracker.try_begin(module, pipeline) {
        return Ok(());
    }
    match run_pipeline(module, pipeline, dry_run) {
        Ok(Some(path)) => {
            tracker.complete(module, pipeline);
            let what = match pipeline {
                Pipeline::BuildScript => "view binding enabled in",
                Pipeline::Parcelize => "parcelize plugin added to",
            };
            sink.info(&format!("{} {}", what, path.display()));
        }
        Ok(None) => tracker.complete(module, pipeline),
        Err(e) => {
            tracker.fail(module, pipeline);
            sink.error(&format!(
                "build script of {} not migrated: {:#}",
                module.display(),
                e
            ));
        }
    }
    Ok(())
}

/// Returns the script path when the file was (or would be) changed.
fn run_pipeline(module: &Path, pipeline: Pipeline, dry_run: bool) -> Result<Option<PathBuf>> {
    let Some((path, dialect)) = locate_build_script(module) else {
        anyhow::bail!("no build.gradle(.kts) in {}", module.display());
    };
    let source = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed = parse_script(&source, dialect);
    let edits = match pipeline {
        Pipeline::BuildScript => plan_view_binding(&parsed, &source)?,
        Pipeline::Parcelize => plan_parcelize(&parsed, &source)?,
    };
    if edits.is_empty() {
        return Ok(None);
    }
    let rewritten = apply_edits(&source, edits)?;
    if !dry_run {
        fs::write(&path, rewritten)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(Some(path))
}
