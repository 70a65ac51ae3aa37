//! Batch migration across a module's Kotlin sources
//!
//! Discovery, reading, and the cross-file class index run sequentially;
//! the per-file rewrites run on the rayon pool. Build-script migration is
//! triggered by the first file that needs it and gated by the tracker.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::binding::LayoutBindingCatalog;
use crate::classify::ClassIndex;
use crate::config::default_helper_package;
use crate::gradle::migrate_build_script;
use crate::kotlin::parse_kotlin;
use crate::layout::LayoutIndex;
use crate::migrate::{migrate_file, MigrationContext};
use crate::module::{find_module_root, module_package, res_dirs};
use crate::notify::NotificationSink;
use crate::status::{Pipeline, StatusTracker};

pub struct BatchOptions {
    /// Application package; overrides the manifest
    pub package_override: Option<String>,
    /// Package holding the viewBinding delegate helpers
    pub helper_package: Option<String>,
    /// Descend into subdirectories of a directory target
    pub include_subdirs: bool,
    /// Only migrate files whose name matches
    pub mask: Option<Regex>,
    /// Plan and report without writing anything
    pub dry_run: bool,
    pub collapse_threshold: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            package_override: None,
            helper_package: None,
            include_subdirs: false,
            mask: None,
            dry_run: false,
            collapse_threshold: 3,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub migrated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub cancelled: bool,
}

enum FileResult {
    Migrated,
    Unchanged,
    Failed,
    Cancelled,
}

/// Migrate every Kotlin file under `target`. The target may be one file
/// or a directory inside a Gradle module.
pub fn run(
    target: &Path,
    options: &BatchOptions,
    tracker: &StatusTracker,
    sink: &dyn NotificationSink,
    cancel: &AtomicBool,
) -> Result<BatchSummary> {
    if !target.exists() {
        bail!("target {} does not exist", target.display());
    }
    let Some(module) = find_module_root(target) else {
        bail!(
            "no build.gradle(.kts) found above {}",
            target.display()
        );
    };
    let package = match &options.package_override {
        Some(package) => package.clone(),
        None => match module_package(&module) {
            Some(package) => package,
            None => bail!(
                "manifest of {} has no package attribute; pass --package",
                module.display()
            ),
        },
    };
    let helper_package = options
        .helper_package
        .clone()
        .unwrap_or_else(|| default_helper_package(&package));

    let layouts = LayoutIndex::load_res_dirs(&res_dirs(&module))?;
    let catalog = LayoutBindingCatalog::from_index(&layouts, &package);
    let ctx = MigrationContext {
        package: &package,
        helper_package: &helper_package,
        layouts: &layouts,
        catalog: &catalog,
        collapse_threshold: options.collapse_threshold,
    };

    let paths = discover_files(target, options)?;
    if paths.is_empty() {
        sink.info("No Kotlin files to migrate");
        return Ok(BatchSummary::default());
    }

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push((path, text));
    }

    // Supertype chains can cross files, so the index sees every source
    // before any file is rewritten.
    let mut class_index = ClassIndex::new();
    for (_, text) in &sources {
        class_index.add_file(&parse_kotlin(text));
    }

    let results: Vec<FileResult> = sources
        .par_iter()
        .map(|(path, text)| {
            if cancel.load(Ordering::SeqCst) {
                return FileResult::Cancelled;
            }
            migrate_one(path, text, &ctx, &class_index, &module, options, tracker, sink)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for result in results {
        match result {
            FileResult::Migrated => summary.migrated += 1,
            FileResult::Unchanged => summary.unchanged += 1,
            FileResult::Failed => summary.failed += 1,
            FileResult::Cancelled => summary.cancelled = true,
        }
    }
    if summary.cancelled {
        sink.info("Migration cancelled; files already written are kept");
    }
    sink.info(&format!(
        "Migrated {} of {} files ({} unchanged, {} failed)",
        summary.migrated,
        summary.migrated + summary.unchanged + summary.failed,
        summary.unchanged,
        summary.failed
    ));
    Ok(summary)
}

fn migrate_one(
    path: &Path,
    text: &str,
    ctx: &MigrationContext,
    class_index: &ClassIndex,
    module: &Path,
    options: &BatchOptions,
    tracker: &StatusTracker,
    sink: &dyn NotificationSink,
) -> FileResult {
    let outcome = match migrate_file(text, ctx, class_index) {
        Ok(outcome) => outcome,
        Err(e) => {
            sink.error(&format!("{}: {}", path.display(), e));
            return FileResult::Failed;
        }
    };
    for (class, reason) in &outcome.skipped_classes {
        sink.error(&format!("{}: {} skipped: {}", path.display(), class, reason));
    }

    let Some(new_text) = &outcome.new_text else {
        return if outcome.skipped_classes.is_empty() {
            FileResult::Unchanged
        } else {
            FileResult::Failed
        };
    };

    if options.dry_run {
        sink.info(&format!("would migrate {}", path.display()));
    } else if let Err(e) = fs::write(path, new_text) {
        sink.error(&format!("Failed to write {}: {}", path.display(), e));
        return FileResult::Failed;
    } else {
        sink.info(&format!("migrated {}", path.display()));
    }

    if outcome.needs_extensions_gradle {
        let _ = migrate_build_script(module, Pipeline::BuildScript, tracker, sink, options.dry_run);
    }
    if outcome.needs_parcelize_gradle {
        let _ = migrate_build_script(module, Pipeline::Parcelize, tracker, sink, options.dry_run);
    }

    if outcome.skipped_classes.is_empty() {
        FileResult::Migrated
    } else {
        FileResult::Failed
    }
}

fn discover_files(target: &Path, options: &BatchOptions) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        if target.extension().and_then(|e| e.to_str()) != Some("kt") {
            bail!("{} is not a Kotlin source file", target.display());
        }
        return Ok(vec![target.to_path_buf()]);
    }

    let max_depth = if options.include_subdirs {
        usize::MAX
    } else {
        1
    };
    let mut files = Vec::new();
    for entry in WalkDir::new(target).max_depth(max_depth).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("kt") {
            continue;
        }
        let name_matches = match &options.mask {
            Some(mask) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| mask.is_match(n))
                .unwrap_or(false),
            None => true,
        };
        if name_matches {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingSink;

    const MANIFEST: &str = "<manifest package=\"com.example.app\" />";

    const LAYOUT: &str = r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <TextView android:id="@+id/foo_text_view" />
</FrameLayout>"#;

    const ACTIVITY: &str = r#"package com.example.app

import android.app.Activity
import android.os.Bundle
import kotlinx.android.synthetic.main.activity_foo.*

class FooActivity : Activity() {

    override fun onCreate(savedInstanceState: Bundle?) {
        super.onCreate(savedInstanceState)
        setContentView(R.layout.activity_foo)
        fooTextView.text = "hello"
    }
}
"#;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path();
        fs::write(
            module.join("build.gradle.kts"),
            "plugins {\n    kotlin(\"android\")\n    kotlin(\"android.extensions\")\n}\n\nandroid {\n    compileSdk = 34\n}\n",
        )
        .unwrap();
        fs::create_dir_all(module.join("src/main/res/layout")).unwrap();
        fs::write(module.join("src/main/AndroidManifest.xml"), MANIFEST).unwrap();
        fs::write(module.join("src/main/res/layout/activity_foo.xml"), LAYOUT).unwrap();
        let kotlin = module.join("src/main/kotlin/com/example/app");
        fs::create_dir_all(&kotlin).unwrap();
        fs::write(kotlin.join("FooActivity.kt"), ACTIVITY).unwrap();
        dir
    }

    fn run_batch(target: &Path, options: &BatchOptions) -> (BatchSummary, RecordingSink) {
        let tracker = StatusTracker::new();
        let sink = RecordingSink::new();
        let cancel = AtomicBool::new(false);
        let summary = run(target, options, &tracker, &sink, &cancel).unwrap();
        (summary, sink)
    }

    #[test]
    fn test_batch_migrates_module() {
        let dir = fixture();
        let options = BatchOptions {
            include_subdirs: true,
            ..Default::default()
        };
        let (summary, sink) = run_batch(dir.path(), &options);
        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.failed, 0);

        let source = fs::read_to_string(
            dir.path().join("src/main/kotlin/com/example/app/FooActivity.kt"),
        )
        .unwrap();
        assert!(source.contains("viewBinding(ActivityFooBinding::inflate)"));
        assert!(!source.contains("kotlinx.android.synthetic"));

        let gradle = fs::read_to_string(dir.path().join("build.gradle.kts")).unwrap();
        assert!(gradle.contains("viewBinding.enable = true"));
        assert!(!gradle.contains("android.extensions"));

        assert!(sink
            .infos()
            .iter()
            .any(|m| m.contains("Migrated 1 of 1 files")));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = fixture();
        let options = BatchOptions {
            include_subdirs: true,
            dry_run: true,
            ..Default::default()
        };
        let (summary, sink) = run_batch(dir.path(), &options);
        assert_eq!(summary.migrated, 1);

        let source = fs::read_to_string(
            dir.path().join("src/main/kotlin/com/example/app/FooActivity.kt"),
        )
        .unwrap();
        assert_eq!(source, ACTIVITY);
        let gradle = fs::read_to_string(dir.path().join("build.gradle.kts")).unwrap();
        assert!(gradle.contains("android.extensions"));
        assert!(sink.infos().iter().any(|m| m.contains("would migrate")));
    }

    #[test]
    fn test_mask_filters_files() {
        let dir = fixture();
        let options = BatchOptions {
            include_subdirs: true,
            mask: Some(Regex::new("Fragment").unwrap()),
            ..Default::default()
        };
        let (summary, _) = run_batch(dir.path(), &options);
        assert_eq!(summary.migrated, 0);
        let source = fs::read_to_string(
            dir.path().join("src/main/kotlin/com/example/app/FooActivity.kt"),
        )
        .unwrap();
        assert_eq!(source, ACTIVITY);
    }

    #[test]
    fn test_single_file_target() {
        let dir = fixture();
        let file = dir.path().join("src/main/kotlin/com/example/app/FooActivity.kt");
        let (summary, _) = run_batch(&file, &BatchOptions::default());
        assert_eq!(summary.migrated, 1);
        let source = fs::read_to_string(&file).unwrap();
        assert!(source.contains("setContentView(binding.root)"));
    }

    #[test]
    fn test_missing_module_is_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join("orphan");
        fs::create_dir_all(&orphan).unwrap();
        fs::write(orphan.join("Foo.kt"), "class Foo\n").unwrap();
        let tracker = StatusTracker::new();
        let sink = RecordingSink::new();
        let cancel = AtomicBool::new(false);
        let err = run(&orphan, &BatchOptions::default(), &tracker, &sink, &cancel).unwrap_err();
        assert!(err.to_string().contains("build.gradle"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = fixture();
        let tracker = StatusTracker::new();
        let sink = RecordingSink::new();
        let cancel = AtomicBool::new(true);
        let options = BatchOptions {
            include_subdirs: true,
            ..Default::default()
        };
        let summary = run(dir.path(), &options, &tracker, &sink, &cancel).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.migrated, 0);
        let source = fs::read_to_string(
            dir.path().join("src/main/kotlin/com/example/app/FooActivity.kt"),
        )
        .unwrap();
        assert_eq!(source, ACTIVITY);
    }
}
