//! End-to-end migration tests
//!
//! Each test builds a throwaway Gradle module on disk, runs the batch
//! migration over it, and checks the rewritten sources and build script.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use rebind::batch::{self, BatchOptions, BatchSummary};
use rebind::notify::RecordingSink;
use rebind::status::StatusTracker;

const BUILD_SCRIPT: &str = r#"plugins {
    id("com.android.application")
    kotlin("android")
    kotlin("android.extensions")
}

android {
    compileSdk = 34
}

androidExtensions {
    isExperimental = true
}
"#;

const MANIFEST: &str = "<manifest package=\"com.example.app\" />";

const ACTIVITY_MAIN_LAYOUT: &str = r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <TextView android:id="@+id/title_view" />
    <TextView android:id="@+id/subtitle_view" />
</FrameLayout>"#;

const ITEM_ENTRY_LAYOUT: &str = r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <TextView android:id="@+id/entry_text" />
</LinearLayout>"#;

const MAIN_ACTIVITY: &str = r#"package com.example.app

import android.app.Activity
import android.os.Bundle
import kotlinx.android.synthetic.main.activity_main.*

class MainActivity : Activity() {

    override fun onCreate(savedInstanceState: Bundle?) {
        super.onCreate(savedInstanceState)
        setContentView(R.layout.activity_main)
        titleView.text = "hello"
        subtitleView.text = "world"
    }
}
"#;

const ENTRY_ITEM: &str = r#"package com.example.app

import com.xwray.groupie.kotlinandroidextensions.GroupieViewHolder
import com.xwray.groupie.kotlinandroidextensions.Item
import kotlinx.android.synthetic.main.item_entry.*

class EntryItem(private val label: String) : Item() {

    override fun getLayout() = R.layout.item_entry

    fun bind(viewHolder: GroupieViewHolder, position: Int) {
        entryText.text = label
    }
}
"#;

const PAYLOAD: &str = r#"package com.example.app

import android.os.Parcelable
import kotlinx.android.parcel.Parcelize

@Parcelize
data class Payload(val id: Int, val label: String) : Parcelable
"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path();
        fs::write(module.join("build.gradle.kts"), BUILD_SCRIPT).unwrap();
        fs::create_dir_all(module.join("src/main/res/layout")).unwrap();
        fs::write(module.join("src/main/AndroidManifest.xml"), MANIFEST).unwrap();
        fs::write(
            module.join("src/main/res/layout/activity_main.xml"),
            ACTIVITY_MAIN_LAYOUT,
        )
        .unwrap();
        fs::write(
            module.join("src/main/res/layout/item_entry.xml"),
            ITEM_ENTRY_LAYOUT,
        )
        .unwrap();
        fs::create_dir_all(module.join("src/main/kotlin/com/example/app")).unwrap();
        let fixture = Fixture { dir };
        fixture.write_source("MainActivity.kt", MAIN_ACTIVITY);
        fixture.write_source("EntryItem.kt", ENTRY_ITEM);
        fixture.write_source("Payload.kt", PAYLOAD);
        fixture
    }

    fn write_source(&self, name: &str, text: &str) {
        fs::write(self.source_path(name), text).unwrap();
    }

    fn source_path(&self, name: &str) -> PathBuf {
        self.dir
            .path()
            .join("src/main/kotlin/com/example/app")
            .join(name)
    }

    fn read_source(&self, name: &str) -> String {
        fs::read_to_string(self.source_path(name)).unwrap()
    }

    fn read_build_script(&self) -> String {
        fs::read_to_string(self.dir.path().join("build.gradle.kts")).unwrap()
    }

    fn run(&self) -> (BatchSummary, RecordingSink) {
        run_batch(self.dir.path())
    }
}

fn run_batch(target: &Path) -> (BatchSummary, RecordingSink) {
    let options = BatchOptions {
        include_subdirs: true,
        ..Default::default()
    };
    let tracker = StatusTracker::new();
    let sink = RecordingSink::new();
    let cancel = AtomicBool::new(false);
    let summary = batch::run(target, &options, &tracker, &sink, &cancel).unwrap();
    (summary, sink)
}

#[test]
fn test_module_migrates_end_to_end() {
    let fixture = Fixture::new();
    let (summary, sink) = fixture.run();

    assert_eq!(summary.migrated, 3);
    assert_eq!(summary.failed, 0);
    assert!(sink.errors().is_empty());
    assert!(sink
        .infos()
        .iter()
        .any(|m| m.contains("Migrated 3 of 3 files")));
}

#[test]
fn test_activity_rewritten() {
    let fixture = Fixture::new();
    fixture.run();
    let out = fixture.read_source("MainActivity.kt");

    assert!(out.contains("private val binding by viewBinding(ActivityMainBinding::inflate)"));
    assert!(out.contains("private val titleView by lazy { binding.titleView }"));
    assert!(out.contains("private val subtitleView by lazy { binding.subtitleView }"));
    assert!(out.contains("setContentView(binding.root)"));
    assert!(out.contains("import com.example.app.databinding.ActivityMainBinding"));
    assert!(out.contains("import com.example.app.viewbinding.viewBinding"));
    assert!(!out.contains("kotlinx.android.synthetic"));
    assert!(!out.contains("R.layout.activity_main"));

    // reference sites read the new properties unchanged
    assert!(out.contains("titleView.text = \"hello\""));
}

#[test]
fn test_groupie_item_rewritten() {
    let fixture = Fixture::new();
    fixture.run();
    let out = fixture.read_source("EntryItem.kt");

    assert!(out.contains(": BindableItem<ItemEntryBinding>()"));
    assert!(out.contains("fun bind(viewHolder: ItemEntryBinding, position: Int)"));
    assert!(out.contains(
        "override fun initializeViewBinding(view: View): ItemEntryBinding = ItemEntryBinding.bind(view)"
    ));
    assert!(out.contains("import com.xwray.groupie.viewbinding.BindableItem"));
    assert!(out.contains("import com.example.app.databinding.ItemEntryBinding"));
    assert!(!out.contains("com.xwray.groupie.kotlinandroidextensions"));
    assert!(!out.contains("kotlinx.android.synthetic"));
}

#[test]
fn test_parcelize_swapped() {
    let fixture = Fixture::new();
    fixture.run();
    let out = fixture.read_source("Payload.kt");

    assert!(out.contains("import kotlinx.parcelize.Parcelize"));
    assert!(!out.contains("kotlinx.android.parcel"));
    assert!(out.contains("@Parcelize"));
}

#[test]
fn test_build_script_rewritten_once() {
    let fixture = Fixture::new();
    let (_, sink) = fixture.run();
    let gradle = fixture.read_build_script();

    assert!(gradle.contains("viewBinding.enable = true"));
    assert!(gradle.contains("id(\"kotlin-parcelize\")"));
    assert!(!gradle.contains("android.extensions"));
    assert!(!gradle.contains("androidExtensions {"));

    // one notification per pipeline, not per file
    let enabled = sink
        .infos()
        .iter()
        .filter(|m| m.contains("view binding enabled"))
        .count();
    assert_eq!(enabled, 1);
}

#[test]
fn test_second_run_is_fixed_point() {
    let fixture = Fixture::new();
    fixture.run();
    let activity = fixture.read_source("MainActivity.kt");
    let item = fixture.read_source("EntryItem.kt");
    let gradle = fixture.read_build_script();

    let (summary, sink) = fixture.run();
    assert_eq!(summary.migrated, 0);
    assert_eq!(summary.failed, 0);
    assert!(sink.errors().is_empty());
    assert_eq!(fixture.read_source("MainActivity.kt"), activity);
    assert_eq!(fixture.read_source("EntryItem.kt"), item);
    assert_eq!(fixture.read_build_script(), gradle);
}

#[test]
fn test_unsupported_class_keeps_file_compiling() {
    let fixture = Fixture::new();
    fixture.write_source(
        "BrokenActivity.kt",
        r#"package com.example.app

import android.app.Activity
import kotlinx.android.synthetic.main.activity_main.*

class BrokenActivity : Activity() {
    fun show() { titleView.text = "x" }
}
"#,
    );
    let (summary, sink) = fixture.run();

    assert_eq!(summary.migrated, 3);
    assert_eq!(summary.failed, 1);
    assert!(sink
        .errors()
        .iter()
        .any(|m| m.contains("BrokenActivity") && m.contains("skipped")));
    let broken = fixture.read_source("BrokenActivity.kt");
    assert!(broken.contains("kotlinx.android.synthetic.main.activity_main.*"));
}
