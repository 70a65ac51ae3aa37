//! Per-file migration driver
//!
//! A file is parsed once, every class is classified and rewritten through
//! its family's strategy, and all planned edits are applied in one pass.
//! Class-level failures are reported and leave that class alone; the rest
//! of the file still migrates.

pub mod activity;
pub mod common;
pub mod imports;
pub mod list_item;
pub mod view;

pub use common::{
    full_line_span, migrate_class, AccessorKind, AccessorStrategy, GenerationKind,
    MigrationContext,
};
pub use imports::ImportPlan;

use crate::classify::{classify, ClassFamily, ClassIndex};
use crate::collect::{collect_class, ResolveScope};
use crate::edit::{apply_edits, Edit};
use crate::error::MigrationError;
use crate::kotlin::{parse_kotlin, Import, KotlinClass, Member};
use crate::layout::LayoutFile;

use activity::ContentViewStrategy;
use imports::{
    is_groupie_synthetic_import, is_parcel_import, is_synthetic_import, legacy_imports,
    synthetic_layout_name, ImportPlan as Plan, PARCEL_PREFIX,
};
use list_item::migrate_list_item;
use view::ViewStrategy;

/// Result of migrating one file's text.
#[derive(Debug, Default)]
pub struct FileOutcome {
    /// Rewritten text; `None` when nothing changed
    pub new_text: Option<String>,
    /// The module's build script still carries android-extensions
    pub needs_extensions_gradle: bool,
    /// The module's build script needs the parcelize plugin
    pub needs_parcelize_gradle: bool,
    /// Classes left alone, with the reason
    pub skipped_classes: Vec<(String, MigrationError)>,
}

impl FileOutcome {
    pub fn changed(&self) -> bool {
        self.new_text.is_some()
    }
}

/// Migrate one Kotlin source file. Pure on the text: filesystem and
/// build-script work stay with the batch layer.
pub fn migrate_file(
    source: &str,
    ctx: &MigrationContext,
    class_index: &ClassIndex,
) -> Result<FileOutcome, MigrationError> {
    let file = parse_kotlin(source);
    let legacy = legacy_imports(&file);
    if legacy.is_empty() {
        return Ok(FileOutcome::default());
    }

    let has_synthetic = legacy
        .iter()
        .any(|i| is_synthetic_import(&i.path) || is_groupie_synthetic_import(&i.path));
    let has_parcel = legacy.iter().any(|i| is_parcel_import(&i.path));

    let mut edits: Vec<Edit> = Vec::new();
    let mut plan = Plan::new();
    let mut skipped: Vec<(String, MigrationError)> = Vec::new();

    // layouts this file reads ids from, via its synthetic imports
    let mut lookup_layouts: Vec<&LayoutFile> = Vec::new();
    for import in &file.imports {
        if let Some(layout_name) = synthetic_layout_name(&import.path) {
            if let Some(layout) = ctx.layouts.get(&layout_name) {
                if !lookup_layouts.iter().any(|l| l.name == layout.name) {
                    lookup_layouts.push(layout);
                }
            }
        }
    }

    if has_synthetic {
        let mut classes: Vec<&KotlinClass> = Vec::new();
        for class in &file.classes {
            push_classes(class, &mut classes);
        }
        for class in classes {
            let family = classify(class, &file.imports, class_index);
            let Some(family) = family else {
                continue;
            };
            let scope = ResolveScope::new(lookup_layouts.clone(), family == ClassFamily::ListItem);
            let refs = collect_class(class, &scope);
            if refs.is_empty() {
                continue;
            }
            let mut class_edits = Vec::new();
            let mut class_plan = Plan::new();
            let result = match family {
                ClassFamily::ContentView => migrate_class(
                    class,
                    source,
                    &refs,
                    ctx,
                    &ContentViewStrategy,
                    &mut class_edits,
                    &mut class_plan,
                ),
                ClassFamily::View => migrate_class(
                    class,
                    source,
                    &refs,
                    ctx,
                    &ViewStrategy,
                    &mut class_edits,
                    &mut class_plan,
                ),
                ClassFamily::ListItem => migrate_list_item(
                    class,
                    source,
                    &refs,
                    ctx,
                    &mut class_edits,
                    &mut class_plan,
                ),
            };
            match result {
                Ok(()) => {
                    edits.extend(class_edits);
                    for addition in class_plan.additions() {
                        plan.add(addition.clone());
                    }
                }
                Err(e) => skipped.push((class.name.clone(), e)),
            }
        }
    }

    if has_parcel {
        for import in &legacy {
            if let Some(rest) = import.path.strip_prefix(PARCEL_PREFIX) {
                plan.add(format!("kotlinx.parcelize.{}", rest));
            }
        }
    }

    // Leaving the synthetic imports in place keeps a class that could not
    // be migrated compiling; only a cleanly migrated file drops them. The
    // parcel swap stays one-for-one either way, otherwise the old and new
    // Parcelize imports would clash on the same simple name.
    if skipped.is_empty() {
        imports::rewrite_imports(&file, &legacy, &plan, &mut edits);
    } else {
        let parcel: Vec<&Import> = legacy
            .iter()
            .filter(|i| is_parcel_import(&i.path))
            .copied()
            .collect();
        if !parcel.is_empty() || !plan.is_empty() {
            imports::rewrite_imports(&file, &parcel, &plan, &mut edits);
        }
    }

    if edits.is_empty() {
        return Ok(FileOutcome {
            new_text: None,
            needs_extensions_gradle: false,
            needs_parcelize_gradle: false,
            skipped_classes: skipped,
        });
    }

    let new_text =
        apply_edits(source, edits).map_err(|e| MigrationError::External(e.to_string()))?;
    Ok(FileOutcome {
        new_text: Some(new_text),
        needs_extensions_gradle: has_synthetic,
        needs_parcelize_gradle: has_parcel,
        skipped_classes: skipped,
    })
}

fn push_classes<'a>(class: &'a KotlinClass, out: &mut Vec<&'a KotlinClass>) {
    if class.is_class {
        out.push(class);
    }
    if let Some(body) = &class.body {
        for member in &body.members {
            if let Member::Class(nested) = member {
                push_classes(nested, out);
            }
        }
    }
}
