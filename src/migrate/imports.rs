//! Legacy import recognition and rewriting
//!
//! Synthetic imports name the layouts a file reads ids from; groupie's
//! kotlinandroidextensions package carries its own synthetic holder; the
//! old parcel package only needs a one-for-one swap. Legacy directives are
//! deleted and replacements appended at the end of the import list.

use crate::edit::Edit;
use crate::kotlin::{Import, KotlinFile};

pub const SYNTHETIC_PREFIX: &str = "kotlinx.android.synthetic.";
pub const GROUPIE_SYNTHETIC_PREFIX: &str = "com.xwray.groupie.kotlinandroidextensions.";
pub const PARCEL_PREFIX: &str = "kotlinx.android.parcel.";

pub const PARCELIZE_IMPORT: &str = "kotlinx.parcelize.Parcelize";

pub fn is_synthetic_import(path: &str) -> bool {
    path.starts_with(SYNTHETIC_PREFIX)
}

pub fn is_groupie_synthetic_import(path: &str) -> bool {
    path.starts_with(GROUPIE_SYNTHETIC_PREFIX)
}

pub fn is_parcel_import(path: &str) -> bool {
    path.starts_with(PARCEL_PREFIX)
}

pub fn is_legacy_import(path: &str) -> bool {
    is_synthetic_import(path) || is_groupie_synthetic_import(path) || is_parcel_import(path)
}

/// Layout a synthetic import reads from:
/// `kotlinx.android.synthetic.main.activity_foo.*` -> `activity_foo`,
/// also through the `.view` sub-package and single-id imports.
pub fn synthetic_layout_name(path: &str) -> Option<String> {
    let rest = path.strip_prefix(SYNTHETIC_PREFIX)?;
    let before_member = match rest.rfind('.') {
        Some(i) => &rest[..i],
        None => rest,
    };
    let without_view = before_member.strip_suffix(".view").unwrap_or(before_member);
    let layout = without_view.rsplit('.').next()?;
    if layout.is_empty() {
        None
    } else {
        Some(layout.to_string())
    }
}

/// New import directives planned for one file. Append-only and
/// deduplicated; order of first addition is preserved.
#[derive(Debug, Default, Clone)]
pub struct ImportPlan {
    additions: Vec<String>,
}

impl ImportPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.additions.contains(&path) {
            self.additions.push(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
    }

    pub fn additions(&self) -> &[String] {
        &self.additions
    }
}

/// Plan the import block rewrite: delete the given legacy directives and
/// append the planned ones. Additions already present in the file are
/// skipped so a re-run plans nothing.
pub fn rewrite_imports(
    file: &KotlinFile,
    removed: &[&Import],
    plan: &ImportPlan,
    edits: &mut Vec<Edit>,
) {
    for import in removed {
        edits.push(Edit::Delete { span: import.span });
    }
    let mut text = String::new();
    for addition in plan.additions() {
        let already_there = file
            .imports
            .iter()
            .any(|i| i.path == *addition && !removed.iter().any(|r| r.span == i.span));
        if !already_there {
            text.push_str("import ");
            text.push_str(addition);
            text.push('\n');
        }
    }
    if !text.is_empty() {
        edits.push(Edit::Insert {
            offset: file.import_insert_offset,
            text,
        });
    }
}

/// Every legacy import directive in the file.
pub fn legacy_imports(file: &KotlinFile) -> Vec<&Import> {
    file.imports
        .iter()
        .filter(|i| is_legacy_import(&i.path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_edits;
    use crate::kotlin::parse_kotlin;

    #[test]
    fn test_synthetic_layout_name() {
        assert_eq!(
            synthetic_layout_name("kotlinx.android.synthetic.main.activity_foo.*").as_deref(),
            Some("activity_foo")
        );
        assert_eq!(
            synthetic_layout_name("kotlinx.android.synthetic.main.item_row.view.*").as_deref(),
            Some("item_row")
        );
        assert_eq!(
            synthetic_layout_name("kotlinx.android.synthetic.main.activity_foo.fooTextView")
                .as_deref(),
            Some("activity_foo")
        );
        assert_eq!(synthetic_layout_name("android.app.Activity"), None);
    }

    #[test]
    fn test_legacy_detection() {
        assert!(is_legacy_import("kotlinx.android.synthetic.main.a.*"));
        assert!(is_legacy_import(
            "com.xwray.groupie.kotlinandroidextensions.GroupieViewHolder"
        ));
        assert!(is_legacy_import("kotlinx.android.parcel.Parcelize"));
        assert!(!is_legacy_import("kotlinx.parcelize.Parcelize"));
        assert!(!is_legacy_import("android.view.View"));
    }

    #[test]
    fn test_rewrite_deletes_and_appends() {
        let source = "package com.example\n\nimport android.view.View\nimport kotlinx.android.synthetic.main.activity_foo.*\n\nclass Foo\n";
        let file = parse_kotlin(source);
        let removed = legacy_imports(&file);
        assert_eq!(removed.len(), 1);

        let mut plan = ImportPlan::new();
        plan.add("com.example.databinding.ActivityFooBinding");
        plan.add("com.example.viewbinding.viewBinding");
        plan.add("com.example.databinding.ActivityFooBinding");

        let mut edits = Vec::new();
        rewrite_imports(&file, &removed, &plan, &mut edits);
        let out = apply_edits(source, edits).unwrap();
        assert_eq!(
            out,
            "package com.example\n\nimport android.view.View\nimport com.example.databinding.ActivityFooBinding\nimport com.example.viewbinding.viewBinding\n\nclass Foo\n"
        );
    }

    #[test]
    fn test_existing_addition_skipped() {
        let source = "package com.example\n\nimport com.example.databinding.ActivityFooBinding\n\nclass Foo\n";
        let file = parse_kotlin(source);
        let mut plan = ImportPlan::new();
        plan.add("com.example.databinding.ActivityFooBinding");
        let mut edits = Vec::new();
        rewrite_imports(&file, &[], &plan, &mut edits);
        assert!(edits.is_empty());
    }
}
