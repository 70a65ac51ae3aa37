//! Accessor strategy for custom views
//!
//! Decided entirely from the layout's root tag, no tree side effects:
//! - root tag names this class (possibly qualified): the XML inflates the
//!   view itself, so the binding binds onto it
//! - `merge` root: the view inflates the merge contents into itself
//! - anything else: the layout is inflated as a child of the view

use crate::edit::Edit;
use crate::error::MigrationError;
use crate::kotlin::KotlinClass;
use crate::layout::LayoutFile;

use super::common::{AccessorKind, AccessorStrategy, GenerationKind};

pub struct ViewStrategy;

impl AccessorStrategy for ViewStrategy {
    fn select(
        &self,
        class: &KotlinClass,
        _source: &str,
        layout: &LayoutFile,
        _property: &str,
        _edits: &mut Vec<Edit>,
    ) -> Result<(AccessorKind, GenerationKind), MigrationError> {
        let root = layout.root_tag.as_str();
        if root == class.name || root.ends_with(&format!(".{}", class.name)) {
            return Ok((AccessorKind::Default, GenerationKind::Bind));
        }
        if root == "merge" {
            return Ok((AccessorKind::AsMergeTag, GenerationKind::Inflate));
        }
        Ok((AccessorKind::AsChild, GenerationKind::Inflate))
    }
}
