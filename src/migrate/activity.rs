//! Accessor strategy for activities and dialogs
//!
//! The layout these classes own is the one handed to `setContentView`.
//! That statement is replaced with the binding's root view; a class
//! without the callback or the call cannot be migrated safely.

use crate::edit::Edit;
use crate::error::MigrationError;
use crate::kotlin::{Expr, KotlinClass, Member};
use crate::layout::LayoutFile;

use super::common::{AccessorKind, AccessorStrategy, GenerationKind};

pub struct ContentViewStrategy;

impl AccessorStrategy for ContentViewStrategy {
    fn select(
        &self,
        class: &KotlinClass,
        _source: &str,
        layout: &LayoutFile,
        property: &str,
        edits: &mut Vec<Edit>,
    ) -> Result<(AccessorKind, GenerationKind), MigrationError> {
        let Some(body) = &class.body else {
            return Err(MigrationError::UnsupportedShape(format!(
                "class {} has no body",
                class.name
            )));
        };
        let on_create = body.members.iter().find_map(|m| match m {
            Member::Function(f) if f.name == "onCreate" => Some(f),
            _ => None,
        });
        let Some(on_create) = on_create else {
            return Err(MigrationError::UnsupportedShape(format!(
                "class {} has no onCreate to anchor the binding in",
                class.name
            )));
        };

        let mut found = None;
        if let Some(block) = &on_create.body {
            for statement in &block.statements {
                if let Some(layout_name) = set_content_view_layout(statement) {
                    found = Some((statement.span(), layout_name));
                }
            }
        }
        let Some((span, layout_name)) = found else {
            return Err(MigrationError::UnsupportedShape(format!(
                "class {} calls no setContentView(R.layout...) in onCreate",
                class.name
            )));
        };

        if layout_name == layout.name {
            edits.push(Edit::Replace {
                span,
                text: format!("setContentView({}.root)", property),
            });
        }
        Ok((AccessorKind::Default, GenerationKind::Inflate))
    }
}

/// `setContentView(R.layout.activity_foo)` -> `Some("activity_foo")`
fn set_content_view_layout(expr: &Expr) -> Option<String> {
    let Expr::Call { callee, args, .. } = expr else {
        return None;
    };
    let Expr::Name { text, .. } = callee.as_ref() else {
        return None;
    };
    if text != "setContentView" || args.len() != 1 {
        return None;
    }
    let path = qualified_path(&args[0])?;
    path.strip_prefix("R.layout.").map(str::to_string)
}

fn qualified_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name { text, .. } => Some(text.clone()),
        Expr::Qualified {
            receiver, selector, ..
        } => {
            let mut path = qualified_path(receiver)?;
            path.push('.');
            path.push_str(&qualified_path(selector)?);
            Some(path)
        }
        _ => None,
    }
}
