//! Shared class rewrite: synthesized properties, manual-inflate cleanup
//!
//! All three class families funnel through here once their accessor
//! strategy is chosen. The rewrite only ever plans edits; applying them is
//! the caller's job.

use std::collections::BTreeMap;

use regex::Regex;

use crate::binding::BindingCatalog;
use crate::collect::CollectedReferences;
use crate::edit::{Edit, Span};
use crate::error::MigrationError;
use crate::kotlin::{KotlinClass, Member};
use crate::layout::{LayoutFile, LayoutIndex, TagKind};
use crate::resource::layout_to_binding_name;

use super::imports::ImportPlan;

/// Which helper delegate creates the binding property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Default,
    AsChild,
    AsMergeTag,
}

impl AccessorKind {
    pub fn helper_function(self) -> &'static str {
        match self {
            AccessorKind::Default => "viewBinding",
            AccessorKind::AsChild => "viewBindingAsChild",
            AccessorKind::AsMergeTag => "viewBindingMergeTag",
        }
    }
}

/// Which generated entry point the delegate is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Bind,
    Inflate,
}

impl GenerationKind {
    pub fn binding_function(self) -> &'static str {
        match self {
            GenerationKind::Bind => "bind",
            GenerationKind::Inflate => "inflate",
        }
    }
}

/// Everything a file migration needs about its module.
pub struct MigrationContext<'a> {
    /// Application package, owns the generated `databinding` package
    pub package: &'a str,
    /// Package the `viewBinding*` property delegates live in
    pub helper_package: &'a str,
    pub layouts: &'a LayoutIndex,
    pub catalog: &'a dyn BindingCatalog,
    /// List-item classes touching at least this many distinct bindings
    /// collapse to the `ViewBinding` supertype
    pub collapse_threshold: usize,
}

/// Family-specific accessor decision, with room for the activity rule's
/// `setContentView` statement replacement.
pub trait AccessorStrategy {
    fn select(
        &self,
        class: &KotlinClass,
        source: &str,
        layout: &LayoutFile,
        property: &str,
        edits: &mut Vec<Edit>,
    ) -> Result<(AccessorKind, GenerationKind), MigrationError>;
}

struct LayoutGroup<'a> {
    layout: &'a LayoutFile,
    /// Retained ids in first-use order, stale ones already dropped
    view_ids: Vec<String>,
    /// Property the ids are read through (`binding`, a multi-layout
    /// binding property, or the include id for include-target layouts)
    property: String,
    /// Set when this layout is only reachable as an `<include>` target
    included_via: Option<String>,
}

/// Rewrite one class against the bindings its references resolve to.
pub fn migrate_class(
    class: &KotlinClass,
    source: &str,
    refs: &CollectedReferences,
    ctx: &MigrationContext,
    strategy: &dyn AccessorStrategy,
    edits: &mut Vec<Edit>,
    imports: &mut ImportPlan,
) -> Result<(), MigrationError> {
    let Some(body) = &class.body else {
        return Ok(());
    };
    if refs.views.is_empty() {
        return Ok(());
    }

    // group retained ids per layout, in first-use order
    let mut order: Vec<&str> = Vec::new();
    let mut ids_by_layout: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    let mut included_via: BTreeMap<String, String> = BTreeMap::new();
    for reference in &refs.views {
        let layout_name = reference.layout_name.as_str();
        if !order.contains(&layout_name) {
            order.push(layout_name);
        }
        let ids = ids_by_layout.entry(layout_name).or_default();
        if !ids.contains(&reference.view_id) {
            ids.push(reference.view_id.clone());
        }
        if let Some(target) = &reference.include_layout {
            included_via
                .entry(target.clone())
                .or_insert_with(|| reference.view_id.clone());
        }
    }

    let mut groups: Vec<LayoutGroup> = Vec::new();
    for layout_name in &order {
        let Some(layout) = ctx.layouts.get(layout_name) else {
            continue;
        };
        if layout.has_duplicate_ids() {
            return Err(MigrationError::UnsupportedShape(format!(
                "layout {} declares the same id twice",
                layout_name
            )));
        }
        let Some(binding) = ctx.catalog.binding_for_layout(layout_name) else {
            return Err(MigrationError::UnsupportedShape(format!(
                "class {} references more layouts than there are binding classes ({})",
                class.name, layout_name
            )));
        };
        let view_ids: Vec<String> = ids_by_layout
            .remove(layout_name)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| binding.has_field(id))
            .collect();
        if view_ids.is_empty() {
            continue;
        }
        groups.push(LayoutGroup {
            layout,
            view_ids,
            property: String::new(),
            included_via: included_via.get(*layout_name).cloned(),
        });
    }
    if groups.is_empty() {
        return Ok(());
    }

    let primaries = groups.iter().filter(|g| g.included_via.is_none()).count();
    for group in &mut groups {
        group.property = match &group.included_via {
            Some(include_id) => include_id.clone(),
            None if primaries <= 1 => "binding".to_string(),
            None => {
                let binding_name = layout_to_binding_name(&group.layout.name);
                crate::resource::binding_property_name(&binding_name)
            }
        };
    }

    // tier 1: plain ids, tier 2: includes and stubs, tier 3: primaries
    let mut plain_lines = Vec::new();
    let mut derived_lines = Vec::new();
    let mut primary_lines = Vec::new();

    for group in &groups {
        for id in &group.view_ids {
            let Some(view) = group.layout.find_view(id) else {
                continue;
            };
            match view.tag_kind {
                TagKind::Plain => plain_lines.push(format!(
                    "private val {} by lazy {{ {}.{} }}",
                    id, group.property, id
                )),
                TagKind::Include => {
                    let target = view.include_layout.as_deref().unwrap_or_default();
                    let target_binding = layout_to_binding_name(target);
                    derived_lines.push(format!(
                        "private val {}: {} by lazy {{ {}.{} }}",
                        id, target_binding, group.property, id
                    ));
                    imports.add(format!("{}.databinding.{}", ctx.package, target_binding));
                }
                TagKind::ViewStub => {
                    let target = view.view_stub_layout.as_deref().unwrap_or_default();
                    let target_binding = layout_to_binding_name(target);
                    derived_lines.push(format!(
                        "private val {} by lazy {{\n        val view = {}.{}.inflate()\n        {}.bind(view)\n    }}",
                        id, group.property, id, target_binding
                    ));
                    imports.add(format!("{}.databinding.{}", ctx.package, target_binding));
                }
            }
        }
    }

    for group in &groups {
        if group.included_via.is_some() {
            continue;
        }
        let (accessor, generation) =
            strategy.select(class, source, group.layout, &group.property, edits)?;
        let binding_name = layout_to_binding_name(&group.layout.name);
        primary_lines.push(format!(
            "private val {} by {}({}::{})",
            group.property,
            accessor.helper_function(),
            binding_name,
            generation.binding_function()
        ));
        imports.add(format!("{}.{}", ctx.helper_package, accessor.helper_function()));
        imports.add(format!("{}.databinding.{}", ctx.package, binding_name));

        remove_manual_inflate(class, source, &group.layout.name, edits)?;
    }

    let mut text = String::new();
    for tier in [&plain_lines, &derived_lines, &primary_lines] {
        if tier.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        for line in tier.iter() {
            text.push_str("\n    ");
            text.push_str(line);
        }
    }
    if !text.is_empty() {
        text.push('\n');
        edits.push(Edit::Insert {
            offset: body.l_brace + 1,
            text,
        });
    }

    Ok(())
}

/// Delete `inflate(..., R.layout.<name>, ...)` statements left over in
/// `init {}` blocks; a block whose every statement matches goes entirely.
fn remove_manual_inflate(
    class: &KotlinClass,
    source: &str,
    layout_name: &str,
    edits: &mut Vec<Edit>,
) -> Result<(), MigrationError> {
    let Some(body) = &class.body else {
        return Ok(());
    };
    let pattern = Regex::new(&format!(
        r"inflate\(.*R\.layout\.{}",
        regex::escape(layout_name)
    ))
    .map_err(|e| MigrationError::External(e.to_string()))?;

    for member in &body.members {
        let Member::Init(init) = member else {
            continue;
        };
        let matching: Vec<Span> = init
            .block
            .statements
            .iter()
            .map(|s| s.span())
            .filter(|s| pattern.is_match(s.text(source)))
            .collect();
        if matching.is_empty() {
            continue;
        }
        if matching.len() == init.block.statements.len() {
            edits.push(Edit::Delete {
                span: full_line_span(source, init.span),
            });
        } else {
            for span in matching {
                edits.push(Edit::Delete {
                    span: full_line_span(source, span),
                });
            }
        }
    }
    Ok(())
}

/// Widen a span to cover its whole line(s) when only whitespace surrounds
/// it, so deletions take their indentation and newline along.
pub fn full_line_span(source: &str, span: Span) -> Span {
    let bytes = source.as_bytes();
    let mut start = span.start;
    while start > 0 {
        let c = bytes[start - 1] as char;
        if c == ' ' || c == '\t' {
            start -= 1;
        } else if c == '\n' {
            break;
        } else {
            start = span.start;
            break;
        }
    }
    let mut end = span.end;
    while end < bytes.len() {
        let c = bytes[end] as char;
        if c == ' ' || c == '\t' {
            end += 1;
        } else if c == '\n' {
            end += 1;
            break;
        } else {
            end = span.end;
            break;
        }
    }
    Span::new(start, end)
}
