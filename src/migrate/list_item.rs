//! Groupie list-item rewrite
//!
//! Holder-typed functions are retyped to the binding their view ids point
//! at, the legacy `Item` supertype becomes `BindableItem<B>`, item-view
//! self references become `root`, and `initializeViewBinding` is inserted
//! ahead of an existing `bind` function. A class whose functions resolve
//! to no binding at all is left untouched.

use std::collections::BTreeMap;

use crate::binding::BindingClass;
use crate::collect::CollectedReferences;
use crate::edit::Edit;
use crate::error::MigrationError;
use crate::kotlin::{Function, KotlinClass, Member};

use super::common::MigrationContext;
use super::imports::ImportPlan;

const HOLDER_TYPE: &str = "GroupieViewHolder";
const ATTACH_CALLBACKS: &[&str] = &["onViewAttachedToWindow", "onViewDetachedFromWindow"];

const BINDABLE_ITEM_IMPORT: &str = "com.xwray.groupie.viewbinding.BindableItem";
const HOLDER_IMPORT: &str = "com.xwray.groupie.viewbinding.GroupieViewHolder";
const VIEW_BINDING_IMPORT: &str = "androidx.viewbinding.ViewBinding";
const VIEW_IMPORT: &str = "android.view.View";

pub fn migrate_list_item(
    class: &KotlinClass,
    source: &str,
    refs: &CollectedReferences,
    ctx: &MigrationContext,
    edits: &mut Vec<Edit>,
    imports: &mut ImportPlan,
) -> Result<(), MigrationError> {
    let Some(body) = &class.body else {
        return Ok(());
    };

    // ids used per enclosing function
    let mut ids_by_function: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for reference in &refs.views {
        if let Some(function) = &reference.enclosing_function {
            let ids = ids_by_function.entry(function.as_str()).or_default();
            if !ids.contains(&reference.view_id.as_str()) {
                ids.push(&reference.view_id);
            }
        }
    }

    // the unique binding whose fields cover each function's ids
    let mut candidate_by_function: BTreeMap<&str, &BindingClass> = BTreeMap::new();
    for (function, ids) in &ids_by_function {
        let id_set = ids.iter().map(|s| s.to_string()).collect();
        let mut covering = ctx
            .catalog
            .all_bindings()
            .into_iter()
            .filter(|b| b.covers(&id_set));
        if let (Some(binding), None) = (covering.next(), covering.next()) {
            candidate_by_function.insert(function, binding);
        }
    }

    let mut distinct: Vec<&BindingClass> = Vec::new();
    for binding in candidate_by_function.values() {
        if !distinct.iter().any(|b| b.name == binding.name) {
            distinct.push(binding);
        }
    }
    if distinct.is_empty() {
        return Ok(());
    }
    distinct.sort_by(|a, b| a.name.cmp(&b.name));

    let collapse = distinct.len() >= ctx.collapse_threshold;
    let class_binding = if collapse {
        imports.add(VIEW_BINDING_IMPORT);
        "ViewBinding".to_string()
    } else {
        imports.add(distinct[0].qualified_name.clone());
        distinct[0].name.clone()
    };

    // retype holder parameters and extension receivers
    for member in &body.members {
        let Member::Function(function) = member else {
            continue;
        };
        if ATTACH_CALLBACKS.contains(&function.name.as_str()) {
            for param in &function.params {
                if param.type_text == HOLDER_TYPE {
                    edits.push(Edit::Replace {
                        span: param.type_span,
                        text: format!("{}<{}>", HOLDER_TYPE, class_binding),
                    });
                    imports.add(HOLDER_IMPORT);
                }
            }
            continue;
        }
        let Some(binding) = candidate_by_function.get(function.name.as_str()) else {
            continue;
        };
        for param in &function.params {
            if param.type_text == HOLDER_TYPE {
                edits.push(Edit::Replace {
                    span: param.type_span,
                    text: binding.name.clone(),
                });
                imports.add(binding.qualified_name.clone());
            }
        }
        if let Some((receiver, span)) = &function.receiver {
            if receiver == HOLDER_TYPE {
                edits.push(Edit::Replace {
                    span: *span,
                    text: binding.name.clone(),
                });
                imports.add(binding.qualified_name.clone());
            }
        }
    }

    // Item(...) / Entry(...) supertype -> BindableItem<B>(...)
    for entry in &class.super_entries {
        let base = entry.base_name();
        if base == "Item" || base == "Entry" {
            let suffix = &entry.text[base.len()..];
            edits.push(Edit::Replace {
                span: entry.span,
                text: format!("BindableItem<{}>{}", class_binding, suffix),
            });
            imports.add(BINDABLE_ITEM_IMPORT);
        }
    }

    // itemView / containerView now live on the binding root
    for span in &refs.item_view_refs {
        edits.push(Edit::Replace {
            span: *span,
            text: "root".to_string(),
        });
    }

    insert_initialize_view_binding(class, source, &class_binding, edits, imports);

    Ok(())
}

fn insert_initialize_view_binding(
    class: &KotlinClass,
    source: &str,
    class_binding: &str,
    edits: &mut Vec<Edit>,
    imports: &mut ImportPlan,
) {
    let Some(body) = &class.body else {
        return;
    };
    let mut bind_function: Option<&Function> = None;
    for member in &body.members {
        if let Member::Function(function) = member {
            if function.name == "initializeViewBinding" {
                return;
            }
            if function.name == "bind" && bind_function.is_none() {
                bind_function = Some(function);
            }
        }
    }
    let Some(bind_function) = bind_function else {
        return;
    };
    let line_start = source[..bind_function.span.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    edits.push(Edit::Insert {
        offset: line_start,
        text: format!(
            "    override fun initializeViewBinding(view: View): {} = {}.bind(view)\n\n",
            class_binding, class_binding
        ),
    });
    imports.add(VIEW_IMPORT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::LayoutBindingCatalog;
    use crate::collect::{collect_class, ResolveScope};
    use crate::edit::apply_edits;
    use crate::kotlin::parse_kotlin;
    use crate::layout::{parse_layout, LayoutIndex};

    fn item_index() -> LayoutIndex {
        let mut index = LayoutIndex::new();
        index.insert(
            parse_layout(
                "item_header",
                r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                    <TextView android:id="@+id/title_view" />
                    <TextView android:id="@+id/subtitle_view" />
                </LinearLayout>"#,
            )
            .unwrap(),
        );
        index.insert(
            parse_layout(
                "item_row",
                r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                    <TextView android:id="@+id/row_label" />
                </LinearLayout>"#,
            )
            .unwrap(),
        );
        index
    }

    fn migrate(source: &str, index: &LayoutIndex, collapse_threshold: usize) -> String {
        let catalog = LayoutBindingCatalog::from_index(index, "com.example.app");
        let ctx = MigrationContext {
            package: "com.example.app",
            helper_package: "com.example.app.viewbinding",
            layouts: index,
            catalog: &catalog,
            collapse_threshold,
        };
        let file = parse_kotlin(source);
        let class = &file.classes[0];
        let layouts: Vec<_> = index.iter().collect();
        let scope = ResolveScope::new(layouts, true);
        let refs = collect_class(class, &scope);
        let mut edits = Vec::new();
        let mut imports = ImportPlan::new();
        migrate_list_item(class, source, &refs, &ctx, &mut edits, &mut imports).unwrap();
        apply_edits(source, edits).unwrap()
    }

    const HEADER_ITEM: &str = r#"class HeaderItem(private val text: String) : Item() {

    override fun getLayout() = R.layout.item_header

    fun bind(viewHolder: GroupieViewHolder, position: Int) {
        itemView.setOnClickListener { }
        titleView.text = text
        subtitleView.text = text
    }

    override fun onViewAttachedToWindow(viewHolder: GroupieViewHolder) {
    }
}
"#;

    #[test]
    fn test_holder_param_retyped_to_binding() {
        let out = migrate(HEADER_ITEM, &item_index(), 3);
        assert!(out.contains("fun bind(viewHolder: ItemHeaderBinding, position: Int)"));
    }

    #[test]
    fn test_supertype_becomes_bindable_item() {
        let out = migrate(HEADER_ITEM, &item_index(), 3);
        assert!(out.contains(": BindableItem<ItemHeaderBinding>()"));
        assert!(!out.contains(": Item()"));
    }

    #[test]
    fn test_entry_supertype_becomes_bindable_item() {
        let source = r#"class HeaderItem(private val text: String) : Entry() {

    fun bind(viewHolder: GroupieViewHolder, position: Int) {
        titleView.text = text
    }
}
"#;
        let out = migrate(source, &item_index(), 3);
        assert!(out.contains(": BindableItem<ItemHeaderBinding>()"));
        assert!(!out.contains(": Entry()"));
    }

    #[test]
    fn test_attach_callback_keeps_generic_holder() {
        let out = migrate(HEADER_ITEM, &item_index(), 3);
        assert!(out
            .contains("fun onViewAttachedToWindow(viewHolder: GroupieViewHolder<ItemHeaderBinding>)"));
    }

    #[test]
    fn test_item_view_becomes_root() {
        let out = migrate(HEADER_ITEM, &item_index(), 3);
        assert!(out.contains("root.setOnClickListener { }"));
        assert!(!out.contains("itemView"));
    }

    #[test]
    fn test_initialize_view_binding_inserted_before_bind() {
        let out = migrate(HEADER_ITEM, &item_index(), 3);
        let init_at = out
            .find("override fun initializeViewBinding(view: View): ItemHeaderBinding = ItemHeaderBinding.bind(view)")
            .unwrap();
        let bind_at = out.find("fun bind(").unwrap();
        assert!(init_at < bind_at);
    }

    #[test]
    fn test_no_bindings_leaves_class_untouched() {
        let source = r#"class PlainItem : Item() {
    fun bind(viewHolder: GroupieViewHolder, position: Int) {
        itemView.setOnClickListener { }
    }
}
"#;
        let out = migrate(source, &item_index(), 3);
        assert_eq!(out, source);
    }

    #[test]
    fn test_extension_receiver_retyped() {
        let source = r#"class HeaderItem : Item() {
    fun GroupieViewHolder.decorate() {
        titleView.text = "x"
    }
}
"#;
        let out = migrate(source, &item_index(), 3);
        assert!(out.contains("fun ItemHeaderBinding.decorate()"));
    }

    #[test]
    fn test_collapse_to_view_binding() {
        let mut index = item_index();
        index.insert(
            parse_layout(
                "item_footer",
                r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                    <TextView android:id="@+id/footer_note" />
                </LinearLayout>"#,
            )
            .unwrap(),
        );
        let source = r#"class MixedItem : Item() {
    fun bindHeader(viewHolder: GroupieViewHolder) { subtitleView.show() }
    fun bindRow(viewHolder: GroupieViewHolder) { rowLabel.show() }
    fun bindFooter(viewHolder: GroupieViewHolder) { footerNote.show() }
}
"#;
        let out = migrate(source, &index, 3);
        assert!(out.contains(": BindableItem<ViewBinding>()"));
    }
}
