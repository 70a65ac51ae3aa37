//! View binding class catalog
//!
//! The build generates one `*Binding` class per layout file. The migration
//! only needs their names and field sets, so the catalog derives both from
//! the layout index instead of asking the build for generated sources.

use std::collections::BTreeSet;

use crate::layout::{LayoutFile, LayoutIndex};
use crate::resource::{binding_property_name, layout_to_binding_name};

/// One generated binding class, e.g. `ActivityFooBinding` for
/// `activity_foo.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingClass {
    /// Simple class name, `ActivityFooBinding`
    pub name: String,
    /// Fully qualified name under the module's `databinding` package
    pub qualified_name: String,
    /// Source layout base name, `activity_foo`
    pub layout_name: String,
    /// Camel-cased ids the class exposes as fields
    pub fields: BTreeSet<String>,
}

impl BindingClass {
    pub fn from_layout(layout: &LayoutFile, package: &str) -> Self {
        let name = layout_to_binding_name(&layout.name);
        let qualified_name = format!("{}.databinding.{}", package, name);
        let fields = layout
            .views
            .iter()
            .map(|v| v.view_id.clone())
            .collect::<BTreeSet<_>>();
        BindingClass {
            name,
            qualified_name,
            layout_name: layout.name.clone(),
            fields,
        }
    }

    /// Property name a migrated class uses for this binding when several
    /// bindings coexist, e.g. `activityFooBinding`.
    pub fn property_name(&self) -> String {
        binding_property_name(&self.name)
    }

    pub fn has_field(&self, view_id: &str) -> bool {
        self.fields.contains(view_id)
    }

    /// True when every id in `view_ids` is a field of this class.
    pub fn covers(&self, view_ids: &BTreeSet<String>) -> bool {
        view_ids.iter().all(|id| self.fields.contains(id))
    }
}

/// Source of binding classes for a module. Shared across batch workers,
/// so implementations must be thread-safe.
pub trait BindingCatalog: Sync {
    fn binding_for_layout(&self, layout_name: &str) -> Option<&BindingClass>;

    /// Every known binding, used when a reference set must be matched
    /// against all candidates (list items bound through helper functions).
    fn all_bindings(&self) -> Vec<&BindingClass>;
}

/// Catalog backed by the module's parsed layouts.
#[derive(Debug, Default, Clone)]
pub struct LayoutBindingCatalog {
    bindings: Vec<BindingClass>,
}

impl LayoutBindingCatalog {
    pub fn from_index(index: &LayoutIndex, package: &str) -> Self {
        let bindings = index
            .iter()
            .map(|layout| BindingClass::from_layout(layout, package))
            .collect();
        LayoutBindingCatalog { bindings }
    }
}

impl BindingCatalog for LayoutBindingCatalog {
    fn binding_for_layout(&self, layout_name: &str) -> Option<&BindingClass> {
        self.bindings.iter().find(|b| b.layout_name == layout_name)
    }

    fn all_bindings(&self) -> Vec<&BindingClass> {
        self.bindings.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::parse_layout;

    fn catalog() -> LayoutBindingCatalog {
        let mut index = LayoutIndex::new();
        index.insert(
            parse_layout(
                "activity_foo",
                r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
                    <TextView android:id="@+id/foo_text_view" />
                    <Button android:id="@+id/submit_button" />
                </FrameLayout>"#,
            )
            .unwrap(),
        );
        index.insert(
            parse_layout(
                "item_header",
                r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                    <TextView android:id="@+id/title" />
                </LinearLayout>"#,
            )
            .unwrap(),
        );
        LayoutBindingCatalog::from_index(&index, "com.example.app")
    }

    #[test]
    fn test_binding_names_from_layout() {
        let catalog = catalog();
        let binding = catalog.binding_for_layout("activity_foo").unwrap();
        assert_eq!(binding.name, "ActivityFooBinding");
        assert_eq!(
            binding.qualified_name,
            "com.example.app.databinding.ActivityFooBinding"
        );
        assert_eq!(binding.property_name(), "activityFooBinding");
    }

    #[test]
    fn test_fields_are_camel_cased_ids() {
        let catalog = catalog();
        let binding = catalog.binding_for_layout("activity_foo").unwrap();
        assert!(binding.has_field("fooTextView"));
        assert!(binding.has_field("submitButton"));
        assert!(!binding.has_field("title"));
    }

    #[test]
    fn test_covers() {
        let catalog = catalog();
        let binding = catalog.binding_for_layout("item_header").unwrap();
        let used: BTreeSet<String> = ["title".to_string()].into_iter().collect();
        assert!(binding.covers(&used));
        let missing: BTreeSet<String> = ["title".to_string(), "subtitle".to_string()]
            .into_iter()
            .collect();
        assert!(!binding.covers(&missing));
    }

    #[test]
    fn test_unknown_layout() {
        assert!(catalog().binding_for_layout("activity_bar").is_none());
    }
}
