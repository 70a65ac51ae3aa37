//! Class family classification
//!
//! Which rewrite rules apply to a class is decided once, from its supertype
//! chain, into a closed set of families. Chains through project-local base
//! classes are followed via an index built from all parsed files.

use std::collections::{HashMap, HashSet};

use crate::kotlin::{Import, KotlinClass, KotlinFile};

/// The three class shapes with distinct rewrite rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFamily {
    /// Activities and dialogs: a `setContentView(R.layout...)` call owns
    /// the layout, the binding is inflated in place of it
    ContentView,
    /// Custom views: the layout is inflated into (or bound onto) the view
    /// itself
    View,
    /// Groupie list items bound through holder extension functions
    ListItem,
}

const CONTENT_VIEW_QUALIFIED: &[&str] = &[
    "android.app.Activity",
    "android.app.Dialog",
    "android.app.AlertDialog",
    "androidx.activity.ComponentActivity",
    "androidx.appcompat.app.AppCompatActivity",
    "androidx.appcompat.app.AppCompatDialog",
    "androidx.appcompat.app.AlertDialog",
    "androidx.fragment.app.FragmentActivity",
];

const CONTENT_VIEW_SIMPLE: &[&str] = &[
    "Activity",
    "ComponentActivity",
    "AppCompatActivity",
    "FragmentActivity",
    "Dialog",
    "AppCompatDialog",
    "AlertDialog",
];

const VIEW_QUALIFIED: &[&str] = &[
    "android.view.View",
    "android.view.ViewGroup",
    "android.widget.FrameLayout",
    "android.widget.LinearLayout",
    "android.widget.RelativeLayout",
    "android.widget.ScrollView",
    "androidx.cardview.widget.CardView",
    "androidx.constraintlayout.widget.ConstraintLayout",
    "androidx.core.widget.NestedScrollView",
];

const VIEW_SIMPLE: &[&str] = &[
    "View",
    "ViewGroup",
    "FrameLayout",
    "LinearLayout",
    "RelativeLayout",
    "ScrollView",
    "NestedScrollView",
    "CardView",
    "ConstraintLayout",
];

const LIST_ITEM_QUALIFIED: &[&str] = &[
    "com.xwray.groupie.kotlinandroidextensions.Item",
    "com.xwray.groupie.kotlinandroidextensions.GroupieViewHolder",
];

const LIST_ITEM_SIMPLE: &[&str] = &["Item", "GroupieViewHolder"];

const MAX_CHAIN_DEPTH: usize = 32;

/// Supertype names of every class declared in the module, keyed by simple
/// class name, with each base resolved against its file's imports.
#[derive(Debug, Default, Clone)]
pub struct ClassIndex {
    supers: HashMap<String, Vec<String>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: &KotlinFile) {
        for class in &file.classes {
            self.add_class(class, &file.imports);
        }
    }

    fn add_class(&mut self, class: &KotlinClass, imports: &[Import]) {
        if !class.name.is_empty() {
            let bases = class
                .super_entries
                .iter()
                .map(|e| resolve_base(e.base_name(), imports))
                .collect();
            self.supers.insert(class.name.clone(), bases);
        }
        if let Some(body) = &class.body {
            for member in &body.members {
                if let crate::kotlin::Member::Class(nested) = member {
                    self.add_class(nested, imports);
                }
            }
        }
    }

    fn bases_of(&self, name: &str) -> Option<&[String]> {
        self.supers.get(name).map(|v| v.as_slice())
    }
}

fn resolve_base(base: &str, imports: &[Import]) -> String {
    if base.contains('.') {
        return base.to_string();
    }
    for import in imports {
        if import.path.rsplit('.').next() == Some(base) {
            return import.path.clone();
        }
    }
    base.to_string()
}

fn family_of_base(base: &str, groupie_in_scope: bool) -> Option<ClassFamily> {
    if LIST_ITEM_QUALIFIED.contains(&base)
        || (groupie_in_scope && LIST_ITEM_SIMPLE.contains(&base))
    {
        return Some(ClassFamily::ListItem);
    }
    if CONTENT_VIEW_QUALIFIED.contains(&base) || CONTENT_VIEW_SIMPLE.contains(&base) {
        return Some(ClassFamily::ContentView);
    }
    if VIEW_QUALIFIED.contains(&base) || VIEW_SIMPLE.contains(&base) {
        return Some(ClassFamily::View);
    }
    None
}

/// Walk the supertype chain until a known family matches. Returns `None`
/// for classes outside all three families, which the rewrite skips.
pub fn classify(class: &KotlinClass, imports: &[Import], index: &ClassIndex) -> Option<ClassFamily> {
    let groupie_in_scope = imports.iter().any(|i| i.path.starts_with("com.xwray.groupie"));

    let mut queue: Vec<String> = class
        .super_entries
        .iter()
        .map(|e| resolve_base(e.base_name(), imports))
        .collect();
    let mut visited = HashSet::new();
    let mut depth = 0;

    while let Some(base) = queue.pop() {
        if depth >= MAX_CHAIN_DEPTH || !visited.insert(base.clone()) {
            continue;
        }
        depth += 1;
        if let Some(family) = family_of_base(&base, groupie_in_scope) {
            return Some(family);
        }
        let simple = base.rsplit('.').next().unwrap_or(&base);
        if let Some(parents) = index.bases_of(simple) {
            queue.extend(parents.iter().cloned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kotlin::parse_kotlin;

    fn classify_source(source: &str) -> Option<ClassFamily> {
        let file = parse_kotlin(source);
        let mut index = ClassIndex::new();
        index.add_file(&file);
        classify(&file.classes[0], &file.imports, &index)
    }

    #[test]
    fn test_activity_by_import() {
        let family = classify_source(
            "import androidx.appcompat.app.AppCompatActivity\n\
             class FooActivity : AppCompatActivity() {}\n",
        );
        assert_eq!(family, Some(ClassFamily::ContentView));
    }

    #[test]
    fn test_dialog_is_content_view() {
        let family = classify_source(
            "import android.app.Dialog\nclass HintDialog(ctx: Context) : Dialog(ctx) {}\n",
        );
        assert_eq!(family, Some(ClassFamily::ContentView));
    }

    #[test]
    fn test_custom_view() {
        let family = classify_source(
            "import android.widget.FrameLayout\n\
             class BannerView(context: Context) : FrameLayout(context) {}\n",
        );
        assert_eq!(family, Some(ClassFamily::View));
    }

    #[test]
    fn test_groupie_item_needs_groupie_import() {
        let with_import = classify_source(
            "import com.xwray.groupie.kotlinandroidextensions.Item\n\
             class HeaderItem : Item() {}\n",
        );
        assert_eq!(with_import, Some(ClassFamily::ListItem));

        let without = classify_source("class HeaderItem : Item() {}\n");
        assert_eq!(without, None);
    }

    #[test]
    fn test_chain_through_local_base() {
        let source = "import androidx.appcompat.app.AppCompatActivity\n\
             class BaseScreen : AppCompatActivity() {}\n\
             class FooActivity : BaseScreen() {}\n";
        let file = parse_kotlin(source);
        let mut index = ClassIndex::new();
        index.add_file(&file);
        let family = classify(&file.classes[1], &file.imports, &index);
        assert_eq!(family, Some(ClassFamily::ContentView));
    }

    #[test]
    fn test_unrelated_class() {
        assert_eq!(classify_source("class Presenter(val repo: Repo) {}\n"), None);
    }

    #[test]
    fn test_cycle_terminates() {
        let source = "class A : B() {}\nclass B : A() {}\n";
        let file = parse_kotlin(source);
        let mut index = ClassIndex::new();
        index.add_file(&file);
        assert_eq!(classify(&file.classes[0], &file.imports, &index), None);
    }
}
