//! Resource reference parsing and identifier case conversion
//!
//! Layout XML refers to resources with tokens like `@+id/my_view` or
//! `@layout/activity_foo`. This module turns those tokens into structured
//! references and converts resource names into Kotlin identifiers and
//! binding class names.

//! A parsed `@[+][package:]type/name` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Namespace prefix, e.g. `android` in `@+android:id/list`
    pub namespace: Option<String>,
    pub kind: ResourceKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Id,
    Layout,
    Other(String),
}

impl ResourceReference {
    /// True for plain `@+id/...` / `@id/...` references without a
    /// framework namespace. Only these have a generated binding field.
    pub fn is_local_id(&self) -> bool {
        self.kind == ResourceKind::Id && self.namespace.is_none()
    }
}

/// Parse a raw attribute value into a [`ResourceReference`].
///
/// Returns `None` when the string does not match the expected grammar.
/// Callers treat that as "not a resource reference" and skip it.
pub fn parse_resource_reference(raw: &str) -> Option<ResourceReference> {
    let rest = raw.trim().strip_prefix('@')?;
    let rest = rest.strip_prefix('+').unwrap_or(rest);

    let (prefix, name) = rest.split_once('/')?;
    let (namespace, kind) = match prefix.split_once(':') {
        Some((ns, kind)) => (Some(ns), kind),
        None => (None, prefix),
    };

    if kind.is_empty() || name.is_empty() {
        return None;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return None;
    }

    let kind = match kind {
        "id" => ResourceKind::Id,
        "layout" => ResourceKind::Layout,
        other => ResourceKind::Other(other.to_string()),
    };

    Some(ResourceReference {
        namespace: namespace.map(|ns| ns.to_string()),
        kind,
        name: name.to_string(),
    })
}

/// Convert a resource name to a camelCase variable identifier.
///
/// `my_view` -> `myView`, `my.other-view` -> `myOtherView`.
pub fn to_camel_case_var(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' || c == '.' || c == '-' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    // Identifiers never start with an uppercase letter
    let mut chars = out.chars();
    match chars.next() {
        None => out,
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Derive the generated binding class name for a layout file name.
///
/// `activity_foo` -> `ActivityFooBinding`.
pub fn layout_to_binding_name(layout_name: &str) -> String {
    let mut out = String::with_capacity(layout_name.len() + 7);
    for segment in layout_name.split(['_', '.', '-']) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out.push_str("Binding");
    out
}

/// Property name for a binding class: `ActivityFooBinding` -> `activityFooBinding`.
pub fn binding_property_name(binding_class_name: &str) -> String {
    let mut chars = binding_class_name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}
