//! Android layout XML model
//!
//! A layout file is reduced to the facts the migration needs: the root tag
//! name and every tag carrying an `android:id`, together with the target
//! layout of `<include>` and `<ViewStub>` tags. The scanner is deliberately
//! shallow; it never builds a full DOM.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::resource::{parse_resource_reference, to_camel_case_var, ResourceKind};

/// How a view id is declared, which decides the generated property shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Plain,
    Include,
    ViewStub,
}

/// One id-bearing tag inside a layout file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutView {
    /// Raw id resource name, e.g. `foo_text_view`
    pub raw_id: String,
    /// Camel-cased identifier, e.g. `fooTextView`
    pub view_id: String,
    /// Owning tag name, e.g. `TextView`, `include`, `ViewStub`
    pub tag_name: String,
    pub tag_kind: TagKind,
    /// Target layout of an `<include layout="@layout/..."/>` tag
    pub include_layout: Option<String>,
    /// Target layout of a `<ViewStub android:layout="@layout/..."/>` tag
    pub view_stub_layout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutFile {
    /// File base name without extension, e.g. `activity_foo`
    pub name: String,
    /// Root XML element name (`merge`, `FrameLayout`, a custom view, ...)
    pub root_tag: String,
    pub views: Vec<LayoutView>,
}

impl LayoutFile {
    pub fn find_view(&self, view_id: &str) -> Option<&LayoutView> {
        self.views.iter().find(|v| v.view_id == view_id)
    }

    /// True when two views in this layout share an id. XML authoring
    /// error; the class referencing this layout is rejected rather than
    /// silently picking a winner.
    pub fn has_duplicate_ids(&self) -> bool {
        let mut seen = std::collections::BTreeSet::new();
        self.views.iter().any(|v| !seen.insert(v.view_id.as_str()))
    }
}

/// Parse a layout file's XML into a [`LayoutFile`].
pub fn parse_layout(name: &str, xml: &str) -> Result<LayoutFile> {
    let mut root_tag = String::new();
    let mut views = Vec::new();

    for tag in TagScanner::new(xml) {
        if root_tag.is_empty() {
            root_tag = tag.name.clone();
        }

        let Some(id_value) = tag.attr("android:id") else {
            continue;
        };
        let Some(reference) = parse_resource_reference(id_value) else {
            continue;
        };
        if !reference.is_local_id() {
            // @+android:id/... framework ids have no binding field
            continue;
        }

        let tag_kind = match tag.name.as_str() {
            "include" => TagKind::Include,
            "ViewStub" => TagKind::ViewStub,
            _ => TagKind::Plain,
        };
        let target_layout = tag
            .attr("layout")
            .or_else(|| tag.attr("android:layout"))
            .and_then(parse_resource_reference)
            .filter(|r| r.kind == ResourceKind::Layout)
            .map(|r| r.name);

        views.push(LayoutView {
            view_id: to_camel_case_var(&reference.name),
            raw_id: reference.name,
            tag_name: tag.name,
            tag_kind,
            include_layout: if tag_kind == TagKind::Include {
                target_layout.clone()
            } else {
                None
            },
            view_stub_layout: if tag_kind == TagKind::ViewStub {
                target_layout
            } else {
                None
            },
        });
    }

    if root_tag.is_empty() {
        anyhow::bail!("layout {} has no root element", name);
    }

    Ok(LayoutFile {
        name: name.to_string(),
        root_tag,
        views,
    })
}

/// All layouts of a module, keyed by base name.
#[derive(Debug, Default, Clone)]
pub struct LayoutIndex {
    layouts: BTreeMap<String, LayoutFile>,
}

impl LayoutIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layout: LayoutFile) {
        self.layouts.insert(layout.name.clone(), layout);
    }

    pub fn get(&self, name: &str) -> Option<&LayoutFile> {
        self.layouts.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutFile> {
        self.layouts.values()
    }

    /// Load every `*.xml` under the module's `res/layout*` directories.
    /// Variant directories (`layout-land`, `layout-sw600dp`) merge into the
    /// same base name; the first parsed file wins for the root tag, ids
    /// from variants are appended when new.
    pub fn load_res_dirs(res_dirs: &[impl AsRef<Path>]) -> Result<Self> {
        let mut index = LayoutIndex::new();
        for res_dir in res_dirs {
            let res_dir = res_dir.as_ref();
            if !res_dir.exists() {
                continue;
            }
            for entry in WalkDir::new(res_dir)
                .min_depth(2)
                .max_depth(2)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                let in_layout_dir = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n == "layout" || n.starts_with("layout-"));
                if !in_layout_dir
                    || path.extension().and_then(|e| e.to_str()) != Some("xml")
                    || !path.is_file()
                {
                    continue;
                }
                let name = path
                    .file_stem()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                let xml = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read layout {}", path.display()))?;
                let parsed = parse_layout(&name, &xml)
                    .with_context(|| format!("Failed to parse layout {}", path.display()))?;
                match index.layouts.get_mut(&name) {
                    None => index.insert(parsed),
                    Some(existing) => {
                        for view in parsed.views {
                            if existing.find_view(&view.view_id).is_none() {
                                existing.views.push(view);
                            }
                        }
                    }
                }
            }
        }
        Ok(index)
    }
}

/// `package` attribute of the root `<manifest>` element of an
/// AndroidManifest.xml.
pub fn manifest_package(xml: &str) -> Option<String> {
    let tag = TagScanner::new(xml).find(|t| t.name == "manifest")?;
    tag.attr("package").map(str::to_string)
}

struct RawTag {
    name: String,
    attrs: Vec<(String, String)>,
}

impl RawTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Yields every opening tag with its attributes. Comments, CDATA,
/// processing instructions and closing tags are skipped.
struct TagScanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    fn new(source: &'a str) -> Self {
        TagScanner { source, pos: 0 }
    }

    fn skip_past(&mut self, marker: &str) {
        match self.source[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.source.len(),
        }
    }

    fn read_tag(&mut self) -> Option<RawTag> {
        let bytes = self.source.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len() {
            let c = bytes[end] as char;
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':' || c == '-' {
                end += 1;
            } else {
                break;
            }
        }
        if end == start {
            return None;
        }
        let name = self.source[start..end].to_string();
        self.pos = end;

        let mut attrs = Vec::new();
        loop {
            while self.pos < bytes.len() && (bytes[self.pos] as char).is_whitespace() {
                self.pos += 1;
            }
            if self.pos >= bytes.len() {
                break;
            }
            let c = bytes[self.pos] as char;
            if c == '>' || c == '/' || c == '?' {
                self.skip_past(">");
                break;
            }
            let attr_start = self.pos;
            while self.pos < bytes.len() {
                let c = bytes[self.pos] as char;
                if c == '=' || c.is_whitespace() || c == '>' || c == '/' {
                    break;
                }
                self.pos += 1;
            }
            let attr_name = self.source[attr_start..self.pos].to_string();
            while self.pos < bytes.len() && (bytes[self.pos] as char).is_whitespace() {
                self.pos += 1;
            }
            if self.pos >= bytes.len() || bytes[self.pos] != b'=' {
                continue;
            }
            self.pos += 1;
            while self.pos < bytes.len() && (bytes[self.pos] as char).is_whitespace() {
                self.pos += 1;
            }
            if self.pos >= bytes.len() {
                break;
            }
            let quote = bytes[self.pos];
            if quote != b'"' && quote != b'\'' {
                continue;
            }
            self.pos += 1;
            let value_start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos] != quote {
                self.pos += 1;
            }
            let value = self.source[value_start..self.pos].to_string();
            if self.pos < bytes.len() {
                self.pos += 1;
            }
            attrs.push((attr_name, value));
        }
        Some(RawTag { name, attrs })
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = RawTag;

    fn next(&mut self) -> Option<RawTag> {
        loop {
            let rest = &self.source[self.pos..];
            let lt = rest.find('<')?;
            self.pos += lt + 1;
            let after = &self.source[self.pos..];
            if after.starts_with("!--") {
                self.skip_past("-->");
            } else if after.starts_with("![CDATA[") {
                self.skip_past("]]>");
            } else if after.starts_with('?') || after.starts_with('/') || after.starts_with('!') {
                self.skip_past(">");
            } else if let Some(tag) = self.read_tag() {
                return Some(tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVITY_FOO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent">

    <!-- header comes from a shared layout -->
    <include
        android:id="@+id/header"
        layout="@layout/layout_header" />

    <TextView
        android:id="@+id/foo_text_view"
        android:layout_width="wrap_content"
        android:layout_height="wrap_content" />

    <ViewStub
        android:id="@+id/error_stub"
        android:layout="@layout/layout_error" />

    <ListView android:id="@+android:id/list" />
</FrameLayout>
"#;

    #[test]
    fn test_parse_layout_views() {
        let layout = parse_layout("activity_foo", ACTIVITY_FOO).unwrap();
        assert_eq!(layout.root_tag, "FrameLayout");
        assert_eq!(layout.views.len(), 3);

        let header = layout.find_view("header").unwrap();
        assert_eq!(header.tag_kind, TagKind::Include);
        assert_eq!(header.include_layout.as_deref(), Some("layout_header"));

        let text = layout.find_view("fooTextView").unwrap();
        assert_eq!(text.tag_kind, TagKind::Plain);
        assert_eq!(text.tag_name, "TextView");
        assert_eq!(text.raw_id, "foo_text_view");

        let stub = layout.find_view("errorStub").unwrap();
        assert_eq!(stub.tag_kind, TagKind::ViewStub);
        assert_eq!(stub.view_stub_layout.as_deref(), Some("layout_error"));
    }

    #[test]
    fn test_framework_id_skipped() {
        let layout = parse_layout("activity_foo", ACTIVITY_FOO).unwrap();
        assert!(layout.find_view("list").is_none());
    }

    #[test]
    fn test_merge_root() {
        let xml = r#"<merge xmlns:android="http://schemas.android.com/apk/res/android">
            <TextView android:id="@+id/title" />
        </merge>"#;
        let layout = parse_layout("view_title", xml).unwrap();
        assert_eq!(layout.root_tag, "merge");
        assert!(layout.find_view("title").is_some());
    }

    #[test]
    fn test_duplicate_ids_detected() {
        let xml = r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
            <TextView android:id="@+id/title" />
            <TextView android:id="@+id/title" />
        </LinearLayout>"#;
        let layout = parse_layout("broken", xml).unwrap();
        assert!(layout.has_duplicate_ids());
    }

    #[test]
    fn test_empty_layout_rejected() {
        assert!(parse_layout("empty", "<!-- nothing here -->").is_err());
    }

    #[test]
    fn test_manifest_package() {
        let xml = r#"<?xml version="1.0"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.app">
    <application android:label="Demo" />
</manifest>"#;
        assert_eq!(manifest_package(xml).as_deref(), Some("com.example.app"));
        assert_eq!(manifest_package("<application />"), None);
    }
}
