//! Synthetic reference collection
//!
//! A pure fold over one class body: every name expression is resolved
//! against the layouts named by the file's synthetic imports, and matches
//! come back as an immutable `CollectedReferences`. Nothing is mutated
//! while reading; nested classes are collected as their own units.

use crate::edit::Span;
use crate::kotlin::{Expr, KotlinClass, Member, Property, WhenEntry};
use crate::layout::{LayoutFile, LayoutView};

/// Layouts visible to one file through its synthetic imports.
pub struct ResolveScope<'a> {
    layouts: Vec<&'a LayoutFile>,
    /// Groupie item classes also track `itemView`/`containerView` usages
    list_item: bool,
}

impl<'a> ResolveScope<'a> {
    pub fn new(layouts: Vec<&'a LayoutFile>, list_item: bool) -> Self {
        ResolveScope { layouts, list_item }
    }

    pub fn layouts(&self) -> &[&'a LayoutFile] {
        &self.layouts
    }

    fn resolve(&self, name: &str) -> Option<(&'a LayoutFile, &'a LayoutView)> {
        for layout in &self.layouts {
            if let Some(view) = layout.find_view(name) {
                return Some((layout, view));
            }
        }
        None
    }
}

/// One resolved usage of a synthetic view property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReference {
    pub span: Span,
    pub layout_name: String,
    pub root_tag: String,
    pub view_id: String,
    pub include_layout: Option<String>,
    pub view_stub_layout: Option<String>,
    /// Name of the function the usage sits in, when any
    pub enclosing_function: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedReferences {
    pub views: Vec<ViewReference>,
    /// Spans of `itemView`/`containerView` names inside a list-item class
    pub item_view_refs: Vec<Span>,
}

impl CollectedReferences {
    pub fn is_empty(&self) -> bool {
        self.views.is_empty() && self.item_view_refs.is_empty()
    }

    /// Distinct layouts referenced, in first-seen order.
    pub fn layout_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for view in &self.views {
            if !names.contains(&view.layout_name.as_str()) {
                names.push(&view.layout_name);
            }
        }
        names
    }
}

/// Collect every synthetic reference in one class body.
pub fn collect_class(class: &KotlinClass, scope: &ResolveScope) -> CollectedReferences {
    let mut out = CollectedReferences::default();
    let Some(body) = &class.body else {
        return out;
    };
    for member in &body.members {
        match member {
            Member::Property(property) => collect_property(property, scope, None, &mut out),
            Member::Function(function) => {
                let enclosing = Some(function.name.as_str());
                if let Some(block) = &function.body {
                    for statement in &block.statements {
                        collect_expr(statement, scope, enclosing, &mut out);
                    }
                }
                if let Some(expr) = &function.expr_body {
                    collect_expr(expr, scope, enclosing, &mut out);
                }
            }
            Member::Init(init) => {
                for statement in &init.block.statements {
                    collect_expr(statement, scope, None, &mut out);
                }
            }
            // nested classes are their own migration units
            Member::Class(_) | Member::Other(_) => {}
        }
    }
    out
}

fn collect_property(
    property: &Property,
    scope: &ResolveScope,
    enclosing: Option<&str>,
    out: &mut CollectedReferences,
) {
    if let Some(expr) = &property.initializer {
        collect_expr(expr, scope, enclosing, out);
    }
    if let Some(expr) = &property.delegate {
        collect_expr(expr, scope, enclosing, out);
    }
    for accessor in &property.accessors {
        collect_expr(accessor, scope, enclosing, out);
    }
}

fn collect_name(
    text: &str,
    span: Span,
    scope: &ResolveScope,
    enclosing: Option<&str>,
    out: &mut CollectedReferences,
) {
    if scope.list_item && (text == "itemView" || text == "containerView") {
        out.item_view_refs.push(span);
        return;
    }
    if let Some((layout, view)) = scope.resolve(text) {
        out.views.push(ViewReference {
            span,
            layout_name: layout.name.clone(),
            root_tag: layout.root_tag.clone(),
            view_id: view.view_id.clone(),
            include_layout: view.include_layout.clone(),
            view_stub_layout: view.view_stub_layout.clone(),
            enclosing_function: enclosing.map(str::to_string),
        });
    }
}

fn collect_block(
    block: &crate::kotlin::Block,
    scope: &ResolveScope,
    enclosing: Option<&str>,
    out: &mut CollectedReferences,
) {
    for statement in &block.statements {
        collect_expr(statement, scope, enclosing, out);
    }
}

fn collect_expr(
    expr: &Expr,
    scope: &ResolveScope,
    enclosing: Option<&str>,
    out: &mut CollectedReferences,
) {
    match expr {
        Expr::Name { text, span } => collect_name(text, *span, scope, enclosing, out),
        Expr::Literal { .. } | Expr::Opaque { .. } => {}
        Expr::Qualified {
            receiver, selector, ..
        } => {
            collect_expr(receiver, scope, enclosing, out);
            collect_expr(selector, scope, enclosing, out);
        }
        Expr::Call {
            callee,
            args,
            lambda,
            ..
        } => {
            collect_expr(callee, scope, enclosing, out);
            for arg in args {
                collect_expr(arg, scope, enclosing, out);
            }
            if let Some(block) = lambda {
                collect_block(block, scope, enclosing, out);
            }
        }
        Expr::Index { receiver, args, .. } => {
            collect_expr(receiver, scope, enclosing, out);
            for arg in args {
                collect_expr(arg, scope, enclosing, out);
            }
        }
        Expr::Lambda { block, .. } => collect_block(block, scope, enclosing, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, scope, enclosing, out);
            collect_expr(rhs, scope, enclosing, out);
        }
        Expr::Unary { operand, .. } => collect_expr(operand, scope, enclosing, out),
        Expr::StringTemplate { entries, .. } => {
            for entry in entries {
                collect_expr(entry, scope, enclosing, out);
            }
        }
        Expr::Paren { inner, .. } => collect_expr(inner, scope, enclosing, out),
        Expr::BlockExpr(block) => collect_block(block, scope, enclosing, out),
        Expr::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            collect_expr(condition, scope, enclosing, out);
            collect_expr(then_branch, scope, enclosing, out);
            if let Some(else_branch) = else_branch {
                collect_expr(else_branch, scope, enclosing, out);
            }
        }
        Expr::When {
            subject, entries, ..
        } => {
            if let Some(subject) = subject {
                collect_expr(subject, scope, enclosing, out);
            }
            for WhenEntry { conditions, body } in entries {
                for condition in conditions {
                    collect_expr(condition, scope, enclosing, out);
                }
                collect_expr(body, scope, enclosing, out);
            }
        }
        Expr::For {
            iterable, body, ..
        } => {
            collect_expr(iterable, scope, enclosing, out);
            collect_expr(body, scope, enclosing, out);
        }
        Expr::While {
            condition, body, ..
        }
        | Expr::DoWhile {
            condition, body, ..
        } => {
            collect_expr(condition, scope, enclosing, out);
            collect_expr(body, scope, enclosing, out);
        }
        Expr::Try {
            body,
            catches,
            finally,
            ..
        } => {
            collect_block(body, scope, enclosing, out);
            for catch in catches {
                collect_block(catch, scope, enclosing, out);
            }
            if let Some(finally) = finally {
                collect_block(finally, scope, enclosing, out);
            }
        }
        Expr::Jump { value, .. } => {
            if let Some(value) = value {
                collect_expr(value, scope, enclosing, out);
            }
        }
        Expr::LocalProperty {
            initializer,
            delegate,
            ..
        } => {
            if let Some(expr) = initializer {
                collect_expr(expr, scope, enclosing, out);
            }
            if let Some(expr) = delegate {
                collect_expr(expr, scope, enclosing, out);
            }
        }
        Expr::LocalFunction(function) => {
            if let Some(block) = &function.body {
                collect_block(block, scope, enclosing, out);
            }
            if let Some(expr) = &function.expr_body {
                collect_expr(expr, scope, enclosing, out);
            }
        }
    }
}
