//! Hand-written recursive-descent parser for the Kotlin subset
//!
//! The parser is tolerant by construction: it models the declarations and
//! expression forms the migration must see through (classes, supertype
//! lists, properties, functions, init blocks, calls, lambdas, string
//! templates, control flow) and swallows everything else as opaque spans.
//! It never fails on unknown syntax, only on files it cannot even bracket.

use crate::edit::Span;
use crate::kotlin::ast::{
    Block, ClassBody, Expr, Function, Import, InitBlock, KotlinClass, KotlinFile, Member, Param,
    Property, SuperTypeEntry, WhenEntry,
};

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "internal",
    "open",
    "final",
    "abstract",
    "sealed",
    "data",
    "inner",
    "enum",
    "annotation",
    "lateinit",
    "override",
    "operator",
    "infix",
    "inline",
    "external",
    "const",
    "tailrec",
    "suspend",
    "actual",
    "expect",
    "vararg",
    "crossinline",
    "noinline",
    "reified",
];

pub struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { source, pos: 0 }
    }

    pub fn parse(mut self) -> KotlinFile {
        self.parse_file()
    }

    // ------------------------------------------------------------------
    // Low-level cursor helpers
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_str(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.at_str(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn at_word(&self, word: &str) -> bool {
        if !self.at_str(word) {
            return false;
        }
        self.source[self.pos + word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !Self::is_ident_char(c))
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.bump(),
                Some('/') if self.at_str("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.at_str("/*") => self.skip_block_comment(),
                Some(';') => self.bump(),
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        // Kotlin block comments nest
        let mut depth = 0;
        while !self.at_end() {
            if self.at_str("/*") {
                depth += 1;
                self.pos += 2;
            } else if self.at_str("*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return;
                }
            } else {
                self.bump();
            }
        }
    }

    /// Skip spaces/tabs only; reports whether a newline was crossed.
    fn trivia_crosses_newline(&self) -> bool {
        let mut probe = Parser {
            source: self.source,
            pos: self.pos,
        };
        let start = probe.pos;
        probe.skip_trivia();
        self.source[start..probe.pos].contains('\n')
    }

    fn read_identifier(&mut self) -> Option<(String, Span)> {
        self.skip_trivia();
        let start = self.pos;
        if self.peek() == Some('`') {
            self.bump();
            while let Some(c) = self.peek() {
                self.bump();
                if c == '`' {
                    break;
                }
            }
            let text = self.source[start..self.pos]
                .trim_matches('`')
                .to_string();
            return Some((text, Span::new(start, self.pos)));
        }
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if Self::is_ident_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        Some((
            self.source[start..self.pos].to_string(),
            Span::new(start, self.pos),
        ))
    }

    /// Consume a balanced bracket pair starting at the current position.
    fn skip_balanced(&mut self, open: char, close: char) {
        if self.peek() != Some(open) {
            return;
        }
        let mut depth = 0usize;
        while !self.at_end() {
            match self.peek() {
                Some('"') => self.skip_string_literal(),
                Some('\'') => self.skip_char_literal(),
                Some('/') if self.at_str("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.at_str("/*") => self.skip_block_comment(),
                Some('-') if self.at_str("->") => {
                    // keep "->" atomic so '>' never closes a bracket
                    self.pos += 2;
                }
                Some(c) if c == open => {
                    depth += 1;
                    self.bump();
                }
                Some(c) if c == close => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.bump(),
            }
        }
    }

    fn skip_string_literal(&mut self) {
        if self.eat_str("\"\"\"") {
            while !self.at_end() && !self.at_str("\"\"\"") {
                if self.at_str("${") {
                    self.pos += 1;
                    self.skip_balanced('{', '}');
                } else {
                    self.bump();
                }
            }
            self.eat_str("\"\"\"");
            return;
        }
        if self.peek() != Some('"') {
            return;
        }
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '"' => {
                    self.bump();
                    return;
                }
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '$' if self.at_str("${") => {
                    self.pos += 1;
                    self.skip_balanced('{', '}');
                }
                _ => self.bump(),
            }
        }
    }

    fn skip_char_literal(&mut self) {
        if self.peek() != Some('\'') {
            return;
        }
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '\'' => {
                    self.bump();
                    return;
                }
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '\n' => return,
                _ => self.bump(),
            }
        }
    }

    fn skip_annotation(&mut self) {
        if !self.eat_str("@") {
            return;
        }
        if let Some((_, _)) = self.read_identifier() {
            // use-site target, e.g. @file: or @get:
            if self.peek() == Some(':') {
                self.bump();
                let _ = self.read_identifier();
            }
        }
        // dotted annotation names
        while self.peek() == Some('.') {
            self.bump();
            let _ = self.read_identifier();
        }
        if self.peek() == Some('<') {
            self.skip_balanced('<', '>');
        }
        if self.peek() == Some('(') {
            self.skip_balanced('(', ')');
        }
    }

    /// Skip modifier keywords and annotations before a declaration.
    /// Returns true when `companion` was among them.
    fn skip_modifiers(&mut self) -> bool {
        let mut companion = false;
        loop {
            self.skip_trivia();
            if self.peek() == Some('@') {
                self.skip_annotation();
                continue;
            }
            if self.at_word("companion") {
                self.eat_word("companion");
                companion = true;
                continue;
            }
            let mut matched = false;
            for modifier in MODIFIERS {
                if self.at_word(modifier) {
                    self.eat_word(modifier);
                    matched = true;
                    break;
                }
            }
            if !matched {
                return companion;
            }
        }
    }

    fn skip_to_line_end(&mut self) -> usize {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        let content_end = self.pos;
        if self.peek() == Some('\n') {
            self.bump();
        }
        content_end
    }

    /// Scan a type reference, stopping at any top-level terminator.
    /// A '-' terminator means "stop at ->"; elsewhere the arrow of a
    /// function type is consumed as part of the type.
    fn skip_type(&mut self, terminators: &[char]) -> Span {
        self.skip_trivia();
        let start = self.pos;
        let mut angle = 0usize;
        let mut paren = 0usize;
        let mut square = 0usize;
        while let Some(c) = self.peek() {
            let top_level = angle == 0 && paren == 0 && square == 0;
            if self.at_str("->") {
                if top_level && terminators.contains(&'-') {
                    break;
                }
                self.pos += 2;
                continue;
            }
            if top_level && (terminators.contains(&c) || c == '\n') {
                break;
            }
            match c {
                '<' => angle += 1,
                '>' => angle = angle.saturating_sub(1),
                '(' => paren += 1,
                ')' => {
                    if paren == 0 {
                        break;
                    }
                    paren -= 1;
                }
                '[' => square += 1,
                ']' => square = square.saturating_sub(1),
                '{' if top_level => break,
                _ => {}
            }
            self.bump();
        }
        let text = &self.source[start..self.pos];
        let trimmed = text.trim_end();
        Span::new(start, start + trimmed.len())
    }

    // ------------------------------------------------------------------
    // File structure
    // ------------------------------------------------------------------

    fn parse_file(&mut self) -> KotlinFile {
        let mut package_name = None;
        let mut imports: Vec<Import> = Vec::new();
        let mut classes = Vec::new();
        let mut import_insert_offset = 0;

        self.skip_trivia();
        while self.peek() == Some('@') {
            self.skip_annotation();
            self.skip_trivia();
        }

        if self.eat_word("package") {
            let name_start = self.pos;
            let content_end = self.skip_to_line_end();
            let decl = self.source[name_start..content_end].trim();
            package_name = Some(decl.trim_end_matches(';').trim().to_string());
            import_insert_offset = self.pos;
        }

        loop {
            self.skip_trivia();
            if !self.at_word("import") {
                break;
            }
            let start = self.pos;
            self.eat_word("import");
            let content_end = self.skip_to_line_end();
            let path = self.source[start + "import".len()..content_end]
                .trim()
                .trim_end_matches(';')
                .trim()
                .to_string();
            imports.push(Import {
                path,
                span: Span::new(start, self.pos),
            });
            import_insert_offset = self.pos;
        }

        while !self.at_end() {
            let before = self.pos;
            self.skip_modifiers();
            self.skip_trivia();
            if self.at_end() {
                break;
            }
            if self.at_word("class") || self.at_word("interface") || self.at_word("object") {
                classes.push(self.parse_class());
            } else if self.at_word("fun") {
                // Top-level functions are not migration targets
                let _ = self.parse_function();
            } else if self.at_word("val") || self.at_word("var") {
                let _ = self.parse_property();
            } else if self.at_word("typealias") || self.at_word("import") || self.at_word("package")
            {
                self.skip_to_line_end();
            } else {
                self.skip_opaque_statement();
            }
            if self.pos == before {
                self.bump();
            }
        }

        KotlinFile {
            package_name,
            imports,
            import_insert_offset,
            classes,
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_class(&mut self) -> KotlinClass {
        let start = self.pos;
        let is_class = self.at_word("class");
        self.eat_word("class");
        self.eat_word("interface");
        self.eat_word("object");
        self.skip_trivia();

        let name = match self.read_identifier() {
            Some((name, _)) => name,
            None => String::new(),
        };

        self.skip_trivia();
        if self.peek() == Some('<') {
            self.skip_balanced('<', '>');
        }

        // primary constructor, possibly preceded by modifiers
        loop {
            self.skip_trivia();
            if self.peek() == Some('@') {
                self.skip_annotation();
                continue;
            }
            if self.at_word("constructor") {
                self.eat_word("constructor");
                continue;
            }
            let mut matched = false;
            for modifier in MODIFIERS {
                if self.at_word(modifier) {
                    self.eat_word(modifier);
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }
            break;
        }
        self.skip_trivia();
        if self.peek() == Some('(') {
            self.skip_balanced('(', ')');
        }

        let mut super_entries = Vec::new();
        self.skip_trivia();
        if self.peek() == Some(':') {
            self.bump();
            super_entries = self.parse_super_entries();
        }

        self.skip_trivia();
        let body = if self.peek() == Some('{') {
            Some(self.parse_class_body())
        } else {
            None
        };

        KotlinClass {
            name,
            super_entries,
            body,
            span: Span::new(start, self.pos),
            is_class,
        }
    }

    fn parse_super_entries(&mut self) -> Vec<SuperTypeEntry> {
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let mut angle = 0usize;
            let mut paren = 0usize;
            loop {
                match self.peek() {
                    None => break,
                    Some('"') => self.skip_string_literal(),
                    Some('<') => {
                        angle += 1;
                        self.bump();
                    }
                    Some('>') => {
                        angle = angle.saturating_sub(1);
                        self.bump();
                    }
                    Some('(') => {
                        paren += 1;
                        self.bump();
                    }
                    Some(')') => {
                        paren = paren.saturating_sub(1);
                        self.bump();
                    }
                    Some(',') | Some('{') | Some('\n') if angle == 0 && paren == 0 => break,
                    Some(_) => self.bump(),
                }
            }
            let text = self.source[start..self.pos].trim_end();
            if !text.is_empty() {
                entries.push(SuperTypeEntry {
                    text: text.to_string(),
                    span: Span::new(start, start + text.len()),
                });
            }
            match self.peek() {
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some('\n') => {
                    // A body-less class header ends here unless the next
                    // line continues the list
                    let mut probe = Parser {
                        source: self.source,
                        pos: self.pos,
                    };
                    probe.skip_trivia();
                    if probe.peek() == Some('{') {
                        self.pos = probe.pos;
                    }
                    break;
                }
                _ => break,
            }
        }
        entries
    }

    fn parse_class_body(&mut self) -> ClassBody {
        let l_brace = self.pos;
        self.bump(); // '{'
        let mut members = Vec::new();
        loop {
            let before = self.pos;
            self.skip_trivia();
            match self.peek() {
                None => {
                    return ClassBody {
                        l_brace,
                        r_brace: self.pos,
                        members,
                    }
                }
                Some('}') => {
                    let r_brace = self.pos;
                    self.bump();
                    return ClassBody {
                        l_brace,
                        r_brace,
                        members,
                    };
                }
                _ => {}
            }
            let member_start = self.pos;
            let companion = self.skip_modifiers();
            self.skip_trivia();
            if companion || self.at_word("class") || self.at_word("interface") || self.at_word("object")
            {
                members.push(Member::Class(self.parse_class()));
            } else if self.at_word("init") {
                self.eat_word("init");
                self.skip_trivia();
                if self.peek() == Some('{') {
                    let block = self.parse_block();
                    members.push(Member::Init(InitBlock {
                        span: Span::new(member_start, block.r_brace + 1),
                        block,
                    }));
                } else {
                    self.skip_opaque_statement();
                    members.push(Member::Other(Span::new(member_start, self.pos)));
                }
            } else if self.at_word("constructor") {
                self.eat_word("constructor");
                self.skip_trivia();
                self.skip_balanced('(', ')');
                self.skip_trivia();
                if self.peek() == Some(':') {
                    self.bump();
                    let _ = self.skip_type(&['{']);
                }
                self.skip_trivia();
                if self.peek() == Some('{') {
                    self.skip_balanced('{', '}');
                }
                members.push(Member::Other(Span::new(member_start, self.pos)));
            } else if self.at_word("fun") {
                members.push(Member::Function(self.parse_function()));
            } else if self.at_word("val") || self.at_word("var") {
                members.push(Member::Property(self.parse_property()));
            } else {
                self.skip_opaque_statement();
                members.push(Member::Other(Span::new(member_start, self.pos)));
            }
            if self.pos == before {
                self.bump();
            }
        }
    }

    fn parse_property(&mut self) -> Property {
        let start = self.pos;
        self.eat_word("val");
        self.eat_word("var");
        self.skip_trivia();

        let name = if self.peek() == Some('(') {
            // destructuring declaration
            self.skip_balanced('(', ')');
            String::new()
        } else {
            self.read_identifier().map(|(n, _)| n).unwrap_or_default()
        };

        self.skip_trivia();
        if self.peek() == Some(':') {
            self.bump();
            let _ = self.skip_type(&['=', '\n']);
        }

        let mut initializer = None;
        let mut delegate = None;
        self.skip_trivia();
        if self.peek() == Some('=') && !self.at_str("==") {
            self.bump();
            initializer = Some(self.parse_expression());
        } else if self.at_word("by") {
            self.eat_word("by");
            delegate = Some(self.parse_expression());
        }

        let mut accessors = Vec::new();
        loop {
            let save = self.pos;
            self.skip_trivia();
            // visibility modifier on an accessor, e.g. `private set`
            loop {
                let mut matched = false;
                for modifier in MODIFIERS {
                    if self.at_word(modifier) {
                        self.eat_word(modifier);
                        self.skip_trivia();
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    break;
                }
            }
            if !self.at_word("get") && !self.at_word("set") {
                self.pos = save;
                break;
            }
            self.eat_word("get");
            self.eat_word("set");
            self.skip_trivia();
            if self.peek() == Some('(') {
                self.skip_balanced('(', ')');
            }
            self.skip_trivia();
            if self.peek() == Some(':') {
                self.bump();
                let _ = self.skip_type(&['=', '\n']);
                self.skip_trivia();
            }
            if self.peek() == Some('=') {
                self.bump();
                accessors.push(self.parse_expression());
            } else if self.peek() == Some('{') {
                accessors.push(Expr::BlockExpr(self.parse_block()));
            }
        }

        Property {
            name,
            initializer,
            delegate,
            accessors,
            span: Span::new(start, self.pos),
        }
    }

    fn parse_function(&mut self) -> Function {
        let start = self.pos;
        self.eat_word("fun");
        self.skip_trivia();
        if self.peek() == Some('<') {
            self.skip_balanced('<', '>');
        }

        // receiver path followed by the function name
        let mut segments: Vec<(String, Span)> = Vec::new();
        loop {
            self.skip_trivia();
            let seg_start = self.pos;
            let Some((mut text, _)) = self.read_identifier() else {
                break;
            };
            if self.peek() == Some('<') {
                let generics_start = self.pos;
                self.skip_balanced('<', '>');
                text.push_str(&self.source[generics_start..self.pos]);
            }
            if self.peek() == Some('?') {
                text.push('?');
                self.bump();
            }
            segments.push((text, Span::new(seg_start, self.pos)));
            if self.peek() == Some('.') {
                self.bump();
            } else {
                break;
            }
        }
        let name = segments
            .last()
            .map(|(t, _)| t.clone())
            .unwrap_or_default();
        let receiver = if segments.len() > 1 {
            let first = segments[0].1.start;
            let last = segments[segments.len() - 2].1.end;
            Some((
                segments[..segments.len() - 1]
                    .iter()
                    .map(|(t, _)| t.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
                Span::new(first, last),
            ))
        } else {
            None
        };

        let params = if self.peek() == Some('(') {
            self.parse_params()
        } else {
            Vec::new()
        };

        self.skip_trivia();
        if self.peek() == Some(':') {
            self.bump();
            let _ = self.skip_type(&['{', '=', '\n']);
        }
        self.skip_trivia();
        if self.at_word("where") {
            let _ = self.skip_type(&['{', '=', '\n']);
        }

        let mut body = None;
        let mut expr_body = None;
        self.skip_trivia();
        if self.peek() == Some('{') {
            body = Some(self.parse_block());
        } else if self.peek() == Some('=') {
            self.bump();
            expr_body = Some(self.parse_expression());
        }

        Function {
            name,
            receiver,
            params,
            body,
            expr_body,
            span: Span::new(start, self.pos),
        }
    }

    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        self.bump(); // '('
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(')') => {
                    self.bump();
                    break;
                }
                Some('@') => {
                    self.skip_annotation();
                    continue;
                }
                _ => {}
            }
            for modifier in &["vararg", "crossinline", "noinline"] {
                if self.at_word(modifier) {
                    self.eat_word(modifier);
                    self.skip_trivia();
                }
            }
            let name = self.read_identifier().map(|(n, _)| n).unwrap_or_default();
            self.skip_trivia();
            let (type_text, type_span) = if self.peek() == Some(':') {
                self.bump();
                let span = self.skip_type(&[',', ')', '=']);
                (span.text(self.source).to_string(), span)
            } else {
                (String::new(), Span::new(self.pos, self.pos))
            };
            self.skip_trivia();
            if self.peek() == Some('=') {
                self.bump();
                let _ = self.skip_type(&[',', ')']);
            }
            params.push(Param {
                name,
                type_text,
                type_span,
            });
            self.skip_trivia();
            if self.peek() == Some(',') {
                self.bump();
            }
        }
        params
    }

    fn skip_opaque_statement(&mut self) {
        loop {
            match self.peek() {
                None => return,
                Some('\n') => {
                    self.bump();
                    return;
                }
                Some('"') => self.skip_string_literal(),
                Some('\'') => self.skip_char_literal(),
                Some('{') => self.skip_balanced('{', '}'),
                Some('(') => self.skip_balanced('(', ')'),
                Some('}') => return,
                Some('/') if self.at_str("//") || self.at_str("/*") => self.skip_trivia(),
                _ => self.bump(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements and expressions
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Block {
        let l_brace = self.pos;
        self.bump(); // '{'
        self.try_consume_lambda_params();
        let mut statements = Vec::new();
        loop {
            let before = self.pos;
            self.skip_trivia();
            match self.peek() {
                None => {
                    return Block {
                        l_brace,
                        r_brace: self.pos,
                        statements,
                    }
                }
                Some('}') => {
                    let r_brace = self.pos;
                    self.bump();
                    return Block {
                        l_brace,
                        r_brace,
                        statements,
                    };
                }
                _ => {}
            }
            statements.push(self.parse_statement());
            if self.pos == before {
                self.bump();
            }
        }
    }

    /// Detect and consume `a, b ->` / `(a, b) ->` at the start of a lambda.
    fn try_consume_lambda_params(&mut self) {
        let save = self.pos;
        let mut probe = Parser {
            source: self.source,
            pos: self.pos,
        };
        probe.skip_trivia();
        let mut saw_token = false;
        loop {
            probe.skip_trivia();
            match probe.peek() {
                Some('(') => {
                    probe.skip_balanced('(', ')');
                    saw_token = true;
                }
                Some(c) if c.is_alphabetic() || c == '_' || c == '`' => {
                    let _ = probe.read_identifier();
                    probe.skip_trivia();
                    if probe.peek() == Some(':') {
                        probe.bump();
                        let _ = probe.skip_type(&[',', '-']);
                    }
                    saw_token = true;
                }
                _ => break,
            }
            probe.skip_trivia();
            if probe.peek() == Some(',') {
                probe.bump();
                continue;
            }
            break;
        }
        probe.skip_trivia();
        if saw_token && probe.at_str("->") {
            probe.pos += 2;
            self.pos = probe.pos;
        } else {
            self.pos = save;
        }
    }

    fn parse_statement(&mut self) -> Expr {
        self.skip_trivia();
        while self.peek() == Some('@') {
            self.skip_annotation();
            self.skip_trivia();
        }
        if self.at_word("val") || self.at_word("var") {
            let start = self.pos;
            self.eat_word("val");
            self.eat_word("var");
            self.skip_trivia();
            let name = if self.peek() == Some('(') {
                self.skip_balanced('(', ')');
                String::new()
            } else {
                self.read_identifier().map(|(n, _)| n).unwrap_or_default()
            };
            self.skip_trivia();
            if self.peek() == Some(':') {
                self.bump();
                let _ = self.skip_type(&['=', '\n']);
            }
            let mut initializer = None;
            let mut delegate = None;
            self.skip_trivia();
            if self.peek() == Some('=') && !self.at_str("==") {
                self.bump();
                initializer = Some(Box::new(self.parse_expression()));
            } else if self.at_word("by") {
                self.eat_word("by");
                delegate = Some(Box::new(self.parse_expression()));
            }
            return Expr::LocalProperty {
                name,
                initializer,
                delegate,
                span: Span::new(start, self.pos),
            };
        }
        if self.at_word("fun") {
            return Expr::LocalFunction(Box::new(self.parse_function()));
        }
        self.parse_expression()
    }

    pub fn parse_expression(&mut self) -> Expr {
        let lhs = self.parse_postfix_unary();
        self.parse_binary_rest(lhs)
    }

    fn parse_binary_rest(&mut self, mut lhs: Expr) -> Expr {
        const OPERATORS: &[&str] = &[
            "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "?:",
            "..", "=", "+", "-", "*", "/", "%", "<", ">",
        ];
        loop {
            let save = self.pos;
            self.skip_trivia();
            // type tests bind a type on the right, consumed opaquely
            if self.at_word("is")
                || self.at_str("!is")
                || self.at_word("as")
                || self.at_word("in")
                || self.at_str("!in")
            {
                if self.at_str("!is") || self.at_str("!in") {
                    self.pos += 3;
                } else if self.eat_word("as") {
                    if self.peek() == Some('?') {
                        self.bump();
                    }
                } else {
                    self.eat_word("is");
                    self.eat_word("in");
                }
                let type_span = self.skip_type(&[',', ')', '}', ']', '\n', '-']);
                let span = Span::new(lhs.span().start, type_span.end);
                lhs = Expr::Binary {
                    lhs: Box::new(lhs),
                    rhs: Box::new(Expr::Opaque { span: type_span }),
                    span,
                };
                continue;
            }
            let mut matched = None;
            if !self.at_str("->") {
                for op in OPERATORS {
                    if self.at_str(op) {
                        // ordering in OPERATORS prefers the longest match,
                        // so '=' is never the first half of '=='
                        matched = Some(*op);
                        break;
                    }
                }
            }
            let Some(op) = matched else {
                self.pos = save;
                return lhs;
            };
            self.pos += op.len();
            let rhs = self.parse_postfix_unary();
            let span = Span::new(lhs.span().start, rhs.span().end);
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
    }

    fn parse_postfix_unary(&mut self) -> Expr {
        self.skip_trivia();
        let start = self.pos;
        for prefix in &["!", "-", "+", "++", "--"] {
            if self.at_str(prefix)
                && !self.at_str("!=")
                && !self.at_str("!is")
                && !self.at_str("!in")
            {
                // prefer the longest prefix
                if (*prefix == "-" && self.at_str("--")) || (*prefix == "+" && self.at_str("++")) {
                    continue;
                }
                self.pos += prefix.len();
                let operand = self.parse_postfix_unary();
                let span = Span::new(start, operand.span().end);
                return Expr::Unary {
                    operand: Box::new(operand),
                    span,
                };
            }
        }
        let mut expr = self.parse_primary();
        loop {
            // postfix pieces may start on the next line for '.' chains
            let save = self.pos;
            let crossed_newline = self.trivia_crosses_newline();
            self.skip_trivia();
            if self.at_str("!!") {
                self.pos += 2;
                expr = Expr::Unary {
                    span: Span::new(expr.span().start, self.pos),
                    operand: Box::new(expr),
                };
                continue;
            }
            if (self.at_str("?.") || (self.peek() == Some('.') && !self.at_str("..")))
                || self.at_str("::")
            {
                if self.at_str("?.") || self.at_str("::") {
                    self.pos += 2;
                } else {
                    self.bump();
                }
                self.skip_trivia();
                let selector = if self.at_word("class") {
                    let sel_start = self.pos;
                    self.eat_word("class");
                    Expr::Name {
                        text: "class".to_string(),
                        span: Span::new(sel_start, self.pos),
                    }
                } else {
                    match self.read_identifier() {
                        Some((text, span)) => Expr::Name { text, span },
                        None => {
                            self.pos = save;
                            return expr;
                        }
                    }
                };
                // generic call type arguments, e.g. `.map<Int>(...)`
                if self.peek() == Some('<') && self.looks_like_type_args() {
                    self.skip_balanced('<', '>');
                }
                let span = Span::new(expr.span().start, selector.span().end);
                expr = Expr::Qualified {
                    receiver: Box::new(expr),
                    selector: Box::new(selector),
                    span,
                };
                continue;
            }
            if self.peek() == Some('<')
                && !crossed_newline
                && matches!(expr, Expr::Name { .. } | Expr::Qualified { .. })
                && self.looks_like_type_args()
            {
                self.skip_balanced('<', '>');
                continue;
            }
            if self.peek() == Some('(') && !crossed_newline {
                let args = self.parse_args();
                let span = Span::new(expr.span().start, self.pos);
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    lambda: None,
                    span,
                };
                // trailing lambda directly after the argument list
                let lambda_save = self.pos;
                if !self.trivia_crosses_newline() {
                    self.skip_trivia();
                    if self.peek() == Some('{') {
                        let block = self.parse_block();
                        if let Expr::Call {
                            ref mut lambda,
                            ref mut span,
                            ..
                        } = expr
                        {
                            *lambda = Some(block);
                            span.end = self.pos;
                        }
                    } else {
                        self.pos = lambda_save;
                    }
                } else {
                    self.pos = lambda_save;
                }
                continue;
            }
            if self.peek() == Some('{') && !crossed_newline {
                // bare trailing lambda: `apply { ... }`
                let block = self.parse_block();
                let span = Span::new(expr.span().start, self.pos);
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args: Vec::new(),
                    lambda: Some(block),
                    span,
                };
                continue;
            }
            if self.peek() == Some('[') && !crossed_newline {
                let bracket_start = self.pos;
                self.bump();
                let mut args = Vec::new();
                loop {
                    self.skip_trivia();
                    match self.peek() {
                        None | Some(']') => {
                            self.bump();
                            break;
                        }
                        Some(',') => {
                            self.bump();
                        }
                        _ => args.push(self.parse_expression()),
                    }
                }
                let _ = bracket_start;
                let span = Span::new(expr.span().start, self.pos);
                expr = Expr::Index {
                    receiver: Box::new(expr),
                    args,
                    span,
                };
                continue;
            }
            self.pos = save;
            return expr;
        }
    }

    /// Distinguish `foo<Bar>(...)` type arguments from a less-than chain.
    fn looks_like_type_args(&self) -> bool {
        let rest = &self.source[self.pos..];
        let mut depth = 0usize;
        for (i, c) in rest.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        let after = rest[i + 1..].trim_start_matches([' ', '\t']);
                        return after.starts_with('(') || after.starts_with('{');
                    }
                }
                c if c.is_alphanumeric()
                    || c.is_whitespace()
                    || matches!(c, '_' | ',' | '.' | '?' | '*' | ':' | '<' | '>') => {}
                _ => return false,
            }
            if i > 200 {
                return false;
            }
        }
        false
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        self.bump(); // '('
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                }
                _ => args.push(self.parse_expression()),
            }
        }
        args
    }

    fn parse_primary(&mut self) -> Expr {
        self.skip_trivia();
        while self.peek() == Some('@') {
            self.skip_annotation();
            self.skip_trivia();
        }
        let start = self.pos;
        match self.peek() {
            None => Expr::Opaque {
                span: Span::new(start, start),
            },
            Some('(') => {
                self.bump();
                let inner = self.parse_expression();
                self.skip_trivia();
                if self.peek() == Some(')') {
                    self.bump();
                }
                Expr::Paren {
                    inner: Box::new(inner),
                    span: Span::new(start, self.pos),
                }
            }
            Some('{') => {
                let block = self.parse_block();
                Expr::Lambda {
                    span: Span::new(start, self.pos),
                    block,
                }
            }
            Some('"') => self.parse_string_template(),
            Some('\'') => {
                self.skip_char_literal();
                Expr::Literal {
                    span: Span::new(start, self.pos),
                }
            }
            Some(c) if c.is_ascii_digit() => {
                while let Some(c) = self.peek() {
                    // '.' continues the literal only before another digit,
                    // so `1.toString()` keeps its member access
                    let decimal_point = c == '.'
                        && self.source[self.pos + 1..]
                            .chars()
                            .next()
                            .is_some_and(|d| d.is_ascii_digit());
                    if c.is_ascii_alphanumeric() || c == '_' || decimal_point {
                        self.bump();
                    } else {
                        break;
                    }
                }
                Expr::Literal {
                    span: Span::new(start, self.pos),
                }
            }
            Some(_) if self.at_word("if") => self.parse_if(),
            Some(_) if self.at_word("when") => self.parse_when(),
            Some(_) if self.at_word("for") => self.parse_for(),
            Some(_) if self.at_word("while") => self.parse_while(),
            Some(_) if self.at_word("do") => self.parse_do_while(),
            Some(_) if self.at_word("try") => self.parse_try(),
            Some(_)
                if self.at_word("return")
                    || self.at_word("throw")
                    || self.at_word("break")
                    || self.at_word("continue") =>
            {
                let wants_value = self.at_word("return") || self.at_word("throw");
                let _ = self.read_identifier();
                if self.peek() == Some('@') {
                    self.bump();
                    let _ = self.read_identifier();
                }
                let mut value = None;
                if wants_value && !self.trivia_crosses_newline() {
                    let save = self.pos;
                    self.skip_trivia();
                    match self.peek() {
                        None | Some('}') | Some(')') | Some(',') => self.pos = save,
                        _ => value = Some(Box::new(self.parse_expression())),
                    }
                }
                Expr::Jump {
                    value,
                    span: Span::new(start, self.pos),
                }
            }
            Some(_) if self.at_word("object") => {
                // anonymous object expression, structure not migrated
                self.eat_word("object");
                self.skip_trivia();
                if self.peek() == Some(':') {
                    self.bump();
                    let _ = self.skip_type(&['{']);
                }
                self.skip_trivia();
                if self.peek() == Some('{') {
                    self.skip_balanced('{', '}');
                }
                Expr::Opaque {
                    span: Span::new(start, self.pos),
                }
            }
            Some(c) if c.is_alphabetic() || c == '_' || c == '`' => {
                let (text, span) = self.read_identifier().unwrap();
                Expr::Name { text, span }
            }
            Some(_) => {
                self.bump();
                Expr::Opaque {
                    span: Span::new(start, self.pos),
                }
            }
        }
    }

    fn parse_control_body(&mut self) -> Expr {
        self.skip_trivia();
        if self.peek() == Some('{') {
            Expr::BlockExpr(self.parse_block())
        } else {
            self.parse_statement()
        }
    }

    fn parse_if(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("if");
        self.skip_trivia();
        let condition = if self.peek() == Some('(') {
            self.bump();
            let condition = self.parse_expression();
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
            }
            condition
        } else {
            Expr::Opaque {
                span: Span::new(self.pos, self.pos),
            }
        };
        let then_branch = self.parse_control_body();
        let mut else_branch = None;
        let save = self.pos;
        self.skip_trivia();
        if self.at_word("else") {
            self.eat_word("else");
            else_branch = Some(Box::new(self.parse_control_body()));
        } else {
            self.pos = save;
        }
        Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
            span: Span::new(start, self.pos),
        }
    }

    fn parse_when(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("when");
        self.skip_trivia();
        let mut subject = None;
        if self.peek() == Some('(') {
            self.bump();
            subject = Some(Box::new(self.parse_statement()));
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
            }
            self.skip_trivia();
        }
        let mut entries = Vec::new();
        if self.peek() == Some('{') {
            self.bump();
            loop {
                let before = self.pos;
                self.skip_trivia();
                match self.peek() {
                    None => break,
                    Some('}') => {
                        self.bump();
                        break;
                    }
                    _ => {}
                }
                let mut conditions = Vec::new();
                if self.at_word("else") {
                    self.eat_word("else");
                } else {
                    loop {
                        conditions.push(self.parse_expression());
                        self.skip_trivia();
                        if self.peek() == Some(',') {
                            self.bump();
                            continue;
                        }
                        break;
                    }
                }
                self.skip_trivia();
                if self.at_str("->") {
                    self.pos += 2;
                }
                let body = self.parse_control_body();
                entries.push(WhenEntry { conditions, body });
                if self.pos == before {
                    self.bump();
                }
            }
        }
        Expr::When {
            subject,
            entries,
            span: Span::new(start, self.pos),
        }
    }

    fn parse_for(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("for");
        self.skip_trivia();
        let mut iterable = Expr::Opaque {
            span: Span::new(self.pos, self.pos),
        };
        if self.peek() == Some('(') {
            self.bump();
            // loop variable (possibly destructured, possibly typed)
            loop {
                self.skip_trivia();
                if self.peek() == Some('(') {
                    self.skip_balanced('(', ')');
                    self.skip_trivia();
                }
                if self.at_word("in") {
                    self.eat_word("in");
                    break;
                }
                if self.peek().is_none() || self.peek() == Some(')') {
                    break;
                }
                self.bump();
            }
            iterable = self.parse_expression();
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
            }
        }
        let body = self.parse_control_body();
        Expr::For {
            iterable: Box::new(iterable),
            body: Box::new(body),
            span: Span::new(start, self.pos),
        }
    }

    fn parse_while(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("while");
        self.skip_trivia();
        let condition = if self.peek() == Some('(') {
            self.bump();
            let condition = self.parse_expression();
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
            }
            condition
        } else {
            Expr::Opaque {
                span: Span::new(self.pos, self.pos),
            }
        };
        let body = self.parse_control_body();
        Expr::While {
            condition: Box::new(condition),
            body: Box::new(body),
            span: Span::new(start, self.pos),
        }
    }

    fn parse_do_while(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("do");
        let body = self.parse_control_body();
        self.skip_trivia();
        self.eat_word("while");
        self.skip_trivia();
        let condition = if self.peek() == Some('(') {
            self.bump();
            let condition = self.parse_expression();
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
            }
            condition
        } else {
            Expr::Opaque {
                span: Span::new(self.pos, self.pos),
            }
        };
        Expr::DoWhile {
            body: Box::new(body),
            condition: Box::new(condition),
            span: Span::new(start, self.pos),
        }
    }

    fn parse_try(&mut self) -> Expr {
        let start = self.pos;
        self.eat_word("try");
        self.skip_trivia();
        let body = if self.peek() == Some('{') {
            self.parse_block()
        } else {
            Block {
                l_brace: self.pos,
                r_brace: self.pos,
                statements: Vec::new(),
            }
        };
        let mut catches = Vec::new();
        let mut finally = None;
        loop {
            let save = self.pos;
            self.skip_trivia();
            if self.at_word("catch") {
                self.eat_word("catch");
                self.skip_trivia();
                if self.peek() == Some('(') {
                    self.skip_balanced('(', ')');
                }
                self.skip_trivia();
                if self.peek() == Some('{') {
                    catches.push(self.parse_block());
                }
                continue;
            }
            if self.at_word("finally") {
                self.eat_word("finally");
                self.skip_trivia();
                if self.peek() == Some('{') {
                    finally = Some(self.parse_block());
                }
                continue;
            }
            self.pos = save;
            break;
        }
        Expr::Try {
            body,
            catches,
            finally,
            span: Span::new(start, self.pos),
        }
    }

    fn parse_string_template(&mut self) -> Expr {
        let start = self.pos;
        let triple = self.at_str("\"\"\"");
        let mut entries = Vec::new();
        if triple {
            self.pos += 3;
        } else {
            self.bump();
        }
        loop {
            if self.at_end() {
                break;
            }
            if triple {
                if self.at_str("\"\"\"") {
                    self.pos += 3;
                    break;
                }
            } else if self.peek() == Some('"') {
                self.bump();
                break;
            } else if self.peek() == Some('\\') {
                self.bump();
                self.bump();
                continue;
            }
            if self.at_str("${") {
                let brace_start = self.pos + 1;
                let mut probe = Parser {
                    source: self.source,
                    pos: brace_start,
                };
                probe.skip_balanced('{', '}');
                let inner_end = probe.pos;
                let mut inner = Parser {
                    source: self.source,
                    pos: brace_start + 1,
                };
                entries.push(inner.parse_expression());
                self.pos = inner_end;
                continue;
            }
            if self.peek() == Some('$') {
                self.bump();
                if let Some((text, span)) = self.read_identifier() {
                    entries.push(Expr::Name { text, span });
                }
                continue;
            }
            self.bump();
        }
        Expr::StringTemplate {
            entries,
            span: Span::new(start, self.pos),
        }
    }
}

/// Parse a complete Kotlin source file.
pub fn parse_kotlin(source: &str) -> KotlinFile {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVITY_SOURCE: &str = r#"package com.example.app

import android.app.Activity
import android.os.Bundle
import kotlinx.android.synthetic.main.activity_foo.*

class FooActivity : Activity() {

    override fun onCreate(savedInstanceState: Bundle?) {
        super.onCreate(savedInstanceState)
        setContentView(R.layout.activity_foo)
        fooTextView.text = "hello"
    }
}
"#;

    #[test]
    fn test_parse_file_structure() {
        let file = parse_kotlin(ACTIVITY_SOURCE);
        assert_eq!(file.package_name.as_deref(), Some("com.example.app"));
        assert_eq!(file.imports.len(), 3);
        assert_eq!(
            file.imports[2].path,
            "kotlinx.android.synthetic.main.activity_foo.*"
        );
        assert_eq!(file.classes.len(), 1);
        let class = &file.classes[0];
        assert_eq!(class.name, "FooActivity");
        assert_eq!(class.super_entries.len(), 1);
        assert_eq!(class.super_entries[0].base_name(), "Activity");
    }

    #[test]
    fn test_import_spans_cover_lines() {
        let file = parse_kotlin(ACTIVITY_SOURCE);
        for import in &file.imports {
            let text = import.span.text(ACTIVITY_SOURCE);
            assert!(text.starts_with("import "), "got {:?}", text);
            assert!(text.ends_with('\n'));
        }
    }

    #[test]
    fn test_parse_function_members() {
        let file = parse_kotlin(ACTIVITY_SOURCE);
        let body = file.classes[0].body.as_ref().unwrap();
        let functions: Vec<_> = body
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Function(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "onCreate");
        assert_eq!(functions[0].params.len(), 1);
        assert_eq!(functions[0].params[0].type_text, "Bundle?");
        assert!(functions[0].body.is_some());
    }

    #[test]
    fn test_statement_spans_slice_source() {
        let file = parse_kotlin(ACTIVITY_SOURCE);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Function(func) = &body.members[0] else {
            panic!("expected function");
        };
        let block = func.body.as_ref().unwrap();
        assert_eq!(block.statements.len(), 3);
        let set_content = block.statements[1].span().text(ACTIVITY_SOURCE);
        assert_eq!(set_content, "setContentView(R.layout.activity_foo)");
    }

    #[test]
    fn test_extension_function_receiver() {
        let source = r#"
class Holder {
    fun GroupieViewHolder.render(count: Int) {
        title.text = "$count"
    }
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Function(func) = &body.members[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name, "render");
        let (receiver, span) = func.receiver.as_ref().unwrap();
        assert_eq!(receiver, "GroupieViewHolder");
        assert_eq!(span.text(source), "GroupieViewHolder");
    }

    #[test]
    fn test_property_with_delegate() {
        let source = r#"
class C {
    private val title by lazy { findView() }
    val other: Int = 1
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Property(first) = &body.members[0] else {
            panic!("expected property");
        };
        assert_eq!(first.name, "title");
        assert!(first.delegate.is_some());
        let Member::Property(second) = &body.members[1] else {
            panic!("expected property");
        };
        assert_eq!(second.name, "other");
        assert!(second.initializer.is_some());
    }

    #[test]
    fn test_init_block_and_nested_lambdas() {
        let source = r#"
class V {
    init {
        inflate(context, R.layout.view_custom, this)
        button.setOnClickListener {
            label.run {
                text = "ok"
            }
        }
    }
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Init(init) = &body.members[0] else {
            panic!("expected init block");
        };
        assert_eq!(init.block.statements.len(), 2);
    }

    #[test]
    fn test_string_template_entries() {
        let source = r#"
class C {
    fun f() {
        log("count=${counterView.text} plain $titleView end")
    }
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Function(func) = &body.members[0] else {
            panic!("expected function");
        };
        let block = func.body.as_ref().unwrap();
        // the call's argument is a template with two entries
        let Expr::Call { args, .. } = &block.statements[0] else {
            panic!("expected call");
        };
        let Expr::StringTemplate { entries, .. } = &args[0] else {
            panic!("expected template");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_when_and_control_flow() {
        let source = r#"
class C {
    fun f(x: Int) {
        when (x) {
            1 -> titleView.show()
            else -> {
                for (i in items) {
                    subtitleView.hide()
                }
            }
        }
        if (x > 0) errorView.show() else errorView.hide()
        try {
            riskyView.load()
        } catch (e: Exception) {
            fallbackView.show()
        }
    }
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Function(func) = &body.members[0] else {
            panic!("expected function");
        };
        assert_eq!(func.body.as_ref().unwrap().statements.len(), 3);
    }

    #[test]
    fn test_nested_class_is_separate_unit() {
        let source = r#"
class Outer {
    val x = 1
    class Inner : Item() {
        fun g() {}
    }
}
"#;
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let nested: Vec<_> = body
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Class(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "Inner");
        assert_eq!(nested[0].super_entries[0].base_name(), "Item");
    }

    #[test]
    fn test_generic_supertype_entry() {
        let source = "class H : BaseHolder<FooBinding>(layout) {\n}\n";
        let file = parse_kotlin(source);
        let entry = &file.classes[0].super_entries[0];
        assert_eq!(entry.base_name(), "BaseHolder");
        assert_eq!(entry.text, "BaseHolder<FooBinding>(layout)");
    }

    #[test]
    fn test_expression_body_function() {
        let source = "class C {\n    fun title(): String = headerView.text.toString()\n}\n";
        let file = parse_kotlin(source);
        let body = file.classes[0].body.as_ref().unwrap();
        let Member::Function(func) = &body.members[0] else {
            panic!("expected function");
        };
        assert!(func.expr_body.is_some());
        assert!(func.body.is_none());
    }
}
