//! Build-script model
//!
//! One block/statement shape covers both Groovy `build.gradle` and Kotlin
//! `build.gradle.kts` at the granularity the migration needs: top-level
//! configuration blocks with their first-level statement lines, plus
//! loose top-level statements (Groovy `apply plugin:` lines). Dialect
//! differences stay in the text the planner writes, not in the model.

use std::path::Path;

use crate::edit::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDialect {
    Groovy,
    KotlinScript,
}

impl ScriptDialect {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("kts") => ScriptDialect::KotlinScript,
            _ => ScriptDialect::Groovy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleBlock {
    /// Header text before the brace, e.g. `plugins` or
    /// `configure<AndroidExtensionsExtension>`
    pub name: String,
    /// Whole block including both braces
    pub span: Span,
    pub l_brace: usize,
    pub r_brace: usize,
    /// First-level statement lines inside the block, trimmed
    pub statements: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleScript {
    pub dialect: ScriptDialect,
    pub blocks: Vec<GradleBlock>,
    /// Top-level statements outside any block
    pub statements: Vec<Span>,
}

impl GradleScript {
    pub fn block(&self, name: &str) -> Option<&GradleBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

pub fn parse_script(source: &str, dialect: ScriptDialect) -> GradleScript {
    let mut scanner = Scanner { source, pos: 0 };
    let mut blocks = Vec::new();
    let mut statements = Vec::new();

    loop {
        scanner.skip_trivia();
        if scanner.at_end() {
            break;
        }
        let start = scanner.pos;
        let mut paren = 0usize;
        let mut found_block = false;
        while let Some(c) = scanner.peek() {
            match c {
                '"' | '\'' => scanner.skip_string(),
                '/' if scanner.at_str("//") => break,
                '/' if scanner.at_str("/*") => scanner.skip_block_comment(),
                '(' => {
                    paren += 1;
                    scanner.bump();
                }
                ')' => {
                    paren = paren.saturating_sub(1);
                    scanner.bump();
                }
                '{' if paren == 0 => {
                    found_block = true;
                    break;
                }
                '\n' if paren == 0 => break,
                _ => scanner.bump(),
            }
        }
        if found_block {
            let name = source[start..scanner.pos].trim().to_string();
            let l_brace = scanner.pos;
            let (r_brace, inner) = scanner.scan_block();
            blocks.push(GradleBlock {
                name,
                span: Span::new(start, r_brace + 1),
                l_brace,
                r_brace,
                statements: inner,
            });
        } else {
            let text = source[start..scanner.pos].trim_end();
            if !text.is_empty() {
                statements.push(Span::new(start, start + text.len()));
            }
            scanner.bump();
        }
    }

    GradleScript {
        dialect,
        blocks,
        statements,
    }
}

struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
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

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.bump(),
                Some('/') if self.at_str("//") => self.skip_line_comment(),
                Some('/') if self.at_str("/*") => self.skip_block_comment(),
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        match self.source[self.pos..].find("*/") {
            Some(i) => self.pos += i + 2,
            None => self.pos = self.source.len(),
        }
    }

    fn skip_string(&mut self) {
        let Some(quote) = self.peek() else {
            return;
        };
        if self.at_str("\"\"\"") {
            self.pos += 3;
            match self.source[self.pos..].find("\"\"\"") {
                Some(i) => self.pos += i + 3,
                None => self.pos = self.source.len(),
            }
            return;
        }
        self.bump();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                self.bump();
            } else if c == quote {
                self.bump();
                return;
            } else if c == '\n' {
                return;
            } else {
                self.bump();
            }
        }
    }

    /// At '{': consume the balanced block, returning the closing brace
    /// offset and the first-level statement line spans.
    fn scan_block(&mut self) -> (usize, Vec<Span>) {
        let mut depth = 0usize;
        let mut statements = Vec::new();
        let mut stmt_start: Option<usize> = None;

        let mut flush = |start: Option<usize>, end: usize, source: &str, out: &mut Vec<Span>| {
            if let Some(start) = start {
                let text = source[start..end].trim_end();
                if !text.is_empty() {
                    out.push(Span::new(start, start + text.len()));
                }
            }
        };

        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' => {
                    if depth == 1 && stmt_start.is_none() {
                        stmt_start = Some(self.pos);
                    }
                    self.skip_string();
                }
                '/' if self.at_str("//") => {
                    flush(stmt_start.take(), self.pos, self.source, &mut statements);
                    self.skip_line_comment();
                }
                '/' if self.at_str("/*") => self.skip_block_comment(),
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let r_brace = self.pos;
                        flush(stmt_start.take(), self.pos, self.source, &mut statements);
                        self.bump();
                        return (r_brace, statements);
                    }
                    if depth == 1 {
                        // a nested block just closed; its header line is
                        // not a first-level statement
                        stmt_start = None;
                    }
                    self.bump();
                }
                '\n' => {
                    if depth == 1 {
                        flush(stmt_start.take(), self.pos, self.source, &mut statements);
                    }
                    self.bump();
                }
                c if c.is_whitespace() => self.bump(),
                _ => {
                    if depth == 1 && stmt_start.is_none() {
                        stmt_start = Some(self.pos);
                    }
                    self.bump();
                }
            }
        }
        (self.pos, statements)
    }
}
