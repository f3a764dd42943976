//! Import scanner for JavaScript/TypeScript sources.
//!
//! A lexical scan, not a parser: comments are blanked out first (string
//! and template literals are left alone so `"//libs/ui"` survives), then a
//! handful of patterns pick out module specifiers.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from "x"`, `export ... from "x"`
    Static,
    /// `import "x"`
    SideEffect,
    /// `import("x")`
    Dynamic,
    /// `require("x")`, `import x = require("x")`
    Require,
}

/// One module reference found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub kind: ImportKind,
    /// `import type` / `export type`: erased before the code runs.
    pub type_only: bool,
}

/// An `import`/`export` keyword starting a statement.
static STATEMENT_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[;{}])[ \t]*(import|export)\b").expect("statement pattern is valid")
});

/// Matched against a single statement, never across two.
static FROM_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:import|export)\s+(type\s+)?[^;'"`()=]*?\bfrom\s*['"]([^'"\n]+)['"]"#)
        .expect("from pattern is valid")
});

static SIDE_EFFECT_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*['"]([^'"\n]+)['"]"#).expect("side effect pattern is valid")
});

static DYNAMIC_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("dynamic pattern is valid")
});

static REQUIRE_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("require pattern is valid")
});

/// Every module reference in `source`, in order of appearance.
pub fn scan(source: &str) -> Vec<ImportRef> {
    let code = strip_comments(source);
    let mut found: Vec<(usize, ImportRef)> = Vec::new();

    let starts: Vec<usize> = STATEMENT_RX
        .captures_iter(&code)
        .filter_map(|caps| caps.get(1))
        .map(|keyword| keyword.start())
        .collect();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(code.len());
        let Some(caps) = FROM_RX.captures(&code[start..end]) else {
            continue;
        };
        if let Some(spec) = caps.get(2) {
            found.push((
                start,
                ImportRef {
                    specifier: spec.as_str().to_string(),
                    kind: ImportKind::Static,
                    type_only: caps.get(1).is_some(),
                },
            ));
        }
    }

    let simple = [
        (&*SIDE_EFFECT_RX, ImportKind::SideEffect),
        (&*DYNAMIC_RX, ImportKind::Dynamic),
        (&*REQUIRE_RX, ImportKind::Require),
    ];
    for (rx, kind) in simple {
        for caps in rx.captures_iter(&code) {
            if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) {
                found.push((
                    whole.start(),
                    ImportRef {
                        specifier: spec.as_str().to_string(),
                        kind,
                        type_only: false,
                    },
                ));
            }
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, import)| import).collect()
}

/// Replace comments with whitespace, keeping line breaks and every string,
/// template and character literal intact.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                while let Some(s) = chars.next() {
                    out.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if s == c || (s == '\n' && c != '`') {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for s in chars.by_ref() {
                    if s == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for s in chars.by_ref() {
                    if prev == '*' && s == '/' {
                        break;
                    }
                    if s == '\n' {
                        out.push('\n');
                    }
                    prev = s;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}
