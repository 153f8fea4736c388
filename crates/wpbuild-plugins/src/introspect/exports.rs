// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical scanning of module syntax
//!
//! Recognises the import and export forms needed to walk a module graph and to
//! list a module's exported names, for both ESM and CommonJS sources. This is a
//! pattern scan, not a parse. Patterns run over a masked copy of the source in
//! which comments and the bodies of string, template and regex literals are
//! blanked; quoted specifiers are then read back from the original text at the
//! same byte offsets.

use regex::{Match, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

const IDENT: &str = r"[A-Za-z_$][\w$]*";

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|export)\b[^'";]*?\bfrom\s*['"]([^'"]+)['"]"#).unwrap()
});
static IMPORT_SIDE_EFFECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*['"]([^'"]+)['"]"#).unwrap());
static IMPORT_DYNAMIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\b").unwrap());
static EXPORT_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bexport\s+(?:async\s+)?(?:function\s*\*?|class|const|let|var)\s*({})",
        IDENT
    ))
    .unwrap()
});
static EXPORT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s*\{([^}]*)\}").unwrap());
static EXPORT_ALL_AS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"\bexport\s*\*\s*as\s+({})\s*from\b"#, IDENT)).unwrap()
});
static EXPORT_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bexport\s*\*\s*from\s*['"]([^'"]+)['"]"#).unwrap());

static CJS_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?:^|[^.\w$])(?:module\.)?exports(?:\.({})|\[\s*['"]([^'"]+)['"]\s*\])\s*=[^=]"#,
        IDENT
    ))
    .unwrap()
});
static CJS_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Object\.defineProperty\(\s*(?:module\.)?exports\s*,\s*['"]([^'"]+)['"]"#).unwrap()
});
static CJS_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmodule\.exports\s*=\s*\{([^}]*)\}").unwrap());
static CJS_REQUIRE_REEXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmodule\.exports\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap()
});
static CJS_EXPORT_STAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:__exportStar|__export)\(\s*require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap()
});
static CJS_ANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:module\.exports|exports)\b").unwrap());

/// Export names found in one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedExports {
    /// Exported names, sorted
    pub names: BTreeSet<String>,
    /// Modules whose names are re-exported wholesale: `export * from '…'`,
    /// `module.exports = require('…')` and `__exportStar(require('…'), exports)`
    pub star_reexports: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Single,
    Double,
    Template,
    LineComment,
    BlockComment,
    Regex { in_class: bool },
}

/// Bytes after which a `/` starts a regex literal rather than a division
const REGEX_PRECEDERS: &[u8] = b"(,=:[!&|?{};+-*%<>~^";

/// Blank comments and literal bodies, preserving byte offsets and newlines.
///
/// Quote and backtick delimiters are kept so quoted-specifier patterns still
/// match; `${…}` expressions inside templates stay visible as code.
pub fn mask_source(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut mode = Mode::Code;
    // brace depth of each open `${` expression
    let mut templates: Vec<usize> = Vec::new();
    let mut prev: Option<u8> = None;
    let mut i = 0;

    let blank = |b: u8| if b == b'\n' { b'\n' } else { b' ' };

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match mode {
            Mode::Code => match b {
                b'\'' | b'"' | b'`' => {
                    out.push(b);
                    mode = match b {
                        b'\'' => Mode::Single,
                        b'"' => Mode::Double,
                        _ => Mode::Template,
                    };
                }
                b'/' if next == Some(b'/') => {
                    out.extend_from_slice(b"  ");
                    i += 1;
                    mode = Mode::LineComment;
                }
                b'/' if next == Some(b'*') => {
                    out.extend_from_slice(b"  ");
                    i += 1;
                    mode = Mode::BlockComment;
                }
                b'/' if prev.is_none_or(|p| REGEX_PRECEDERS.contains(&p)) => {
                    out.push(b);
                    mode = Mode::Regex { in_class: false };
                }
                b'{' => {
                    if let Some(depth) = templates.last_mut() {
                        *depth += 1;
                    }
                    out.push(b);
                    prev = Some(b);
                }
                b'}' => {
                    out.push(b);
                    match templates.last_mut() {
                        Some(0) => {
                            templates.pop();
                            mode = Mode::Template;
                        }
                        Some(depth) => *depth -= 1,
                        None => {}
                    }
                    prev = Some(b);
                }
                _ => {
                    out.push(b);
                    if !b.is_ascii_whitespace() {
                        prev = Some(b);
                    }
                }
            },
            Mode::Single | Mode::Double => {
                let quote = if mode == Mode::Single { b'\'' } else { b'"' };
                if b == b'\\' {
                    out.push(b' ');
                    if let Some(escaped) = next {
                        out.push(blank(escaped));
                        i += 1;
                    }
                } else if b == quote {
                    out.push(b);
                    prev = Some(b);
                    mode = Mode::Code;
                } else if b == b'\n' {
                    // unterminated literal
                    out.push(b);
                    mode = Mode::Code;
                } else {
                    out.push(b' ');
                }
            }
            Mode::Template => {
                if b == b'\\' {
                    out.push(b' ');
                    if let Some(escaped) = next {
                        out.push(blank(escaped));
                        i += 1;
                    }
                } else if b == b'`' {
                    out.push(b);
                    prev = Some(b);
                    mode = Mode::Code;
                } else if b == b'$' && next == Some(b'{') {
                    out.extend_from_slice(b"${");
                    i += 1;
                    templates.push(0);
                    prev = Some(b'{');
                    mode = Mode::Code;
                } else {
                    out.push(blank(b));
                }
            }
            Mode::LineComment => {
                out.push(blank(b));
                if b == b'\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    out.extend_from_slice(b"  ");
                    i += 1;
                    mode = Mode::Code;
                } else {
                    out.push(blank(b));
                }
            }
            Mode::Regex { in_class } => match b {
                b'\\' => {
                    out.push(b' ');
                    if let Some(escaped) = next {
                        out.push(blank(escaped));
                        i += 1;
                    }
                }
                b'[' => {
                    out.push(b' ');
                    mode = Mode::Regex { in_class: true };
                }
                b']' => {
                    out.push(b' ');
                    mode = Mode::Regex { in_class: false };
                }
                b'/' if !in_class => {
                    out.push(b);
                    // a regex literal ends an operand
                    prev = Some(b')');
                    mode = Mode::Code;
                }
                b'\n' => {
                    out.push(b);
                    mode = Mode::Code;
                }
                _ => out.push(b' '),
            },
        }

        i += 1;
    }

    // Mode switches happen on ASCII bytes only, so multi-byte sequences are
    // either copied whole or blanked whole.
    String::from_utf8(out).unwrap_or_default()
}

/// Original text under a match found in the masked source
fn original<'s>(source: &'s str, m: Match<'_>) -> &'s str {
    &source[m.range()]
}

/// Import specifiers of a module in source order, de-duplicated.
///
/// Covers `import … from`, `export … from`, side-effect `import '…'` and
/// `import('…')` with a literal argument.
pub fn scan_imports(source: &str) -> Vec<String> {
    let masked = mask_source(source);
    let mut found: Vec<(usize, String)> = Vec::new();

    for re in [&*IMPORT_FROM, &*IMPORT_SIDE_EFFECT, &*IMPORT_DYNAMIC] {
        for cap in re.captures_iter(&masked) {
            if let Some(m) = cap.get(1) {
                found.push((m.start(), original(source, m).to_string()));
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = BTreeSet::new();
    found
        .into_iter()
        .filter_map(|(_, specifier)| seen.insert(specifier.clone()).then_some(specifier))
        .collect()
}

/// Export names of a module
pub fn scan_exports(source: &str) -> ScannedExports {
    let masked = mask_source(source);
    let mut scanned = ScannedExports::default();

    if EXPORT_DEFAULT.is_match(&masked) {
        scanned.names.insert("default".to_string());
    }

    for cap in EXPORT_DECLARATION.captures_iter(&masked) {
        scanned.names.insert(cap[1].to_string());
    }

    for cap in EXPORT_CLAUSE.captures_iter(&masked) {
        let Some(clause) = cap.get(1) else { continue };
        for part in original(source, clause).split(',') {
            if let Some(name) = exported_alias(part) {
                scanned.names.insert(name);
            }
        }
    }

    for cap in EXPORT_ALL_AS.captures_iter(&masked) {
        scanned.names.insert(cap[1].to_string());
    }

    for cap in EXPORT_ALL.captures_iter(&masked) {
        if let Some(m) = cap.get(1) {
            scanned.star_reexports.push(original(source, m).to_string());
        }
    }

    scan_commonjs(source, &masked, &mut scanned);

    scanned
}

fn scan_commonjs(source: &str, masked: &str, scanned: &mut ScannedExports) {
    if !CJS_ANY.is_match(masked) {
        return;
    }
    // CommonJS modules always expose module.exports as the default
    scanned.names.insert("default".to_string());

    for cap in CJS_ASSIGN.captures_iter(masked) {
        if let Some(name) = cap.get(1) {
            scanned.names.insert(name.as_str().to_string());
        } else if let Some(key) = cap.get(2) {
            scanned.names.insert(original(source, key).to_string());
        }
    }

    for cap in CJS_DEFINE.captures_iter(masked) {
        if let Some(m) = cap.get(1) {
            scanned.names.insert(original(source, m).to_string());
        }
    }

    for cap in CJS_OBJECT.captures_iter(masked) {
        let Some(body) = cap.get(1) else { continue };
        for entry in original(source, body).split(',') {
            let entry = entry.trim();
            if entry.is_empty() || entry.starts_with("...") {
                continue;
            }
            let key = entry
                .split(|c| c == ':' || c == '(')
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches(|c| c == '\'' || c == '"');
            if is_identifier_name(key) {
                scanned.names.insert(key.to_string());
            }
        }
    }

    for re in [&*CJS_REQUIRE_REEXPORT, &*CJS_EXPORT_STAR] {
        for cap in re.captures_iter(masked) {
            if let Some(m) = cap.get(1) {
                let target = original(source, m).to_string();
                if !scanned.star_reexports.contains(&target) {
                    scanned.star_reexports.push(target);
                }
            }
        }
    }
}

/// `a` → `a`, `a as b` → `b`
fn exported_alias(part: &str) -> Option<String> {
    let part = part.trim();
    if part.is_empty() {
        return None;
    }

    let name = match part.split_once(" as ") {
        Some((_, alias)) => alias.trim(),
        None => part,
    };
    let name = name.trim_matches(|c| c == '\'' || c == '"');

    (!name.is_empty()).then(|| name.to_string())
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(scanned: &ScannedExports) -> Vec<&str> {
        scanned.names.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_scan_imports() {
        let source = r#"
            import components from "@wordpress/components";
            import { a, b as c } from './local';
            import * as all from 'all';
            import "./example.scss";
            export { x } from "./reexport";
            // import "./commented";
            const lazy = () => import('./lazy');
            import domReady from "@wordpress/dom-ready";
            import again from "@wordpress/components";
        "#;

        assert_eq!(
            scan_imports(source),
            vec![
                "@wordpress/components",
                "./local",
                "all",
                "./example.scss",
                "./reexport",
                "./lazy",
                "@wordpress/dom-ready",
            ]
        );
    }

    #[test]
    fn test_scan_imports_minified() {
        let source = r#"import{a as b}from"x";import"y";export*from"z";"#;
        assert_eq!(scan_imports(source), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_scan_imports_ignores_literals() {
        let source = r#"
            const help = "import x from 'in-a-string'";
            const doc = `import("in-a-template")`;
            const re = /import ['"]in-a-regex['"]/;
            import real from './real';
        "#;
        assert_eq!(scan_imports(source), vec!["./real"]);
    }

    #[test]
    fn test_mask_source_preserves_offsets() {
        let source = "const a = 'x/*y*/'; // done\n/* é */ const b = `t${c + \"d\"}u`;";
        let masked = mask_source(source);

        assert_eq!(masked.len(), source.len());
        assert_eq!(masked.lines().count(), source.lines().count());
        assert!(masked.starts_with("const a = '      ';"));
        assert!(masked.contains("const b = ` ${c + \" \"} `;"));
        assert!(!masked.contains("done"));
        assert!(!masked.contains('é'));
    }

    #[test]
    fn test_division_is_not_a_regex() {
        let masked = mask_source("const half = total / 2; export const x = \"/\";");
        assert!(masked.contains("total / 2"));
        assert!(masked.contains("export const x"));
    }

    #[test]
    fn test_scan_esm_exports() {
        let source = r#"
            export default function domReady() {}
            export const one = 1;
            export let two = 2;
            export function three() {}
            export async function four() {}
            export function* five() {}
            export class Six {}
            export { seven, eight as nine };
            export * as ten from './ten';
            export * from './rest';
            /* export const hidden = 0; */
        "#;

        let scanned = scan_exports(source);
        assert_eq!(
            names(&scanned),
            vec!["Six", "default", "five", "four", "nine", "one", "seven", "ten", "three", "two"]
        );
        assert_eq!(scanned.star_reexports, vec!["./rest"]);
    }

    #[test]
    fn test_declarations_inside_literals_are_not_exports() {
        let source = r#"
            export const example = `export const fake = 2;`;
            export const message = "export function alsoFake() {}";
            const hint = 'exports.notThis = 1';
            export const real = 1;
        "#;

        let scanned = scan_exports(source);
        assert_eq!(names(&scanned), vec!["example", "message", "real"]);
    }

    #[test]
    fn test_scan_commonjs_exports() {
        let source = r#"
            "use strict";
            Object.defineProperty(exports, "__esModule", { value: true });
            exports.render = render;
            module.exports.hydrate = hydrate;
            exports["createPortal"] = createPortal;
            if (exports.render == null) {}
        "#;

        let scanned = scan_exports(source);
        assert_eq!(
            names(&scanned),
            vec!["__esModule", "createPortal", "default", "hydrate", "render"]
        );
        assert!(scanned.star_reexports.is_empty());
    }

    #[test]
    fn test_scan_module_exports_object() {
        let source = "module.exports = { enable, disable: off, 'coerce': coerce, ...rest };";
        let scanned = scan_exports(source);
        assert_eq!(names(&scanned), vec!["coerce", "default", "disable", "enable"]);
    }

    #[test]
    fn test_commonjs_require_reexports() {
        let source = r#"
            'use strict';
            if (process.env.NODE_ENV === 'production') {
              module.exports = require('./cjs/react.production.min.js');
            } else {
              module.exports = require('./cjs/react.development.js');
            }
        "#;
        let scanned = scan_exports(source);
        assert_eq!(
            scanned.star_reexports,
            vec!["./cjs/react.production.min.js", "./cjs/react.development.js"]
        );

        let compiled = r#"__exportStar(require("./hooks"), exports);"#;
        assert_eq!(scan_exports(compiled).star_reexports, vec!["./hooks"]);
    }

    #[test]
    fn test_exported_alias() {
        assert_eq!(exported_alias(" a "), Some("a".to_string()));
        assert_eq!(exported_alias("a as default"), Some("default".to_string()));
        assert_eq!(exported_alias(""), None);
    }
}
