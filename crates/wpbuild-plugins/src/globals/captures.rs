// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Specifier decomposition and specifier-to-global translation

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Externals pattern for WordPress packages and the React packages it bundles.
pub const WORDPRESS_EXTERNALS: &str =
    r"^(?P<package>react|react-dom|@(?P<scope>wordpress|foo))(/(?P<subpath>.+))?$";

/// Tokens of a specifier matched by an externals pattern.
///
/// Every token is optional: the groups that participate depend on the pattern
/// and on the specifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecifierCaptures<'a> {
    /// Whole match
    pub specifier: &'a str,
    /// Unscoped package name, or `@scope` for scoped specifiers
    pub package: Option<&'a str>,
    /// Scope without the `@`
    pub scope: Option<&'a str>,
    /// Everything after the package token's `/`
    pub subpath: Option<&'a str>,
}

impl<'a> SpecifierCaptures<'a> {
    /// Match `specifier` against `pattern`.
    ///
    /// Named groups `package`, `scope` and `subpath` are used when the pattern
    /// declares any of them; otherwise groups 1, 2 and 4 are read positionally.
    pub fn extract(pattern: &Regex, specifier: &'a str) -> Option<Self> {
        let caps = pattern.captures(specifier)?;
        let named = pattern
            .capture_names()
            .flatten()
            .any(|n| matches!(n, "package" | "scope" | "subpath"));

        let group = |name: &str, index: usize| {
            let m = if named { caps.name(name) } else { caps.get(index) };
            m.map(|m| m.as_str()).filter(|s| !s.is_empty())
        };

        Some(Self {
            specifier: caps.get(0).map(|m| m.as_str()).unwrap_or(specifier),
            package: group("package", 1),
            scope: group("scope", 2),
            subpath: group("subpath", 4),
        })
    }

    /// Last `/`-separated segment of the sub-path
    pub fn last_segment(&self) -> Option<&'a str> {
        self.subpath
            .and_then(|s| s.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}

/// Caller-supplied specifier-to-global function; `None` means no mapping.
pub type GlobalPathFn = Arc<dyn Fn(&SpecifierCaptures<'_>) -> Option<String> + Send + Sync>;

/// `dom-ready` → `domReady`.
pub fn kebab_to_camel(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();

    while let Some(c) = chars.next() {
        if c != '-' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) => out.extend(next.to_uppercase()),
            None => out.push('-'),
        }
    }

    out
}

/// Table-driven translation from specifier tokens to a global property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalPathMapping {
    /// Runtime global every path starts from
    pub root: String,
    /// Scope → namespace object under `root`
    pub scopes: BTreeMap<String, String>,
    /// Unscoped package → fixed path under `root`
    pub aliases: BTreeMap<String, String>,
}

impl GlobalPathMapping {
    /// Mapping with no known scopes or aliases
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            scopes: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// `window.wp.*` for `@wordpress/*`, `window.wp.element` for React.
    pub fn wordpress() -> Self {
        Self::new("window")
            .scope("wordpress", "wp")
            .alias("react", "wp.element")
            .alias("react-dom", "wp.element")
    }

    /// Map `@scope/*` under `root.namespace`
    pub fn scope(mut self, scope: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.scopes.insert(scope.into(), namespace.into());
        self
    }

    /// Map an unscoped package to `root.path`
    pub fn alias(mut self, package: impl Into<String>, path: impl Into<String>) -> Self {
        self.aliases.insert(package.into(), path.into());
        self
    }

    /// Global property path for `captures`, if known.
    pub fn global_path(&self, captures: &SpecifierCaptures<'_>) -> Option<String> {
        if captures.scope.is_none() {
            let path = self.aliases.get(captures.package?)?;
            return Some(format!("{}.{}", self.root, path));
        }

        let namespace = self.scopes.get(captures.scope?)?;
        let name = captures.last_segment()?;
        Some(format!("{}.{}.{}", self.root, namespace, kebab_to_camel(name)))
    }

    /// Wrap into a [`GlobalPathFn`]
    pub fn into_fn(self) -> GlobalPathFn {
        Arc::new(move |captures: &SpecifierCaptures<'_>| self.global_path(captures))
    }
}

impl Default for GlobalPathMapping {
    fn default() -> Self {
        Self::wordpress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_for(specifier: &str) -> Option<String> {
        let pattern = Regex::new(WORDPRESS_EXTERNALS).unwrap();
        let captures = SpecifierCaptures::extract(&pattern, specifier).unwrap();
        GlobalPathMapping::wordpress().global_path(&captures)
    }

    #[test]
    fn test_kebab_to_camel() {
        assert_eq!(kebab_to_camel("dom-ready"), "domReady");
        assert_eq!(kebab_to_camel("rich-text"), "richText");
        assert_eq!(kebab_to_camel("block-editor-x"), "blockEditorX");
        assert_eq!(kebab_to_camel("a11y"), "a11y");
        assert_eq!(kebab_to_camel("trailing-"), "trailing-");
        assert_eq!(kebab_to_camel("double--dash"), "double-dash");
    }

    #[test]
    fn test_extract_named() {
        let pattern = Regex::new(WORDPRESS_EXTERNALS).unwrap();
        let caps = SpecifierCaptures::extract(&pattern, "@wordpress/a11y/something").unwrap();
        assert_eq!(caps.package, Some("@wordpress"));
        assert_eq!(caps.scope, Some("wordpress"));
        assert_eq!(caps.subpath, Some("a11y/something"));
        assert_eq!(caps.last_segment(), Some("something"));

        let caps = SpecifierCaptures::extract(&pattern, "react").unwrap();
        assert_eq!(caps.package, Some("react"));
        assert_eq!(caps.scope, None);
        assert_eq!(caps.subpath, None);

        assert!(SpecifierCaptures::extract(&pattern, "lodash").is_none());
    }

    #[test]
    fn test_extract_positional() {
        let pattern = Regex::new(r"^(react|react-dom|@(wordpress|foo))(/(.+))?$").unwrap();
        let caps = SpecifierCaptures::extract(&pattern, "@wordpress/dom-ready").unwrap();
        assert_eq!(caps.package, Some("@wordpress"));
        assert_eq!(caps.scope, Some("wordpress"));
        assert_eq!(caps.subpath, Some("dom-ready"));
    }

    #[test]
    fn test_extract_partially_named() {
        // names only scope and sub-path; group 1 is the scope, not a package
        let pattern = Regex::new(r"^@(?P<scope>wordpress)/(?P<subpath>.+)$").unwrap();
        let caps = SpecifierCaptures::extract(&pattern, "@wordpress/dom-ready").unwrap();
        assert_eq!(caps.package, None);
        assert_eq!(caps.scope, Some("wordpress"));
        assert_eq!(caps.subpath, Some("dom-ready"));
        assert_eq!(
            GlobalPathMapping::wordpress().global_path(&caps).as_deref(),
            Some("window.wp.domReady")
        );
    }

    #[test]
    fn test_scoped_package() {
        assert_eq!(path_for("@wordpress/dom-ready").as_deref(), Some("window.wp.domReady"));
        assert_eq!(path_for("@wordpress/rich-text").as_deref(), Some("window.wp.richText"));
        assert_eq!(path_for("@wordpress/components").as_deref(), Some("window.wp.components"));
    }

    #[test]
    fn test_subpath_drives_last_segment() {
        assert_eq!(path_for("@wordpress/a11y/something").as_deref(), Some("window.wp.something"));
        assert_eq!(
            path_for("@wordpress/editor/store-name").as_deref(),
            Some("window.wp.storeName")
        );
    }

    #[test]
    fn test_unscoped_aliases() {
        assert_eq!(path_for("react").as_deref(), Some("window.wp.element"));
        assert_eq!(path_for("react-dom").as_deref(), Some("window.wp.element"));
        assert_eq!(path_for("react-dom/client").as_deref(), Some("window.wp.element"));
    }

    #[test]
    fn test_unmapped() {
        // matched by the pattern, unknown to the scope table
        assert_eq!(path_for("@foo/bar"), None);
        // scope without a package
        assert_eq!(path_for("@wordpress"), None);
    }

    #[test]
    fn test_custom_mapping_fn() {
        let mapping = GlobalPathMapping::new("globalThis").scope("acme", "Acme").into_fn();
        let pattern = Regex::new(r"^(?P<package>@(?P<scope>acme))(/(?P<subpath>.+))?$").unwrap();
        let caps = SpecifierCaptures::extract(&pattern, "@acme/ui-kit").unwrap();
        assert_eq!(mapping(&caps).as_deref(), Some("globalThis.Acme.uiKit"));
    }
}
