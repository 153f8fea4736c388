// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm, browser conditions)

use crate::error::{BuildError, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// Extensions probed for extensionless specifiers, in order
pub const EXTENSIONS: &[&str] = &[".mjs", ".js", ".jsx", ".cjs", ".json"];

/// `exports` conditions honoured for browser bundles, by priority
pub const CONDITIONS: &[&str] = &["browser", "import", "module", "default"];

/// Resolver for relative, absolute and `node_modules` specifiers
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// File extensions to try
    extensions: Vec<String>,
    /// Export conditions to honour
    conditions: Vec<String>,
}

impl ModuleResolver {
    /// Create a new module resolver
    pub fn new() -> Self {
        Self {
            extensions: EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            conditions: CONDITIONS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Resolve `specifier` imported from a module living in `resolve_dir`
    pub fn resolve(&self, specifier: &str, resolve_dir: &Path) -> Result<PathBuf> {
        if is_path_specifier(specifier) {
            let path = normalize_path(&resolve_dir.join(specifier));
            return self
                .resolve_file(&path)
                .ok_or_else(|| BuildError::module_not_found(specifier));
        }

        self.resolve_node_modules(specifier, resolve_dir)
    }

    /// Exact file, then with each extension appended, then as a directory
    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        for ext in &self.extensions {
            let mut with_ext = path.as_os_str().to_os_string();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if path.is_dir() {
            return self.resolve_directory(path).ok();
        }

        None
    }

    /// Resolve a directory (package.json entry or index file)
    fn resolve_directory(&self, dir: &Path) -> Result<PathBuf> {
        let package_json_path = dir.join("package.json");
        if package_json_path.is_file() {
            let content = std::fs::read_to_string(&package_json_path)?;
            let pkg: PackageJson = serde_json::from_str(&content)?;

            if let Some(entry) = pkg.entry(".", &self.conditions) {
                if let Some(resolved) = self.resolve_file(&normalize_path(&dir.join(&entry))) {
                    return Ok(resolved);
                }
            }
        }

        for ext in &self.extensions {
            let index = dir.join(format!("index{}", ext));
            if index.is_file() {
                return Ok(index);
            }
        }

        Err(BuildError::module_not_found(dir.display().to_string()))
    }

    /// Resolve a module from node_modules
    fn resolve_node_modules(&self, specifier: &str, resolve_dir: &Path) -> Result<PathBuf> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        // Walk up directory tree looking for node_modules
        let mut current = Some(resolve_dir);
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(package_name);

            if package_dir.is_dir() {
                return match subpath {
                    Some(sub) => self.resolve_subpath(&package_dir, sub),
                    None => self.resolve_directory(&package_dir),
                }
                .map_err(|_| BuildError::module_not_found(specifier));
            }

            current = dir.parent();
        }

        Err(BuildError::module_not_found(specifier))
    }

    /// `exports["./sub"]` when declared, otherwise the file under the package
    fn resolve_subpath(&self, package_dir: &Path, subpath: &str) -> Result<PathBuf> {
        let package_json_path = package_dir.join("package.json");
        if package_json_path.is_file() {
            let content = std::fs::read_to_string(&package_json_path)?;
            let pkg: PackageJson = serde_json::from_str(&content)?;
            if let Some(entry) = pkg.export_target(&format!("./{}", subpath), &self.conditions) {
                if let Some(resolved) = self.resolve_file(&normalize_path(&package_dir.join(entry))) {
                    return Ok(resolved);
                }
            }
        }

        self.resolve_file(&package_dir.join(subpath))
            .ok_or_else(|| BuildError::module_not_found(subpath))
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `./x`, `../x`, `/x` (and drive paths on Windows)
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
        || (cfg!(windows) && specifier.chars().nth(1) == Some(':'))
}

/// Split a bare specifier into package name and optional subpath
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if specifier.starts_with('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = specifier[1..].find('/') {
            let after_scope = &specifier[slash_pos + 2..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
    } else {
        (specifier, None)
    }
}

/// Collapse `.` and `..` without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Fields of package.json used for entry selection
#[derive(Debug, Default, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,
    /// CommonJS entry
    #[serde(default)]
    pub main: Option<String>,
    /// ESM entry (bundler convention)
    #[serde(default)]
    pub module: Option<String>,
    /// Conditional exports
    #[serde(default)]
    pub exports: Option<serde_json::Value>,
}

impl PackageJson {
    /// Entry for `subpath` (`.` for the package root)
    pub fn entry(&self, subpath: &str, conditions: &[String]) -> Option<String> {
        self.export_target(subpath, conditions)
            .or_else(|| self.module.clone())
            .or_else(|| self.main.clone())
    }

    /// Target of `exports` for `subpath`
    pub fn export_target(&self, subpath: &str, conditions: &[String]) -> Option<String> {
        let exports = self.exports.as_ref()?;

        let has_subpaths = exports
            .as_object()
            .map(|map| map.keys().any(|k| k.starts_with('.')))
            .unwrap_or(false);

        if has_subpaths {
            let target = exports.get(subpath)?;
            select_condition(target, conditions)
        } else if subpath == "." {
            select_condition(exports, conditions)
        } else {
            None
        }
    }
}

fn select_condition(value: &serde_json::Value, conditions: &[String]) -> Option<String> {
    match value {
        serde_json::Value::String(target) => Some(target.clone()),
        serde_json::Value::Array(items) => {
            items.iter().find_map(|item| select_condition(item, conditions))
        }
        serde_json::Value::Object(map) => conditions
            .iter()
            .filter_map(|condition| map.get(condition))
            .find_map(|target| select_condition(target, conditions)),
        _ => None,
    }
}
