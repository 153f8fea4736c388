// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build-time discovery of a package's exported names
//!
//! The externals plugin asks an introspector what the real package exports so
//! that named imports keep working while the default export points at the
//! runtime global. Lookups never fail: anything that goes wrong is reported as
//! [`ModuleDescriptor::NotFound`].

pub mod exports;

use crate::error::Result;
use crate::resolver::ModuleResolver;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use exports::{scan_exports, scan_imports, ScannedExports};

/// Names never forwarded as named re-exports
pub const RESERVED_EXPORTS: &[&str] = &["default", "__esModule"];

/// Bound on `export * from` chains
const MAX_REEXPORT_DEPTH: usize = 16;

/// What a lookup found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDescriptor {
    /// The package was loaded; `exports` excludes reserved names
    Found {
        /// Absolute path of the entry module
        path: PathBuf,
        /// Exported names, sorted
        exports: Vec<String>,
    },
    /// The package could not be introspected
    NotFound,
}

impl ModuleDescriptor {
    /// Named exports to forward (empty when not found)
    pub fn named_exports(&self) -> &[String] {
        match self {
            ModuleDescriptor::Found { exports, .. } => exports,
            ModuleDescriptor::NotFound => &[],
        }
    }
}

/// Capability to look up a package's exports
#[async_trait]
pub trait ModuleIntrospector: Send + Sync {
    /// Describe `specifier` as imported from `resolve_dir`
    async fn describe(&self, specifier: &str, resolve_dir: &Path) -> ModuleDescriptor;
}

/// Introspector reading installed packages from `node_modules`
#[derive(Debug, Clone, Default)]
pub struct NodeModulesIntrospector {
    resolver: ModuleResolver,
}

impl NodeModulesIntrospector {
    /// Create a new introspector
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve on the blocking pool; the resolver probes the file system synchronously.
    async fn resolve(&self, specifier: &str, resolve_dir: &Path) -> Result<PathBuf> {
        let resolver = self.resolver.clone();
        let specifier = specifier.to_string();
        let resolve_dir = resolve_dir.to_path_buf();
        tokio::task::spawn_blocking(move || resolver.resolve(&specifier, &resolve_dir)).await?
    }

    async fn try_describe(&self, specifier: &str, resolve_dir: &Path) -> Result<ModuleDescriptor> {
        let entry = self.resolve(specifier, resolve_dir).await?;
        let entry = tokio::fs::canonicalize(&entry).await.unwrap_or(entry);

        let mut names = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect(&entry, 0, &mut names, &mut visited).await?;

        let exports = names
            .into_iter()
            .filter(|name| !RESERVED_EXPORTS.contains(&name.as_str()))
            .collect();

        Ok(ModuleDescriptor::Found { path: entry, exports })
    }

    /// Gather names of `path`, following `export * from` chains.
    fn collect<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
        names: &'a mut BTreeSet<String>,
        visited: &'a mut HashSet<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_REEXPORT_DEPTH || !visited.insert(path.to_path_buf()) {
                return Ok(());
            }

            let source = tokio::fs::read_to_string(path).await?;
            let scanned = scan_exports(&source);

            // `export *` never forwards the target's default
            if depth == 0 {
                names.extend(scanned.names);
            } else {
                names.extend(scanned.names.into_iter().filter(|n| n != "default"));
            }

            let dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();
            for specifier in &scanned.star_reexports {
                let target = self.resolve(specifier, &dir).await?;
                self.collect(&target, depth + 1, names, visited).await?;
            }

            Ok(())
        })
    }
}

#[async_trait]
impl ModuleIntrospector for NodeModulesIntrospector {
    async fn describe(&self, specifier: &str, resolve_dir: &Path) -> ModuleDescriptor {
        match self.try_describe(specifier, resolve_dir).await {
            Ok(descriptor) => {
                debug!(specifier, exports = descriptor.named_exports().len(), "introspected package");
                descriptor
            }
            Err(_) => ModuleDescriptor::NotFound,
        }
    }
}

/// Introspector answering from a fixed table
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    packages: HashMap<String, (PathBuf, Vec<String>)>,
}

impl StaticIntrospector {
    /// Empty table: every lookup is `NotFound`
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package's entry and exports
    pub fn with_package(
        mut self,
        specifier: impl Into<String>,
        path: impl Into<PathBuf>,
        exports: &[&str],
    ) -> Self {
        self.packages.insert(
            specifier.into(),
            (path.into(), exports.iter().map(|e| e.to_string()).collect()),
        );
        self
    }
}

#[async_trait]
impl ModuleIntrospector for StaticIntrospector {
    async fn describe(&self, specifier: &str, _resolve_dir: &Path) -> ModuleDescriptor {
        match self.packages.get(specifier) {
            Some((path, exports)) => {
                let exports: BTreeSet<String> = exports
                    .iter()
                    .filter(|name| !RESERVED_EXPORTS.contains(&name.as_str()))
                    .cloned()
                    .collect();
                ModuleDescriptor::Found {
                    path: path.clone(),
                    exports: exports.into_iter().collect(),
                }
            }
            None => ModuleDescriptor::NotFound,
        }
    }
}
