// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Minimal reference host
//!
//! Walks the import graph from the entry point through the registered
//! resolve/load hooks, falling back to the file system for the `file`
//! namespace. The emitted JavaScript is the loaded modules in dependency
//! order; scope hoisting, JSX lowering and minification belong to a full
//! bundler and are not attempted here.

use crate::config::{BuildConfig, SourceMapMode};
use crate::error::{BuildError, Result};
use crate::introspect::scan_imports;
use crate::plugin::{LoadArgs, LoadResult, Loader, Plugin, PluginBuild, ResolveArgs, ResolveResult};
use crate::resolver::{normalize_path, ModuleResolver};
use crate::sourcemap::SourceMap;
use regex::{NoExpand, Regex};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Namespace it was resolved into
    pub namespace: String,
    /// Path inside the namespace
    pub path: String,
    /// Loader its contents are interpreted with
    pub loader: Loader,
    /// Loaded contents
    pub contents: String,
}

impl Module {
    /// `namespace:path`
    pub fn id(&self) -> String {
        format!("{}:{}", self.namespace, self.path)
    }
}

/// Result of one build
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Modules in dependency order (dependencies first)
    pub modules: Vec<Module>,
    /// Emitted JavaScript
    pub javascript: String,
    /// Emitted CSS (empty when no stylesheet was imported)
    pub css: String,
    /// Files whose change should trigger a rebuild
    pub watch_files: Vec<PathBuf>,
}

impl BuildOutput {
    /// Find a module by namespace and path
    pub fn module(&self, namespace: &str, path: &str) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.namespace == namespace && m.path == path)
    }
}

#[derive(Default)]
struct Graph {
    seen: HashSet<(String, String)>,
    modules: Vec<Module>,
    watch_files: Vec<PathBuf>,
}

impl Graph {
    fn watch(&mut self, path: PathBuf) {
        if !self.watch_files.contains(&path) {
            self.watch_files.push(path);
        }
    }
}

/// Drives plugins over a module graph
pub struct Bundler {
    config: Arc<BuildConfig>,
    build: PluginBuild,
    resolver: ModuleResolver,
}

impl Bundler {
    /// Register `plugins` for a build of `config`
    pub fn new(config: Arc<BuildConfig>, plugins: &[Arc<dyn Plugin>]) -> Self {
        Self {
            build: PluginBuild::with_plugins(Arc::clone(&config), plugins),
            config,
            resolver: ModuleResolver::new(),
        }
    }

    /// The build configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve one import: plugins first, then the file system
    pub fn resolve(&self, args: &ResolveArgs) -> Result<ResolveResult> {
        if let Some(resolved) = self.build.resolve(args)? {
            return Ok(resolved);
        }

        if args.resolve_dir.as_os_str().is_empty() {
            return Err(BuildError::resolve(&args.path, &args.resolve_dir));
        }

        let path = self
            .resolver
            .resolve(&args.path, &args.resolve_dir)
            .map_err(|_| BuildError::resolve(&args.path, &args.resolve_dir))?;
        Ok(ResolveResult::file(path.to_string_lossy()))
    }

    /// Load one module: plugins first, then the file system for `file` paths
    pub async fn load(&self, resolved: &ResolveResult) -> Result<LoadResult> {
        let args = LoadArgs::from(resolved.clone());
        if let Some(loaded) = self.build.load(&args).await? {
            return Ok(loaded);
        }

        if !resolved.is_file() {
            return Err(BuildError::NoLoader {
                namespace: resolved.namespace.clone(),
                path: resolved.path.clone(),
            });
        }

        let path = PathBuf::from(&resolved.path);
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(LoadResult {
            contents,
            loader: self.config.loader_for(&path),
            resolve_dir: path.parent().map(Path::to_path_buf),
            watch_files: Vec::new(),
        })
    }

    /// Walk the graph from the entry point and emit output
    pub async fn build(&self) -> Result<BuildOutput> {
        let entry = absolute(&self.config.entry_point)?;
        let mut graph = Graph::default();

        self.visit(ResolveResult::file(entry.to_string_lossy()), &mut graph)
            .await?;

        let javascript = self.emit_javascript(&graph.modules)?;
        let css = graph
            .modules
            .iter()
            .filter(|m| m.loader == Loader::Css)
            .map(|m| m.contents.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            modules = graph.modules.len(),
            watch_files = graph.watch_files.len(),
            "build finished"
        );

        Ok(BuildOutput {
            modules: graph.modules,
            javascript,
            css,
            watch_files: graph.watch_files,
        })
    }

    fn visit<'a>(
        &'a self,
        resolved: ResolveResult,
        graph: &'a mut Graph,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let key = (resolved.namespace.clone(), resolved.path.clone());
            // each (namespace, path) is resolved and loaded once per build
            if !graph.seen.insert(key) {
                return Ok(());
            }

            let loaded = self.load(&resolved).await?;

            if resolved.is_file() {
                graph.watch(PathBuf::from(&resolved.path));
            }
            for file in &loaded.watch_files {
                graph.watch(file.clone());
            }

            if loaded.loader.is_script() {
                let resolve_dir = loaded.resolve_dir.clone().unwrap_or_default();
                for specifier in scan_imports(&loaded.contents) {
                    let args = ResolveArgs::new(specifier, resolve_dir.clone())
                        .with_importer(&resolved.path, &resolved.namespace);
                    let dependency = self.resolve(&args)?;
                    self.visit(dependency, graph).await?;
                }
            }

            debug!(module = %resolved.path, namespace = %resolved.namespace, "module added");
            graph.modules.push(Module {
                namespace: resolved.namespace,
                path: resolved.path,
                loader: loaded.loader,
                contents: loaded.contents,
            });

            Ok(())
        })
    }

    fn emit_javascript(&self, modules: &[Module]) -> Result<String> {
        let defines = self
            .config
            .define
            .iter()
            .map(|(key, value)| {
                Regex::new(&format!(r"\b{}\b", regex::escape(key))).map(|re| (re, value.as_str()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut body = String::new();
        if modules.iter().any(|m| m.loader == Loader::Jsx) {
            body.push_str(&format!("/** @jsx {} */\n", self.config.jsx_factory));
            body.push_str(&format!("/** @jsxFrag {} */\n", self.config.jsx_fragment));
        }

        let mut sources = Vec::new();
        for module in modules.iter().filter(|m| m.loader != Loader::Css) {
            let mut contents = match module.loader {
                Loader::Json => format!("export default {};", module.contents.trim()),
                Loader::Text => format!(
                    "export default {};",
                    serde_json::Value::String(module.contents.clone())
                ),
                _ => module.contents.clone(),
            };
            for (re, value) in &defines {
                contents = re.replace_all(&contents, NoExpand(value)).into_owned();
            }

            if !self.config.minify {
                body.push_str(&format!("// {}\n", module.id()));
            }
            body.push_str(contents.trim_end());
            body.push('\n');
            sources.push((module.id(), contents));
        }

        let mut javascript = match &self.config.global_name {
            Some(name) => format!("var {} = (() => {{\n{}}})();\n", name, body),
            None => body,
        };

        if self.config.sourcemap == Some(SourceMapMode::Inline) {
            let (names, contents): (Vec<_>, Vec<_>) = sources.into_iter().unzip();
            let file = self
                .config
                .outfile
                .file_name()
                .map(|f| f.to_string_lossy().into_owned());
            javascript.push_str(&SourceMap::new(file, names).with_contents(contents).js_comment());
            javascript.push('\n');
        }

        Ok(javascript)
    }

    /// Where the collected CSS is written
    pub fn css_outfile(&self) -> PathBuf {
        let css = self.config.css_outfile();
        if css == self.config.outfile {
            self.config.outfile.with_extension("css")
        } else {
            css
        }
    }

    /// Write the JavaScript and, if any, the CSS output
    pub async fn write(&self, output: &BuildOutput) -> Result<()> {
        if let Some(parent) = self.config.outfile.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.config.outfile, &output.javascript).await?;
        debug!("wrote {}", self.config.outfile.display());

        if !output.css.is_empty() {
            let css_path = self.css_outfile();
            tokio::fs::write(&css_path, format!("{}\n", output.css)).await?;
            debug!("wrote {}", css_path.display());
        }

        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}
