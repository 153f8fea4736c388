// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bundler plugin contract
//!
//! Mirrors the esbuild plugin API:
//! - `onResolve({ filter }, handler)` maps an import specifier to a `(namespace, path)` pair
//! - `onLoad({ filter, namespace }, handler)` turns a `(namespace, path)` pair into source
//!
//! Paths outside the `file` namespace are virtual: only load hooks registered
//! for that namespace may serve them.

use crate::config::BuildConfig;
use crate::error::Result;
use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Namespace of modules backed by real files
pub const FILE_NAMESPACE: &str = "file";

/// How loaded contents should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    /// JavaScript module
    Js,
    /// JavaScript with JSX
    Jsx,
    /// Stylesheet
    Css,
    /// JSON document
    Json,
    /// Plain text exported as a string
    Text,
}

impl Loader {
    /// Default loader for an extension (with leading dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".jsx" | ".tsx" => Loader::Jsx,
            ".css" => Loader::Css,
            ".json" => Loader::Json,
            ".txt" => Loader::Text,
            _ => Loader::Js,
        }
    }

    /// Whether contents can carry `import`/`export` statements
    pub fn is_script(self) -> bool {
        matches!(self, Loader::Js | Loader::Jsx)
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Css => "css",
            Loader::Json => "json",
            Loader::Text => "text",
        };
        f.write_str(name)
    }
}

impl FromStr for Loader {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "js" => Ok(Loader::Js),
            "jsx" => Ok(Loader::Jsx),
            "css" => Ok(Loader::Css),
            "json" => Ok(Loader::Json),
            "text" => Ok(Loader::Text),
            other => Err(format!("unknown loader '{}'", other)),
        }
    }
}

/// Arguments passed to resolve hooks, one per import statement
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    /// Specifier as written in the import
    pub path: String,
    /// Path of the importing module
    pub importer: String,
    /// Directory relative imports resolve against
    pub resolve_dir: PathBuf,
    /// Namespace of the importing module
    pub namespace: String,
}

impl ResolveArgs {
    /// Arguments for an import found in a file-backed module
    pub fn new(path: impl Into<String>, resolve_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            importer: String::new(),
            resolve_dir: resolve_dir.into(),
            namespace: FILE_NAMESPACE.to_string(),
        }
    }

    /// Set the importing module
    pub fn with_importer(mut self, importer: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.importer = importer.into();
        self.namespace = namespace.into();
        self
    }
}

/// Outcome of a resolve hook
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveResult {
    /// Resolved path inside `namespace`
    pub path: String,
    /// Namespace the load step is routed to
    pub namespace: String,
    /// Opaque data handed to the load hook of the same module
    pub plugin_data: Option<serde_json::Value>,
}

impl ResolveResult {
    /// Tag `path` into `namespace`
    pub fn new(path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
            plugin_data: None,
        }
    }

    /// A real file
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, FILE_NAMESPACE)
    }

    /// Attach plugin data
    pub fn with_plugin_data(mut self, data: serde_json::Value) -> Self {
        self.plugin_data = Some(data);
        self
    }

    /// Whether the host's file loader may read this path
    pub fn is_file(&self) -> bool {
        self.namespace == FILE_NAMESPACE
    }
}

/// Arguments passed to load hooks
#[derive(Debug, Clone)]
pub struct LoadArgs {
    /// Path from the resolve step
    pub path: String,
    /// Namespace from the resolve step
    pub namespace: String,
    /// Plugin data from the resolve step
    pub plugin_data: Option<serde_json::Value>,
}

impl From<ResolveResult> for LoadArgs {
    fn from(resolved: ResolveResult) -> Self {
        Self {
            path: resolved.path,
            namespace: resolved.namespace,
            plugin_data: resolved.plugin_data,
        }
    }
}

/// Outcome of a load hook
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// Module source or compiled stylesheet
    pub contents: String,
    /// How `contents` is parsed
    pub loader: Loader,
    /// Directory imports inside `contents` resolve against
    pub resolve_dir: Option<PathBuf>,
    /// Extra files whose change should trigger a rebuild
    pub watch_files: Vec<PathBuf>,
}

impl LoadResult {
    /// Plain module source
    pub fn js(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            loader: Loader::Js,
            resolve_dir: None,
            watch_files: Vec::new(),
        }
    }

    /// Compiled stylesheet
    pub fn css(contents: impl Into<String>) -> Self {
        Self {
            loader: Loader::Css,
            ..Self::js(contents)
        }
    }
}

/// Options for [`PluginBuild::on_resolve`]
#[derive(Debug, Clone)]
pub struct OnResolveOptions {
    /// Specifiers the hook is offered
    pub filter: Regex,
}

impl OnResolveOptions {
    /// Offer specifiers matching `filter`
    pub fn new(filter: Regex) -> Self {
        Self { filter }
    }
}

/// Options for [`PluginBuild::on_load`]
#[derive(Debug, Clone)]
pub struct OnLoadOptions {
    /// Paths the hook is offered
    pub filter: Regex,
    /// Namespace the hook serves; `None` serves the file namespace
    pub namespace: Option<String>,
}

impl OnLoadOptions {
    /// Offer file-namespace paths matching `filter`
    pub fn new(filter: Regex) -> Self {
        Self {
            filter,
            namespace: None,
        }
    }

    /// Serve a specific namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Filter accepting every path
pub fn match_all() -> Regex {
    Regex::new(".*").unwrap()
}

/// Resolve hook handler
pub type ResolveHandler = Arc<dyn Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync>;

/// Load hook handler
pub type LoadHandler =
    Arc<dyn Fn(LoadArgs) -> BoxFuture<'static, Result<Option<LoadResult>>> + Send + Sync>;

struct ResolveHook {
    plugin: String,
    options: OnResolveOptions,
    handler: ResolveHandler,
}

struct LoadHook {
    plugin: String,
    options: OnLoadOptions,
    handler: LoadHandler,
}

/// A plugin registers its hooks in `setup`
pub trait Plugin: Send + Sync {
    /// Plugin name, used in logs
    fn name(&self) -> &str;

    /// Register hooks
    fn setup(&self, build: &mut PluginBuild);
}

/// Hook registry handed to [`Plugin::setup`]
pub struct PluginBuild {
    config: Arc<BuildConfig>,
    current_plugin: String,
    resolve_hooks: Vec<ResolveHook>,
    load_hooks: Vec<LoadHook>,
}

impl PluginBuild {
    /// Empty registry for a build
    pub fn new(config: Arc<BuildConfig>) -> Self {
        Self {
            config,
            current_plugin: String::new(),
            resolve_hooks: Vec::new(),
            load_hooks: Vec::new(),
        }
    }

    /// Run `setup` of each plugin in order
    pub fn with_plugins(config: Arc<BuildConfig>, plugins: &[Arc<dyn Plugin>]) -> Self {
        let mut build = Self::new(config);
        for plugin in plugins {
            build.current_plugin = plugin.name().to_string();
            plugin.setup(&mut build);
        }
        build.current_plugin.clear();
        build
    }

    /// The build configuration
    pub fn initial_options(&self) -> &BuildConfig {
        &self.config
    }

    /// Register a resolve hook
    pub fn on_resolve<F>(&mut self, options: OnResolveOptions, handler: F)
    where
        F: Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync + 'static,
    {
        self.resolve_hooks.push(ResolveHook {
            plugin: self.current_plugin.clone(),
            options,
            handler: Arc::new(handler),
        });
    }

    /// Register a load hook
    pub fn on_load<F, Fut>(&mut self, options: OnLoadOptions, handler: F)
    where
        F: Fn(LoadArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<LoadResult>>> + Send + 'static,
    {
        self.load_hooks.push(LoadHook {
            plugin: self.current_plugin.clone(),
            options,
            handler: Arc::new(move |args: LoadArgs| -> BoxFuture<'static, Result<Option<LoadResult>>> {
                Box::pin(handler(args))
            }),
        });
    }

    /// Offer `args` to the resolve hooks; first claim wins
    pub fn resolve(&self, args: &ResolveArgs) -> Result<Option<ResolveResult>> {
        for hook in &self.resolve_hooks {
            if !hook.options.filter.is_match(&args.path) {
                continue;
            }
            if let Some(result) = (hook.handler)(args)? {
                debug!(
                    plugin = %hook.plugin,
                    specifier = %args.path,
                    "resolved to {}:{}",
                    result.namespace,
                    result.path
                );
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Offer `args` to the load hooks serving its namespace; first claim wins
    pub async fn load(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        for hook in &self.load_hooks {
            let namespace = hook.options.namespace.as_deref().unwrap_or(FILE_NAMESPACE);
            if namespace != args.namespace || !hook.options.filter.is_match(&args.path) {
                continue;
            }
            if let Some(result) = (hook.handler)(args.clone()).await? {
                debug!(plugin = %hook.plugin, path = %args.path, loader = %result.loader, "loaded");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}
