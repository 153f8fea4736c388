// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Global-externals plugin
//!
//! Maps imports such as `@wordpress/dom-ready` onto runtime globals
//! (`window.wp.domReady`) instead of bundling the package:
//!
//! ```text
//! import domReady from "@wordpress/dom-ready";
//! // => export default window.wp.domReady;
//! ```
//!
//! With introspection enabled the named exports of the installed package are
//! forwarded as well, so `import { foo } from "@wordpress/x"` still resolves.

pub mod captures;

use crate::error::Result;
use crate::introspect::{ModuleDescriptor, ModuleIntrospector, NodeModulesIntrospector};
use crate::plugin::{
    match_all, LoadArgs, LoadResult, OnLoadOptions, OnResolveOptions, Plugin, PluginBuild,
    ResolveArgs, ResolveResult,
};
use regex::Regex;
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub use captures::{
    kebab_to_camel, GlobalPathFn, GlobalPathMapping, SpecifierCaptures, WORDPRESS_EXTERNALS,
};

/// Default namespace of externalized modules
pub const GLOBALS_NAMESPACE: &str = "esbuild-globals-plugin";

/// Default export used when no global is known
const UNMAPPED: &str = "undefined";

/// Options of [`GlobalExternalsPlugin`]
#[derive(Clone)]
pub struct GlobalExternalsOptions {
    /// Specifiers claimed by the plugin
    pub pattern: Regex,
    /// Specifier tokens → global property path
    pub compute_global_path: GlobalPathFn,
    /// Virtual namespace (also the plugin name)
    pub namespace: String,
    /// Forward the real package's named exports
    pub introspect: bool,
}

impl GlobalExternalsOptions {
    /// Options for `pattern` with a custom mapping
    pub fn new(pattern: Regex, compute_global_path: GlobalPathFn) -> Self {
        Self {
            pattern,
            compute_global_path,
            namespace: GLOBALS_NAMESPACE.to_string(),
            introspect: false,
        }
    }

    /// WordPress packages onto `window.wp`
    pub fn wordpress() -> Self {
        let pattern = Regex::new(WORDPRESS_EXTERNALS).unwrap();
        Self::new(pattern, GlobalPathMapping::wordpress().into_fn())
    }

    /// Use a different namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Enable named-export forwarding
    pub fn introspect(mut self, introspect: bool) -> Self {
        self.introspect = introspect;
        self
    }
}

impl fmt::Debug for GlobalExternalsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalExternalsOptions")
            .field("pattern", &self.pattern.as_str())
            .field("namespace", &self.namespace)
            .field("introspect", &self.introspect)
            .finish_non_exhaustive()
    }
}

/// Resolver/loader pair turning matching imports into global re-exports
#[derive(Clone)]
pub struct GlobalExternalsPlugin {
    options: Arc<GlobalExternalsOptions>,
    introspector: Arc<dyn ModuleIntrospector>,
}

impl GlobalExternalsPlugin {
    /// Plugin introspecting `node_modules` when enabled
    pub fn new(options: GlobalExternalsOptions) -> Self {
        Self::with_introspector(options, Arc::new(NodeModulesIntrospector::new()))
    }

    /// Plugin with a custom introspector
    pub fn with_introspector(
        options: GlobalExternalsOptions,
        introspector: Arc<dyn ModuleIntrospector>,
    ) -> Self {
        Self {
            options: Arc::new(options),
            introspector,
        }
    }

    /// Plugin options
    pub fn options(&self) -> &GlobalExternalsOptions {
        &self.options
    }

    /// Global property path for `specifier`, if mapped
    pub fn global_path(&self, specifier: &str) -> Option<String> {
        let captures = SpecifierCaptures::extract(&self.options.pattern, specifier)
            .unwrap_or(SpecifierCaptures {
                specifier,
                ..Default::default()
            });
        (self.options.compute_global_path)(&captures)
    }

    /// Claim `args` into the plugin namespace. Never touches the file system.
    pub fn resolve(&self, args: &ResolveArgs) -> ResolveResult {
        ResolveResult::new(&args.path, &self.options.namespace)
            .with_plugin_data(json!({ "resolveDir": args.resolve_dir }))
    }

    /// Synthesize the module for a claimed specifier.
    pub async fn load(&self, args: &LoadArgs) -> LoadResult {
        let global = self.global_path(&args.path).unwrap_or_else(|| {
            debug!(specifier = %args.path, "no global mapping");
            UNMAPPED.to_string()
        });

        if !self.options.introspect {
            return LoadResult::js(default_export(&global));
        }

        let resolve_dir = args
            .plugin_data
            .as_ref()
            .and_then(|data| data.get("resolveDir"))
            .and_then(|dir| dir.as_str())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        match self.introspector.describe(&args.path, &resolve_dir).await {
            ModuleDescriptor::Found { path, exports } if !exports.is_empty() => {
                let mut result = LoadResult::js(format!(
                    "{}{}",
                    named_reexports(&exports, &path),
                    default_export(&global)
                ));
                result.resolve_dir = Some(PathBuf::from("/"));
                result
            }
            _ => LoadResult::js(default_export(&global)),
        }
    }
}

fn default_export(global: &str) -> String {
    format!("export default {};\n", global)
}

fn named_reexports(names: &[String], path: &Path) -> String {
    format!(
        "export {{ {} }} from {};\n",
        names.join(", "),
        serde_json::Value::String(path.to_string_lossy().into_owned())
    )
}

impl Plugin for GlobalExternalsPlugin {
    fn name(&self) -> &str {
        &self.options.namespace
    }

    fn setup(&self, build: &mut PluginBuild) {
        let plugin = self.clone();
        build.on_resolve(OnResolveOptions::new(self.options.pattern.clone()), move |args| {
            Ok(Some(plugin.resolve(args)))
        });

        let plugin = self.clone();
        build.on_load(
            OnLoadOptions::new(match_all()).namespace(&self.options.namespace),
            move |args| {
                let plugin = plugin.clone();
                async move { Result::Ok(Some(plugin.load(&args).await)) }
            },
        );
    }
}
