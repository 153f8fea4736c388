// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build configuration.
//!
//! A [`BuildConfig`] is assembled once from the command line and then shared
//! read-only with every plugin through [`crate::plugin::PluginBuild::initial_options`].

use crate::plugin::Loader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Define key for the environment mode constant
pub const NODE_ENV_KEY: &str = "process.env.NODE_ENV";

/// JSX factory rooted at the WordPress element global
pub const JSX_FACTORY: &str = "window.wp.element.createElement";

/// JSX fragment rooted at the WordPress element global
pub const JSX_FRAGMENT: &str = "window.wp.element.Fragment";

/// Target platform of the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Browser globals (`window`)
    Browser,
}

/// Source map emission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Base64 data URL appended to the output
    Inline,
}

/// Immutable configuration for one build invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Entry module
    pub entry_point: PathBuf,
    /// Output JavaScript file
    pub outfile: PathBuf,
    /// Debug build: readable output, inline source maps, development mode
    pub debug: bool,
    /// Name of the global the bundle is assigned to
    pub global_name: Option<String>,
    /// Rebuild on change
    pub watch: bool,
    /// Follow imports into a single bundle
    pub bundle: bool,
    /// Target platform
    pub platform: Platform,
    /// Language target
    pub target: String,
    /// Loader overrides keyed by extension (with leading dot)
    pub loaders: BTreeMap<String, Loader>,
    /// Global identifier substitutions
    pub define: BTreeMap<String, String>,
    /// JSX element factory
    pub jsx_factory: String,
    /// JSX fragment
    pub jsx_fragment: String,
    /// Minify output
    pub minify: bool,
    /// Source map mode
    pub sourcemap: Option<SourceMapMode>,
}

impl BuildConfig {
    /// Create a production configuration for `entry_point` → `outfile`.
    pub fn new(entry_point: impl Into<PathBuf>, outfile: impl Into<PathBuf>) -> Self {
        let mut loaders = BTreeMap::new();
        // .mjs sources carry JSX
        loaders.insert(".mjs".to_string(), Loader::Jsx);

        let mut config = Self {
            entry_point: entry_point.into(),
            outfile: outfile.into(),
            debug: false,
            global_name: None,
            watch: false,
            bundle: true,
            platform: Platform::Browser,
            target: "esnext".to_string(),
            loaders,
            define: BTreeMap::new(),
            jsx_factory: JSX_FACTORY.to_string(),
            jsx_fragment: JSX_FRAGMENT.to_string(),
            minify: true,
            sourcemap: None,
        };
        config.apply_mode();
        config
    }

    /// Switch between production and debug builds.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self.apply_mode();
        self
    }

    /// Assign the bundle to a global.
    pub fn with_global_name(mut self, name: Option<String>) -> Self {
        self.global_name = name.filter(|n| !n.is_empty());
        self
    }

    /// Enable watch mode.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    fn apply_mode(&mut self) {
        self.define.insert(NODE_ENV_KEY.to_string(), format!("\"{}\"", self.mode()));
        self.minify = !self.debug;
        self.sourcemap = self.debug.then_some(SourceMapMode::Inline);
    }

    /// `development` for debug builds, `production` otherwise
    pub fn mode(&self) -> &'static str {
        if self.debug {
            "development"
        } else {
            "production"
        }
    }

    /// Loader for a file, honouring the extension overrides.
    pub fn loader_for(&self, path: &Path) -> Loader {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        self.loaders
            .get(&ext)
            .copied()
            .unwrap_or_else(|| Loader::from_extension(&ext))
    }

    /// Nominal stylesheet output: the outfile with a trailing `.js` swapped for `.css`.
    pub fn css_outfile(&self) -> PathBuf {
        let out = self.outfile.to_string_lossy();
        match out.strip_suffix(".js") {
            Some(stem) => PathBuf::from(format!("{}.css", stem)),
            None => self.outfile.clone(),
        }
    }
}
