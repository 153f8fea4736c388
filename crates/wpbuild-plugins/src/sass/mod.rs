// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sass plugin
//!
//! Claims `*.scss` imports, compiles them and hands the CSS back to the host
//! with the `css` loader. Every stylesheet the compiler read is reported as a
//! watch file so partials trigger rebuilds too.

mod compiler;

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::plugin::{
    match_all, LoadArgs, LoadResult, OnLoadOptions, OnResolveOptions, Plugin, PluginBuild,
    ResolveArgs, ResolveResult,
};
use crate::resolver::normalize_path;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub use compiler::{CompileStats, CompiledStylesheet, GrassCompiler, StylesheetCompiler};

/// Namespace of compiled stylesheets
pub const SASS_NAMESPACE: &str = "esbuild-sass-plugin";

/// Imports claimed by the plugin
pub const SCSS_FILTER: &str = r"\.scss$";

/// CSS formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    /// One rule per block, indented
    Expanded,
    /// No insignificant whitespace
    Compressed,
}

/// Compiler options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SassOptions {
    /// Nominal CSS output, used for source-map paths only; never written
    pub out_file: PathBuf,
    /// CSS formatting
    pub output_style: OutputStyle,
    /// Produce a source map
    pub source_map: bool,
    /// Annotate rules with their origin
    pub source_comments: bool,
    /// Include original texts in the source map
    pub source_map_contents: bool,
    /// Append the source map as a data URL
    pub source_map_embed: bool,
    /// Extra import search directories
    pub load_paths: Vec<PathBuf>,
}

impl SassOptions {
    /// Compressed, map-free options for production
    pub fn new(out_file: impl Into<PathBuf>) -> Self {
        Self {
            out_file: out_file.into(),
            output_style: OutputStyle::Compressed,
            source_map: false,
            source_comments: false,
            source_map_contents: false,
            source_map_embed: false,
            load_paths: Vec::new(),
        }
    }

    /// Options following the build's debug flag
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.css_outfile()).with_debug(config.debug)
    }

    /// Expanded output with an embedded source map when `debug`
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.output_style = if debug {
            OutputStyle::Expanded
        } else {
            OutputStyle::Compressed
        };
        self.source_map = debug;
        self.source_comments = debug;
        self.source_map_contents = debug;
        self.source_map_embed = debug;
        self
    }

    /// Add an import search directory
    pub fn load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }
}

/// Resolver/loader pair compiling Sass stylesheets
#[derive(Clone)]
pub struct SassPlugin {
    options: Arc<SassOptions>,
    compiler: Arc<dyn StylesheetCompiler>,
    report_watch_files: bool,
}

impl SassPlugin {
    /// Plugin backed by [`GrassCompiler`]
    pub fn new(options: SassOptions) -> Self {
        Self::with_compiler(options, Arc::new(GrassCompiler))
    }

    /// Plugin backed by a custom compiler
    pub fn with_compiler(options: SassOptions, compiler: Arc<dyn StylesheetCompiler>) -> Self {
        Self {
            options: Arc::new(options),
            compiler,
            report_watch_files: true,
        }
    }

    /// Toggle reporting of included files as watch files
    pub fn report_watch_files(mut self, report: bool) -> Self {
        self.report_watch_files = report;
        self
    }

    /// Compiler options
    pub fn options(&self) -> &SassOptions {
        &self.options
    }

    /// Absolute stylesheet path in the plugin namespace
    pub fn resolve(&self, args: &ResolveArgs) -> ResolveResult {
        let path = normalize_path(&args.resolve_dir.join(&args.path));
        ResolveResult::new(path.to_string_lossy(), SASS_NAMESPACE)
    }

    /// Compile the stylesheet; returns once compilation has finished.
    pub async fn load(&self, args: &LoadArgs) -> Result<LoadResult> {
        let path = PathBuf::from(&args.path);
        let compiler = Arc::clone(&self.compiler);
        let options = Arc::clone(&self.options);

        let compiled = tokio::task::spawn_blocking(move || compiler.compile(&path, &options)).await??;

        debug!(
            path = %args.path,
            included = compiled.stats.included_files.len(),
            "compiled stylesheet"
        );

        let mut result = LoadResult::css(String::from_utf8_lossy(&compiled.css));
        if self.report_watch_files {
            result.watch_files = compiled.stats.included_files;
        }
        Ok(result)
    }
}

impl Plugin for SassPlugin {
    fn name(&self) -> &str {
        SASS_NAMESPACE
    }

    fn setup(&self, build: &mut PluginBuild) {
        let plugin = self.clone();
        build.on_resolve(OnResolveOptions::new(Regex::new(SCSS_FILTER).unwrap()), move |args| {
            Ok(Some(plugin.resolve(args)))
        });

        let plugin = self.clone();
        build.on_load(OnLoadOptions::new(match_all()).namespace(SASS_NAMESPACE), move |args| {
            let plugin = plugin.clone();
            async move { plugin.load(&args).await.map(Some) }
        });
    }
}

/// Map a compiler failure for `path`
pub(crate) fn compile_error(path: &Path, message: impl Into<String>) -> BuildError {
    BuildError::StylesheetCompile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
