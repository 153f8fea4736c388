// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # wpbuild-plugins
//!
//! Bundler plugins for WordPress front-end builds, written against an
//! esbuild-style resolve/load hook contract.
//!
//! - [`globals::GlobalExternalsPlugin`] turns imports such as
//!   `@wordpress/dom-ready` into re-exports of runtime globals
//!   (`window.wp.domReady`), optionally forwarding the named exports of the
//!   installed package.
//! - [`sass::SassPlugin`] compiles `*.scss` imports to CSS and reports every
//!   partial it read as a watch file.
//! - [`host::Bundler`] is a small reference host driving the plugins over an
//!   import graph.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wpbuild_plugins::{
//!     BuildConfig, Bundler, GlobalExternalsOptions, GlobalExternalsPlugin, Plugin, SassOptions,
//!     SassPlugin,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(BuildConfig::new("src/index.mjs", "dist/index.js"));
//!     let plugins: Vec<Arc<dyn Plugin>> = vec![
//!         Arc::new(GlobalExternalsPlugin::new(GlobalExternalsOptions::wordpress().introspect(true))),
//!         Arc::new(SassPlugin::new(SassOptions::from_config(&config))),
//!     ];
//!     let bundler = Bundler::new(config, &plugins);
//!     let output = bundler.build().await?;
//!     bundler.write(&output).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod globals;
pub mod host;
pub mod introspect;
pub mod plugin;
pub mod resolver;
pub mod sass;
pub mod sourcemap;

pub use config::BuildConfig;
pub use error::{BuildError, Result};
pub use globals::{GlobalExternalsOptions, GlobalExternalsPlugin};
pub use host::{BuildOutput, Bundler};
pub use plugin::{Plugin, PluginBuild};
pub use sass::{SassOptions, SassPlugin};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
