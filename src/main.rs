// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! esbuild-bundle - bundle a WordPress front-end entry point
//!
//! ```bash
//! esbuild-bundle src/index.mjs dist/index.js
//! esbuild-bundle --debug --global-name=MyBlock --watch src/index.mjs dist/index.js
//! ```
//!
//! `@wordpress/*`, `react` and `react-dom` imports are mapped onto `window.wp`
//! globals; `*.scss` imports are compiled and written next to the output as
//! `<output>.css`.

mod watch;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use wpbuild_plugins::{
    BuildConfig, BuildOutput, Bundler, GlobalExternalsOptions, GlobalExternalsPlugin, Plugin,
    SassOptions, SassPlugin, VERSION,
};

#[derive(Parser, Debug)]
#[command(
    name = "esbuild-bundle",
    about = "Bundle a WordPress front-end entry point",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Entry module
    input: PathBuf,

    /// Output JavaScript file
    output: PathBuf,

    /// Development build with inline source maps and no minification
    #[arg(long)]
    debug: bool,

    /// Assign the bundle's exports to this global
    #[arg(long = "global-name", value_name = "NAME")]
    global_name: Option<String>,

    /// Rebuild when an input changes
    #[arg(long)]
    watch: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> BuildConfig {
        BuildConfig::new(&self.input, &self.output)
            .with_debug(self.debug)
            .with_global_name(self.global_name.clone())
            .with_watch(self.watch)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("wpbuild=debug,wpbuild_plugins=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("wpbuild=info,wpbuild_plugins=warn")
            .init();
    }

    let config = Arc::new(cli.config());

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Plugins every build runs with
fn plugins(config: &BuildConfig) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(GlobalExternalsPlugin::new(
            GlobalExternalsOptions::wordpress().introspect(true),
        )),
        Arc::new(SassPlugin::new(SassOptions::from_config(config))),
    ]
}

async fn run(config: Arc<BuildConfig>) -> anyhow::Result<()> {
    let bundler = Bundler::new(Arc::clone(&config), &plugins(&config));
    let output = build_once(&bundler).await?;

    if config.watch {
        watch::watch(&bundler, output.watch_files).await?;
    }

    Ok(())
}

/// Build and write the outputs
async fn build_once(bundler: &Bundler) -> anyhow::Result<BuildOutput> {
    let output = bundler
        .build()
        .await
        .with_context(|| format!("failed to bundle {}", bundler.config().entry_point.display()))?;
    bundler
        .write(&output)
        .await
        .with_context(|| format!("failed to write {}", bundler.config().outfile.display()))?;
    Ok(output)
}
