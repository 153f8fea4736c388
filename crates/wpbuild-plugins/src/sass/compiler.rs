// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stylesheet compiler seam and its `grass` implementation

use super::{compile_error, OutputStyle, SassOptions};
use crate::error::Result;
use crate::resolver::normalize_path;
use crate::sourcemap::{relative_source, SourceMap};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Files the compiler read while compiling an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Entry first, then imports in the order they were loaded
    pub included_files: Vec<PathBuf>,
}

/// Output of one compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledStylesheet {
    /// CSS text
    pub css: Vec<u8>,
    /// Compilation statistics
    pub stats: CompileStats,
}

/// Synchronous stylesheet compiler
pub trait StylesheetCompiler: Send + Sync {
    /// Compile the stylesheet at `path`
    fn compile(&self, path: &Path, options: &SassOptions) -> Result<CompiledStylesheet>;
}

/// Compiler backed by the `grass` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

impl StylesheetCompiler for GrassCompiler {
    fn compile(&self, path: &Path, options: &SassOptions) -> Result<CompiledStylesheet> {
        let fs = RecordingFs::default();

        let style = match options.output_style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        };

        let mut grass_options = grass::Options::default().style(style).fs(&fs).quiet(true);
        for load_path in &options.load_paths {
            grass_options = grass_options.load_path(load_path);
        }

        let mut css = grass::from_path(path, &grass_options)
            .map_err(|err| compile_error(path, err.to_string()))?;

        let included_files = fs.into_files();

        if options.source_map && options.source_map_embed {
            let map = source_map_for(&included_files, options)?;
            if !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(&map.css_comment());
            css.push('\n');
        }

        Ok(CompiledStylesheet {
            css: css.into_bytes(),
            stats: CompileStats { included_files },
        })
    }
}

/// Map whose sources are relative to the nominal output's directory
fn source_map_for(included: &[PathBuf], options: &SassOptions) -> Result<SourceMap> {
    let out_file = if options.out_file.is_absolute() {
        normalize_path(&options.out_file)
    } else {
        normalize_path(&std::env::current_dir()?.join(&options.out_file))
    };
    let out_dir = out_file.parent().unwrap_or(Path::new("/"));

    let file = out_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let sources = included
        .iter()
        .map(|p| relative_source(p, out_dir).to_string_lossy().into_owned())
        .collect();

    let mut map = SourceMap::new(file, sources);
    if options.source_map_contents {
        let contents = included
            .iter()
            .map(std::fs::read_to_string)
            .collect::<std::io::Result<Vec<_>>>()?;
        map = map.with_contents(contents);
    }
    Ok(map)
}

/// File system view recording every stylesheet read
#[derive(Debug, Default)]
struct RecordingFs {
    files: Mutex<Vec<PathBuf>>,
}

impl RecordingFs {
    fn into_files(self) -> Vec<PathBuf> {
        self.files.into_inner()
    }
}

impl grass::Fs for RecordingFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let contents = std::fs::read(path)?;
        let path = normalize_path(path);
        let mut files = self.files.lock();
        if !files.contains(&path) {
            files.push(path);
        }
        Ok(contents)
    }
}
