// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the build plugins

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin and host operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can abort a build
#[derive(Debug, Error)]
pub enum BuildError {
    /// Module not found on disk or in node_modules
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// No resolve hook or fallback could place the specifier
    #[error("Could not resolve \"{specifier}\" from {}", resolve_dir.display())]
    Resolve {
        /// Import specifier as written
        specifier: String,
        /// Directory the import was resolved against
        resolve_dir: PathBuf,
    },

    /// A namespaced module that no load hook claimed
    #[error("No loader is configured for \"{namespace}:{path}\"")]
    NoLoader {
        /// Virtual namespace
        namespace: String,
        /// Path inside the namespace
        path: String,
    },

    /// Stylesheet preprocessor failure
    #[error("{}: {message}", path.display())]
    StylesheetCompile {
        /// Stylesheet entry that failed
        path: PathBuf,
        /// Compiler message, unmodified
        message: String,
    },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid filter or externals pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Blocking task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Create a resolve error
    pub fn resolve(specifier: impl Into<String>, resolve_dir: impl Into<PathBuf>) -> Self {
        Self::Resolve {
            specifier: specifier.into(),
            resolve_dir: resolve_dir.into(),
        }
    }
}
