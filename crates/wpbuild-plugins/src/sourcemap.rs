// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Inline (data URL) source maps

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Source map v3 document
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Always 3
    pub version: u8,
    /// Generated file the map belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Original sources
    pub sources: Vec<String>,
    /// Original source text, parallel to `sources`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    /// Symbol names
    pub names: Vec<String>,
    /// VLQ mappings
    pub mappings: String,
}

impl SourceMap {
    /// Map for `file` listing `sources` without segment mappings
    pub fn new(file: Option<String>, sources: Vec<String>) -> Self {
        Self {
            version: 3,
            file,
            sources,
            ..Default::default()
        }
    }

    /// Embed the original texts
    pub fn with_contents(mut self, contents: Vec<String>) -> Self {
        self.sources_content = Some(contents);
        self
    }

    /// `data:` URL carrying the map
    pub fn to_data_url(&self) -> String {
        // Serializing plain strings cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("data:application/json;charset=utf-8;base64,{}", STANDARD.encode(json))
    }

    /// CSS comment referencing the inline map
    pub fn css_comment(&self) -> String {
        format!("/*# sourceMappingURL={} */", self.to_data_url())
    }

    /// JavaScript comment referencing the inline map
    pub fn js_comment(&self) -> String {
        format!("//# sourceMappingURL={}", self.to_data_url())
    }
}

/// `path` relative to the directory `base`; both absolute and normalized
pub fn relative_source(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<_> = path.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &path[common..] {
        relative.push(component);
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_source() {
        let out_dir = Path::new("/project/dist");
        assert_eq!(
            relative_source(Path::new("/project/src/main.scss"), out_dir),
            PathBuf::from("../src/main.scss")
        );
        assert_eq!(
            relative_source(Path::new("/project/dist/app.scss"), out_dir),
            PathBuf::from("app.scss")
        );
        assert_eq!(
            relative_source(Path::new("/other/a.scss"), out_dir),
            PathBuf::from("../../other/a.scss")
        );
    }

    #[test]
    fn test_inline_map_decodes() {
        let map = SourceMap::new(Some("app.css".into()), vec!["/src/main.scss".into()])
            .with_contents(vec!["a { b: c }".into()]);
        let comment = map.css_comment();
        assert!(comment.starts_with("/*# sourceMappingURL=data:application/json;charset=utf-8;base64,"));

        let encoded = comment
            .trim_start_matches("/*# sourceMappingURL=data:application/json;charset=utf-8;base64,")
            .trim_end_matches(" */");
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "app.css");
        assert_eq!(json["sources"][0], "/src/main.scss");
        assert_eq!(json["sourcesContent"][0], "a { b: c }");
    }

    #[test]
    fn test_contents_optional() {
        let map = SourceMap::new(None, vec!["a.js".into()]);
        let json = serde_json::to_value(&map).unwrap();
        assert!(json.get("sourcesContent").is_none());
        assert!(json.get("file").is_none());
        assert!(map.js_comment().starts_with("//# sourceMappingURL=data:"));
    }
}
