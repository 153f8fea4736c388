//! End-to-end builds through the reference host
//!
//! Each test lays out a small project in a temporary directory and bundles it
//! with both plugins registered, the same way the `esbuild-bundle` binary does.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use wpbuild_plugins::globals::GLOBALS_NAMESPACE;
use wpbuild_plugins::plugin::{Loader, ResolveArgs};
use wpbuild_plugins::sass::SASS_NAMESPACE;
use wpbuild_plugins::{
    BuildConfig, BuildError, Bundler, GlobalExternalsOptions, GlobalExternalsPlugin, Plugin,
    SassOptions, SassPlugin,
};

/// Write `files` (relative path, contents) under a fresh temporary directory
fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn bundler(dir: &Path, debug: bool, introspect: bool) -> Bundler {
    let config = Arc::new(
        BuildConfig::new(dir.join("src/index.mjs"), dir.join("dist/index.js")).with_debug(debug),
    );
    let plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(GlobalExternalsPlugin::new(
            GlobalExternalsOptions::wordpress().introspect(introspect),
        )),
        Arc::new(SassPlugin::new(SassOptions::from_config(&config))),
    ];
    Bundler::new(config, &plugins)
}

#[test]
fn test_matching_specifiers_stay_virtual() {
    let dir = project(&[]);
    let bundler = bundler(dir.path(), false, true);

    for specifier in [
        "react",
        "react-dom",
        "@wordpress/element",
        "@wordpress/a11y/something",
        "@foo/bar",
    ] {
        let resolved = bundler
            .resolve(&ResolveArgs::new(specifier, dir.path()))
            .unwrap();
        assert_eq!(resolved.namespace, GLOBALS_NAMESPACE, "{}", specifier);
        assert_eq!(resolved.path, specifier);
    }
}

#[test]
fn test_global_paths() {
    let plugin = GlobalExternalsPlugin::new(GlobalExternalsOptions::wordpress());

    assert_eq!(plugin.global_path("@wordpress/dom-ready").as_deref(), Some("window.wp.domReady"));
    assert_eq!(plugin.global_path("@wordpress/a11y/something").as_deref(), Some("window.wp.something"));
    assert_eq!(plugin.global_path("@wordpress/block-editor").as_deref(), Some("window.wp.blockEditor"));
    assert_eq!(plugin.global_path("react").as_deref(), Some("window.wp.element"));
    assert_eq!(plugin.global_path("@foo/bar"), None);
}

#[tokio::test]
async fn test_wordpress_imports_become_globals() {
    let dir = project(&[
        (
            "src/index.mjs",
            "import domReady from '@wordpress/dom-ready';\n\
             import { speak } from '@wordpress/a11y/something';\n\
             import './panel.mjs';\n\
             domReady(() => speak('ready'));\n",
        ),
        ("src/panel.mjs", "import domReady from '@wordpress/dom-ready';\nexport const panel = 1;\n"),
    ]);

    let output = bundler(dir.path(), false, false).build().await.unwrap();

    let dom_ready = output.module(GLOBALS_NAMESPACE, "@wordpress/dom-ready").unwrap();
    assert_eq!(dom_ready.contents, "export default window.wp.domReady;\n");
    let something = output.module(GLOBALS_NAMESPACE, "@wordpress/a11y/something").unwrap();
    assert_eq!(something.contents, "export default window.wp.something;\n");

    // a virtual module is loaded once however many files import it
    let virtual_modules = output
        .modules
        .iter()
        .filter(|m| m.namespace == GLOBALS_NAMESPACE)
        .count();
    assert_eq!(virtual_modules, 2);
    assert!(output.watch_files.iter().all(|f| !f.to_string_lossy().contains("@wordpress")));
}

#[tokio::test]
async fn test_debug_and_production_builds() {
    let files = [(
        "src/index.mjs",
        "const App = () => <div />;\nif (process.env.NODE_ENV !== 'production') { console.log(App); }\n",
    )];

    let dir = project(&files);
    let production = bundler(dir.path(), false, true).build().await.unwrap();
    assert!(production.javascript.contains("\"production\" !== 'production'"));
    assert!(!production.javascript.contains("sourceMappingURL"));
    assert!(!production.javascript.contains("// file:"));
    assert!(production.javascript.contains("/** @jsx window.wp.element.createElement */"));

    let debug = bundler(dir.path(), true, true).build().await.unwrap();
    assert!(debug.javascript.contains("\"development\" !== 'production'"));
    assert!(debug.javascript.contains("// file:"));
    assert!(debug.javascript.contains("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
}

#[tokio::test]
async fn test_stylesheet_partials_are_watched() {
    let dir = project(&[
        ("src/index.mjs", "import './style/main.scss';\n"),
        ("src/style/_partial.scss", "$accent: #c00;\n.partial { color: $accent; }\n"),
        ("src/style/main.scss", "@import \"partial\";\n.main { .title { color: $accent; } }\n"),
    ]);
    let root = dir.path();

    let bundler = bundler(root, false, false);
    let output = bundler.build().await.unwrap();

    let main = root.join("src/style/main.scss");
    let partial = root.join("src/style/_partial.scss");
    assert!(output.watch_files.contains(&main));
    assert!(output.watch_files.contains(&partial));
    assert!(output.watch_files.contains(&root.join("src/index.mjs")));

    let stylesheet = output
        .module(SASS_NAMESPACE, &main.to_string_lossy())
        .unwrap();
    assert_eq!(stylesheet.loader, Loader::Css);
    assert!(output.css.contains(".main .title{color:#c00}"));

    bundler.write(&output).await.unwrap();
    let written = std::fs::read_to_string(root.join("dist/index.css")).unwrap();
    assert!(written.contains(".partial{color:#c00}"));
}

#[tokio::test]
async fn test_stylesheet_compile_error_fails_build() {
    let dir = project(&[
        ("src/index.mjs", "import './broken.scss';\n"),
        ("src/broken.scss", ".a { color: red;\n"),
    ]);

    let err = bundler(dir.path(), false, false).build().await.unwrap_err();
    match err {
        BuildError::StylesheetCompile { path, .. } => {
            assert_eq!(path, dir.path().join("src/broken.scss"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_uninstalled_package_falls_back_to_default() {
    let dir = project(&[
        ("src/index.mjs", "import { render } from '@wordpress/element';\nrender();\n"),
        // installed but broken: the entry it names does not exist
        (
            "node_modules/@wordpress/element/package.json",
            r#"{ "name": "@wordpress/element", "module": "build-module/missing.js" }"#,
        ),
    ]);

    let output = bundler(dir.path(), false, true).build().await.unwrap();
    let element = output.module(GLOBALS_NAMESPACE, "@wordpress/element").unwrap();
    assert_eq!(element.contents, "export default window.wp.element;\n");

    let dir = project(&[("src/index.mjs", "import { speak } from '@wordpress/a11y';\n")]);
    let output = bundler(dir.path(), false, true).build().await.unwrap();
    let a11y = output.module(GLOBALS_NAMESPACE, "@wordpress/a11y").unwrap();
    assert_eq!(a11y.contents, "export default window.wp.a11y;\n");
}

#[tokio::test]
async fn test_installed_package_exports_are_forwarded() {
    let dir = project(&[
        ("src/index.mjs", "import { render, createElement } from '@wordpress/element';\n"),
        (
            "node_modules/@wordpress/element/package.json",
            r#"{ "name": "@wordpress/element", "main": "build/index.js", "module": "build-module/index.js" }"#,
        ),
        (
            "node_modules/@wordpress/element/build-module/index.js",
            "export * from './react';\nexport { default as serialize } from './serialize';\nexport default {};\n",
        ),
        (
            "node_modules/@wordpress/element/build-module/react.js",
            "import { createHooks } from '@wordpress/hooks';\n\
             export function createElement() {}\nexport const render = () => {};\nexport default 1;\n",
        ),
        (
            "node_modules/@wordpress/element/build-module/serialize.js",
            "export default function serialize() {}\n",
        ),
    ]);

    let output = bundler(dir.path(), false, true).build().await.unwrap();

    let entry: PathBuf = std::fs::canonicalize(
        dir.path().join("node_modules/@wordpress/element/build-module/index.js"),
    )
    .unwrap();
    let element = output.module(GLOBALS_NAMESPACE, "@wordpress/element").unwrap();
    assert_eq!(
        element.contents,
        format!(
            "export {{ createElement, render, serialize }} from \"{}\";\nexport default window.wp.element;\n",
            entry.display()
        )
    );

    // the real package is pulled in, its own WordPress imports stay external
    assert!(output.module("file", &entry.to_string_lossy()).is_some());
    assert!(output.module(GLOBALS_NAMESPACE, "@wordpress/hooks").is_some());
}

#[tokio::test]
async fn test_simple_generation_skips_introspection() {
    let dir = project(&[
        ("src/index.mjs", "import { render } from '@wordpress/element';\n"),
        (
            "node_modules/@wordpress/element/package.json",
            r#"{ "name": "@wordpress/element", "module": "index.js" }"#,
        ),
        ("node_modules/@wordpress/element/index.js", "export const render = 1;\n"),
    ]);

    let output = bundler(dir.path(), false, false).build().await.unwrap();
    let element = output.module(GLOBALS_NAMESPACE, "@wordpress/element").unwrap();
    assert_eq!(element.contents, "export default window.wp.element;\n");
    assert_eq!(output.modules.len(), 2);
}
