//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use similar_asserts::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAIN_JS: &str = r#"// RequireJS entry point
require.config({
    baseUrl: 'js',
    paths: {
        jquery: 'lib/jquery',
        underscore: 'lib/underscore'
    },
    shim: {
        backbone: { deps: ['underscore', 'jquery'], exports: 'Backbone' }
    }
});

require(['app', 'router'], function (app, router) {
    app.start(router);
});
require('main');
"#;

const EXPECTED_WEBPACK: &str = "resolve: {\n\
                                \talias: {\n\
                                \t\t'jquery': 'lib/jquery',\n\
                                \t\t'underscore': 'lib/underscore',\n\
                                \t},\n\
                                \tmodule: {\n\
                                \t\trules: {\n\
                                \t\t\t{\n\
                                \t\t\t\ttest: /backbone/,\n\
                                \t\t\t\tuse: [\n\
                                \t\t\t\t\t\"imports-loader?this=>underscore,jquery\"\n\
                                \t\t\t\t],\n\
                                \t\t\t},\n\
                                \t\t},\n\
                                \t},\n\
                                }\n\
                                define([\t'app',\n\
                                \t'router',\n\
                                \t'main',\n\
                                ], function () {});\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let fixture = Self { dir };
        fixture.write("main.js", MAIN_JS);
        fixture
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("requirejs2webpack"));
        cmd.current_dir(self.root()).env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("requirejs2webpack"));
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("requirejs2webpack"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("requirejs2webpack"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Translate a RequireJS"))
        .stdout(predicate::str::contains("--use-format"));
}

#[test]
fn test_missing_source_argument_prints_invalid_file_message() {
    let fixture = Fixture::new();
    fixture
        .command()
        .assert()
        .success()
        .stdout("na please enter a valid config file.\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_nonexistent_source_prints_invalid_file_message() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["does-not-exist.js", "out.js"])
        .assert()
        .success()
        .stdout("na please enter a valid config file.\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_translates_config_to_webpack() {
    let fixture = Fixture::new();
    let output = fixture.command().args(["main.js", "webpack.config.js"]).output().expect("run");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 stdout");
    assert_eq!(stdout.as_str(), EXPECTED_WEBPACK);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Module 'app' was required."));
    assert!(stderr.contains("Module 'main' was required."));
    assert!(!stderr.contains("was mapped to"));
}

#[test]
fn test_verbose_logs_mappings_and_shims() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--verbose", "main.js", "webpack.config.js"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Module 'jquery' was mapped to lib/jquery."))
        .stderr(predicate::str::contains("Shim 'backbone' depends on underscore,jquery."))
        .stderr(predicate::str::contains("Writing to 'webpack.config.js'."));
}

#[test]
fn test_throwing_source_prints_no_output() {
    let fixture = Fixture::new();
    fixture.write("broken.js", "require('a');\nrequirejs.config({ paths: {} });\n");
    fixture
        .command()
        .args(["broken.js", "out.js"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("ReferenceError: requirejs is not defined"));
}

#[test]
fn test_syntax_error_prints_no_output() {
    let fixture = Fixture::new();
    fixture.write("broken.js", "require.config({ paths: { a: 'b' }\n");
    fixture
        .command()
        .args(["broken.js"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SyntaxError"));
}

#[test]
fn test_write_flag_writes_output_file() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--write", "main.js", "webpack.fragment.js"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(fixture.path("webpack.fragment.js")).expect("output file");
    assert_eq!(written.as_str(), EXPECTED_WEBPACK);
}

#[test]
fn test_write_flag_without_output_warns_and_prints() {
    let fixture = Fixture::new();
    let output = fixture.command().args(["--write", "main.js"]).output().expect("run");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 stdout");
    assert_eq!(stdout.as_str(), EXPECTED_WEBPACK);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no OUTPUT path was given; printing to stdout"));
    assert!(!fixture.path("stdout").exists());
}

#[test]
fn test_per_dependency_use_format() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--use-format", "per-dependency", "main.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\t\t\t\t\t\"imports-loader?this=>underscore\",\n\t\t\t\t\t\"imports-loader?this=>jquery\"\n",
        ));
}

#[test]
fn test_config_file_selects_json_output() {
    let fixture = Fixture::new();
    fixture.write("requirejs2webpack.toml", "emit = \"json\"\n");
    let output = fixture.command().arg("main.js").output().expect("run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["required"], serde_json::json!(["app", "router", "main"]));
    assert_eq!(json["aliases"]["underscore"], serde_json::json!("lib/underscore"));
    assert_eq!(json["rules"][0]["test"], serde_json::json!("/backbone/"));
}

#[test]
fn test_rejects_invalid_use_format() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--use-format", "spread", "main.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid use format"));
}
