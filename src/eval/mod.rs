//! Restricted evaluation of RequireJS configuration scripts.
//!
//! [`evaluate`] is the only place where the content of a configuration file
//! is interpreted. The script runs against a small, fixed set of globals:
//! `require` (and its `config` property) are bound to a caller-supplied
//! [`ModuleRecorder`], and nothing else from the host is reachable. Script
//! functions are kept as opaque values and never executed, so the code a
//! configuration file can run is limited to literal construction, variable
//! bindings, property access and calls into the recorder.

mod interpreter;
pub mod value;

use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use interpreter::Interpreter;
pub use value::Value;

/// A script-level `TypeError` raised by a recorder. The evaluator attaches
/// the position of the call that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TypeError(pub String);

/// Capability injected into the script as `require` / `require.config`.
pub trait ModuleRecorder {
    /// Called for every `require(modules, ...)`; only the first argument is passed.
    fn record_require(&mut self, modules: &Value) -> Result<(), TypeError>;

    /// Called for every `require.config(config)`.
    fn record_config(&mut self, config: &Value) -> Result<(), TypeError>;
}

/// Errors raised while parsing or evaluating a configuration script.
/// Line and column numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("failed to initialise the JavaScript parser: {0}")]
    Parser(String),

    #[error("SyntaxError: unexpected {found} at line {line}, column {column}")]
    Syntax { found: String, line: usize, column: usize },

    #[error("ReferenceError: {name} is not defined (line {line}, column {column})")]
    Reference { name: String, line: usize, column: usize },

    #[error("TypeError: {message} (line {line}, column {column})")]
    Type { message: String, line: usize, column: usize },

    #[error("unsupported syntax: {what} (line {line}, column {column})")]
    Unsupported { what: String, line: usize, column: usize },
}

impl EvalError {
    pub(crate) fn syntax(node: Node<'_>, source: &str) -> Self {
        let (line, column) = position(node);
        let found = if node.is_missing() {
            format!("end of input (missing `{}`)", node.kind())
        } else {
            let text = source.get(node.byte_range()).unwrap_or_default();
            match text.split_whitespace().next() {
                Some(token) => format!("token `{token}`"),
                None => "end of input".to_string(),
            }
        };
        EvalError::Syntax { found, line, column }
    }

    pub(crate) fn reference(node: Node<'_>, name: &str) -> Self {
        let (line, column) = position(node);
        EvalError::Reference { name: name.to_string(), line, column }
    }

    pub(crate) fn type_error(node: Node<'_>, err: TypeError) -> Self {
        let (line, column) = position(node);
        EvalError::Type { message: err.0, line, column }
    }

    pub(crate) fn unsupported(node: Node<'_>, what: impl Into<String>) -> Self {
        let (line, column) = position(node);
        EvalError::Unsupported { what: what.into(), line, column }
    }
}

fn position(node: Node<'_>) -> (usize, usize) {
    let point = node.start_position();
    (point.row + 1, point.column + 1)
}

/// Parse `source` as JavaScript and run its top-level code once, routing
/// every `require(...)` and `require.config(...)` call to `recorder`.
pub fn evaluate(source: &str, recorder: &mut dyn ModuleRecorder) -> Result<(), EvalError> {
    let language: Language = tree_sitter_javascript::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|err| EvalError::Parser(err.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| EvalError::Parser("parsing was cancelled".to_string()))?;
    let root = tree.root_node();

    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        return Err(EvalError::syntax(node, source));
    }

    Interpreter::new(source, recorder).run(root)
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Pushed in reverse so the leftmost child is visited first.
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                if child.has_error() || child.is_missing() {
                    pending.push(child);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records raw values without any of the translator's semantics.
    #[derive(Debug, Default)]
    struct Calls {
        requires: Vec<String>,
        configs: Vec<String>,
    }

    impl ModuleRecorder for Calls {
        fn record_require(&mut self, modules: &Value) -> Result<(), TypeError> {
            self.requires.push(format!("{}:{}", modules.type_of(), modules.to_js_string()));
            Ok(())
        }

        fn record_config(&mut self, config: &Value) -> Result<(), TypeError> {
            let paths = config.get_property("paths")?;
            let rendered: Vec<String> = paths
                .enumerate()
                .into_iter()
                .map(|(k, v)| format!("{k}={}", v.to_js_string()))
                .collect();
            self.configs.push(rendered.join(";"));
            Ok(())
        }
    }

    fn run(source: &str) -> Result<Calls, EvalError> {
        let mut calls = Calls::default();
        evaluate(source, &mut calls)?;
        Ok(calls)
    }

    #[test]
    fn routes_require_calls_in_order() {
        let calls = run(r#"
            // entry points
            require('app');
            require(["a", 'b'], function (a, b) { window.started = true; });
            require(42);
        "#)
        .expect("evaluate");
        assert_eq!(calls.requires, vec!["string:app", "object:a,b", "number:42"]);
    }

    #[test]
    fn routes_config_through_variables_and_mutation() {
        let calls = run(r#"
            var base = 'vendor/';
            var config = { paths: { jquery: base + 'jquery.min' } };
            config.paths["underscore"] = `${base}underscore`;
            config.paths.backbone = base + "backbone";
            require.config(config);
        "#)
        .expect("evaluate");
        assert_eq!(calls.configs, vec![
            "jquery=vendor/jquery.min;underscore=vendor/underscore;backbone=vendor/backbone"
        ]);
    }

    #[test]
    fn decodes_string_escapes_and_templates() {
        let calls = run(r#"
            require('it\'s\x41B\u{43}\n');
            require(`tpl-${1 + 2}-${[1, 2]}-${undefined}`);
            require("two\
lines");
        "#)
        .expect("evaluate");
        assert_eq!(calls.requires, vec![
            "string:it'sABC\n",
            "string:tpl-3-1,2-undefined",
            "string:twolines",
        ]);
    }

    #[test]
    fn surrogate_pair_escapes_form_one_character() {
        let calls = run(r#"
            require('\uD83D\uDE00');
            require(`smile-\uD83D\uDE00`);
        "#)
        .expect("evaluate");
        assert_eq!(calls.requires, vec!["string:😀", "string:smile-😀"]);
    }

    #[test]
    fn array_elisions_are_undefined() {
        let calls = run(r#"
            require([ , 'hole']);
            require(['a', , 'b']);
            var trailing = ['a', , ];
            require(trailing.length);
            require([, ].length);
        "#)
        .expect("evaluate");
        assert_eq!(calls.requires, vec!["object:,hole", "object:a,,b", "number:2", "number:1"]);
    }

    #[test]
    fn deeply_nested_expressions_are_rejected() {
        let depth = 3000;
        let source = format!("require({}'a'{});", "[".repeat(depth), "]".repeat(depth));
        let err = run(&source).unwrap_err();
        assert!(matches!(err, EvalError::Unsupported { ref what, .. } if what == "nesting too deep"));

        let shallow = format!("require({}'a'{});", "[".repeat(20), "]".repeat(20));
        assert_eq!(run(&shallow).expect("evaluate").requires, vec!["object:a"]);
    }

    #[test]
    fn deeply_nested_syntax_errors_are_located() {
        let depth = 3000;
        let source = format!("require({}'a' 'b'{});", "[".repeat(depth), "]".repeat(depth));
        assert!(matches!(run(&source).unwrap_err(), EvalError::Syntax { line: 1, .. }));
    }

    #[test]
    fn object_literal_keys_and_spread() {
        let calls = run(r#"
            const extra = { d3: 'lib/d3' };
            const name = 'moment';
            require.config({
                paths: {
                    'jquery-ui': 'lib/ui',
                    2: 'two',
                    ['comp' + 'uted']: 'lib/c',
                    name,
                    ...extra,
                },
            });
        "#)
        .expect("evaluate");
        assert_eq!(calls.configs, vec!["2=two;jquery-ui=lib/ui;computed=lib/c;name=moment;d3=lib/d3"]);
    }

    #[test]
    fn function_declarations_are_hoisted_but_not_run() {
        let calls = run(r#"
            require(setup);
            function setup() { require('never'); }
        "#)
        .expect("evaluate");
        assert_eq!(calls.requires.len(), 1);
        assert!(calls.requires[0].starts_with("function:function setup()"));
    }

    #[test]
    fn require_can_be_shadowed() {
        let calls = run(r#"
            var require = { paths: { a: 'b' } };
        "#)
        .expect("evaluate");
        assert!(calls.requires.is_empty());
        assert!(calls.configs.is_empty());
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = run("require('a');\nrequire.config({ paths: { a: } });\n").unwrap_err();
        match err {
            EvalError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_identifiers_are_reference_errors() {
        let err = run("require('a');\ndefine(['a'], function () {});\n").unwrap_err();
        assert_eq!(err, EvalError::Reference { name: "define".to_string(), line: 2, column: 1 });
        assert_eq!(err.to_string(), "ReferenceError: define is not defined (line 2, column 1)");
    }

    #[test]
    fn calling_non_functions_is_a_type_error() {
        let err = run("var x = 1;\nx('a');\n").unwrap_err();
        assert!(matches!(err, EvalError::Type { ref message, .. } if message == "x is not a function"));
    }

    #[test]
    fn recorder_errors_carry_the_call_position() {
        let err = run("\n  require.config();").unwrap_err();
        assert_eq!(err, EvalError::Type {
            message: "Cannot read properties of undefined (reading 'paths')".to_string(),
            line: 2,
            column: 3,
        });
    }

    #[test]
    fn control_flow_is_unsupported() {
        let err = run("if (true) { require('a'); }").unwrap_err();
        assert!(matches!(err, EvalError::Unsupported { ref what, .. } if what.contains("if_statement")));

        let err = run("(function () { require('a'); })();").unwrap_err();
        assert!(matches!(err, EvalError::Unsupported { .. }));
    }
}
