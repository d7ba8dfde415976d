//! Tree-walking evaluator over the tree-sitter JavaScript syntax tree.

use std::collections::HashMap;
use std::rc::Rc;

use tree_sitter::Node;

use super::{EvalError, ModuleRecorder, Value};
use crate::domain::PropertyMap;

/// Expressions nested deeper than this are rejected rather than recursed into.
const MAX_DEPTH: usize = 256;

pub(super) struct Interpreter<'src, 'rec> {
    source: &'src str,
    globals: HashMap<String, Value>,
    recorder: &'rec mut dyn ModuleRecorder,
    depth: usize,
}

impl<'src, 'rec> Interpreter<'src, 'rec> {
    pub(super) fn new(source: &'src str, recorder: &'rec mut dyn ModuleRecorder) -> Self {
        let globals = HashMap::from([
            ("require".to_string(), Value::Require),
            ("undefined".to_string(), Value::Undefined),
            ("NaN".to_string(), Value::Number(f64::NAN)),
            ("Infinity".to_string(), Value::Number(f64::INFINITY)),
        ]);
        Self { source, globals, recorder, depth: 0 }
    }

    pub(super) fn run(mut self, program: Node<'_>) -> Result<(), EvalError> {
        let statements = named_children(program);
        self.hoist(&statements);
        for statement in statements {
            self.exec(statement)?;
        }
        Ok(())
    }

    fn text(&self, node: Node<'_>) -> &'src str {
        &self.source[node.byte_range()]
    }

    /// Bind function declarations and `var` names before any statement runs.
    /// A hoisted `var` does not reset a binding that already exists.
    fn hoist(&mut self, statements: &[Node<'_>]) {
        for statement in statements {
            match statement.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = statement.child_by_field_name("name") {
                        let function = Value::Function(Rc::from(self.text(*statement)));
                        let name = self.text(name).to_string();
                        self.globals.insert(name, function);
                    }
                }
                "variable_declaration" => {
                    for declarator in named_children(*statement) {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            if name.kind() == "identifier" {
                                let name = self.text(name).to_string();
                                self.globals.entry(name).or_insert(Value::Undefined);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn exec(&mut self, statement: Node<'_>) -> Result<(), EvalError> {
        match statement.kind() {
            "expression_statement" => {
                if let Some(expr) = first_named(statement) {
                    self.eval(expr)?;
                }
                Ok(())
            }
            "variable_declaration" | "lexical_declaration" => {
                let is_var = statement.kind() == "variable_declaration";
                for declarator in named_children(statement) {
                    let name = required_field(declarator, "name")?;
                    if name.kind() != "identifier" {
                        return Err(EvalError::unsupported(name, "destructuring declaration"));
                    }
                    let value = match declarator.child_by_field_name("value") {
                        Some(init) => self.eval(init)?,
                        // `var x;` leaves an existing binding alone.
                        None if is_var => continue,
                        None => Value::Undefined,
                    };
                    let name = self.text(name).to_string();
                    self.globals.insert(name, value);
                }
                Ok(())
            }
            "function_declaration"
            | "generator_function_declaration"
            | "empty_statement"
            | "hash_bang_line" => Ok(()),
            other => Err(EvalError::unsupported(statement, format!("statement `{other}`"))),
        }
    }

    fn eval(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::unsupported(node, "nesting too deep"));
        }
        self.depth += 1;
        let value = self.eval_node(node);
        self.depth -= 1;
        value
    }

    fn eval_node(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        match node.kind() {
            "string" => Ok(Value::String(self.string_literal(node))),
            "template_string" => self.template_string(node).map(Value::String),
            "number" => parse_number(self.text(node))
                .map(Value::Number)
                .ok_or_else(|| EvalError::unsupported(node, "numeric literal")),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "undefined" => Ok(Value::Undefined),
            "identifier" => self.lookup(node),
            "parenthesized_expression" => self.eval(required_named(node)?),
            "sequence_expression" => {
                let mut last = Value::Undefined;
                for expr in named_children(node) {
                    last = self.eval(expr)?;
                }
                Ok(last)
            }
            "array" => self.array_literal(node),
            "object" => self.object_literal(node),
            "member_expression" => {
                let object = self.eval(required_field(node, "object")?)?;
                let key = self.member_key(node)?;
                object.get_property(&key).map_err(|err| EvalError::type_error(node, err))
            }
            "subscript_expression" => {
                let object = self.eval(required_field(node, "object")?)?;
                let key = self.eval(required_field(node, "index")?)?.to_js_string();
                object.get_property(&key).map_err(|err| EvalError::type_error(node, err))
            }
            "call_expression" => self.call(node),
            "function_expression" | "function" | "arrow_function" | "generator_function" => {
                Ok(Value::Function(Rc::from(self.text(node))))
            }
            "assignment_expression" => self.assign(node),
            "binary_expression" => self.binary(node),
            other => Err(EvalError::unsupported(node, format!("expression `{other}`"))),
        }
    }

    fn lookup(&self, node: Node<'_>) -> Result<Value, EvalError> {
        let name = self.text(node);
        self.globals.get(name).cloned().ok_or_else(|| EvalError::reference(node, name))
    }

    fn member_key(&self, member: Node<'_>) -> Result<String, EvalError> {
        let property = required_field(member, "property")?;
        match property.kind() {
            "property_identifier" => Ok(self.text(property).to_string()),
            other => Err(EvalError::unsupported(property, format!("property `{other}`"))),
        }
    }

    fn call(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        let callee_node = required_field(node, "function")?;
        let callee = self.eval(callee_node)?;

        let arguments = required_field(node, "arguments")?;
        let args = if arguments.kind() == "template_string" {
            vec![self.eval(arguments)?]
        } else {
            let mut args = Vec::new();
            for arg in named_children(arguments) {
                args.push(self.eval(arg)?);
            }
            args
        };
        let first = args.into_iter().next().unwrap_or(Value::Undefined);

        let recorded = match callee {
            Value::Require => self.recorder.record_require(&first),
            Value::RequireConfig => self.recorder.record_config(&first),
            Value::Function(_) => {
                return Err(EvalError::unsupported(node, "call to a script-defined function"));
            }
            _ => {
                return Err(EvalError::type_error(
                    node,
                    super::TypeError(format!("{} is not a function", self.text(callee_node))),
                ));
            }
        };
        recorded.map_err(|err| EvalError::type_error(node, err))?;

        Ok(Value::Undefined)
    }

    fn assign(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        let left = required_field(node, "left")?;
        let right = required_field(node, "right")?;

        match left.kind() {
            "identifier" => {
                let value = self.eval(right)?;
                let name = self.text(left).to_string();
                self.globals.insert(name, value.clone());
                Ok(value)
            }
            "member_expression" | "subscript_expression" => {
                let target = self.eval(required_field(left, "object")?)?;
                let key = if left.kind() == "member_expression" {
                    self.member_key(left)?
                } else {
                    self.eval(required_field(left, "index")?)?.to_js_string()
                };
                let value = self.eval(right)?;
                target
                    .set_property(&key, value.clone())
                    .map_err(|err| EvalError::type_error(node, err))?;
                Ok(value)
            }
            other => Err(EvalError::unsupported(left, format!("assignment to `{other}`"))),
        }
    }

    fn binary(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        let operator = required_field(node, "operator")?;
        if self.text(operator) != "+" {
            return Err(EvalError::unsupported(
                operator,
                format!("operator `{}`", self.text(operator)),
            ));
        }

        let left = self.eval(required_field(node, "left")?)?;
        let right = self.eval(required_field(node, "right")?)?;
        let numeric = |v: &Value| {
            matches!(v, Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_))
        };

        if numeric(&left) && numeric(&right) {
            Ok(Value::Number(left.to_number() + right.to_number()))
        } else {
            Ok(Value::String(left.to_js_string() + &right.to_js_string()))
        }
    }

    /// Array literal. An elision (`[, a]`, `[a, , b]`) reads as `undefined`;
    /// a single trailing comma adds nothing.
    fn array_literal(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        let mut items = Vec::new();
        let mut after_comma = true;
        for i in 0..node.child_count() {
            let Some(element) = node.child(i) else { continue };
            match element.kind() {
                "[" | "]" | "comment" => {}
                "," => {
                    if after_comma {
                        items.push(Value::Undefined);
                    }
                    after_comma = true;
                }
                "spread_element" => {
                    let spread = self.eval(required_named(element)?)?;
                    if !matches!(spread, Value::Array(_)) {
                        return Err(EvalError::unsupported(element, "spread of a non-array value"));
                    }
                    items.extend(spread.enumerate().into_iter().map(|(_, v)| v));
                    after_comma = false;
                }
                _ => {
                    items.push(self.eval(element)?);
                    after_comma = false;
                }
            }
        }
        Ok(Value::array(items))
    }

    fn object_literal(&mut self, node: Node<'_>) -> Result<Value, EvalError> {
        let mut map = PropertyMap::new();
        for member in named_children(node) {
            match member.kind() {
                "pair" => {
                    let key = self.property_key(required_field(member, "key")?)?;
                    let value = self.eval(required_field(member, "value")?)?;
                    map.insert(key, value);
                }
                "shorthand_property_identifier" => {
                    let value = self.lookup(member)?;
                    map.insert(self.text(member), value);
                }
                "method_definition" => {
                    let key = self.property_key(required_field(member, "name")?)?;
                    map.insert(key, Value::Function(Rc::from(self.text(member))));
                }
                "spread_element" => {
                    let spread = self.eval(required_named(member)?)?;
                    for (key, value) in spread.enumerate() {
                        map.insert(key, value);
                    }
                }
                other => {
                    return Err(EvalError::unsupported(member, format!("object member `{other}`")));
                }
            }
        }
        Ok(Value::object(map))
    }

    fn property_key(&mut self, key: Node<'_>) -> Result<String, EvalError> {
        match key.kind() {
            "property_identifier" => Ok(self.text(key).to_string()),
            "string" => Ok(self.string_literal(key)),
            "number" => parse_number(self.text(key))
                .map(|n| Value::Number(n).to_js_string())
                .ok_or_else(|| EvalError::unsupported(key, "numeric property key")),
            "computed_property_name" => Ok(self.eval(required_named(key)?)?.to_js_string()),
            other => Err(EvalError::unsupported(key, format!("property key `{other}`"))),
        }
    }

    /// Built from UTF-16 units so that `\uD83D\uDE00` pairs up into one
    /// character.
    fn string_literal(&self, node: Node<'_>) -> String {
        let mut units = Vec::new();
        for part in named_children(node) {
            match part.kind() {
                "string_fragment" => units.extend(self.text(part).encode_utf16()),
                "escape_sequence" => units.extend(decode_escape(self.text(part))),
                _ => {}
            }
        }
        String::from_utf16_lossy(&units)
    }

    /// Template literal text between the backticks, with escapes decoded
    /// and substitutions converted to strings.
    fn template_string(&mut self, node: Node<'_>) -> Result<String, EvalError> {
        let mut units: Vec<u16> = Vec::new();
        let end = node.end_byte().saturating_sub(1);
        let mut cursor = node.start_byte() + 1;

        for part in named_children(node) {
            units.extend(self.source[cursor..part.start_byte()].encode_utf16());
            match part.kind() {
                "escape_sequence" => units.extend(decode_escape(self.text(part))),
                "template_substitution" => {
                    let value = self.eval(required_named(part)?)?;
                    units.extend(value.to_js_string().encode_utf16());
                }
                _ => units.extend(self.text(part).encode_utf16()),
            }
            cursor = part.end_byte();
        }
        if cursor < end {
            units.extend(self.source[cursor..end].encode_utf16());
        }
        Ok(String::from_utf16_lossy(&units))
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).filter(|child| child.kind() != "comment").collect()
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node).into_iter().next()
}

fn required_named(node: Node<'_>) -> Result<Node<'_>, EvalError> {
    first_named(node).ok_or_else(|| EvalError::unsupported(node, "empty expression"))
}

fn required_field<'t>(node: Node<'t>, field: &str) -> Result<Node<'t>, EvalError> {
    node.child_by_field_name(field)
        .ok_or_else(|| EvalError::unsupported(node, format!("`{}` without `{field}`", node.kind())))
}

/// Decode one escape sequence into UTF-16 units. A four-digit `\uXXXX` is
/// kept as a raw unit, which may be half of a surrogate pair.
fn decode_escape(raw: &str) -> Vec<u16> {
    let body = raw.strip_prefix('\\').unwrap_or(raw);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return Vec::new();
    };

    let decoded = match first {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        // Line continuation
        '\r' | '\n' | '\u{2028}' | '\u{2029}' => return Vec::new(),
        'x' => code_point(u32::from_str_radix(&body[1..], 16).ok()),
        'u' if !body[1..].starts_with('{') => match u16::from_str_radix(&body[1..], 16) {
            Ok(unit) => return vec![unit],
            Err(_) => char::REPLACEMENT_CHARACTER,
        },
        'u' => {
            let hex = body[1..].trim_start_matches('{').trim_end_matches('}');
            code_point(u32::from_str_radix(hex, 16).ok())
        }
        '0'..='7' => code_point(u32::from_str_radix(body, 8).ok()),
        other => other,
    };
    let mut buf = [0; 2];
    decoded.encode_utf16(&mut buf).to_vec()
}

fn code_point(value: Option<u32>) -> char {
    value.and_then(char::from_u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace('_', "");
    if cleaned.ends_with('n') {
        // BigInt
        return None;
    }

    let radix = |prefix: [&str; 2], radix: u32| {
        prefix
            .iter()
            .find_map(|p| cleaned.strip_prefix(*p))
            .map(|digits| u64::from_str_radix(digits, radix).ok().map(|n| n as f64))
    };

    if let Some(parsed) = radix(["0x", "0X"], 16)
        .or_else(|| radix(["0o", "0O"], 8))
        .or_else(|| radix(["0b", "0B"], 2))
    {
        return parsed;
    }
    cleaned.parse().ok()
}
