//! Runtime values produced by the script evaluator.

use crate::domain::{array_index, PropertyMap};
use std::cell::RefCell;
use std::rc::Rc;

use super::TypeError;

/// Arrays are stored densely; an index write past this bound is rejected
/// instead of allocating every hole in between.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

/// A script value. Arrays and objects are shared and mutable, so an object
/// bound to a variable and later passed to `require.config` reflects every
/// assignment made through that variable.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<PropertyMap<Value>>>),
    /// A script-defined function, kept as its source text. Never executed.
    Function(Rc<str>),
    /// The injected `require` capability
    Require,
    /// The injected `require.config` capability
    RequireConfig,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: PropertyMap<Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    /// The result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Require | Value::RequireConfig => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// String conversion as performed by template literals and `+`.
    pub fn to_js_string(&self) -> String {
        self.to_js_string_within(&mut Vec::new())
    }

    /// `open` holds the arrays currently being joined; an array that contains
    /// itself contributes an empty string the second time round.
    fn to_js_string_within(&self, open: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return String::new();
                }
                open.push(ptr);
                let joined = items
                    .borrow()
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_js_string_within(open)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                open.pop();
                joined
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(source) => source.to_string(),
            Value::Require => "function require(modules) { [native code] }".to_string(),
            Value::RequireConfig => "function config(config) { [native code] }".to_string(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => self.to_js_string().parse().unwrap_or(f64::NAN),
        }
    }

    /// Property read (`value.key` / `value[key]`).
    pub fn get_property(&self, key: &str) -> Result<Value, TypeError> {
        match self {
            Value::Undefined | Value::Null => Err(TypeError(format!(
                "Cannot read properties of {} (reading '{key}')",
                self.to_js_string()
            ))),
            Value::Object(map) => Ok(map.borrow().get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    return Ok(Value::Number(items.len() as f64));
                }
                Ok(array_index(key)
                    .and_then(|idx| items.get(idx as usize).cloned())
                    .unwrap_or(Value::Undefined))
            }
            Value::String(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                if key == "length" {
                    return Ok(Value::Number(units.len() as f64));
                }
                Ok(array_index(key)
                    .and_then(|idx| units.get(idx as usize))
                    .map(|unit| Value::String(String::from_utf16_lossy(&[*unit])))
                    .unwrap_or(Value::Undefined))
            }
            Value::Require if key == "config" => Ok(Value::RequireConfig),
            _ => Ok(Value::Undefined),
        }
    }

    /// Property write (`value.key = v` / `value[key] = v`). Writes to
    /// primitives and to the injected capabilities are silently dropped.
    pub fn set_property(&self, key: &str, value: Value) -> Result<(), TypeError> {
        match self {
            Value::Undefined | Value::Null => Err(TypeError(format!(
                "Cannot set properties of {} (setting '{key}')",
                self.to_js_string()
            ))),
            Value::Object(map) => {
                map.borrow_mut().insert(key, value);
                Ok(())
            }
            Value::Array(items) => {
                if let Some(idx) = array_index(key) {
                    let idx = idx as usize;
                    let mut items = items.borrow_mut();
                    if idx >= MAX_ARRAY_LENGTH {
                        return Err(TypeError("Invalid array length".to_string()));
                    }
                    if idx >= items.len() {
                        items.resize(idx + 1, Value::Undefined);
                    }
                    items[idx] = value;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Key/value pairs visited by a `for...in` loop.
    pub fn enumerate(&self) -> Vec<(String, Value)> {
        match self {
            Value::Object(map) => {
                map.borrow().iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
            }
            Value::Array(items) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(idx, item)| (idx.to_string(), item.clone()))
                .collect(),
            Value::String(_) => {
                let len = self.get_property("length").map(|len| len.to_number()).unwrap_or(0.0);
                (0..len as usize)
                    .map(|idx| {
                        let key = idx.to_string();
                        let value = self.get_property(&key).unwrap_or(Value::Undefined);
                        (key, value)
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Elements of an array value, each converted to a string.
    pub fn string_elements(&self) -> Option<Vec<String>> {
        match self {
            Value::Array(items) => Some(items.borrow().iter().map(Value::to_js_string).collect()),
            _ => None,
        }
    }
}

/// Number-to-string conversion. Integral values print without a fraction,
/// everything else uses the shortest round-trip form, and magnitudes at or
/// above 1e21 or below 1e-6 switch to exponent notation (`1e+21`, `1.5e-7`).
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // Covers negative zero.
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else {
        format!("{n}")
    }
}
