//! Core domain types
//!
//! Defines the tables collected while evaluating a RequireJS configuration
//! (`Tables`, `ShimRule`, `PropertyMap`) and the output options that control
//! how they are rendered.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Prefix of every generated `use` entry.
pub const IMPORTS_LOADER_PREFIX: &str = "imports-loader?this=>";

/// How the `use` array of a shim rule is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UseFormat {
    /// One quoted string holding the stringified dependency list.
    #[default]
    Compat,
    /// One quoted `imports-loader` string per dependency.
    PerDependency,
}

/// What `save` emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmitFormat {
    /// Webpack `resolve`/`module` fragment followed by a `define([...])` wrapper
    #[default]
    Webpack,
    /// Pretty-printed JSON dump of the collected tables
    Json,
}

/// An insertion-ordered string-keyed map that iterates like the own
/// properties of a JavaScript object: canonical array-index keys first in
/// ascending numeric order, then every other key in first-insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for PropertyMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> PropertyMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in JavaScript own-property order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        let mut indexed: Vec<(u32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(pos, (k, _))| array_index(k).map(|idx| (idx, pos)))
            .collect();
        indexed.sort_unstable();

        let named = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (k, _))| array_index(k).is_none())
            .map(|(pos, _)| pos);

        let order: Vec<usize> = indexed.into_iter().map(|(_, pos)| pos).chain(named).collect();
        order.into_iter().map(move |pos| {
            let (k, v) = &self.entries[pos];
            (k.as_str(), v)
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }
}

impl<V: Serialize> Serialize for PropertyMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Returns the numeric value of `key` if it is a canonical array index
/// (`"0"`, `"17"`, but not `"01"` or `"4294967295"`).
pub(crate) fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&idx| idx != u32::MAX)
}

/// A Webpack rule derived from one `shim` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShimRule {
    /// Rendered verbatim (unquoted): `/<shimName>/`
    pub test: String,

    /// Individual dependency names when `deps` was an array
    #[serde(skip)]
    pub dep_list: Option<Vec<String>>,

    /// Loader entries
    #[serde(rename = "use")]
    pub uses: Vec<String>,
}

impl ShimRule {
    pub fn new(shim_name: &str, deps: String, dep_list: Option<Vec<String>>) -> Self {
        let uses = vec![format!("{IMPORTS_LOADER_PREFIX}{deps}")];
        Self { test: format!("/{shim_name}/"), dep_list, uses }
    }

    /// The quoted strings that go inside the rendered `use: [...]` block.
    pub fn use_entries(&self, format: UseFormat) -> Vec<String> {
        match (format, &self.dep_list) {
            (UseFormat::PerDependency, Some(deps)) => {
                deps.iter().map(|dep| format!("{IMPORTS_LOADER_PREFIX}{dep}")).collect()
            }
            // An array of strings stringifies by joining with commas.
            _ => vec![self.uses.join(",")],
        }
    }
}

/// Everything collected during a load pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tables {
    /// Module names passed to `require(...)`, in call order, duplicates kept
    pub required: Vec<String>,

    /// `paths` entries: module name to path
    pub aliases: PropertyMap<String>,

    /// One rule per `shim` entry
    pub rules: Vec<ShimRule>,
}
