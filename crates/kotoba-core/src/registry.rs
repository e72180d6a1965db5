//! The plugin namespace consulted by the code generator.
//!
//! Plugins contribute named functions, constants and variables grouped by
//! module. The generator only looks at an entry's kind, its accepted
//! particles and whether a function produces a value; the implementation of
//! each function lives in the runtime host.

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// The reserved per-module initializer name.
pub const INIT_FUNCTION: &str = "初期化";

/// Key under which the initializer of `module` is registered.
pub fn init_key(module: &str) -> String {
    format!("!{module}:{INIT_FUNCTION}")
}

/// A registered name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "PluginEntry")]
pub enum Entry {
    Func {
        /// Accepted particles per argument position.
        josi: Vec<Vec<String>>,
        /// Calls to functions returning nothing are emitted as statements.
        returns_value: bool,
    },
    Const {
        value: serde_json::Value,
    },
    Var {
        value: serde_json::Value,
    },
}

impl Entry {
    /// A value-returning function accepting the given particles.
    pub fn func(josi: &[&[&str]]) -> Self {
        Self::Func {
            josi: josi
                .iter()
                .map(|pattern| pattern.iter().map(|p| p.to_string()).collect())
                .collect(),
            returns_value: true,
        }
    }

    /// A function whose calls are statements.
    pub fn procedure(josi: &[&[&str]]) -> Self {
        match Self::func(josi) {
            Self::Func { josi, .. } => Self::Func {
                josi,
                returns_value: false,
            },
            other => other,
        }
    }

    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Self::Const {
            value: value.into(),
        }
    }

    pub fn variable(value: impl Into<serde_json::Value>) -> Self {
        Self::Var {
            value: value.into(),
        }
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Self::Func { .. })
    }

    /// Particle patterns of a function, `None` for constants and variables.
    pub fn josi(&self) -> Option<&[Vec<String>]> {
        match self {
            Self::Func { josi, .. } => Some(josi),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Func { .. } => "func",
            Self::Const { .. } => "const",
            Self::Var { .. } => "var",
        }
    }
}

/// The JSON shape plugins are described in.
#[derive(Debug, Deserialize)]
struct PluginEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    josi: Vec<Vec<String>>,
    #[serde(default)]
    return_none: bool,
    #[serde(default)]
    value: serde_json::Value,
}

impl TryFrom<PluginEntry> for Entry {
    type Error = UnknownEntryKind;

    fn try_from(raw: PluginEntry) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "func" => Ok(Self::Func {
                josi: raw.josi,
                returns_value: !raw.return_none,
            }),
            "const" => Ok(Self::Const { value: raw.value }),
            "var" => Ok(Self::Var { value: raw.value }),
            _ => Err(UnknownEntryKind(raw.kind)),
        }
    }
}

/// An entry `type` other than `func`, `const` or `var`.
#[derive(Debug, Error)]
#[error("unknown entry type `{0}`")]
pub struct UnknownEntryKind(String);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid plugin `{module}`: {source}")]
    InvalidPlugin {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An entry together with the module that registered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub module: String,
    pub entry: Entry,
}

/// The plugin namespace.
///
/// Later registrations of a name replace earlier ones, while module order is
/// the order in which modules were first added.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: IndexSet<String>,
    entries: IndexMap<String, Registered>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every entry of `module`.
    ///
    /// An entry named [`INIT_FUNCTION`] is stored under [`init_key`] so each
    /// module keeps its own initializer.
    pub fn add_plugin<I, K>(&mut self, module: &str, entries: I)
    where
        I: IntoIterator<Item = (K, Entry)>,
        K: Into<String>,
    {
        self.modules.insert(module.to_string());
        let mut count = 0usize;
        for (name, entry) in entries {
            let mut name = name.into();
            if name == INIT_FUNCTION {
                name = init_key(module);
            }
            self.entries.insert(
                name,
                Registered {
                    module: module.to_string(),
                    entry,
                },
            );
            count += 1;
        }
        debug!(module, entries = count; "Plugin registered");
    }

    /// Register a module described as a JSON object of entries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPlugin`] if the JSON is malformed or an
    /// entry has an unknown type.
    pub fn add_plugin_json(&mut self, module: &str, json: &str) -> Result<(), RegistryError> {
        let entries: IndexMap<String, Entry> =
            serde_json::from_str(json).map_err(|source| RegistryError::InvalidPlugin {
                module: module.to_string(),
                source,
            })?;
        self.add_plugin(module, entries);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name).map(|registered| &registered.entry)
    }

    pub fn get_registered(&self, name: &str) -> Option<&Registered> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Module names in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Initializer keys of the modules that define one, in module order.
    pub fn init_functions(&self) -> impl Iterator<Item = (&str, String)> {
        self.modules()
            .map(|module| (module, init_key(module)))
            .filter(|(_, key)| self.entries.get(key).is_some_and(|r| r.entry.is_func()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
