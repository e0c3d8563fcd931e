//! Attribute containers shared by targets and compile steps.
//!
//! List attributes accept a bare scalar, a list or an iterator of scalars and
//! always end up as an ordered `Vec<String>`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Ordered list of attribute values (sources, includes, options, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrList(Vec<String>);

impl AttrList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Normalize a description value into a list.
    ///
    /// Scalars become a one-element list, arrays must contain only scalars.
    pub fn from_value(attribute: &str, value: &toml::Value) -> Result<Self> {
        match value {
            toml::Value::Array(items) => items
                .iter()
                .map(|item| scalar_to_string(attribute, item))
                .collect::<Result<Vec<_>>>()
                .map(AttrList),
            scalar => Ok(AttrList(vec![scalar_to_string(attribute, scalar)?])),
        }
    }
}

impl From<&str> for AttrList {
    fn from(value: &str) -> Self {
        AttrList(vec![value.to_string()])
    }
}

impl From<String> for AttrList {
    fn from(value: String) -> Self {
        AttrList(vec![value])
    }
}

impl From<&String> for AttrList {
    fn from(value: &String) -> Self {
        AttrList(vec![value.clone()])
    }
}

impl From<&Path> for AttrList {
    fn from(value: &Path) -> Self {
        AttrList(vec![value.to_string_lossy().to_string()])
    }
}

impl From<PathBuf> for AttrList {
    fn from(value: PathBuf) -> Self {
        AttrList::from(value.as_path())
    }
}

impl<T: Into<String>> From<Vec<T>> for AttrList {
    fn from(values: Vec<T>) -> Self {
        AttrList(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for AttrList {
    fn from(values: [T; N]) -> Self {
        AttrList(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>> FromIterator<T> for AttrList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        AttrList(iter.into_iter().map(Into::into).collect())
    }
}

/// Preprocessor defines, name to optional value, in insertion order.
///
/// Re-defining a name replaces its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines(Vec<(String, Option<String>)>);

impl Defines {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Merge another set of defines, later values winning
    pub fn merge(&mut self, other: Defines) {
        for (name, value) in other.0 {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `NAME` or `NAME=VALUE` for every define
    pub fn to_assignments(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{}={}", name, value),
                None => name.to_string(),
            })
            .collect()
    }

    /// Parse `NAME` or `NAME=VALUE`
    pub fn parse_assignment(text: &str) -> (String, Option<String>) {
        match text.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (text.to_string(), None),
        }
    }

    /// Normalize a description value: a scalar, a list of scalars or a table.
    pub fn from_value(value: &toml::Value) -> Result<Self> {
        let mut defines = Defines::new();
        match value {
            toml::Value::Table(table) => {
                for (name, value) in table {
                    match value {
                        toml::Value::Boolean(false) => {}
                        toml::Value::Boolean(true) => defines.insert(name.clone(), None),
                        toml::Value::String(s) if s.is_empty() => {
                            defines.insert(name.clone(), None)
                        }
                        other => {
                            let value = scalar_to_string("defines", other)?;
                            defines.insert(name.clone(), Some(value));
                        }
                    }
                }
            }
            other => {
                for entry in AttrList::from_value("defines", other)?.into_vec() {
                    let (name, value) = Defines::parse_assignment(&entry);
                    defines.insert(name, value);
                }
            }
        }
        Ok(defines)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for Defines {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut defines = Defines::new();
        for (name, value) in iter {
            defines.insert(name, value.map(Into::into));
        }
        defines
    }
}

pub(crate) fn scalar_to_string(attribute: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(Error::InvalidArgumentType {
            attribute: attribute.to_string(),
            found: other.type_str().to_string(),
        }),
    }
}
