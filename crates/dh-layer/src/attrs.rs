//! Attribute bags at the host boundary.
//!
//! Hosts hand over features with arbitrary name → value attributes. Each
//! layer role resolves them once into a typed record via [`Record`].

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, LayerResult};

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view; integers widen to `f64`, text never converts.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Real(v) => Some(*v),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered attribute mapping (insertion order is preserved).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Optional numeric attribute; present-but-non-numeric is an error.
    pub fn real(&self, name: &str) -> LayerResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_real().map(Some).ok_or_else(|| LayerError::Attribute {
                name: name.to_string(),
                reason: "expected a number".to_string(),
            }),
        }
    }

    /// Optional integer attribute; present-but-non-integer is an error.
    pub fn int(&self, name: &str) -> LayerResult<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_int().map(Some).ok_or_else(|| LayerError::Attribute {
                name: name.to_string(),
                reason: "expected an integer".to_string(),
            }),
        }
    }

    pub fn text(&self, name: &str) -> LayerResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_text().map(Some).ok_or_else(|| LayerError::Attribute {
                name: name.to_string(),
                reason: "expected text".to_string(),
            }),
        }
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// A typed record for one layer role, convertible to and from attributes.
pub trait Record: Sized + Clone {
    fn to_attributes(&self) -> Attributes;
    fn from_attributes(attrs: &Attributes) -> LayerResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut attrs = Attributes::new()
            .with("a", AttrValue::Int(1))
            .with("b", AttrValue::Real(2.0));
        attrs.set("a", AttrValue::Int(5));
        let names: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(attrs.int("a").unwrap(), Some(5));
    }

    #[test]
    fn numeric_views() {
        let attrs = Attributes::new()
            .with("n", AttrValue::Int(3))
            .with("label", AttrValue::Text("x".into()));
        assert_eq!(attrs.real("n").unwrap(), Some(3.0));
        assert_eq!(attrs.real("missing").unwrap(), None);
        assert!(attrs.real("label").is_err());
        assert!(attrs.int("label").is_err());
        assert_eq!(attrs.text("label").unwrap(), Some("x"));
    }
}
