//! Named, typed per-entity data attached to a mesh for export.
//!
//! Replaces a polymorphic layer base class with a closed tagged variant
//! over the element types the solution export actually needs, keyed by
//! name in insertion order.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A single named layer's backing storage.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    /// Per-entity real value, e.g. a solution field.
    Real(Vec<f64>),
    /// Per-entity integer value, e.g. a cell or edge index.
    Index(Vec<i64>),
}

impl LayerData {
    pub fn len(&self) -> usize {
        match self {
            LayerData::Real(v) => v.len(),
            LayerData::Index(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A name-keyed dictionary of [`LayerData`], insertion-ordered for
/// deterministic export.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    entries: IndexMap<String, LayerData>,
}

impl Layers {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or overwrite a real-valued layer.
    pub fn set_real(&mut self, name: impl Into<String>, data: Vec<f64>) {
        self.entries.insert(name.into(), LayerData::Real(data));
    }

    /// Insert or overwrite an integer-valued layer.
    pub fn set_index(&mut self, name: impl Into<String>, data: Vec<i64>) {
        self.entries.insert(name.into(), LayerData::Index(data));
    }

    /// Fetch a real-valued layer by name.
    ///
    /// Errors if the name is absent or holds the other variant.
    pub fn get_real(&self, name: &str) -> Result<&[f64]> {
        match self.entries.get(name) {
            Some(LayerData::Real(v)) => Ok(v),
            Some(LayerData::Index(_)) => Err(Error::InvalidArgument(format!(
                "layer '{name}' is indexed, not real"
            ))),
            None => Err(Error::InvalidArgument(format!("no such layer '{name}'"))),
        }
    }

    /// Fetch an integer-valued layer by name.
    ///
    /// Errors if the name is absent or holds the other variant.
    pub fn get_index(&self, name: &str) -> Result<&[i64]> {
        match self.entries.get(name) {
            Some(LayerData::Index(v)) => Ok(v),
            Some(LayerData::Real(_)) => Err(Error::InvalidArgument(format!(
                "layer '{name}' is real, not indexed"
            ))),
            None => Err(Error::InvalidArgument(format!("no such layer '{name}'"))),
        }
    }

    /// Names in insertion order, the order they will be emitted in.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resize every layer to `size`, filling new entries with zero.
    pub fn resize_all(&mut self, size: usize) {
        for layer in self.entries.values_mut() {
            match layer {
                LayerData::Real(v) => v.resize(size, 0.0),
                LayerData::Index(v) => v.resize(size, 0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut layers = Layers::new();
        layers.set_real("P", vec![1.0, 2.0, 3.0]);
        layers.set_index("owner", vec![0, 1, 0]);
        assert_eq!(layers.get_real("P").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(layers.get_index("owner").unwrap(), &[0, 1, 0]);
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut layers = Layers::new();
        layers.set_real("P", vec![1.0]);
        assert!(layers.get_index("P").is_err());
    }

    #[test]
    fn missing_name_is_an_error() {
        let layers = Layers::new();
        assert!(layers.get_real("missing").is_err());
    }

    #[test]
    fn names_preserve_insertion_order() {
        let mut layers = Layers::new();
        layers.set_real("b", vec![]);
        layers.set_real("a", vec![]);
        assert_eq!(layers.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn resize_all_pads_with_zero() {
        let mut layers = Layers::new();
        layers.set_real("P", vec![1.0]);
        layers.set_index("owner", vec![7]);
        layers.resize_all(3);
        assert_eq!(layers.get_real("P").unwrap(), &[1.0, 0.0, 0.0]);
        assert_eq!(layers.get_index("owner").unwrap(), &[7, 0, 0]);
    }
}
