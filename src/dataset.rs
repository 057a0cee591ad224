use std::ops::Range;

use netcdf::AttributeValue;

use crate::error::{Result, SplitError};

// ─────────────────────────────────────────────────────────────────────
// Attributes
// ─────────────────────────────────────────────────────────────────────

/// Attribute map that keeps the order attributes were written in.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace in place if present, append otherwise.
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String attribute lookup; `None` when absent, error when not a string.
    pub fn text(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(AttributeValue::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(SplitError::AttributeType {
                name: name.to_string(),
                expected: "a string",
            }),
        }
    }

    /// Global string attribute that must be present.
    pub fn required_text(&self, name: &str) -> Result<&str> {
        self.text(name)?
            .ok_or_else(|| SplitError::MissingGlobalAttribute(name.to_string()))
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(&k, v);
        }
        attrs
    }
}

// ─────────────────────────────────────────────────────────────────────
// Values / variables
// ─────────────────────────────────────────────────────────────────────

/// Flat row-major values. Missing numbers are NaN, missing text is "".
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Numeric(v) => v.len(),
            Values::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slice(&self, range: Range<usize>) -> Values {
        match self {
            Values::Numeric(v) => Values::Numeric(v[range].to_vec()),
            Values::Text(v) => Values::Text(v[range].to_vec()),
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Values::Numeric(v) => Some(v),
            Values::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Values,
    pub attrs: Attributes,
}

impl Variable {
    pub fn new(name: &str, dims: &[(&str, usize)], values: Values) -> Result<Self> {
        let expected: usize = dims.iter().map(|(_, n)| n).product();
        if values.len() != expected {
            return Err(SplitError::Shape(name.to_string(), values.len(), expected));
        }
        Ok(Self {
            name: name.to_string(),
            dims: dims.iter().map(|(d, _)| d.to_string()).collect(),
            shape: dims.iter().map(|(_, n)| *n).collect(),
            values,
            attrs: Attributes::new(),
        })
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Copy of row `index` of a 2-D variable.
    pub fn row(&self, index: usize) -> Option<Values> {
        if self.ndim() != 2 || index >= self.shape[0] {
            return None;
        }
        let width = self.shape[1];
        Some(self.values.slice(index * width..(index + 1) * width))
    }

    /// Required per-variable string attribute.
    pub fn required_text(&self, attribute: &str) -> Result<&str> {
        self.attrs
            .text(attribute)?
            .ok_or_else(|| SplitError::MissingVariableAttribute {
                variable: self.name.clone(),
                attribute: attribute.to_string(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Dataset
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub dims: Vec<Dimension>,
    pub variables: Vec<Variable>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn required_variable(&self, name: &str) -> Result<&Variable> {
        self.variable(name)
            .ok_or_else(|| SplitError::MissingVariable(name.to_string()))
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dims.iter().find(|d| d.name == name)
    }

    /// Adds the variable, registering any dimension not seen before.
    pub fn push(&mut self, var: Variable) {
        for (name, len) in var.dims.iter().zip(&var.shape) {
            if self.dimension(name).is_none() {
                self.dims.push(Dimension { name: name.clone(), len: *len });
            }
        }
        self.variables.push(var);
    }

    /// Variables that are not coordinate variables of their own dimension.
    pub fn data_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables
            .iter()
            .filter(|v| !(v.ndim() == 1 && v.dims[0] == v.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_position_and_remove_returns_value() {
        let mut attrs = Attributes::new();
        attrs.set("a", "1");
        attrs.set("b", "2");
        attrs.set("a", "3");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(attrs.text("a").unwrap(), Some("3"));
        assert!(attrs.remove("a").is_some());
        assert!(attrs.remove("a").is_none());
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn text_rejects_numbers() {
        let mut attrs = Attributes::new();
        attrs.set("n", 4.0_f64);
        assert!(matches!(attrs.text("n"), Err(SplitError::AttributeType { .. })));
        assert!(matches!(
            attrs.required_text("missing"),
            Err(SplitError::MissingGlobalAttribute(name)) if name == "missing"
        ));
    }

    #[test]
    fn row_copies_one_station() {
        let v = Variable::new(
            "PRES",
            &[("POSITION", 2), ("DEPTH", 3)],
            Values::Numeric(vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]),
        )
        .unwrap();
        assert_eq!(v.row(1), Some(Values::Numeric(vec![10.0, 11.0, 12.0])));
        assert_eq!(v.row(2), None);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = Variable::new("X", &[("A", 2)], Values::Numeric(vec![1.0])).unwrap_err();
        assert!(matches!(err, SplitError::Shape(_, 1, 2)));
    }

    #[test]
    fn coordinate_variables_are_not_data() {
        let mut ds = Dataset::default();
        ds.push(Variable::new("POSITION", &[("POSITION", 1)], Values::Numeric(vec![0.0])).unwrap());
        ds.push(
            Variable::new("PRES", &[("POSITION", 1), ("DEPTH", 1)], Values::Numeric(vec![0.0]))
                .unwrap(),
        );
        let names: Vec<_> = ds.data_variables().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["PRES"]);
        assert_eq!(ds.dims.len(), 2);
    }
}
