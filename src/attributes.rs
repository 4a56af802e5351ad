//! Attributes
//!
//! The attribute set a tree is defined over: names, types and value
//! domains of the attributes, plus one "current instance" value per
//! attribute that inference falls back to when no explicit row is given.
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// Finite set of named values.
    Nominal,
    /// Ordered integer values, tested against a cut.
    Integer,
    /// Ordered real values, tested against a cut.
    Float,
}

/// A single cell of a row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    /// Value id of a nominal attribute.
    Nominal(usize),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Null and NaN are both unknown.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of an ordered value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(v) if !v.is_nan() => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeType,
    values: Vec<String>,
    value_index: HashMap<String, usize>,
    instance: Value,
}

impl Attribute {
    fn with_type(name: &str, kind: AttributeType) -> Self {
        Attribute {
            name: name.to_string(),
            kind,
            values: Vec::new(),
            value_index: HashMap::new(),
            instance: Value::Null,
        }
    }

    /// Create a nominal attribute, value ids follow the order of `values`.
    pub fn nominal<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut attribute = Attribute::with_type(name, AttributeType::Nominal);
        for v in values {
            attribute.add_value(v.as_ref());
        }
        attribute
    }

    pub fn integer(name: &str) -> Self {
        Attribute::with_type(name, AttributeType::Integer)
    }

    pub fn float(name: &str) -> Self {
        Attribute::with_type(name, AttributeType::Float)
    }

    /// Add a value to the domain and return its id. Existing
    /// names keep their id.
    pub fn add_value(&mut self, value: &str) -> usize {
        if let Some(id) = self.value_index.get(value) {
            return *id;
        }
        let id = self.values.len();
        self.values.push(value.to_string());
        self.value_index.insert(value.to_string(), id);
        id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeType {
        self.kind
    }

    pub fn is_nominal(&self) -> bool {
        self.kind == AttributeType::Nominal
    }

    pub fn is_ordered(&self) -> bool {
        !self.is_nominal()
    }

    /// Number of values in the domain, zero for ordered attributes.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn value_name(&self, id: usize) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn value_id(&self, name: &str) -> Option<usize> {
        self.value_index.get(name).copied()
    }

    pub fn instance(&self) -> Value {
        self.instance
    }

    pub fn set_instance(&mut self, value: Value) {
        self.instance = value;
    }
}

/// An ordered collection of attributes with lookup by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
    name_index: HashMap<String, usize>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute and return its id. An attribute with the same
    /// name that is already present is kept and its id returned.
    pub fn add(&mut self, attribute: Attribute) -> usize {
        if let Some(id) = self.name_index.get(attribute.name()) {
            return *id;
        }
        let id = self.attributes.len();
        self.name_index.insert(attribute.name().to_string(), id);
        self.attributes.push(attribute);
        id
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Attribute> {
        self.attributes.get_mut(id)
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Current instance value of an attribute, `Null` for unknown ids.
    pub fn instance(&self, id: usize) -> Value {
        self.attributes.get(id).map_or(Value::Null, Attribute::instance)
    }

    /// Load a row into the current instance.
    pub fn set_instance(&mut self, row: &[Value]) {
        for (attribute, value) in self.attributes.iter_mut().zip(row) {
            attribute.set_instance(*value);
        }
    }
}
