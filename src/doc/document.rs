// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Insertion-ordered field containers.
//!
//! A `Document` keeps its fields in the order they were appended; field
//! order is significant both for index keys (position matters, names do
//! not) and for command payloads (the first field is the command name).
//! Serialization round-trips through JSON objects while preserving order,
//! which plain map types cannot do.

use std::{cmp::Ordering, fmt};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::doc::Value;

/// An ordered sequence of `(name, value)` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Build a document of anonymous fields, the shape index keys take
    /// once their names are stripped.
    pub fn unnamed<I>(values: I) -> Self
    where I: IntoIterator<Item = Value> {
        Self {
            fields: values.into_iter().map(|v| (String::new(), v)).collect(),
        }
    }

    /// Append a field, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder-style `push`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// First field whose name matches, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Name of the first field; commands are spelled as `{name: ...}`.
    pub fn first_name(&self) -> Option<&str> {
        self.fields.first().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn value_at(&self, idx: usize) -> Option<&Value> {
        self.fields.get(idx).map(|(_, v)| v)
    }

    /// True when any field carries a non-empty name.
    pub fn has_field_names(&self) -> bool {
        self.fields.iter().any(|(n, _)| !n.is_empty())
    }

    /// Copy of this document with every field name blanked out. Documents
    /// that are already anonymous are cloned as-is.
    pub fn strip_field_names(&self) -> Document {
        if !self.has_field_names() {
            return self.clone();
        }
        Document {
            fields: self
                .fields
                .iter()
                .map(|(_, v)| (String::new(), v.clone()))
                .collect(),
        }
    }
}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Field-pairwise order: names first, then values, shorter document first
/// on a shared prefix. Used for nested document values; top-level index
/// keys are compared by the index ordering instead.
impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.fields.iter().zip(other.fields.iter()) {
            let by_name = a.0.cmp(&b.0);
            if by_name != Ordering::Equal {
                return by_name;
            }
            let by_value = a.1.cmp(&b.1);
            if by_value != Ordering::Equal {
                return by_value;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if name.is_empty() {
                write!(f, ": {value}")?;
            } else {
                write!(f, "{name}: {value}")?;
            }
        }
        write!(f, " }}")
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::MinKey => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$minKey", &1)?;
                map.end()
            },
            Value::MaxKey => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$maxKey", &1)?;
                map.end()
            },
            Value::Null => serializer.serialize_unit(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::Doc(d) => d.serialize(serializer),
            Value::Array(items) => items.serialize(serializer),
            Value::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a document field value")
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E>(self, n: i64) -> Result<Value, E> {
                Ok(Value::Int(n))
            }

            fn visit_u64<E: serde::de::Error>(self, n: u64) -> Result<Value, E> {
                i64::try_from(n)
                    .map(Value::Int)
                    .map_err(|_| E::custom("integer out of range"))
            }

            fn visit_f64<E>(self, d: f64) -> Result<Value, E> {
                Ok(Value::Double(d))
            }

            fn visit_str<E>(self, s: &str) -> Result<Value, E> {
                Ok(Value::String(s.to_string()))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Value, A::Error> {
                let doc = visit_document(map)?;
                // {$minKey: 1} / {$maxKey: 1} are the wire spellings of the
                // sentinel values.
                if doc.len() == 1 {
                    match doc.first_name() {
                        Some("$minKey") => return Ok(Value::MinKey),
                        Some("$maxKey") => return Ok(Value::MaxKey),
                        _ => {},
                    }
                }
                Ok(Value::Doc(doc))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

fn visit_document<'de, A: MapAccess<'de>>(mut map: A) -> Result<Document, A::Error> {
    let mut doc = Document::new();
    while let Some((name, value)) = map.next_entry::<String, Value>()? {
        doc.push(name, value);
    }
    Ok(doc)
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocVisitor;

        impl<'de> Visitor<'de> for DocVisitor {
            type Value = Document;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Document, A::Error> {
                visit_document(map)
            }
        }

        deserializer.deserialize_map(DocVisitor)
    }
}
