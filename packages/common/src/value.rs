//! Prop values carried by visual components.
//!
//! Props are a tagged variant rather than a free-form bag: a value is a
//! literal, a nested object or list, a named reference (such as a
//! behavior handler), or an opaque expression that is never evaluated.

use serde::de::{MapAccess, Visitor as SerdeVisitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Primitive literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Number(n) => write!(f, "{}", format_number(*n)),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

/// Value of a single component prop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropValue {
    /// String, number, boolean or null
    Literal(Literal),

    /// Nested key/value object (e.g. the style prop)
    Object(Props),

    /// Ordered list of values
    List(Vec<PropValue>),

    /// Named binding, e.g. `handleClick`
    Reference(String),

    /// Unevaluated expression source, carried verbatim
    Expression(String),
}

impl PropValue {
    pub fn string(value: impl Into<String>) -> Self {
        PropValue::Literal(Literal::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        PropValue::Literal(Literal::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        PropValue::Literal(Literal::Bool(value))
    }

    pub fn null() -> Self {
        PropValue::Literal(Literal::Null)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        PropValue::Reference(name.into())
    }

    pub fn expression(source: impl Into<String>) -> Self {
        PropValue::Expression(source.into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PropValue::Literal(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Literal(Literal::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Props> {
        match self {
            PropValue::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Convert a JSON value into a prop value. Objects and arrays keep
    /// their shape; everything else becomes a literal.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => PropValue::null(),
            Value::Bool(b) => PropValue::bool(b),
            Value::Number(n) => PropValue::number(n.as_f64().unwrap_or_default()),
            Value::String(s) => PropValue::string(s),
            Value::Array(items) => {
                PropValue::List(items.into_iter().map(PropValue::from_json).collect())
            }
            Value::Object(map) => PropValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, PropValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering of literal, object and list values. References and
    /// expressions have no JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        Some(match self {
            PropValue::Literal(Literal::String(s)) => Value::String(s.clone()),
            PropValue::Literal(Literal::Number(n)) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropValue::Literal(Literal::Bool(b)) => Value::Bool(*b),
            PropValue::Literal(Literal::Null) => Value::Null,
            PropValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(PropValue::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            PropValue::Object(props) => {
                let mut map = serde_json::Map::new();
                for (key, value) in props.iter() {
                    map.insert(key.to_string(), value.to_json()?);
                }
                Value::Object(map)
            }
            PropValue::Reference(_) | PropValue::Expression(_) => return None,
        })
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::string(value)
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::string(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::number(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::bool(value)
    }
}

impl From<Props> for PropValue {
    fn from(value: Props) -> Self {
        PropValue::Object(value)
    }
}

/// Render a number the way it is written in source (`3` rather than `3.0`)
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Insertion-ordered string-keyed map of prop values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(String, PropValue)>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a value. Replacing keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, value: PropValue) -> Option<PropValue> {
        let key = key.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(existing, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<T: IntoIterator<Item = (String, PropValue)>>(iter: T) -> Self {
        let mut props = Props::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

impl IntoIterator for Props {
    type Item = (String, PropValue);
    type IntoIter = std::vec::IntoIter<(String, PropValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Props {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Props {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropsVisitor;

        impl<'de> SerdeVisitor<'de> for PropsVisitor {
            type Value = Props;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of prop values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Props, A::Error> {
                let mut props = Props::new();
                while let Some((key, value)) = access.next_entry::<String, PropValue>()? {
                    props.insert(key, value);
                }
                Ok(props)
            }
        }

        deserializer.deserialize_map(PropsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut props = Props::new();
        props.insert("a", PropValue::number(1.0));
        props.insert("b", PropValue::number(2.0));
        let old = props.insert("a", PropValue::number(3.0));

        assert_eq!(old, Some(PropValue::number(1.0)));
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(props.get("a"), Some(&PropValue::number(3.0)));
    }

    #[test]
    fn test_props_json_keeps_order() {
        let mut props = Props::new();
        props.insert("zeta", PropValue::string("z"));
        props.insert("alpha", PropValue::bool(true));
        props.insert("handler", PropValue::reference("onSave"));

        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(
            json,
            r#"{"zeta":{"literal":"z"},"alpha":{"literal":true},"handler":{"reference":"onSave"}}"#
        );

        let back: Props = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }

    #[test]
    fn test_null_literal_serializes_as_null() {
        let json = serde_json::to_string(&PropValue::null()).unwrap();
        assert_eq!(json, r#"{"literal":null}"#);
        let back: PropValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PropValue::null());
    }

    #[test]
    fn test_expression_has_no_json_form() {
        assert!(PropValue::expression("a + b").to_json().is_none());
        let list = PropValue::List(vec![PropValue::number(1.0), PropValue::reference("x")]);
        assert!(list.to_json().is_none());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
