//! canonical value representation
//!
//! Every loaded configuration is lowered into this model before it is handed to the rule engine:
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Values never point at each other. A relationship between two resources is expressed as a plain
//! string holding the id of the referenced resource, so a rendered tree is always acyclic.
//!
//! Objects never hold duplicate keys. Code building objects from native documents goes through
//! [insert_unique] (or the [serde::Deserialize] impl) which rejects a second occurrence of a key
//! instead of silently overwriting the first one.
use indexmap::IndexMap;
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserializer, Serializer,
};

/// Object representation (insertion order is kept for display)
pub type Object = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Member lookup, `None` for missing keys and non-objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|object| object.get(key))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A float that carries no fractional part is an integer
    ///
    /// Native numbers may be arbitrary precision decimals. Integral values are kept as [Value::Integer]
    /// as long as they fit.
    pub fn from_f64(value: f64) -> Self {
        let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
        if value.is_finite() && value.fract() == 0.0 && in_range {
            Value::Integer(value as i64)
        } else {
            Value::Decimal(value)
        }
    }
}

/// Insert a member, failing when the key is already taken
pub(crate) fn insert_unique<E: de::Error>(
    object: &mut Object,
    key: String,
    value: Value,
) -> Result<(), E> {
    if object.contains_key(&key) {
        return Err(E::custom(format_args!("duplicate key `{key}`")));
    }
    object.insert(key, value);
    Ok(())
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        match value.as_f64() {
            Some(float) => Value::from_f64(float),
            None => Value::Null,
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

impl<'de> serde::de::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or(Value::Decimal(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Decimal(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        serde::de::Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut array = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(element) = seq.next_element()? {
            array.push(element);
        }
        Ok(Value::Array(array))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Object::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value()?;
            insert_unique::<A::Error>(&mut object, key, value)?;
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(Value::from(hcl::Number::from(5i64)), Value::Integer(5));
        assert_eq!(Value::from(hcl::Number::from_f64(5.0).unwrap()), Value::Integer(5));
        assert_eq!(
            Value::from(hcl::Number::from_f64(5.5).unwrap()),
            Value::Decimal(5.5)
        );
    }

    #[test]
    fn huge_integral_float_is_decimal() {
        assert_eq!(Value::from_f64(1e300), Value::Decimal(1e300));
    }

    #[test]
    fn deserialize_rejects_duplicate_keys() {
        let err = serde_json::from_str::<Value>(r#"{"a": 1, "a": 2}"#).expect_err("must error");
        assert!(err.to_string().contains("duplicate key `a`"), "{err}");
    }

    #[test]
    fn deserialize_keeps_order() {
        let value: Value = serde_json::from_str(r#"{"b": [1, 2.5, null], "a": true}"#).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            value.get("b"),
            Some(&Value::Array(vec![
                Value::Integer(1),
                Value::Decimal(2.5),
                Value::Null
            ]))
        );
    }

    #[test]
    fn serializes_as_json() {
        let mut object = Object::new();
        object.insert("n".into(), Value::Null);
        object.insert("list".into(), vec!["x", "y"].into());
        let json = serde_json::to_string(&Value::Object(object)).unwrap();
        assert_eq!(json, r#"{"n":null,"list":["x","y"]}"#);
    }
}
