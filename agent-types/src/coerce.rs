//! The one coercion helper every tool invocation goes through.
//!
//! Model-supplied tool parameters arrive as a loose JSON value. Rust tool
//! authors declare a strongly-typed `Args` struct. [`coerce`] bridges the
//! two using the conversion rules from the Tool Registry + Invoker spec:
//!
//! - string ↔ primitive: numbers/booleans parsed from their textual form;
//!   non-strings are stringified via canonical formatting when a string is
//!   expected.
//! - sequences and maps are coerced element-wise using the same rules.
//! - struct fields are populated by matching JSON object keys; missing
//!   required fields are an error, unknown keys are ignored (plain `serde`
//!   behavior, since no `#[serde(deny_unknown_fields)]` is applied here).
//!
//! No per-type casts are scattered elsewhere in the engine — every call
//! site from `ToolDyn::invoke` to the request assembler's output-schema
//! handling goes through this one function.

use serde::de::{
    DeserializeOwned, Deserializer, EnumAccess, Error as DeError, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde_json::Value;

/// Coerce a loose JSON value into a strongly-typed `T`, applying lenient
/// string/primitive conversions at every level.
///
/// # Errors
///
/// Returns `serde_json::Error` describing the first mismatch encountered
/// (missing required field, unparsable string, etc).
pub fn coerce<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    T::deserialize(Coercing(value))
}

/// A `Deserializer` wrapper that loosens primitive type matching before
/// delegating to the wrapped value's own (exact) `Deserializer` impl.
struct Coercing(Value);

macro_rules! forward_loose_number {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => {
                    let parsed: $ty = s
                        .trim()
                        .parse()
                        .map_err(|_| DeError::custom(format!("cannot parse {s:?} as a number")))?;
                    visitor.$visit(parsed)
                }
                other => Coercing(other).deserialize_any(visitor),
            }
        }
    };
}

impl<'de> Deserializer<'de> for Coercing {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.0.deserialize_any(visitor)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => match s.trim() {
                "true" => visitor.visit_bool(true),
                "false" => visitor.visit_bool(false),
                other => Err(DeError::custom(format!("cannot parse {other:?} as a bool"))),
            },
            other => Coercing(other).deserialize_any(visitor),
        }
    }

    forward_loose_number!(deserialize_i8, visit_i8, i8);
    forward_loose_number!(deserialize_i16, visit_i16, i16);
    forward_loose_number!(deserialize_i32, visit_i32, i32);
    forward_loose_number!(deserialize_i64, visit_i64, i64);
    forward_loose_number!(deserialize_i128, visit_i128, i128);
    forward_loose_number!(deserialize_u8, visit_u8, u8);
    forward_loose_number!(deserialize_u16, visit_u16, u16);
    forward_loose_number!(deserialize_u32, visit_u32, u32);
    forward_loose_number!(deserialize_u64, visit_u64, u64);
    forward_loose_number!(deserialize_u128, visit_u128, u128);
    forward_loose_number!(deserialize_f32, visit_f32, f32);
    forward_loose_number!(deserialize_f64, visit_f64, f64);

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.0.deserialize_char(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => visitor.visit_string(s),
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => other.deserialize_string(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Coercing(other)),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => {
                visitor.visit_seq(CoercingSeq(items.into_iter()))
            }
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(CoercingMap {
                iter: map.into_iter(),
                value: None,
            }),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => visitor.visit_enum(CoercingUnitVariant(s)),
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    serde::forward_to_deserialize_any! {
        unit unit_struct newtype_struct tuple tuple_struct
        identifier ignored_any bytes byte_buf
    }
}

struct CoercingSeq(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for CoercingSeq {
    type Error = serde_json::Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        match self.0.next() {
            Some(v) => seed.deserialize(Coercing(v)).map(Some),
            None => Ok(None),
        }
    }
}

struct CoercingMap {
    iter: serde_json::map::IntoIter,
    value: Option<Value>,
}

impl<'de> MapAccess<'de> for CoercingMap {
    type Error = serde_json::Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: serde::de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((k, v)) => {
                self.value = Some(v);
                seed.deserialize(serde_json::Value::String(k)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::DeserializeSeed<'de>,
    {
        let value = self.value.take().ok_or_else(|| DeError::custom("value is missing"))?;
        seed.deserialize(Coercing(value))
    }
}

struct CoercingUnitVariant(String);

impl<'de> EnumAccess<'de> for CoercingUnitVariant {
    type Error = serde_json::Error;
    type Variant = CoercingUnitVariantAccess;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: serde::de::DeserializeSeed<'de>,
    {
        let value = seed.deserialize(serde_json::Value::String(self.0))?;
        Ok((value, CoercingUnitVariantAccess))
    }
}

struct CoercingUnitVariantAccess;

impl<'de> VariantAccess<'de> for CoercingUnitVariantAccess {
    type Error = serde_json::Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, _seed: T) -> Result<T::Value, Self::Error>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        Err(DeError::custom("expected a unit variant"))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(DeError::custom("expected a unit variant"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(DeError::custom("expected a unit variant"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Args {
        name: String,
        count: i64,
        ready: bool,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn coerces_stringly_typed_numbers_and_bools() {
        let value = json!({
            "name": 42,
            "count": "7",
            "ready": "true",
            "tags": ["a", 1, true],
        });
        let args: Args = coerce(value).unwrap();
        assert_eq!(
            args,
            Args {
                name: "42".to_string(),
                count: 7,
                ready: true,
                tags: vec!["a".to_string(), "1".to_string(), "true".to_string()],
            }
        );
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let value = json!({ "name": "x", "ready": true });
        let result: Result<Args, _> = coerce(value);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let value = json!({
            "name": "x",
            "count": 1,
            "ready": false,
            "unexpected": "field",
        });
        let args: Args = coerce(value).unwrap();
        assert_eq!(args.name, "x");
    }

    #[test]
    fn round_trips_already_well_typed_values() {
        let value = json!({ "name": "x", "count": 3, "ready": true, "tags": ["a"] });
        let args: Args = coerce(value).unwrap();
        assert_eq!(args.count, 3);
    }
}
