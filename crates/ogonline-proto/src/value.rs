//! Structured key/value container used as every message's payload.
//!
//! An [`Object`] keeps its fields in insertion order, so the encoded bytes of
//! a message are deterministic. Vectors and matrices are written as lists of
//! floats.
//!
//! Decoding is hand-written so that nesting is bounded by
//! [`MAX_VALUE_DEPTH`]; a payload nested deeper is rejected instead of
//! recursing without limit.

use std::fmt;

use serde::de::{self, DeserializeSeed, EnumAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::ProtoError;
use crate::limits::MAX_VALUE_DEPTH;
use crate::math::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Bool(bool),
    UInt8(u8),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    Str(String),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::UInt8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn floats(values: &[f32]) -> Value {
        Value::List(values.iter().copied().map(Value::Float).collect())
    }

    /// Reads a list of exactly `N` floats.
    pub fn as_floats<const N: usize>(&self) -> Option<[f32; N]> {
        let list = self.as_list()?;
        if list.len() != N {
            return None;
        }
        let mut out = [0.0f32; N];
        for (slot, v) in out.iter_mut().zip(list) {
            *slot = v.as_f32()?;
        }
        Some(out)
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        self.as_floats::<3>().map(Vec3::from_array)
    }

    pub fn as_quat(&self) -> Option<Quat> {
        self.as_floats::<4>().map(Quat::from_array)
    }

    pub fn as_mat4(&self) -> Option<Mat4> {
        self.as_floats::<16>().map(Mat4)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::floats(&v.to_array())
    }
}

impl From<Quat> for Value {
    fn from(v: Quat) -> Self {
        Value::floats(&v.to_array())
    }
}

impl From<Mat4> for Value {
    fn from(v: Mat4) -> Self {
        Value::floats(&v.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Object {
    fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Replaces an existing field in place, otherwise appends.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key.to_owned(), value)),
        }
    }

    /// Builder form of [`Object::set`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(postcard::to_stdvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ObjectSeed { depth: 1 }.deserialize(deserializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueSeed { depth: 1 }.deserialize(deserializer)
    }
}

/// Depth of the container about to be entered, or an error past the limit.
fn enter<E: de::Error>(depth: usize) -> Result<usize, E> {
    if depth >= MAX_VALUE_DEPTH {
        return Err(E::custom(format_args!("value nesting deeper than {MAX_VALUE_DEPTH}")));
    }
    Ok(depth + 1)
}

/// Cap on preallocation from a length prefix the peer controls.
fn capacity(hint: Option<usize>) -> usize {
    hint.unwrap_or(0).min(1024)
}

/// Reads one [`Value`] found inside a container at `depth`.
#[derive(Clone, Copy)]
struct ValueSeed {
    depth: usize,
}

const VALUE_VARIANTS: &[&str] = &["Bool", "UInt8", "Int32", "UInt32", "Float", "Str", "List", "Object"];

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_enum("Value", VALUE_VARIANTS, self)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a message value")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (index, variant) = data.variant::<u32>()?;
        match index {
            0 => variant.newtype_variant().map(Value::Bool),
            1 => variant.newtype_variant().map(Value::UInt8),
            2 => variant.newtype_variant().map(Value::Int32),
            3 => variant.newtype_variant().map(Value::UInt32),
            4 => variant.newtype_variant().map(Value::Float),
            5 => variant.newtype_variant().map(Value::Str),
            6 => {
                let depth = enter(self.depth)?;
                variant
                    .newtype_variant_seed(ListSeed { depth })
                    .map(Value::List)
            }
            7 => {
                let depth = enter(self.depth)?;
                variant
                    .newtype_variant_seed(ObjectSeed { depth })
                    .map(Value::Object)
            }
            other => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(u64::from(other)),
                &"a value variant index",
            )),
        }
    }
}

/// Reads the elements of a list at `depth`.
struct ListSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for ListSeed {
    type Value = Vec<Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Vec<Value>, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ListSeed {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Value>, A::Error> {
        let mut out = Vec::with_capacity(capacity(seq.size_hint()));
        while let Some(v) = seq.next_element_seed(ValueSeed { depth: self.depth })? {
            out.push(v);
        }
        Ok(out)
    }
}

/// Reads an [`Object`] at `depth`.
struct ObjectSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for ObjectSeed {
    type Value = Object;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Object, D::Error> {
        deserializer.deserialize_struct("Object", &["fields"], self)
    }
}

impl<'de> Visitor<'de> for ObjectSeed {
    type Value = Object;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Object, A::Error> {
        let fields = seq
            .next_element_seed(FieldsSeed { depth: self.depth })?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        Ok(Object { fields })
    }
}

struct FieldsSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for FieldsSeed {
    type Value = Vec<(String, Value)>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for FieldsSeed {
    type Value = Vec<(String, Value)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("object fields")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(capacity(seq.size_hint()));
        while let Some(field) = seq.next_element_seed(FieldSeed { depth: self.depth })? {
            out.push(field);
        }
        Ok(out)
    }
}

/// One `(key, value)` pair.
struct FieldSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for FieldSeed {
    type Value = (String, Value);

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_tuple(2, self)
    }
}

impl<'de> Visitor<'de> for FieldSeed {
    type Value = (String, Value);

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a key and a value")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let key: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let value = seq
            .next_element_seed(ValueSeed { depth: self.depth })?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok((key, value))
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    u8 => UInt8,
    i32 => Int32,
    u32 => UInt32,
    f32 => Float,
    String => Str,
    Vec<Value> => List,
    Object => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

/// Reads typed fields out of an [`Object`] while recording every field that
/// was absent or had the wrong type.
///
/// Missing fields leave the destination untouched, so a message keeps its
/// default for that field.
pub struct FieldReader<'a> {
    object: &'a Object,
    missing: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    pub fn new(object: &'a Object) -> Self {
        Self {
            object,
            missing: Vec::new(),
        }
    }

    fn read<T>(
        &mut self,
        key: &'static str,
        out: &mut T,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> bool {
        match self.object.get(key).and_then(extract) {
            Some(v) => {
                *out = v;
                true
            }
            None => {
                self.missing.push(key);
                false
            }
        }
    }

    pub fn bool(&mut self, key: &'static str, out: &mut bool) -> bool {
        self.read(key, out, Value::as_bool)
    }

    pub fn u8(&mut self, key: &'static str, out: &mut u8) -> bool {
        self.read(key, out, Value::as_u8)
    }

    pub fn i32(&mut self, key: &'static str, out: &mut i32) -> bool {
        self.read(key, out, Value::as_i32)
    }

    pub fn u32(&mut self, key: &'static str, out: &mut u32) -> bool {
        self.read(key, out, Value::as_u32)
    }

    pub fn f32(&mut self, key: &'static str, out: &mut f32) -> bool {
        self.read(key, out, Value::as_f32)
    }

    pub fn string(&mut self, key: &'static str, out: &mut String) -> bool {
        self.read(key, out, |v| v.as_str().map(str::to_owned))
    }

    pub fn vec3(&mut self, key: &'static str, out: &mut Vec3) -> bool {
        self.read(key, out, Value::as_vec3)
    }

    pub fn quat(&mut self, key: &'static str, out: &mut Quat) -> bool {
        self.read(key, out, Value::as_quat)
    }

    pub fn mat4(&mut self, key: &'static str, out: &mut Mat4) -> bool {
        self.read(key, out, Value::as_mat4)
    }

    pub fn list(&mut self, key: &'static str) -> Option<&'a [Value]> {
        let found = self.object.get(key).and_then(Value::as_list);
        if found.is_none() {
            self.missing.push(key);
        }
        found
    }

    pub fn object(&mut self, key: &'static str) -> Option<&'a Object> {
        let found = self.object.get(key).and_then(Value::as_object);
        if found.is_none() {
            self.missing.push(key);
        }
        found
    }

    /// Records a field that was present but could not be used.
    pub fn mark_invalid(&mut self, key: &'static str) {
        self.missing.push(key);
    }

    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Logs absent fields and hands them back.
    pub fn finish(self, context: &str) -> Vec<&'static str> {
        if !self.missing.is_empty() {
            warn!(msg = context, missing = ?self.missing, "message fields missing, defaults used");
        }
        self.missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place_and_keeps_order() {
        let mut obj = Object::new().with("a", 1i32).with("b", "two").with("c", true);
        obj.set("b", 2.5f32);
        assert_eq!(obj.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(obj.get("b").and_then(Value::as_f32), Some(2.5));
    }

    #[test]
    fn typed_getters_reject_wrong_types() {
        let obj = Object::new().with("n", 7u32);
        assert_eq!(obj.get("n").and_then(Value::as_u32), Some(7));
        assert_eq!(obj.get("n").and_then(Value::as_i32), None);
    }

    #[test]
    fn vectors_are_float_lists() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let obj = Object::new().with("p", v).with("bad", Value::floats(&[1.0, 2.0]));
        assert_eq!(obj.get("p").and_then(Value::as_vec3), Some(v));
        assert_eq!(obj.get("bad").and_then(Value::as_vec3), None);
    }

    #[test]
    fn reader_tracks_missing_fields_and_keeps_defaults() {
        let obj = Object::new().with("present", 3i32).with("wrong", "x");
        let mut reader = FieldReader::new(&obj);

        let mut present = 0;
        let mut wrong = 11;
        let mut absent = String::from("keep");
        assert!(reader.i32("present", &mut present));
        assert!(!reader.i32("wrong", &mut wrong));
        assert!(!reader.string("absent", &mut absent));

        assert_eq!(present, 3);
        assert_eq!(wrong, 11);
        assert_eq!(absent, "keep");
        assert_eq!(reader.missing(), ["wrong", "absent"]);
    }

    fn nested_lists(levels: usize) -> Value {
        let mut v = Value::UInt8(0);
        for _ in 0..levels {
            v = Value::List(vec![v]);
        }
        v
    }

    #[test]
    fn nesting_is_bounded() {
        // The payload object is depth 1, so seven lists still fit.
        let fits = Object::new().with("a", nested_lists(MAX_VALUE_DEPTH - 1));
        let bytes = fits.to_bytes().unwrap();
        assert_eq!(Object::from_bytes(&bytes).unwrap(), fits);

        let deep = Object::new().with("a", nested_lists(MAX_VALUE_DEPTH));
        let bytes = deep.to_bytes().unwrap();
        assert!(matches!(Object::from_bytes(&bytes), Err(ProtoError::Postcard(_))));
    }

    #[test]
    fn unknown_value_variant_is_rejected() {
        // One field "a" holding variant 9.
        let bytes = [1, 1, b'a', 9, 0];
        assert!(Object::from_bytes(&bytes).is_err());
    }

    #[test]
    fn nested_objects_survive_bytes() {
        let inner = Object::new().with("x", Value::List(vec![Value::UInt8(1), Value::Str("s".into())]));
        let obj = Object::new().with("inner", inner).with("f", -0.5f32);
        let bytes = obj.to_bytes().unwrap();
        assert_eq!(Object::from_bytes(&bytes).unwrap(), obj);
    }
}
