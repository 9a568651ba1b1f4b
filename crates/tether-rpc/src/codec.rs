//! Value encoding with a bounded nesting depth.
//!
//! Encoding goes through a `Serializer` adapter that counts how many sequences, maps and
//! records it is nested in. Past the configured limit it fails with a `recursion limit` error,
//! so shared object graphs that loop back on themselves fail deterministically instead of
//! exhausting the stack.

use serde::de::DeserializeOwned;
use serde::ser::{self, Error as _, Serialize, Serializer};
use serde_json::Value;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{RpcError, RpcResult};

/// Converts between typed values and JSON values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    max_depth: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Codec {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Encode `value`, failing once nesting exceeds the depth limit.
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, serde_json::Error> {
        Guarded {
            value,
            remaining: self.max_depth,
            limit: self.max_depth,
        }
        .serialize(serde_json::value::Serializer)
    }

    pub fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn encode_result<T: Serialize + ?Sized>(&self, value: &T) -> RpcResult<Value> {
        self.to_value(value)
            .map_err(|e| RpcError::encode("result", e))
    }

    pub fn decode_result<T: DeserializeOwned>(&self, value: Value) -> RpcResult<T> {
        self.from_value(value)
            .map_err(|e| RpcError::decode("result", e))
    }

    pub fn encode_param<T: Serialize + ?Sized>(&self, value: &T, index: usize) -> RpcResult<Value> {
        self.to_value(value)
            .map_err(|e| RpcError::encode(format!("parameter {index}"), e))
    }

    /// Decode a positional parameter. A missing value decodes from `null`.
    pub fn decode_param<T: DeserializeOwned>(
        &self,
        value: Option<Value>,
        index: usize,
    ) -> RpcResult<T> {
        self.from_value(value.unwrap_or(Value::Null))
            .map_err(|e| RpcError::decode(format!("parameter {index}"), e))
    }
}

// A value to serialize together with the nesting budget left at its position.
struct Guarded<'a, T: ?Sized> {
    value: &'a T,
    remaining: usize,
    limit: usize,
}

impl<T: Serialize + ?Sized> Serialize for Guarded<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(DepthLimited {
            inner: serializer,
            remaining: self.remaining,
            limit: self.limit,
        })
    }
}

struct DepthLimited<S> {
    inner: S,
    remaining: usize,
    limit: usize,
}

impl<S: Serializer> DepthLimited<S> {
    fn descend(&self) -> Result<usize, S::Error> {
        self.remaining.checked_sub(1).ok_or_else(|| {
            S::Error::custom(format!(
                "recursion limit of {} exceeded while encoding",
                self.limit
            ))
        })
    }

    fn guard<'a, T: ?Sized>(&self, value: &'a T, remaining: usize) -> Guarded<'a, T> {
        Guarded {
            value,
            remaining,
            limit: self.limit,
        }
    }
}

macro_rules! forward_scalars {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<S::Ok, S::Error> {
                self.inner.$method(v)
            }
        )*
    };
}

impl<S: Serializer> Serializer for DepthLimited<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = Compound<S::SerializeSeq>;
    type SerializeTuple = Compound<S::SerializeTuple>;
    type SerializeTupleStruct = Compound<S::SerializeTupleStruct>;
    type SerializeTupleVariant = Compound<S::SerializeTupleVariant>;
    type SerializeMap = Compound<S::SerializeMap>;
    type SerializeStruct = Compound<S::SerializeStruct>;
    type SerializeStructVariant = Compound<S::SerializeStructVariant>;

    forward_scalars!(
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    );

    fn serialize_none(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_none()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<S::Ok, S::Error> {
        let value = self.guard(value, self.remaining);
        self.inner.serialize_some(&value)
    }

    fn serialize_unit(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<S::Ok, S::Error> {
        self.inner
            .serialize_unit_variant(name, variant_index, variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error> {
        let value = self.guard(value, self.remaining);
        self.inner.serialize_newtype_struct(name, &value)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error> {
        let remaining = self.descend()?;
        let value = self.guard(value, remaining);
        self.inner
            .serialize_newtype_variant(name, variant_index, variant, &value)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self.inner.serialize_seq(len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self.inner.serialize_tuple(len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self.inner.serialize_tuple_struct(name, len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self
            .inner
            .serialize_tuple_variant(name, variant_index, variant, len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self.inner.serialize_map(len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self.inner.serialize_struct(name, len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, S::Error> {
        let remaining = self.descend()?;
        let limit = self.limit;
        let inner = self
            .inner
            .serialize_struct_variant(name, variant_index, variant, len)?;
        Ok(Compound {
            inner,
            remaining,
            limit,
        })
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

// Sequences, maps and records in progress; every element they receive is guarded one level deeper.
struct Compound<C> {
    inner: C,
    remaining: usize,
    limit: usize,
}

impl<C> Compound<C> {
    fn guard<'a, T: ?Sized>(&self, value: &'a T) -> Guarded<'a, T> {
        Guarded {
            value,
            remaining: self.remaining,
            limit: self.limit,
        }
    }
}

impl<C: ser::SerializeSeq> ser::SerializeSeq for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_element(&value)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeTuple> ser::SerializeTuple for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_element(&value)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeTupleStruct> ser::SerializeTupleStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_field(&value)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeTupleVariant> ser::SerializeTupleVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_field(&value)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeMap> ser::SerializeMap for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), C::Error> {
        let key = self.guard(key);
        self.inner.serialize_key(&key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_value(&value)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeStruct> ser::SerializeStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_field(key, &value)
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: ser::SerializeStructVariant> ser::SerializeStructVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), C::Error> {
        let value = self.guard(value);
        self.inner.serialize_field(key, &value)
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}
