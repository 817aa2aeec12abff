//! The keyed-record payload model.
//!
//! Every message on the dispatch socket (chunks, results, work requests,
//! stop packets, acks) is a [`Payload`]: an ordered map from field names to
//! [`Value`]s. Leaf types cover scalars, strings, byte blobs, and homogeneous
//! numeric arrays with an explicit element type and shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A keyed record of opaque fields, the unit of everything on the wire.
pub type Payload = BTreeMap<String, Value>;

/// A single payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// UTF-8 string.
    Str(String),
    /// Opaque byte sequence.
    Bytes(Vec<u8>),
    /// Homogeneous numeric array with element type and shape.
    Array(NdArray),
}

impl Value {
    /// Integer view of this value, if it is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of this value (`Int` widens to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view of this value, if it is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Array view of this value, if it is an `Array`.
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

/// A homogeneous numeric array carrying its shape alongside the flat data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    /// Dimension extents, outermost first.
    pub shape: Vec<u64>,
    /// Flat element storage in row-major order.
    pub data: ArrayData,
}

impl NdArray {
    /// One-dimensional `f32` array.
    pub fn f32(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len() as u64],
            data: ArrayData::F32(data),
        }
    }

    /// One-dimensional `f64` array.
    pub fn f64(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len() as u64],
            data: ArrayData::F64(data),
        }
    }

    /// One-dimensional `i64` array.
    pub fn i64(data: Vec<i64>) -> Self {
        Self {
            shape: vec![data.len() as u64],
            data: ArrayData::I64(data),
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Element-type name (`i32`, `i64`, `f32`, `f64`).
    pub fn dtype(&self) -> &'static str {
        match self.data {
            ArrayData::I32(_) => "i32",
            ArrayData::I64(_) => "i64",
            ArrayData::F32(_) => "f32",
            ArrayData::F64(_) => "f64",
        }
    }
}

/// Typed element storage for [`NdArray`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    /// 32-bit signed integers.
    I32(Vec<i32>),
    /// 64-bit signed integers.
    I64(Vec<i64>),
    /// Single-precision floats.
    F32(Vec<f32>),
    /// Double-precision floats.
    F64(Vec<f64>),
}

impl ArrayData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayData::I32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
        }
    }

    /// True when the storage holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements widened to `f64`, in storage order.
    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            ArrayData::I32(v) => Box::new(v.iter().map(|&x| f64::from(x))),
            ArrayData::I64(v) => Box::new(v.iter().map(|&x| x as f64)),
            ArrayData::F32(v) => Box::new(v.iter().map(|&x| f64::from(x))),
            ArrayData::F64(v) => Box::new(v.iter().copied()),
        }
    }
}

/// Typed field accessors for [`Payload`].
pub trait PayloadExt {
    /// Integer field, if present and an `Int`.
    fn get_i64(&self, key: &str) -> Option<i64>;
    /// Numeric field widened to `f64`, if present.
    fn get_f64(&self, key: &str) -> Option<f64>;
    /// Boolean field, if present and a `Bool`.
    fn get_bool(&self, key: &str) -> Option<bool>;
    /// Array field, if present and an `Array`.
    fn get_array(&self, key: &str) -> Option<&NdArray>;
}

impl PayloadExt for Payload {
    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    fn get_array(&self, key: &str) -> Option<&NdArray> {
        self.get(key).and_then(Value::as_array)
    }
}
