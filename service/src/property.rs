//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Typed values for the per-connection property bag

use bytes::Bytes;

/// A value stored on a [`Connection`](crate::Connection)
///
/// Handlers convert in with `From` and back out with `TryFrom`; a mismatched
/// variant hands the original value back as the error.
///
/// ```
/// use gridlink_service::PropertyValue;
///
/// let value = PropertyValue::from(42i64);
/// assert_eq!(i64::try_from(value.clone()), Ok(42));
/// assert!(String::try_from(value).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
}

impl PropertyValue {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "i64",
            PropertyValue::UInt(_) => "u64",
            PropertyValue::Float(_) => "f64",
            PropertyValue::Text(_) => "String",
            PropertyValue::Bytes(_) => "Bytes",
        }
    }
}

macro_rules! property_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::$variant(value)
                }
            }

            impl TryFrom<PropertyValue> for $ty {
                type Error = PropertyValue;

                fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
                    match value {
                        PropertyValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

property_conversions! {
    Bool => bool,
    Int => i64,
    UInt => u64,
    Float => f64,
    Text => String,
    Bytes => Bytes,
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::UInt(value.into())
    }
}
