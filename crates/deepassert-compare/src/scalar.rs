use deepassert_types::Value;

use crate::config::AssertConfig;

/// Equality for values that classify as Primitive.
pub trait ScalarEquality: Send + Sync {
    /// `true` when `actual` satisfies `expected`.
    fn scalar_equals(&self, expected: &Value, actual: &Value) -> bool;
}

/// Value equality with the float and text knobs of [`AssertConfig`].
///
/// Ints and floats compare numerically across the two kinds. Unregistered
/// objects are equal only when they are the same reference.
#[derive(Clone, Debug, Default)]
pub struct DefaultScalarEquality {
    float_tolerance: f64,
    ignore_text_case: bool,
}

impl DefaultScalarEquality {
    /// Equality using the tolerance and case settings of `config`.
    pub fn from_config(config: &AssertConfig) -> Self {
        Self {
            float_tolerance: config.float_tolerance,
            ignore_text_case: config.ignore_text_case,
        }
    }

    /// Two NaNs are equal, so a value always equals its own copy.
    fn floats_equal(&self, a: f64, b: f64) -> bool {
        a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() <= self.float_tolerance
    }
}

impl ScalarEquality for DefaultScalarEquality {
    fn scalar_equals(&self, expected: &Value, actual: &Value) -> bool {
        match (expected, actual) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => self.floats_equal(*a, *b),
            (Value::Int(a), Value::Float(b)) => self.floats_equal(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => self.floats_equal(*a, *b as f64),
            (Value::Text(a), Value::Text(b)) if self.ignore_text_case => a.eq_ignore_ascii_case(b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
