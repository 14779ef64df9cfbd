//! Runtime value representation for the Luna interpreter.
//!
//! `LValue` is what lives on the operand stack and in every variable map.
//! All operators are total over the union: combinations that are not
//! meaningful either produce a defined result (comparisons are simply false)
//! or a [`TypeMismatch`] (arithmetic on strings, arrays and `undefined`).

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::data_type::DataType;
use crate::error::TypeMismatch;
use crate::instruction::Comparison;

/// Runtime value.
///
/// Strings are immutable and shared by reference count; cloning a string
/// value never copies its text. Arrays own their elements and are copied on
/// clone, so two variables never alias the same array.
#[derive(Debug, Clone, Default)]
pub enum LValue {
    /// IEEE 754 64-bit float. The default numeric representation.
    Real(f64),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Boolean. Its numeric value is exactly 1.0 or 0.0.
    Bool(bool),
    /// Interned, immutable text.
    String(Rc<str>),
    /// Ordered sequence of values.
    Array(Vec<LValue>),
    /// Value of a variable that was never written.
    #[default]
    Undefined,
}

/// Language equality: numeric kinds compare by value, strings by content,
/// arrays element-wise. Incompatible kinds are unequal.
impl PartialEq for LValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<f64> for LValue {
    fn from(value: f64) -> Self {
        LValue::Real(value)
    }
}

impl From<i32> for LValue {
    fn from(value: i32) -> Self {
        LValue::Int32(value)
    }
}

impl From<i64> for LValue {
    fn from(value: i64) -> Self {
        LValue::Int64(value)
    }
}

impl From<bool> for LValue {
    fn from(value: bool) -> Self {
        LValue::Bool(value)
    }
}

impl From<&str> for LValue {
    fn from(value: &str) -> Self {
        LValue::String(Rc::from(value))
    }
}

impl From<String> for LValue {
    fn from(value: String) -> Self {
        LValue::String(Rc::from(value))
    }
}

impl From<Rc<str>> for LValue {
    fn from(value: Rc<str>) -> Self {
        LValue::String(value)
    }
}

impl From<Vec<LValue>> for LValue {
    fn from(value: Vec<LValue>) -> Self {
        LValue::Array(value)
    }
}

/// Integer view used by the bitwise operators: floor toward negative
/// infinity, then truncate.
fn floor_to_int(x: f64) -> i64 {
    x.floor() as i64
}

impl LValue {
    /// Short name of the variant, used in error messages and listings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LValue::Real(_) => "real",
            LValue::Int32(_) => "int32",
            LValue::Int64(_) => "int64",
            LValue::Bool(_) => "bool",
            LValue::String(_) => "string",
            LValue::Array(_) => "array",
            LValue::Undefined => "undefined",
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LValue::Real(x) => Some(*x),
            LValue::Int32(x) => Some(*x as f64),
            LValue::Int64(x) => Some(*x as f64),
            LValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Numeric view, or `0.0` for values without one. Used by native
    /// functions that accept loosely typed arguments.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// Returns the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an array value.
    pub fn as_array(&self) -> Option<&[LValue]> {
        match self {
            LValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, LValue::Undefined)
    }

    fn mismatch(&self, op: &'static str, rhs: &LValue) -> TypeMismatch {
        TypeMismatch {
            op,
            left: self.kind_name(),
            right: rhs.kind_name(),
        }
    }

    /// Applies a floating-point operator after coercing both operands.
    fn real_binary(
        &self,
        rhs: &LValue,
        op: &'static str,
        f: fn(f64, f64) -> f64,
    ) -> Result<LValue, TypeMismatch> {
        match (self.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(LValue::Real(f(a, b))),
            _ => Err(self.mismatch(op, rhs)),
        }
    }

    /// Applies an integer operator. The result keeps the widest integer kind
    /// of the operands; a real operand yields a real result.
    fn int_binary(
        &self,
        rhs: &LValue,
        op: &'static str,
        i32_op: fn(i32, i32) -> i32,
        i64_op: fn(i64, i64) -> i64,
    ) -> Result<LValue, TypeMismatch> {
        match (self, rhs) {
            (LValue::Int64(_), _) | (_, LValue::Int64(_)) => {
                let (a, b) = self.int_operands(rhs, op)?;
                Ok(LValue::Int64(i64_op(a, b)))
            }
            (LValue::Int32(_) | LValue::Bool(_), LValue::Int32(_) | LValue::Bool(_)) => {
                let (a, b) = self.int_operands(rhs, op)?;
                Ok(LValue::Int32(i32_op(a as i32, b as i32)))
            }
            _ => {
                let (a, b) = self.int_operands(rhs, op)?;
                Ok(LValue::Real(i64_op(a, b) as f64))
            }
        }
    }

    fn int_operands(&self, rhs: &LValue, op: &'static str) -> Result<(i64, i64), TypeMismatch> {
        match (self.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok((floor_to_int(a), floor_to_int(b))),
            _ => Err(self.mismatch(op, rhs)),
        }
    }

    /// `+`: numeric addition, or concatenation when both operands are strings.
    pub fn add(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        if let (LValue::String(a), LValue::String(b)) = (self, rhs) {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            return Ok(LValue::from(joined));
        }
        self.real_binary(rhs, "+", |a, b| a + b)
    }

    pub fn sub(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.real_binary(rhs, "-", |a, b| a - b)
    }

    pub fn mul(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.real_binary(rhs, "*", |a, b| a * b)
    }

    /// `/`: floating division. Division by zero yields infinity or NaN.
    pub fn div(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.real_binary(rhs, "/", |a, b| a / b)
    }

    /// `div`: quotient floored toward negative infinity.
    pub fn rem(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.real_binary(rhs, "div", |a, b| (a / b).floor())
    }

    /// `mod`: floating remainder with the sign of the dividend.
    pub fn modulo(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.real_binary(rhs, "mod", |a, b| a % b)
    }

    pub fn bit_and(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        if let (LValue::Bool(a), LValue::Bool(b)) = (self, rhs) {
            return Ok(LValue::Bool(*a && *b));
        }
        self.int_binary(rhs, "&", |a, b| a & b, |a, b| a & b)
    }

    pub fn bit_or(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        if let (LValue::Bool(a), LValue::Bool(b)) = (self, rhs) {
            return Ok(LValue::Bool(*a || *b));
        }
        self.int_binary(rhs, "|", |a, b| a | b, |a, b| a | b)
    }

    pub fn bit_xor(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        if let (LValue::Bool(a), LValue::Bool(b)) = (self, rhs) {
            return Ok(LValue::Bool(*a ^ *b));
        }
        self.int_binary(rhs, "^", |a, b| a ^ b, |a, b| a ^ b)
    }

    pub fn shl(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.int_binary(
            rhs,
            "<<",
            |a, b| a.wrapping_shl(b as u32 & 31),
            |a, b| a.wrapping_shl(b as u32 & 63),
        )
    }

    /// `>>`: arithmetic shift right.
    pub fn shr(&self, rhs: &LValue) -> Result<LValue, TypeMismatch> {
        self.int_binary(
            rhs,
            ">>",
            |a, b| a.wrapping_shr(b as u32 & 31),
            |a, b| a.wrapping_shr(b as u32 & 63),
        )
    }

    /// Arithmetic negation, keeping the integer kind of integer operands.
    pub fn neg(&self) -> Result<LValue, TypeMismatch> {
        match self {
            LValue::Real(x) => Ok(LValue::Real(-x)),
            LValue::Int32(x) => Ok(LValue::Int32(x.wrapping_neg())),
            LValue::Int64(x) => Ok(LValue::Int64(x.wrapping_neg())),
            LValue::Bool(b) => Ok(LValue::Real(if *b { -1.0 } else { 0.0 })),
            _ => Err(TypeMismatch {
                op: "neg",
                left: self.kind_name(),
                right: "",
            }),
        }
    }

    /// Logical NOT for booleans, bitwise NOT for numbers.
    pub fn not(&self) -> Result<LValue, TypeMismatch> {
        match self {
            LValue::Bool(b) => Ok(LValue::Bool(!b)),
            LValue::Int32(x) => Ok(LValue::Int32(!x)),
            LValue::Int64(x) => Ok(LValue::Int64(!x)),
            LValue::Real(x) => Ok(LValue::Real(!floor_to_int(*x) as f64)),
            _ => Err(TypeMismatch {
                op: "not",
                left: self.kind_name(),
                right: "",
            }),
        }
    }

    /// Language equality. Never fails.
    pub fn equals(&self, rhs: &LValue) -> bool {
        match (self, rhs) {
            (LValue::String(a), LValue::String(b)) => a == b,
            (LValue::Array(a), LValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (LValue::Undefined, LValue::Undefined) => true,
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Ordering between numbers (by value) or between strings (by text).
    /// Any other pairing is unordered.
    pub fn ordering(&self, rhs: &LValue) -> Option<Ordering> {
        match (self, rhs) {
            (LValue::String(a), LValue::String(b)) => Some(a.cmp(b)),
            _ => match (self.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Evaluates a relational operator. Unordered pairs compare false for
    /// every operator except `<>`.
    pub fn compare(&self, op: Comparison, rhs: &LValue) -> bool {
        match op {
            Comparison::Equal => self.equals(rhs),
            Comparison::NotEqual => !self.equals(rhs),
            Comparison::LessThan => self.ordering(rhs) == Some(Ordering::Less),
            Comparison::LessEqual => {
                matches!(self.ordering(rhs), Some(Ordering::Less | Ordering::Equal))
            }
            Comparison::GreaterEqual => {
                matches!(
                    self.ordering(rhs),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }
            Comparison::GreaterThan => self.ordering(rhs) == Some(Ordering::Greater),
        }
    }

    /// Implements the `conv` instruction.
    pub fn convert(&self, to: DataType) -> Result<LValue, TypeMismatch> {
        let numeric = || {
            self.as_number().ok_or(TypeMismatch {
                op: "conv",
                left: self.kind_name(),
                right: to.name(),
            })
        };

        match to {
            DataType::Variable => Ok(self.clone()),
            DataType::String => Ok(LValue::from(self.to_string())),
            DataType::Double | DataType::Float => Ok(LValue::Real(numeric()?)),
            DataType::Int32 | DataType::Int16 | DataType::Instance => {
                Ok(LValue::Int32(numeric()? as i32))
            }
            DataType::Int64 => Ok(LValue::Int64(numeric()? as i64)),
            DataType::UnsignedInt => Ok(LValue::Int64(numeric()? as u32 as i64)),
            DataType::Bool => Ok(LValue::Bool(numeric()? > 0.5)),
            DataType::Undefined | DataType::Delete => Ok(LValue::Undefined),
        }
    }
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LValue::Real(x) if x.is_nan() => write!(f, "NaN"),
            LValue::Real(x) if x.is_infinite() => {
                write!(f, "{}", if *x > 0.0 { "inf" } else { "-inf" })
            }
            // Adding zero folds -0.0 into 0.0; values that round to zero
            // print unsigned.
            LValue::Real(x) if x.fract() == 0.0 => write!(f, "{:.0}", x + 0.0),
            LValue::Real(x) if x.abs() < 0.005 => write!(f, "0.00"),
            LValue::Real(x) => write!(f, "{x:.2}"),
            LValue::Int32(x) => write!(f, "{x}"),
            LValue::Int64(x) => write!(f, "{x}"),
            LValue::Bool(b) => write!(f, "{b}"),
            LValue::String(s) => write!(f, "{s}"),
            LValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            LValue::Undefined => write!(f, "undefined"),
        }
    }
}
