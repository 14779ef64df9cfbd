//! Operand data types carried in the argument byte of an instruction word.
//!
//! Typed instructions store one data type per nibble: `push` uses the low
//! nibble, `pop` and `conv` use both (low = first, high = second).

/// Identifies the representation of an operand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// IEEE 754 64-bit float, 8 trailing bytes.
    Double = 0x0,
    /// IEEE 754 32-bit float, 4 trailing bytes.
    Float = 0x1,
    /// Signed 32-bit integer, 4 trailing bytes.
    Int32 = 0x2,
    /// Signed 64-bit integer, 8 trailing bytes.
    Int64 = 0x3,
    /// Boolean stored as a 32-bit integer.
    Bool = 0x4,
    /// Variable reference, 4 trailing bytes patched by the site chain.
    Variable = 0x5,
    /// Index into the string table, 4 trailing bytes.
    String = 0x6,
    /// Instance id.
    Instance = 0x7,
    /// Delete marker.
    Delete = 0x8,
    /// Undefined marker.
    Undefined = 0x9,
    /// Unsigned 32-bit integer.
    UnsignedInt = 0xA,
    /// Signed 16-bit integer held in the immediate field.
    Int16 = 0xF,
}

/// All valid data types, in definition order.
pub const ALL_DATA_TYPES: [DataType; 12] = [
    DataType::Double,
    DataType::Float,
    DataType::Int32,
    DataType::Int64,
    DataType::Bool,
    DataType::Variable,
    DataType::String,
    DataType::Instance,
    DataType::Delete,
    DataType::Undefined,
    DataType::UnsignedInt,
    DataType::Int16,
];

/// Returns the nibble back when it names no data type.
impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(DataType::Double),
            0x1 => Ok(DataType::Float),
            0x2 => Ok(DataType::Int32),
            0x3 => Ok(DataType::Int64),
            0x4 => Ok(DataType::Bool),
            0x5 => Ok(DataType::Variable),
            0x6 => Ok(DataType::String),
            0x7 => Ok(DataType::Instance),
            0x8 => Ok(DataType::Delete),
            0x9 => Ok(DataType::Undefined),
            0xA => Ok(DataType::UnsignedInt),
            0xF => Ok(DataType::Int16),
            other => Err(other),
        }
    }
}

impl DataType {
    /// Returns the canonical one-letter suffix used in listings (`push.v`).
    pub fn suffix(self) -> &'static str {
        match self {
            DataType::Double => "d",
            DataType::Float => "f",
            DataType::Int32 => "i",
            DataType::Int64 => "l",
            DataType::Bool => "b",
            DataType::Variable => "v",
            DataType::String => "s",
            DataType::Instance => "inst",
            DataType::Delete => "del",
            DataType::Undefined => "u",
            DataType::UnsignedInt => "ui",
            DataType::Int16 => "e",
        }
    }

    /// Returns a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Bool => "bool",
            DataType::Variable => "variable",
            DataType::String => "string",
            DataType::Instance => "instance",
            DataType::Delete => "delete",
            DataType::Undefined => "undefined",
            DataType::UnsignedInt => "uint32",
            DataType::Int16 => "int16",
        }
    }
}
