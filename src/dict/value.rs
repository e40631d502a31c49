//! Value Module
//!
//! The tagged union stored in the dictionary and its byte encoding inside
//! a slot.

// == Value Kind ==
/// Type tag written into every entry and list element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 1,
    Number = 2,
    Str = 3,
    List = 4,
}

impl ValueKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Decodes a tag read back from the region
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Bool),
            2 => Some(Self::Number),
            3 => Some(Self::Str),
            4 => Some(Self::List),
            _ => None,
        }
    }
}

/// Encoded size of a list value: head, tail and length
pub const LIST_HEADER_LEN: usize = 12;

// == Scalar ==
/// A list element: a number or a byte string.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Str(Vec<u8>),
}

impl Scalar {
    pub fn kind(&self) -> ValueKind {
        match self {
            Scalar::Number(_) => ValueKind::Number,
            Scalar::Str(_) => ValueKind::Str,
        }
    }

    /// Number of payload bytes this scalar encodes to
    pub fn encoded_len(&self) -> usize {
        match self {
            Scalar::Number(_) => 8,
            Scalar::Str(s) => s.len(),
        }
    }

    /// Writes the payload; `buf` must be exactly `encoded_len()` bytes
    pub fn encode(&self, buf: &mut [u8]) {
        match self {
            Scalar::Number(n) => buf.copy_from_slice(&n.to_le_bytes()),
            Scalar::Str(s) => buf.copy_from_slice(s),
        }
    }

    /// Reads a payload back; None for kinds that are not scalars
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Option<Self> {
        match kind {
            ValueKind::Number => decode_f64(bytes).map(Scalar::Number),
            ValueKind::Str => Some(Scalar::Str(bytes.to_vec())),
            ValueKind::Bool | ValueKind::List => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.as_bytes().to_vec())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s.into_bytes())
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Number(n) => Value::Number(n),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

// == Value ==
/// Everything a dictionary entry can hold.
///
/// `Nil` is never stored: writing it removes the key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Vec<u8>),
    List(Vec<Scalar>),
}

impl Value {
    /// Type tag, or None for `Nil`
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Nil => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Number(_) => Some(ValueKind::Number),
            Value::Str(_) => Some(ValueKind::Str),
            Value::List(_) => Some(ValueKind::List),
        }
    }

    /// Bytes the value occupies inside its entry slot.
    ///
    /// List elements live in their own slots, so a list only needs its header.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 8,
            Value::Str(s) => s.len(),
            Value::List(_) => LIST_HEADER_LEN,
        }
    }

    /// Writes a non-list payload; `buf` must be exactly `encoded_len()` bytes
    pub fn encode_scalar(&self, buf: &mut [u8]) {
        match self {
            Value::Bool(b) => buf[0] = u8::from(*b),
            Value::Number(n) => buf.copy_from_slice(&n.to_le_bytes()),
            Value::Str(s) => buf.copy_from_slice(s),
            Value::Nil | Value::List(_) => {}
        }
    }

    /// Reads a non-list payload back
    pub fn decode_scalar(kind: ValueKind, bytes: &[u8]) -> Option<Self> {
        match kind {
            ValueKind::Bool => bytes.first().map(|b| Value::Bool(*b != 0)),
            ValueKind::Number => decode_f64(bytes).map(Value::Number),
            ValueKind::Str => Some(Value::Str(bytes.to_vec())),
            ValueKind::List => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Str(bytes)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Value::List(items)
    }
}

/// True when all elements are numbers or all are strings
pub fn is_homogeneous(items: &[Scalar]) -> bool {
    match items.first() {
        Some(first) => items.iter().all(|s| s.kind() == first.kind()),
        None => true,
    }
}

fn decode_f64(bytes: &[u8]) -> Option<f64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Some(f64::from_le_bytes(raw))
}
