//! # Binary Table Codec
//!
//! Shared building blocks for decoding and encoding fixed-offset table
//! layouts. Decoders are `nom` parsers over the raw table bytes; encoders
//! append to a `BytesMut`. Length is checked up front so a short table is
//! reported as [`PsemError::TruncatedTable`] instead of a parser error.
//!
//! Layouts whose field widths vary between meter families (the configuration
//! header) are described as data with [`FieldSpec`] lists and handled by
//! [`decode_fields`] / [`encode_fields`].

use crate::error::PsemError;
use bytes::{BufMut, BytesMut};
use std::borrow::Cow;
use std::fmt;
use nom::{
    bytes::complete::take,
    number::complete::{le_u16, le_u32, le_u8},
    IResult,
};

/// Width of a numeric field in a data-driven layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
}

impl FieldWidth {
    pub const fn len(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
        }
    }

    pub const fn max(self) -> u32 {
        match self {
            FieldWidth::U8 => u8::MAX as u32,
            FieldWidth::U16 => u16::MAX as u32,
            FieldWidth::U32 => u32::MAX,
        }
    }
}

/// One named field of a data-driven layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub width: FieldWidth,
}

impl FieldSpec {
    pub const fn new(name: &'static str, width: FieldWidth) -> Self {
        Self { name, width }
    }
}

/// Total encoded length of a field list.
pub fn record_len(specs: &[FieldSpec]) -> usize {
    specs.iter().map(|f| f.width.len()).sum()
}

/// Decodes a field list into its numeric values, in layout order.
pub fn decode_fields(table: u16, bytes: &[u8], specs: &[FieldSpec]) -> Result<Vec<u32>, PsemError> {
    run_parser(table, record_len(specs), bytes, |mut input| {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let (rest, value) = field(spec.width)(input)?;
            values.push(value);
            input = rest;
        }
        Ok((input, values))
    })
}

/// Encodes values against a field list; a value too wide for its field is an error.
pub fn encode_fields(values: &[u32], specs: &[FieldSpec]) -> Result<Vec<u8>, PsemError> {
    let mut buf = BytesMut::with_capacity(record_len(specs));
    for (spec, &value) in specs.iter().zip(values) {
        if value > spec.width.max() {
            return Err(PsemError::InvalidField {
                field: spec.name,
                value: u64::from(value),
            });
        }
        match spec.width {
            FieldWidth::U8 => buf.put_u8(value as u8),
            FieldWidth::U16 => buf.put_u16_le(value as u16),
            FieldWidth::U32 => buf.put_u32_le(value),
        }
    }
    Ok(buf.to_vec())
}

/// Parser for a single numeric field.
pub fn field(width: FieldWidth) -> impl Fn(&[u8]) -> IResult<&[u8], u32> {
    move |input| match width {
        FieldWidth::U8 => le_u8(input).map(|(i, v)| (i, u32::from(v))),
        FieldWidth::U16 => le_u16(input).map(|(i, v)| (i, u32::from(v))),
        FieldWidth::U32 => le_u32(input),
    }
}

/// Fixed-width text field of `N` bytes, kept exactly as the device stores it.
///
/// The text ends at the first NUL; trailing spaces are padding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsciiField<const N: usize>(pub [u8; N]);

impl<const N: usize> AsciiField<N> {
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    pub fn text(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        let len = self.0[..end].iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.0[..len])
    }
}

impl<const N: usize> Default for AsciiField<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

/// NUL-padded, truncated to `N` bytes on a character boundary.
impl<const N: usize> From<&str> for AsciiField<N> {
    fn from(text: &str) -> Self {
        let mut end = text.len().min(N);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut field = [0; N];
        field[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self(field)
    }
}

impl<const N: usize> PartialEq<&str> for AsciiField<N> {
    fn eq(&self, other: &&str) -> bool {
        self.text() == *other
    }
}

impl<const N: usize> fmt::Display for AsciiField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl<const N: usize> fmt::Debug for AsciiField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.text())
    }
}

/// Parser for an `N`-byte text field.
pub fn ascii<const N: usize>(input: &[u8]) -> IResult<&[u8], AsciiField<N>> {
    let (rest, raw) = take::<_, _, nom::error::Error<&[u8]>>(N)(input)?;
    let mut field = [0; N];
    field.copy_from_slice(raw);
    Ok((rest, AsciiField(field)))
}

pub fn put_ascii<const N: usize>(buf: &mut BytesMut, field: &AsciiField<N>) {
    buf.put_slice(field.as_bytes());
}

/// Checks `bytes` holds at least `expected` bytes, then runs `parser` over
/// exactly that prefix.
pub fn run_parser<'a, O, F>(
    table: u16,
    expected: usize,
    bytes: &'a [u8],
    mut parser: F,
) -> Result<O, PsemError>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
{
    if bytes.len() < expected {
        return Err(PsemError::TruncatedTable {
            table,
            expected,
            actual: bytes.len(),
        });
    }
    parser(&bytes[..expected])
        .map(|(_, value)| value)
        .map_err(|_| PsemError::TruncatedTable {
            table,
            expected,
            actual: bytes.len(),
        })
}

/// Total and decimal digit counts packed into one byte.
///
/// Total digits live in the high nibble, decimal digits in the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitFormat {
    pub total_digits: u8,
    pub decimal_digits: u8,
}

impl DigitFormat {
    pub const TOTAL_DIGITS_MASK: u8 = 0xF0;
    pub const TOTAL_DIGITS_SHIFT: u8 = 4;
    pub const DECIMAL_DIGITS_MASK: u8 = 0x0F;

    pub fn from_byte(byte: u8) -> Self {
        Self {
            total_digits: (byte & Self::TOTAL_DIGITS_MASK) >> Self::TOTAL_DIGITS_SHIFT,
            decimal_digits: byte & Self::DECIMAL_DIGITS_MASK,
        }
    }

    pub fn to_byte(self) -> u8 {
        ((self.total_digits << Self::TOTAL_DIGITS_SHIFT) & Self::TOTAL_DIGITS_MASK)
            | (self.decimal_digits & Self::DECIMAL_DIGITS_MASK)
    }
}
