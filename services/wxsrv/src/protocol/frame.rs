//! Binary frame codec
//!
//! Every response starts with `FF FF <command> <subcommand>`. The payload has
//! no self-describing structure: fields sit at fixed offsets given by a
//! [`Layout`], big-endian, with filler bytes between them. Callers must pick
//! the layout from the decoded header first.

use crate::error::ProtocolError;
use crate::protocol::catalog::PROBE;
use wx_model::{RawFieldMap, RawValue};

/// Frame magic
pub const MAGIC: [u8; 2] = [0xFF, 0xFF];

/// Size of the fixed header
pub const HEADER_LEN: usize = 4;

/// Response identifier found in every header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHeader {
    pub command: u8,
    pub subcommand: u8,
}

impl FrameHeader {
    pub const fn new(command: u8, subcommand: u8) -> Self {
        Self {
            command,
            subcommand,
        }
    }
}

/// How the bytes of a field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unsigned,
    Signed,
    /// Fixed-length UTF-8, NUL or space padded
    Text,
}

/// One field at a fixed position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub encoding: Encoding,
    /// 1, 2 or 4 for integers, string length for text
    pub width: usize,
    /// Filler bytes after the field
    pub skip_after: usize,
}

impl FieldLayout {
    pub const fn unsigned(name: &'static str, width: usize) -> Self {
        Self {
            name,
            encoding: Encoding::Unsigned,
            width,
            skip_after: 0,
        }
    }

    pub const fn signed(name: &'static str, width: usize) -> Self {
        Self {
            name,
            encoding: Encoding::Signed,
            width,
            skip_after: 0,
        }
    }

    pub const fn text(name: &'static str, len: usize) -> Self {
        Self {
            name,
            encoding: Encoding::Text,
            width: len,
            skip_after: 0,
        }
    }

    pub const fn skip(mut self, bytes: usize) -> Self {
        self.skip_after = bytes;
        self
    }
}

/// Payload layout of one response type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Bytes from the start of the frame to the first field
    pub header_skip: usize,
    pub fields: &'static [FieldLayout],
}

impl Layout {
    /// Number of bytes a complete frame occupies, up to the end of the last
    /// field and its filler.
    pub fn frame_len(&self) -> usize {
        self.header_skip
            + self
                .fields
                .iter()
                .map(|f| f.width + f.skip_after)
                .sum::<usize>()
    }
}

/// Read the (command, subcommand) pair from the fixed 4-byte prefix.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::FrameTooShort { len: bytes.len() });
    }
    let fields = decode(bytes, &PROBE.layout)?;
    let byte = |name: &str| match fields.get(name) {
        Some(RawValue::Integer(v)) => *v as u8,
        _ => 0,
    };
    Ok(FrameHeader::new(byte("command"), byte("subcommand")))
}

/// Walk `layout` over `bytes` and collect the named values.
pub fn decode(bytes: &[u8], layout: &Layout) -> Result<RawFieldMap, ProtocolError> {
    let mut fields = RawFieldMap::new();
    let mut cursor = layout.header_skip;

    for field in layout.fields {
        let end = cursor + field.width;
        let Some(raw) = bytes.get(cursor..end) else {
            return Err(ProtocolError::FrameTruncated {
                field: field.name.to_string(),
                offset: cursor,
                needed: field.width,
                available: bytes.len().saturating_sub(cursor),
            });
        };

        let value = match field.encoding {
            Encoding::Unsigned => RawValue::Integer(read_unsigned(raw) as i64),
            Encoding::Signed => RawValue::Integer(read_signed(raw)),
            Encoding::Text => RawValue::Text(read_text(raw)),
        };
        fields.insert(field.name.to_string(), value);

        cursor = end + field.skip_after;
    }

    Ok(fields)
}

/// Build a frame with `header` and the given values laid out per `layout`.
///
/// Filler bytes and fields missing from `values` are written as zero. Used to
/// simulate a station in tests and tools.
pub fn encode(
    header: FrameHeader,
    layout: &Layout,
    values: &RawFieldMap,
) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = vec![0u8; layout.frame_len().max(HEADER_LEN)];
    frame[..2].copy_from_slice(&MAGIC);
    frame[2] = header.command;
    frame[3] = header.subcommand;

    let mut cursor = layout.header_skip;
    for field in layout.fields {
        let slot = &mut frame[cursor..cursor + field.width];
        match (values.get(field.name), field.encoding) {
            (None, _) => {},
            (Some(RawValue::Text(text)), Encoding::Text) => {
                let bytes = text.as_bytes();
                if bytes.len() > field.width {
                    return Err(out_of_range(field, text));
                }
                slot[..bytes.len()].copy_from_slice(bytes);
            },
            (Some(RawValue::Integer(v)), Encoding::Unsigned) => {
                let max = if field.width >= 8 {
                    u64::MAX
                } else {
                    (1u64 << (field.width * 8)) - 1
                };
                if *v < 0 || *v as u64 > max {
                    return Err(out_of_range(field, v));
                }
                write_be(slot, *v as u64);
            },
            (Some(RawValue::Integer(v)), Encoding::Signed) => {
                let bits = field.width * 8;
                let min = -(1i64 << (bits - 1));
                let max = (1i64 << (bits - 1)) - 1;
                if *v < min || *v > max {
                    return Err(out_of_range(field, v));
                }
                write_be(slot, *v as u64);
            },
            (Some(other), _) => return Err(out_of_range(field, format!("{:?}", other))),
        }
        cursor += field.width + field.skip_after;
    }

    Ok(frame)
}

fn out_of_range(field: &FieldLayout, value: impl ToString) -> ProtocolError {
    ProtocolError::ValueOutOfRange {
        field: field.name.to_string(),
        value: value.to_string(),
    }
}

fn read_unsigned(raw: &[u8]) -> u64 {
    raw.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn read_signed(raw: &[u8]) -> i64 {
    let bits = raw.len() * 8;
    let value = read_unsigned(raw);
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    // sign-extend from the field width
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

fn read_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

fn write_be(slot: &mut [u8], value: u64) {
    let width = slot.len();
    for (i, byte) in slot.iter_mut().enumerate() {
        *byte = (value >> (8 * (width - 1 - i))) as u8;
    }
}
