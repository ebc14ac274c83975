use super::{anomaly::Anomaly, utils, DecodeError};
use bytes::Bytes;
use std::fmt;

type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Text(String),
    Bytes(Bytes),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(n) => write!(f, "{n}"),
            Self::U16(n) => write!(f, "{n}"),
            Self::U32(n) => write!(f, "{n}"),
            Self::Text(t) => write!(f, "{:?}", t),
            Self::Bytes(bytes) => {
                for b in bytes.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// One decoded unit of a buffer, addressed relative to the buffer start.
///
/// Names are not unique: every element of a repeating array shares its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
    pub raw: Bytes,
    pub value: FieldValue,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {}={}", self.offset, self.name, self.value)
    }
}

/// A decoded record together with its field sequence and advisory findings.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub fields: Vec<Field>,
    pub anomalies: Vec<Anomaly>,
}

/// Reads fields front-to-back out of a borrowed buffer, stamping each one
/// with the cursor position it was read at. The cursor only moves forward.
#[derive(Debug)]
pub(crate) struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    fields: Vec<Field>,
}

impl<'a> FieldCursor<'a> {
    pub(crate) fn new(buf: &'a [u8], start: usize) -> Self {
        Self {
            buf,
            pos: start,
            fields: vec![],
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn u8(&mut self, name: &'static str) -> DecodeResult<u8> {
        let [value] = utils::read_1_bytes(self.buf, self.pos)?;
        self.push(name, 1, FieldValue::U8(value));
        Ok(value)
    }

    pub(crate) fn u16(&mut self, name: &'static str) -> DecodeResult<u16> {
        let value = u16::from_be_bytes(utils::read_2_bytes(self.buf, self.pos)?);
        self.push(name, 2, FieldValue::U16(value));
        Ok(value)
    }

    pub(crate) fn u32(&mut self, name: &'static str) -> DecodeResult<u32> {
        let value = u32::from_be_bytes(utils::read_4_bytes(self.buf, self.pos)?);
        self.push(name, 4, FieldValue::U32(value));
        Ok(value)
    }

    /// Fixed-length text. Invalid UTF-8 is kept lossily so a corrupt header
    /// still shows up in the field list.
    pub(crate) fn text(&mut self, name: &'static str, len: usize) -> DecodeResult<&'a [u8]> {
        let bytes = utils::read_n_bytes(self.buf, self.pos, len)?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.push(name, len, FieldValue::Text(text));
        Ok(bytes)
    }

    pub(crate) fn bytes(&mut self, name: &'static str, len: usize) -> DecodeResult<&'a [u8]> {
        let bytes = utils::read_n_bytes(self.buf, self.pos, len)?;
        self.push(name, len, FieldValue::Bytes(Bytes::copy_from_slice(bytes)));
        Ok(bytes)
    }

    pub(crate) fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    // Callers have already bounds-checked `size` bytes at `pos`.
    fn push(&mut self, name: &'static str, size: usize, value: FieldValue) {
        let raw = Bytes::copy_from_slice(&self.buf[self.pos..self.pos + size]);
        self.fields.push(Field {
            name,
            offset: self.pos,
            size,
            raw,
            value,
        });
        self.pos += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_stamps_fields_with_running_offsets() {
        let buf: &[u8] = b"\xff\x00\x10\x00\x00\x00\x2aabc";
        let mut cursor = FieldCursor::new(buf, 0);

        assert_eq!(cursor.u8("a").unwrap(), 0xff);
        assert_eq!(cursor.u16("b").unwrap(), 0x0010);
        assert_eq!(cursor.u32("c").unwrap(), 0x2a);
        assert_eq!(cursor.text("d", 3).unwrap(), b"abc");
        assert_eq!(cursor.position(), 10);

        let fields = cursor.into_fields();
        let offsets: Vec<(usize, usize)> = fields.iter().map(|f| (f.offset, f.size)).collect();
        assert_eq!(offsets, vec![(0, 1), (1, 2), (3, 4), (7, 3)]);
        assert_eq!(fields[3].value, FieldValue::Text("abc".into()));
        assert_eq!(&fields[2].raw[..], b"\x00\x00\x00\x2a");
    }

    #[test]
    fn it_starts_from_the_given_offset() {
        let buf = [0u8; 8];
        let mut cursor = FieldCursor::new(&buf, 5);
        cursor.u16("x").unwrap();

        assert_eq!(cursor.into_fields()[0].offset, 5);
    }

    #[test]
    fn it_does_not_advance_on_a_failed_read() {
        let buf = [0u8; 3];
        let mut cursor = FieldCursor::new(&buf, 0);
        cursor.u16("x").unwrap();

        assert!(matches!(
            cursor.u16("y"),
            Err(DecodeError::TruncatedBuffer { offset: 2, .. })
        ));
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.into_fields().len(), 1);
    }

    #[test]
    fn it_displays_fields_as_report_lines() {
        let buf: &[u8] = b"\x00\x01\xde\xad";
        let mut cursor = FieldCursor::new(buf, 0);
        cursor.u16("n").unwrap();
        cursor.bytes("blob", 2).unwrap();
        let fields = cursor.into_fields();

        assert_eq!(fields[0].to_string(), "0) n=1");
        assert_eq!(fields[1].to_string(), "2) blob=dead");
    }
}
