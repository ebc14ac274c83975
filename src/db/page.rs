use super::{
    anomaly::Anomaly,
    field::{Decoded, FieldCursor},
    DecodeError,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

pub type PageNum = u32;

/// Stored value 0 of the cell content area start.
pub const MAX_CELL_CONTENT_START: u32 = 65536;

// SQLite never lets fragments inside a page add up to more than this.
const MAX_FRAGMENTED_FREE_BYTES: u8 = 60;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex,
    InteriorTable,
    LeafIndex,
    LeafTable,
}

impl PageType {
    pub fn new(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::InteriorIndex),
            0x05 => Some(Self::InteriorTable),
            0x0a => Some(Self::LeafIndex),
            0x0d => Some(Self::LeafTable),
            _ => None,
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            Self::InteriorIndex => 0x02,
            Self::InteriorTable => 0x05,
            Self::LeafIndex => 0x0a,
            Self::LeafTable => 0x0d,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::LeafIndex | Self::LeafTable)
    }

    pub fn header_size(&self) -> usize {
        if self.is_leaf() {
            8
        } else {
            12
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InteriorIndex => "interior index",
            Self::InteriorTable => "interior table",
            Self::LeafIndex => "leaf index",
            Self::LeafTable => "leaf table",
        };
        write!(f, "{name}")
    }
}

/// The b-tree page header plus its cell pointer array.
///
/// Cell pointers are offsets into the same page; they are reported as-is
/// and never followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub first_freeblock: u16,
    pub cell_count: u16,
    /// Logical value, so a stored 0 reads as 65536.
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    pub right_most_pointer: Option<PageNum>,
    pub cell_pointers: Vec<u16>,
}

impl PageHeader {
    /// Decodes the page header starting at `offset` in `buf`.
    ///
    /// Field offsets are reported relative to the start of `buf`, not to
    /// `offset`, so a header embedded after the file header starts at 100.
    pub fn decode(buf: &[u8], offset: usize) -> Result<Decoded<Self>, DecodeError> {
        let mut cursor = FieldCursor::new(buf, offset);
        let mut anomalies = vec![];

        let byte = cursor.u8("page_type")?;
        let page_type = PageType::new(byte).ok_or(DecodeError::InvalidPageType { offset, byte })?;
        let first_freeblock = cursor.u16("first_freeblock")?;
        let cell_count = cursor.u16("cell_count")?;
        let cell_content_start = match cursor.u16("cell_content_start")? {
            0 => MAX_CELL_CONTENT_START,
            n => n as u32,
        };

        let fragmented_at = cursor.position();
        let fragmented_free_bytes = cursor.u8("fragmented_free_bytes")?;
        if fragmented_free_bytes > MAX_FRAGMENTED_FREE_BYTES {
            anomalies.push(Anomaly::violation(
                "fragmented_free_bytes",
                fragmented_at,
                fragmented_free_bytes,
                "at most 60",
            ));
        }

        let right_most_pointer = if page_type.is_leaf() {
            None
        } else {
            Some(cursor.u32("right_most_pointer")?)
        };

        let cell_pointers = (0..cell_count)
            .map(|_| cursor.u16("cell_pointer"))
            .collect::<Result<Vec<u16>, DecodeError>>()?;

        Ok(Decoded {
            value: Self {
                page_type,
                first_freeblock,
                cell_count,
                cell_content_start,
                fragmented_free_bytes,
                right_most_pointer,
                cell_pointers,
            },
            fields: cursor.into_fields(),
            anomalies,
        })
    }

    /// Size of the header including its cell pointer array.
    pub fn size(&self) -> usize {
        self.page_type.header_size() + 2 * self.cell_pointers.len()
    }

    /// Offset right after the cell pointer array for a header read at `offset`.
    pub fn end_offset(&self, offset: usize) -> usize {
        offset + self.size()
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        self.put(&mut buf);
        buf.freeze()
    }

    pub(crate) fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.page_type.byte());
        buf.put_u16(self.first_freeblock);
        buf.put_u16(self.cell_count);
        buf.put_u16(if self.cell_content_start == MAX_CELL_CONTENT_START {
            0
        } else {
            self.cell_content_start as u16
        });
        buf.put_u8(self.fragmented_free_bytes);
        if let Some(p) = self.right_most_pointer {
            buf.put_u32(p);
        }
        for p in &self.cell_pointers {
            buf.put_u16(*p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(page_type: u8, cells: &[u16]) -> Vec<u8> {
        let mut buf = vec![page_type, 0x00, 0x00];
        buf.extend_from_slice(&(cells.len() as u16).to_be_bytes());
        buf.extend_from_slice(&[0x0f, 0xa0, 0x00]);
        if page_type == 0x02 || page_type == 0x05 {
            buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x07]);
        }
        for c in cells {
            buf.extend_from_slice(&c.to_be_bytes());
        }
        buf
    }

    #[test]
    fn it_reads_right_most_pointer_only_on_interior_pages() {
        for (byte, interior) in [(0x02, true), (0x05, true), (0x0a, false), (0x0d, false)] {
            let buf = header_bytes(byte, &[0x0ff0]);
            let header = PageHeader::decode(&buf, 0).unwrap().value;

            assert_eq!(header.page_type.byte(), byte);
            assert_eq!(header.right_most_pointer.is_some(), interior);
            assert_eq!(header.cell_pointers, vec![0x0ff0]);
            if interior {
                assert_eq!(header.right_most_pointer, Some(7));
            }
        }
    }

    #[test]
    fn it_names_page_types() {
        let names: Vec<String> = [0x02, 0x05, 0x0a, 0x0d]
            .into_iter()
            .filter_map(PageType::new)
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["interior index", "interior table", "leaf index", "leaf table"]
        );
    }

    #[test]
    fn it_rejects_unknown_page_types() {
        for byte in [0x00, 0x01, 0x03, 0x0c, 0xff] {
            let mut buf = header_bytes(0x0d, &[]);
            buf[0] = byte;
            assert_eq!(
                PageHeader::decode(&buf, 0),
                Err(DecodeError::InvalidPageType { offset: 0, byte })
            );
        }
    }

    #[test]
    fn it_ends_at_the_fixed_region_without_cells() {
        for (byte, size) in [(0x0d, 8), (0x05, 12)] {
            let buf = header_bytes(byte, &[]);
            let decoded = PageHeader::decode(&buf, 0).unwrap();

            assert!(decoded.value.cell_pointers.is_empty());
            assert_eq!(decoded.value.end_offset(0), size);
            let last = decoded.fields.last().unwrap();
            assert_eq!(last.offset + last.size, size);
        }
    }

    #[test]
    fn it_keeps_fields_contiguous() {
        let buf = header_bytes(0x02, &[0x0ff8, 0x0fe0, 0x0fc0]);
        let decoded = PageHeader::decode(&buf, 0).unwrap();

        assert_eq!(decoded.value.cell_pointers.len(), decoded.value.cell_count as usize);
        assert_eq!(decoded.fields.len(), 6 + 3);
        for pair in decoded.fields.windows(2) {
            assert_eq!(pair[1].offset, pair[0].offset + pair[0].size);
        }
        let names: Vec<&str> = decoded.fields.iter().skip(6).map(|f| f.name).collect();
        assert_eq!(names, vec!["cell_pointer"; 3]);
    }

    #[test]
    fn it_maps_zero_content_start_to_65536() {
        let mut buf = header_bytes(0x0d, &[]);
        buf[5] = 0x00;
        buf[6] = 0x00;
        assert_eq!(PageHeader::decode(&buf, 0).unwrap().value.cell_content_start, 65536);

        buf[6] = 0x01;
        assert_eq!(PageHeader::decode(&buf, 0).unwrap().value.cell_content_start, 1);
    }

    #[test]
    fn it_reports_offsets_from_the_buffer_start() {
        let mut buf = vec![0u8; 100];
        buf.extend(header_bytes(0x0d, &[0x0ff8]));
        let decoded = PageHeader::decode(&buf, 100).unwrap();

        assert_eq!(decoded.fields[0].offset, 100);
        assert_eq!(decoded.fields.last().unwrap().offset, 108);
    }

    #[test]
    fn it_rejects_a_cell_array_running_past_the_buffer() {
        let mut buf = header_bytes(0x0d, &[0x0ff8]);
        buf[4] = 3;
        assert_eq!(
            PageHeader::decode(&buf, 0),
            Err(DecodeError::TruncatedBuffer {
                offset: 10,
                needed: 2,
                available: 0,
            })
        );
    }

    #[test]
    fn it_flags_too_many_fragmented_bytes() {
        let mut buf = header_bytes(0x0a, &[]);
        buf[7] = 61;
        let decoded = PageHeader::decode(&buf, 0).unwrap();

        assert_eq!(
            decoded.anomalies,
            vec![Anomaly::violation("fragmented_free_bytes", 7, 61u8, "at most 60")]
        );
    }

    #[test]
    fn it_reencodes_to_the_same_header() {
        let mut buf = header_bytes(0x05, &[0x0ff8, 0x0fe0]);
        buf[5] = 0x00;
        buf[6] = 0x00;
        let header = PageHeader::decode(&buf, 0).unwrap().value;

        let bytes = header.to_bytes();
        assert_eq!(&bytes[..], &buf[..]);
        assert_eq!(PageHeader::decode(&bytes, 0).unwrap().value, header);
    }
}
