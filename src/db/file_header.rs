use super::{
    anomaly::Anomaly,
    field::{Decoded, FieldCursor},
    page::{PageHeader, PageNum},
    DecodeError,
};
use bytes::{BufMut, Bytes, BytesMut};

pub const FILE_HEADER_SIZE: usize = 100;
pub const MAGIC: &[u8; 16] = b"SQLite format 3\0";

const RESERVED_SIZE: usize = 24;

/// The 100-byte file header, followed by the b-tree header of page 1 which
/// shares the same chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    pub magic: [u8; 16],
    /// Stored value; see [`DatabaseHeader::page_size_bytes`].
    pub page_size: u16,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved_space: u8,
    pub max_payload_fraction: u8,
    pub min_payload_fraction: u8,
    pub leaf_payload_fraction: u8,
    pub file_change_counter: u32,
    pub size_in_pages: u32,
    pub first_freelist_page: PageNum,
    pub freelist_page_count: u32,
    pub schema_cookie: u32,
    pub schema_format: u32,
    pub default_page_cache_size: u32,
    pub largest_root_page: PageNum,
    pub text_encoding: u32,
    pub user_version: u32,
    pub incremental_vacuum: u32,
    pub reserved: [u8; RESERVED_SIZE],
    pub version_valid_for: u32,
    pub sqlite_version: u32,
    /// Outcome of decoding page 1's header. A failure here does not fail
    /// the file header itself.
    pub page: Result<PageHeader, DecodeError>,
}

impl DatabaseHeader {
    pub fn decode(buf: &[u8]) -> Result<Decoded<Self>, DecodeError> {
        if buf.len() < FILE_HEADER_SIZE {
            return Err(DecodeError::TruncatedBuffer {
                offset: 0,
                needed: FILE_HEADER_SIZE,
                available: buf.len(),
            });
        }

        let mut cursor = FieldCursor::new(buf, 0);
        let mut anomalies = vec![];

        let mut magic = [0u8; 16];
        magic.copy_from_slice(cursor.text("magic", 16)?);
        if &magic != MAGIC {
            anomalies.push(Anomaly::MagicMismatch { found: magic });
        }

        let at = cursor.position();
        let page_size = cursor.u16("page_size")?;
        if page_size_bytes(page_size).is_none() {
            anomalies.push(Anomaly::violation(
                "page_size",
                at,
                page_size,
                "a power of two in 512..=32768, or 1",
            ));
        }

        let versions_at = cursor.position();
        let write_version = cursor.u8("write_version")?;
        let read_version = cursor.u8("read_version")?;
        for (i, (field, value)) in [("write_version", write_version), ("read_version", read_version)]
            .into_iter()
            .enumerate()
        {
            if !matches!(value, 1 | 2) {
                anomalies.push(Anomaly::violation(field, versions_at + i, value, "1 or 2"));
            }
        }

        let reserved_space = cursor.u8("reserved_space")?;
        let fractions_at = cursor.position();
        let max_payload_fraction = cursor.u8("max_payload_fraction")?;
        let min_payload_fraction = cursor.u8("min_payload_fraction")?;
        let leaf_payload_fraction = cursor.u8("leaf_payload_fraction")?;
        for (i, (field, value, expected, name)) in [
            ("max_payload_fraction", max_payload_fraction, 64, "64"),
            ("min_payload_fraction", min_payload_fraction, 32, "32"),
            ("leaf_payload_fraction", leaf_payload_fraction, 32, "32"),
        ]
        .into_iter()
        .enumerate()
        {
            if value != expected {
                anomalies.push(Anomaly::violation(field, fractions_at + i, value, name));
            }
        }

        let file_change_counter = cursor.u32("file_change_counter")?;
        let size_in_pages = cursor.u32("size_in_pages")?;
        let first_freelist_page = cursor.u32("first_freelist_page")?;
        let freelist_page_count = cursor.u32("freelist_page_count")?;
        let schema_cookie = cursor.u32("schema_cookie")?;

        let at = cursor.position();
        let schema_format = cursor.u32("schema_format")?;
        if !(1..=4).contains(&schema_format) {
            anomalies.push(Anomaly::violation(
                "schema_format",
                at,
                schema_format,
                "1, 2, 3 or 4",
            ));
        }

        let default_page_cache_size = cursor.u32("default_page_cache_size")?;
        let largest_root_page = cursor.u32("largest_root_page")?;

        let at = cursor.position();
        let text_encoding = cursor.u32("text_encoding")?;
        if !(1..=3).contains(&text_encoding) {
            anomalies.push(Anomaly::violation(
                "text_encoding",
                at,
                text_encoding,
                "1, 2 or 3",
            ));
        }

        let user_version = cursor.u32("user_version")?;
        let incremental_vacuum = cursor.u32("incremental_vacuum")?;

        let at = cursor.position();
        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(cursor.bytes("reserved", RESERVED_SIZE)?);
        if let Some(i) = reserved.iter().position(|b| *b != 0) {
            anomalies.push(Anomaly::violation(
                "reserved",
                at + i,
                reserved[i],
                "all zero bytes",
            ));
        }

        let version_valid_for = cursor.u32("version_valid_for")?;
        let sqlite_version = cursor.u32("sqlite_version")?;

        let mut fields = cursor.into_fields();
        let page = PageHeader::decode(buf, FILE_HEADER_SIZE).map(|decoded| {
            fields.extend(decoded.fields);
            anomalies.extend(decoded.anomalies);
            decoded.value
        });

        Ok(Decoded {
            value: Self {
                magic,
                page_size,
                write_version,
                read_version,
                reserved_space,
                max_payload_fraction,
                min_payload_fraction,
                leaf_payload_fraction,
                file_change_counter,
                size_in_pages,
                first_freelist_page,
                freelist_page_count,
                schema_cookie,
                schema_format,
                default_page_cache_size,
                largest_root_page,
                text_encoding,
                user_version,
                incremental_vacuum,
                reserved,
                version_valid_for,
                sqlite_version,
                page,
            },
            fields,
            anomalies,
        })
    }

    /// Page size in bytes, with the stored value 1 meaning 65536.
    pub fn page_size_bytes(&self) -> Option<usize> {
        page_size_bytes(self.page_size)
    }

    pub fn text_encoding_name(&self) -> Option<&'static str> {
        match self.text_encoding {
            1 => Some("UTF-8"),
            2 => Some("UTF-16le"),
            3 => Some("UTF-16be"),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE);
        buf.put_slice(&self.magic);
        buf.put_u16(self.page_size);
        buf.put_u8(self.write_version);
        buf.put_u8(self.read_version);
        buf.put_u8(self.reserved_space);
        buf.put_u8(self.max_payload_fraction);
        buf.put_u8(self.min_payload_fraction);
        buf.put_u8(self.leaf_payload_fraction);
        buf.put_u32(self.file_change_counter);
        buf.put_u32(self.size_in_pages);
        buf.put_u32(self.first_freelist_page);
        buf.put_u32(self.freelist_page_count);
        buf.put_u32(self.schema_cookie);
        buf.put_u32(self.schema_format);
        buf.put_u32(self.default_page_cache_size);
        buf.put_u32(self.largest_root_page);
        buf.put_u32(self.text_encoding);
        buf.put_u32(self.user_version);
        buf.put_u32(self.incremental_vacuum);
        buf.put_slice(&self.reserved);
        buf.put_u32(self.version_valid_for);
        buf.put_u32(self.sqlite_version);
        match &self.page {
            Ok(page) => page.put(&mut buf),
            // Keep the rejected byte so decoding again fails the same way.
            Err(DecodeError::InvalidPageType { byte, .. }) => buf.put_u8(*byte),
            Err(DecodeError::TruncatedBuffer { .. }) => {}
        }
        buf.freeze()
    }
}

/// Interprets a stored page size, returning `None` when it is not one
/// SQLite would write.
pub fn page_size_bytes(stored: u16) -> Option<usize> {
    match stored {
        1 => Some(65536),
        n if n >= 512 && n.is_power_of_two() => Some(n as usize),
        _ => None,
    }
}
