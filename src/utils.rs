use super::DecodeError;
use paste::paste;

pub fn read_n_bytes(buf: &[u8], offset: usize, n: usize) -> Result<&[u8], DecodeError> {
    offset
        .checked_add(n)
        .and_then(|end| buf.get(offset..end))
        .ok_or(DecodeError::TruncatedBuffer {
            offset,
            needed: n,
            available: buf.len().saturating_sub(offset),
        })
}

macro_rules! read_bytes {
    ($($num:expr),*) => {
        paste! {
            $(
                pub fn [<read_ $num _bytes>](buf: &[u8], offset: usize) -> Result<[u8; $num], DecodeError> {
                    let mut out = [0u8; $num];
                    out.copy_from_slice(read_n_bytes(buf, offset, $num)?);
                    Ok(out)
                }
            )*
        }
    };
}

read_bytes!(1, 2, 4);
