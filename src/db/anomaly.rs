use thiserror::Error as ThisError;

/// Advisory findings. Decoding carries on past these and reports them
/// next to the decoded value.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Anomaly {
    #[error("magic string mismatch: found {}", String::from_utf8_lossy(.found).escape_debug())]
    MagicMismatch { found: [u8; 16] },

    #[error("field {field} at offset {offset} holds {value}, expected {expected}")]
    FieldConstraintViolation {
        field: &'static str,
        offset: usize,
        value: u64,
        expected: &'static str,
    },
}

impl Anomaly {
    pub(crate) fn violation(
        field: &'static str,
        offset: usize,
        value: impl Into<u64>,
        expected: &'static str,
    ) -> Self {
        Self::FieldConstraintViolation {
            field,
            offset,
            value: value.into(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_describes_violations() {
        let anomaly = Anomaly::violation("text_encoding", 56, 7u32, "1, 2 or 3");
        assert_eq!(
            anomaly.to_string(),
            "field text_encoding at offset 56 holds 7, expected 1, 2 or 3"
        );
    }

    #[test]
    fn it_escapes_a_bad_magic_string() {
        let anomaly = Anomaly::MagicMismatch {
            found: *b"SQLite format 4\0",
        };
        assert_eq!(
            anomaly.to_string(),
            "magic string mismatch: found SQLite format 4\\0"
        );
    }
}
