use crate::error::OelfError;

/// A byte-offset indexed, NUL-delimited string table.
///
/// Unlike a general-purpose strtab, every lookup is bounds-checked against
/// the table and returns a typed error on overrun instead of panicking —
/// malformed OELFs are adversarial input, not a programmer error.
#[derive(Debug, Clone, Copy)]
pub struct Strtab<'a> {
    bytes: &'a [u8],
}

impl<'a> Strtab<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Strtab { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads the NUL-terminated string starting at `offset`.
    ///
    /// Invariant: the returned slice's terminating NUL lies strictly inside
    /// the table.
    pub fn get(&self, offset: usize) -> Result<&'a str, OelfError> {
        if offset >= self.bytes.len() {
            return Err(OelfError::StringTableOverrun {
                offset,
                len: self.bytes.len(),
            });
        }

        let rest = &self.bytes[offset..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(OelfError::StringTableOverrun {
                offset,
                len: self.bytes.len(),
            })?;

        std::str::from_utf8(&rest[..nul])
            .map_err(|_| OelfError::Malformed(format!("non-UTF8 string at offset {offset}")))
    }
}
