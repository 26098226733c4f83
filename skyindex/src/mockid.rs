//! Packed (row, file) identifiers for mock objects
//!
//! A mock identifier spends 52 of its 64 bits on two unsigned sub-fields:
//!
//! ```text
//!  63        52 51                 32 31                              0
//! +------------+---------------------+---------------------------------+
//! |  reserved  |     file number     |           row number            |
//! +------------+---------------------+---------------------------------+
//! ```
//!
//! The reserved bits are always zero. Decoding a value with any reserved bit
//! set is rejected with [`IdError::ReservedBits`]; such values never came out
//! of [`encode`] and are not silently truncated.

use std::fmt;

use thiserror::Error;

/// First bit past the row field
pub const ENCODE_ROW_END: u32 = 32;
/// Mask selecting the row field
pub const ENCODE_ROW_MASK: u64 = (1u64 << ENCODE_ROW_END) - 1;
/// Largest encodable row number (2^32 - 1)
pub const ENCODE_ROW_MAX: i64 = ENCODE_ROW_MASK as i64;

/// First bit past the file field
pub const ENCODE_FILE_END: u32 = 52;
/// Mask selecting the file field
pub const ENCODE_FILE_MASK: u64 = (1u64 << ENCODE_FILE_END) - (1u64 << ENCODE_ROW_END);
/// Largest encodable file number (2^20 - 1)
pub const ENCODE_FILE_MAX: i64 = (ENCODE_FILE_MASK >> ENCODE_ROW_END) as i64;

const RESERVED_MASK: u64 = !((1u64 << ENCODE_FILE_END) - 1);

/// Errors raised while packing or unpacking identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Row number {0} is outside [0, 4294967295]")]
    RowOutOfRange(i64),

    #[error("File number {0} is outside [0, 1048575]")]
    FileOutOfRange(i64),

    #[error("Row and file sequences differ in length ({rows} vs {files})")]
    LengthMismatch { rows: usize, files: usize },

    #[error("Identifier {0:#018x} has reserved bits 52-63 set")]
    ReservedBits(i64),
}

/// A packed mock identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MockId(i64);

impl MockId {
    /// Wrap an already packed value, checking the reserved bits
    pub fn from_i64(value: i64) -> Result<Self, IdError> {
        if (value as u64) & RESERVED_MASK != 0 {
            return Err(IdError::ReservedBits(value));
        }
        Ok(Self(value))
    }

    /// Row number within the originating file
    pub fn row(&self) -> u32 {
        ((self.0 as u64) & ENCODE_ROW_MASK) as u32
    }

    /// Index of the originating file within its batch
    pub fn file(&self) -> u32 {
        (((self.0 as u64) & ENCODE_FILE_MASK) >> ENCODE_ROW_END) as u32
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MockId> for i64 {
    fn from(id: MockId) -> Self {
        id.0
    }
}

/// Pack a row and file number into a signed 64-bit identifier.
///
/// # Errors
///
/// [`IdError::RowOutOfRange`] if `row` is negative or above 2^32 - 1,
/// [`IdError::FileOutOfRange`] if `file` is negative or above 2^20 - 1.
pub fn encode(row: i64, file: i64) -> Result<MockId, IdError> {
    if !(0..=ENCODE_ROW_MAX).contains(&row) {
        return Err(IdError::RowOutOfRange(row));
    }
    if !(0..=ENCODE_FILE_MAX).contains(&file) {
        return Err(IdError::FileOutOfRange(file));
    }

    let packed = ((file as u64) << ENCODE_ROW_END) | row as u64;
    Ok(MockId(packed as i64))
}

/// Element-wise [`encode`] over two equal-length sequences
pub fn encode_many(rows: &[i64], files: &[i64]) -> Result<Vec<MockId>, IdError> {
    if rows.len() != files.len() {
        return Err(IdError::LengthMismatch {
            rows: rows.len(),
            files: files.len(),
        });
    }
    rows.iter()
        .zip(files)
        .map(|(&row, &file)| encode(row, file))
        .collect()
}

/// Unpack an identifier into `(row, file)`.
pub fn decode(id: i64) -> Result<(u32, u32), IdError> {
    let id = MockId::from_i64(id)?;
    Ok((id.row(), id.file()))
}

/// Build identifiers for a flattened sequence of rows drawn from several files.
///
/// `file_sizes[n]` is the number of rows contributed by file `n`; the rows of
/// file 0 come first, then those of file 1, and so on. `row_numbers` holds
/// each row's index within its own file.
///
/// # Errors
///
/// [`IdError::LengthMismatch`] if `row_numbers` does not hold exactly
/// `file_sizes.iter().sum()` entries, otherwise whatever [`encode`] reports.
pub fn assign_ids(row_numbers: &[i64], file_sizes: &[usize]) -> Result<Vec<MockId>, IdError> {
    let total: usize = file_sizes.iter().sum();
    if row_numbers.len() != total {
        return Err(IdError::LengthMismatch {
            rows: row_numbers.len(),
            files: total,
        });
    }

    let files: Vec<i64> = file_sizes
        .iter()
        .enumerate()
        .flat_map(|(file, &n)| std::iter::repeat(file as i64).take(n))
        .collect();

    encode_many(row_numbers, &files)
}
