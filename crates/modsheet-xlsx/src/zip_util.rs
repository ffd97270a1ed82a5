use std::io::Read;

use crate::XlsxError;

/// Default maximum uncompressed size of a single part inflated into memory.
pub(crate) const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

/// Default maximum total uncompressed size of all parts of one package.
pub(crate) const DEFAULT_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024; // 512MiB

#[derive(Debug)]
pub(crate) struct ZipInflateBudget {
    max_total_bytes: u64,
    used_bytes: u64,
}

impl ZipInflateBudget {
    pub(crate) fn new(max_total_bytes: u64) -> Self {
        Self {
            max_total_bytes,
            used_bytes: 0,
        }
    }

    fn remaining_bytes(&self) -> u64 {
        self.max_total_bytes.saturating_sub(self.used_bytes)
    }

    fn consume(&mut self, bytes: u64) -> Result<(), XlsxError> {
        self.used_bytes = self.used_bytes.saturating_add(bytes);
        if self.used_bytes > self.max_total_bytes {
            return Err(XlsxError::PackageTooLarge {
                total: self.used_bytes,
                max: self.max_total_bytes,
            });
        }
        Ok(())
    }
}

/// Inflate one archive entry, enforcing both the per-part limit and the package budget.
///
/// The declared size is only a fast-path; the entry is read through `take(limit + 1)` so forged
/// size metadata can't push past the limit.
pub(crate) fn read_entry_with_budget<R: Read>(
    entry: &mut R,
    declared_size: u64,
    part: &str,
    max_part_bytes: u64,
    budget: &mut ZipInflateBudget,
) -> Result<Vec<u8>, XlsxError> {
    if declared_size > max_part_bytes {
        return Err(XlsxError::PartTooLarge {
            part: part.to_string(),
            size: declared_size,
            max: max_part_bytes,
        });
    }
    let remaining = budget.remaining_bytes();
    if declared_size > remaining {
        return Err(XlsxError::PackageTooLarge {
            total: budget.used_bytes.saturating_add(declared_size),
            max: budget.max_total_bytes,
        });
    }

    let limit = max_part_bytes.min(remaining);
    let mut buf = Vec::with_capacity(declared_size.min(limit) as usize);
    entry
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)?;

    let read = buf.len() as u64;
    if read > max_part_bytes {
        return Err(XlsxError::PartTooLarge {
            part: part.to_string(),
            size: read,
            max: max_part_bytes,
        });
    }
    budget.consume(read)?;
    Ok(buf)
}
