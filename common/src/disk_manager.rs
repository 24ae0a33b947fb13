//! Raw, positioned page I/O against the store's single backing file.
//!
//! Id allocation is not this type's concern — the B+-tree owns
//! `next_node_id` and persists it in the header, since node ids must
//! survive eviction and reopen rather than being derived from file length.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::Result;
use crate::PageId;

#[derive(Debug)]
pub struct DiskManager {
    file: File,
    page_size: usize,
}

impl DiskManager {
    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file, page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reads the page at `page_id` into `buf`. `buf` must be exactly
    /// `page_size` bytes.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = page_id * self.page_size as u64;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    /// Writes `buf` to the page at `page_id`. `buf` must be exactly
    /// `page_size` bytes.
    pub fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = page_id * self.page_size as u64;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
