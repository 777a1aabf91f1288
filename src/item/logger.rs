use std::cell::Cell;

use log::{debug, info};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    item::elasticsearch::BulkFragment,
};

/// Logs bulk fragments instead of sending them. Used for dry runs.
#[derive(Default)]
pub struct LoggerWriter {
    fragments: Cell<usize>,
    bytes: Cell<usize>,
}

impl LoggerWriter {
    /// Number of fragments and bytes logged so far.
    pub fn totals(&self) -> (usize, usize) {
        (self.fragments.get(), self.bytes.get())
    }
}

impl ItemWriter<BulkFragment> for LoggerWriter {
    fn write(&self, items: &[BulkFragment]) -> ItemWriterResult {
        for fragment in items {
            info!("Fragment:{} ({} bytes)", fragment.id(), fragment.len());
            debug!("{}", String::from_utf8_lossy(fragment.as_bytes()).trim_end());
            self.fragments.set(self.fragments.get() + 1);
            self.bytes.set(self.bytes.get() + fragment.len());
        }
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        let (fragments, bytes) = self.totals();
        info!("Dry run: {fragments} fragments, {bytes} bytes would have been sent");
        Ok(())
    }
}
