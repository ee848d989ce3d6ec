//! Process-wide "download in progress" flag

use std::sync::atomic::{AtomicUsize, Ordering};

static ACTIVE_DOWNLOADS: AtomicUsize = AtomicUsize::new(0);

/// True while at least one download call is running in this process
pub fn is_downloading() -> bool {
    ACTIVE_DOWNLOADS.load(Ordering::SeqCst) > 0
}

/// Marks a download as active until dropped, on success and error alike
pub(crate) struct DownloadingGuard(());

impl DownloadingGuard {
    pub(crate) fn acquire() -> Self {
        ACTIVE_DOWNLOADS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }
}

impl Drop for DownloadingGuard {
    fn drop(&mut self) {
        ACTIVE_DOWNLOADS.fetch_sub(1, Ordering::SeqCst);
    }
}
