//! Local path selection seam
//!
//! Upload and download need a local path chosen by the user. The engine does
//! not own any dialog UI; the embedding shell implements [`DialogProvider`]
//! over whatever prompt mechanism it has.

use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait DialogProvider: Send + Sync {
    /// Ask the user for an existing local file. `None` means cancelled.
    async fn pick_open_file(&self, title: &str) -> Option<PathBuf>;

    /// Ask the user for a local save destination. `None` means cancelled.
    async fn pick_save_file(&self, title: &str, default_name: &str) -> Option<PathBuf>;
}

/// Dialog provider that always cancels, for headless embedders and tests.
pub struct NoopDialogs;

#[async_trait]
impl DialogProvider for NoopDialogs {
    async fn pick_open_file(&self, _title: &str) -> Option<PathBuf> {
        None
    }

    async fn pick_save_file(&self, _title: &str, _default_name: &str) -> Option<PathBuf> {
        None
    }
}
