//! Export/import of whole compositions as text blobs and files

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::snapshot;
use crate::domain::Composition;
use crate::infrastructure::traits::FileSystem;

/// Clipboard and file transfer of the serialized tree.
pub struct TransferService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TransferService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Serialized tree for the clipboard; pretty-printed if configured.
    pub fn copy_blob(&self, tree: &Composition) -> ApplicationResult<String> {
        Ok(snapshot::to_json(tree, self.settings.pretty_export)?)
    }

    /// Parse a user-supplied blob.
    ///
    /// Text that is not JSON is rejected; any JSON shape is accepted leniently.
    pub fn parse_blob(&self, text: &str) -> ApplicationResult<Composition> {
        let tree = snapshot::from_json(text)?;
        debug!("parsed blob into {} nodes", tree.len());
        Ok(tree)
    }

    #[instrument(level = "debug", skip(self, tree))]
    pub fn export_to_file(&self, tree: &Composition, path: &Path) -> ApplicationResult<()> {
        let blob = self.copy_blob(tree)?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create export directory", path)?;
        self.fs
            .write(path, &blob)
            .with_path_context("export composition", path)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn import_from_file(&self, path: &Path) -> ApplicationResult<Composition> {
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("import composition", path)?;
        self.parse_blob(&text)
    }
}
