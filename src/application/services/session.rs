//! Editing session: the live composition wired to storage and the host's fields
//!
//! Every applied mutation is followed by a synchronous recompile, a push of both
//! prompt strings and a persist of the snapshot. Push and persist are best effort:
//! failures are logged and reported, the in-memory tree is never rolled back.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::mutation::{Change, Mutation};
use crate::application::services::TransferService;
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::{SeedConfig, Settings};
use crate::domain::{compile, snapshot, CompiledPrompt, Composition, Parent, TreeNodeConvert};
use crate::infrastructure::traits::{FileSystem, HostFields, KeyValueStore, PromptField};

/// Where the session's initial tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    Restored,
    Seeded,
    /// Stored state existed but could not be read; the session started empty.
    Recovered,
}

/// Outcome of pushing and persisting after a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// One entry per host field that rejected its text
    pub push_errors: Vec<String>,
    pub persist_error: Option<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.push_errors.is_empty() && self.persist_error.is_none()
    }
}

/// Result of [`PromptSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub change: Change,
    pub sync: SyncReport,
}

pub struct PromptSession {
    store: Arc<dyn KeyValueStore>,
    fields: Arc<dyn HostFields>,
    transfer: TransferService,
    settings: Arc<Settings>,
    tree: Composition,
    prompt: CompiledPrompt,
    origin: SessionOrigin,
    last_sync: SyncReport,
}

impl PromptSession {
    /// Restore the persisted tree, then compile and push once.
    ///
    /// Nothing stored seeds sample fragments; stored state that cannot be read
    /// starts an empty tree.
    #[instrument(level = "debug", skip_all)]
    pub fn start(
        store: Arc<dyn KeyValueStore>,
        fields: Arc<dyn HostFields>,
        fs: Arc<dyn FileSystem>,
        settings: Arc<Settings>,
    ) -> Self {
        let (tree, origin) = load_or_seed(store.as_ref(), &settings);
        info!("session started ({:?}) with {} nodes", origin, tree.len());
        let mut session = Self {
            store,
            fields,
            transfer: TransferService::new(fs, settings.clone()),
            settings,
            tree,
            prompt: CompiledPrompt::default(),
            origin,
            last_sync: SyncReport::default(),
        };
        session.sync();
        session
    }

    pub fn composition(&self) -> &Composition {
        &self.tree
    }

    /// Strings last pushed to the host.
    pub fn prompt(&self) -> &CompiledPrompt {
        &self.prompt
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_sync(&self) -> &SyncReport {
        &self.last_sync
    }

    /// Apply one mutation, then recompile, push and persist.
    ///
    /// A rejected mutation returns the domain error and skips the sync.
    #[instrument(level = "debug", skip(self))]
    pub fn apply(&mut self, mutation: &Mutation) -> ApplicationResult<Applied> {
        let change = mutation.apply(&mut self.tree)?;
        debug!("applied: {:?}", change);
        let sync = self.sync();
        Ok(Applied { change, sync })
    }

    /// Recompile and push to the host fields, then persist the snapshot.
    pub fn sync(&mut self) -> SyncReport {
        let policy = self.settings.factor_policy;
        self.prompt = compile(&self.tree, policy).assemble();

        let mut report = SyncReport::default();
        for (field, text) in [
            (PromptField::Positive, &self.prompt.positive),
            (PromptField::Negative, &self.prompt.negative),
        ] {
            if let Err(e) = self.fields.write(field, text) {
                warn!("push to {} field failed: {}", field, e);
                report.push_errors.push(format!("{field}: {e}"));
            }
        }
        if let Err(e) = self.persist() {
            warn!("persist failed: {}", e);
            report.persist_error = Some(e.to_string());
        }
        self.last_sync = report.clone();
        report
    }

    fn persist(&self) -> ApplicationResult<()> {
        let key = &self.settings.storage_key;
        let json = snapshot::to_json(&self.tree, false)?;
        self.store.set(key, &json).with_key_context("persist composition", key)
    }

    /// Swap in a whole tree (e.g. after an import) and sync.
    pub fn replace(&mut self, tree: &Composition) -> SyncReport {
        self.tree.replace_with(tree);
        debug!("replaced composition:\n{}", self.tree.to_tree_string());
        self.sync()
    }

    pub fn copy_blob(&self) -> ApplicationResult<String> {
        self.transfer.copy_blob(&self.tree)
    }

    /// Replace the tree with an imported blob; non-JSON leaves the tree untouched.
    #[instrument(level = "debug", skip_all)]
    pub fn import_blob(&mut self, text: &str) -> ApplicationResult<SyncReport> {
        let tree = self.transfer.parse_blob(text)?;
        Ok(self.replace(&tree))
    }

    pub fn export_to_file(&self, path: &Path) -> ApplicationResult<()> {
        self.transfer.export_to_file(&self.tree, path)
    }

    pub fn import_from_file(&mut self, path: &Path) -> ApplicationResult<SyncReport> {
        let tree = self.transfer.import_from_file(path)?;
        Ok(self.replace(&tree))
    }
}

fn load_or_seed(store: &dyn KeyValueStore, settings: &Settings) -> (Composition, SessionOrigin) {
    let key = &settings.storage_key;
    match store.get(key) {
        Ok(Some(text)) => match snapshot::from_json(&text) {
            Ok(tree) => (tree, SessionOrigin::Restored),
            Err(e) => {
                warn!("stored composition under '{}' is malformed: {}", key, e);
                (Composition::new(), SessionOrigin::Recovered)
            }
        },
        Ok(None) => {
            debug!("nothing stored under '{}'", key);
            (seed_tree(&settings.seed), SessionOrigin::Seeded)
        }
        Err(e) => {
            warn!("cannot read stored composition '{}': {}", key, e);
            (Composition::new(), SessionOrigin::Recovered)
        }
    }
}

/// One positive and one negative sample fragment; blank entries are left out.
pub fn seed_tree(seed: &SeedConfig) -> Composition {
    let mut tree = Composition::new();
    if !seed.positive.trim().is_empty() {
        if let Err(e) = tree.insert_fragment(Parent::Root, usize::MAX, &seed.positive) {
            debug!("seed fragment skipped: {}", e);
        }
    }
    if !seed.negative.trim().is_empty() {
        let negative = tree
            .insert_fragment(Parent::Root, usize::MAX, &seed.negative)
            .and_then(|id| tree.set_negative(id, true));
        if let Err(e) = negative {
            debug!("negative seed fragment skipped: {}", e);
        }
    }
    tree
}
