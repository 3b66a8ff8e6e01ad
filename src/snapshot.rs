//! Versioned structure snapshots, their derived caches, and reloading
//!
//! A `Snapshot` is immutable once built and is shared as `Arc<Snapshot>`.
//! Caches live inside the snapshot, so a reload can never serve results
//! computed against an older structure.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::conflict::{self, ConflictReport};
use crate::error::{Error, Result};
use crate::index::{PermissionIndex, PermissionInfo};
use crate::legacy::{self, Normalized, Selection};
use crate::mutator::{self, Command};
use crate::power::{self, ChildValidation, PowerAnalysis};
use crate::selection::SelectionState;
use crate::structure::{StructureDocument, StructureMetadata, StructureNode, StructureTree};
use crate::tristate::{self, FlatNode, SelectionStatus};

// ============================================================================
// Derived caches
// ============================================================================

/// Memoized results keyed by the id list of the input
#[derive(Debug, Default)]
pub struct DerivedCache {
    version: u64,
    conflicts: RwLock<HashMap<Vec<String>, Arc<ConflictReport>>>,
    analyses: RwLock<HashMap<Vec<String>, Arc<PowerAnalysis>>>,
}

impl DerivedCache {
    fn new(version: u64) -> Self {
        DerivedCache { version, ..Default::default() }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of cached (conflict, analysis) entries
    pub fn len(&self) -> (usize, usize) {
        (self.conflicts.read().len(), self.analyses.read().len())
    }

    pub fn clear(&self) {
        self.conflicts.write().clear();
        self.analyses.write().clear();
    }

    // Concurrent misses may compute twice; the last insert wins.
    fn get_or_insert<T>(map: &RwLock<HashMap<Vec<String>, Arc<T>>>, key: Vec<String>, f: impl FnOnce() -> T) -> Arc<T> {
        if let Some(hit) = map.read().get(&key) {
            tracing::debug!(ids = key.len(), "derived cache hit");
            return Arc::clone(hit);
        }
        let value = Arc::new(f());
        map.write().insert(key, Arc::clone(&value));
        value
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// One loaded structure with its index, config and caches
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    tree: StructureTree,
    index: PermissionIndex,
    metadata: StructureMetadata,
    config: Arc<EngineConfig>,
    cache: DerivedCache,
}

/// Content hash of the document: first 8 bytes of SHA-256 over its JSON
pub fn document_version(doc: &StructureDocument) -> Result<u64> {
    let bytes = serde_json::to_vec(doc)?;
    let digest = Sha256::digest(&bytes);
    Ok(BigEndian::read_u64(&digest[..8]))
}

impl Snapshot {
    pub fn build(doc: &StructureDocument, config: Arc<EngineConfig>) -> Result<Self> {
        config.validate()?;
        let version = document_version(doc)?;
        let tree = StructureTree::from_document(doc)?;
        let index = PermissionIndex::build(&tree);
        let last_updated = doc.metadata.as_ref().map(|m| m.last_updated.as_str()).unwrap_or("");
        let metadata = tree.metadata(last_updated);
        tracing::info!(
            version = %format!("{:016x}", version),
            modules = metadata.total_modules,
            menus = metadata.total_menus,
            cards = metadata.total_cards,
            permissions = index.len(),
            "permission structure snapshot built"
        );
        Ok(Snapshot { version, tree, index, metadata, config, cache: DerivedCache::new(version) })
    }

    pub fn from_json(json: &str, config: Arc<EngineConfig>) -> Result<Self> {
        Self::build(&StructureDocument::from_json(json)?, config)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn tree(&self) -> &StructureTree {
        &self.tree
    }

    pub fn index(&self) -> &PermissionIndex {
        &self.index
    }

    pub fn metadata(&self) -> &StructureMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &DerivedCache {
        &self.cache
    }

    // === Lookups ===

    #[inline]
    pub fn find_node(&self, node_id: &str) -> Option<&StructureNode> {
        self.tree.node(node_id)
    }

    #[inline]
    pub fn find_permission(&self, id: &str) -> Option<&PermissionInfo> {
        self.index.resolve(id)
    }

    // === Selection views ===

    pub fn flatten(&self, node_id: &str) -> Vec<FlatNode<'_>> {
        tristate::flatten(&self.tree, node_id, &self.config.view)
    }

    pub fn selection_status(&self, state: &SelectionState, node_id: &str) -> SelectionStatus {
        tristate::selection_status(&self.tree, state, node_id, &self.config.view)
    }

    pub fn is_fully_selected(&self, state: &SelectionState, node_id: &str) -> bool {
        tristate::is_fully_selected(&self.tree, state, node_id, &self.config.view)
    }

    pub fn is_partially_selected(&self, state: &SelectionState, node_id: &str) -> bool {
        tristate::is_partially_selected(&self.tree, state, node_id, &self.config.view)
    }

    // === Mutation ===

    pub fn apply(&self, state: &SelectionState, command: &Command) -> SelectionState {
        mutator::apply(&self.tree, &self.config.view, state, command)
    }

    // === Power ===

    pub fn max_power<S: AsRef<str>>(&self, ids: &[S]) -> u8 {
        power::max_power(&self.index, ids)
    }

    /// Highest power granted by a selection: the role rating
    pub fn selection_power(&self, state: &SelectionState) -> u8 {
        state
            .pairs()
            .filter_map(|(n, k)| self.index.lookup(n, k))
            .map(|p| p.power_level)
            .max()
            .unwrap_or(0)
    }

    /// Cached per distinct id sequence; order matters for tie-breaking
    pub fn analyze<S: AsRef<str>>(&self, ids: &[S]) -> Arc<PowerAnalysis> {
        let mut seen = HashSet::new();
        let key = ids.iter().map(AsRef::as_ref).filter(|id| seen.insert(*id)).map(str::to_string).collect();
        DerivedCache::get_or_insert(&self.cache.analyses, key, || power::analyze(&self.index, &self.config, ids))
    }

    pub fn allowed_child_permissions<P: AsRef<str>, C: AsRef<str>>(&self, parents: &[P], candidates: &[C]) -> Vec<String> {
        power::allowed_child_permissions(&self.index, parents, candidates)
    }

    pub fn allowed_child_catalog<P: AsRef<str>>(&self, parents: &[P]) -> Vec<&PermissionInfo> {
        power::allowed_child_catalog(&self.index, parents)
    }

    pub fn default_permission(&self) -> Option<&PermissionInfo> {
        power::default_permission(&self.index)
    }

    pub fn validate_child_permissions<P: AsRef<str>, C: AsRef<str>>(&self, parents: &[P], children: &[C]) -> ChildValidation {
        power::validate_child_permissions(&self.index, parents, children)
    }

    pub fn can_access_power_level<S: AsRef<str>>(&self, ids: &[S], required: u8) -> bool {
        power::can_access_power_level(&self.index, ids, required)
    }

    // === Conflicts ===

    pub fn detect_conflicts<S: AsRef<str>>(&self, ids: &[S]) -> Arc<ConflictReport> {
        let key = conflict::cache_key(ids);
        DerivedCache::get_or_insert(&self.cache.conflicts, key, || conflict::detect(&self.index, &self.config, ids))
    }

    // === Legacy ===

    pub fn normalize(&self, selection: &Selection) -> Normalized {
        legacy::normalize(&self.tree, &self.index, selection)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Source of structure documents (REST client, file, fixture, ...)
pub trait StructureLoader: Send + Sync {
    fn load(&self) -> Result<StructureDocument>;
}

impl<F> StructureLoader for F
where
    F: Fn() -> Result<StructureDocument> + Send + Sync,
{
    fn load(&self) -> Result<StructureDocument> {
        self()
    }
}

/// Reads a JSON structure document from disk
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileLoader { path: path.as_ref().to_path_buf() }
    }
}

impl StructureLoader for JsonFileLoader {
    fn load(&self) -> Result<StructureDocument> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::StructureLoad(format!("{}: {}", self.path.display(), e)))?;
        StructureDocument::from_json(&content)
    }
}

/// Serves a fixed in-memory JSON document
#[derive(Debug, Clone)]
pub struct StaticLoader(pub String);

impl StructureLoader for StaticLoader {
    fn load(&self) -> Result<StructureDocument> {
        StructureDocument::from_json(&self.0)
    }
}

/// Holds the current snapshot; a failed reload keeps the last good one
pub struct Catalog {
    loader: Box<dyn StructureLoader>,
    config: Arc<EngineConfig>,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl Catalog {
    pub fn new(loader: impl StructureLoader + 'static, config: EngineConfig) -> Self {
        Catalog { loader: Box::new(loader), config: Arc::new(config), current: RwLock::new(None) }
    }

    /// Load and swap in a fresh snapshot
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        let built = self
            .loader
            .load()
            .and_then(|doc| Snapshot::build(&doc, Arc::clone(&self.config)))
            .map_err(|e| match e {
                Error::StructureLoad(_) => e,
                other => Error::StructureLoad(other.to_string()),
            });
        match built {
            Ok(snap) => {
                let snap = Arc::new(snap);
                *self.current.write() = Some(Arc::clone(&snap));
                Ok(snap)
            }
            Err(e) => {
                let kept = self.current.read().as_ref().map(|s| s.version());
                tracing::warn!(error = %e, kept_version = ?kept, "structure reload failed, keeping last snapshot");
                Err(e)
            }
        }
    }

    /// Current snapshot, or `NoSnapshot` if nothing ever loaded
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current.read().clone().ok_or(Error::NoSnapshot)
    }

    /// Current snapshot, loading on first use
    pub fn get_or_load(&self) -> Result<Arc<Snapshot>> {
        match self.snapshot() {
            Ok(s) => Ok(s),
            Err(_) => self.reload(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
