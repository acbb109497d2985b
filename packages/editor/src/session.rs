//! # Sync Session
//!
//! [`SyncEngine`] owns the baseline (the last state both sides agreed on)
//! and runs sync cycles in either direction:
//!
//! ```text
//! tree edit   → serialize → diff tree + diff source → resolve → source:updated → commit
//! source edit → parse     → diff tree + diff source → resolve → tree:updated   → commit
//! ```
//!
//! Only one cycle runs at a time. A cycle started while another is in
//! flight (typically from a listener reacting to the first cycle's
//! event) is dropped.

use crate::bus::{EventBus, SubscribeOptions, Subscription};
use crate::config::{ConfigPatch, ConflictStrategy, SyncConfig, SyncMode};
use crate::differ::{diff, diff_source};
use crate::errors::SyncError;
use crate::events::{EventKind, SyncEvent};
use crate::resolver::{find_conflicts, resolve};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tandem_common::{validate_tree, ChangeOperation, Side, VisualComponent};
use tandem_parser::{MapperOptions, SerializeOptions, SerializedSource, Serializer, SourceMapper};

/// Path used to key structural ids of the synchronized source
pub const DEFAULT_SOURCE_PATH: &str = "tandem://source";

/// Last state both sides agreed on
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub tree: VisualComponent,
    pub source: String,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            tree: VisualComponent::fragment(Vec::new()),
            source: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    AwaitingResolution,
}

/// What a sync call did
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Baseline updated; the resolved operations were published
    Committed { operations: Vec<ChangeOperation> },
    /// Manual strategy held the cycle back; it awaits resolution.
    /// `conflicts` may be empty.
    Conflict { conflicts: BTreeSet<String> },
    /// Another cycle was in flight
    Skipped,
    /// Cycle failed and `sync:error` was published
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SyncOutcome::Committed { .. })
    }
}

/// A cycle held back by the manual conflict strategy
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConflict {
    /// Side the cycle started from
    pub origin: Side,
    pub tree: VisualComponent,
    pub source: SerializedSource,
    pub tree_ops: Vec<ChangeOperation>,
    pub source_ops: Vec<ChangeOperation>,
}

impl PendingConflict {
    pub fn conflicts(&self) -> BTreeSet<String> {
        find_conflicts(&self.tree_ops, &self.source_ops)
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub config: SyncConfig,
    pub mapper: MapperOptions,
    pub serializer: SerializeOptions,
    pub source_path: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            config: SyncConfig::default(),
            mapper: MapperOptions::default(),
            serializer: SerializeOptions::default(),
            source_path: DEFAULT_SOURCE_PATH.to_string(),
        }
    }
}

struct Inner {
    bus: EventBus,
    mapper: SourceMapper,
    serializer: SerializeOptions,
    source_path: String,
    config: RwLock<SyncConfig>,
    baseline: RwLock<Arc<Baseline>>,
    syncing: AtomicBool,
    pending: Mutex<Option<PendingConflict>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Bidirectional sync orchestrator; clones share one session
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

/// Releases the single-flight flag, also when a cycle unwinds
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SyncEngine {
    pub fn new(bus: EventBus) -> Self {
        Self::with_options(bus, EngineOptions::default())
    }

    pub fn with_options(bus: EventBus, options: EngineOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                mapper: SourceMapper::new(options.mapper),
                serializer: options.serializer,
                source_path: options.source_path,
                config: RwLock::new(options.config),
                baseline: RwLock::new(Arc::new(Baseline::default())),
                syncing: AtomicBool::new(false),
                pending: Mutex::new(None),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> SyncConfig {
        *self.inner.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_config(&self, patch: ConfigPatch) {
        let mut config = self.inner.config.write().unwrap_or_else(PoisonError::into_inner);
        config.merge(patch);
        tracing::debug!(?config, "sync config updated");
    }

    /// Snapshot of the current baseline
    pub fn baseline(&self) -> Arc<Baseline> {
        self.inner
            .baseline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Seed the session with a known-good state
    pub fn reset_baseline(&self, tree: VisualComponent, source: impl Into<String>) {
        self.commit_baseline(Baseline {
            tree,
            source: source.into(),
        });
        locked(&self.inner.pending).take();
    }

    pub fn state(&self) -> SyncState {
        if self.inner.syncing.load(Ordering::Acquire) {
            SyncState::Syncing
        } else if locked(&self.inner.pending).is_some() {
            SyncState::AwaitingResolution
        } else {
            SyncState::Idle
        }
    }

    pub fn pending_conflict(&self) -> Option<PendingConflict> {
        locked(&self.inner.pending).clone()
    }

    /// Subscribe to `tree:changed` and `source:changed` on the bus. Events
    /// drive cycles only while the sync mode is automatic.
    pub fn attach(&self) {
        let weak = Arc::downgrade(&self.inner);
        let tree_sub = self.inner.bus.subscribe(
            EventKind::TreeChanged,
            automatic(weak.clone(), |engine, event| {
                if let SyncEvent::TreeChanged { tree } = event {
                    engine.sync_from_tree(tree.clone());
                }
            }),
            SubscribeOptions::default(),
        );
        let source_sub = self.inner.bus.subscribe(
            EventKind::SourceChanged,
            automatic(weak, |engine, event| {
                if let SyncEvent::SourceChanged { content } = event {
                    engine.sync_from_source(content.clone());
                }
            }),
            SubscribeOptions::default(),
        );

        locked(&self.inner.subscriptions).extend([tree_sub, source_sub]);
    }

    /// Remove the subscriptions made by [`SyncEngine::attach`]
    pub fn detach(&self) {
        let subscriptions = std::mem::take(&mut *locked(&self.inner.subscriptions));
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }

    /// Propagate a tree edit to the source
    pub fn sync_from_tree(&self, tree: VisualComponent) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("sync already in progress, dropping tree change");
            return SyncOutcome::Skipped;
        };
        tracing::debug!(components = tree.count(), "sync from tree");

        match self.run_tree_cycle(tree) {
            Ok(outcome) => outcome,
            Err(error) => self.fail(Side::Tree, error),
        }
    }

    /// Propagate a source edit to the tree
    pub fn sync_from_source(&self, text: impl Into<String>) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("sync already in progress, dropping source change");
            return SyncOutcome::Skipped;
        };
        let text = text.into();
        tracing::debug!(bytes = text.len(), "sync from source");

        match self.run_source_cycle(text) {
            Ok(outcome) => outcome,
            Err(error) => self.fail(Side::Source, error),
        }
    }

    /// Settle the pending manual conflict with `strategy` and commit it
    pub fn resolve_pending(&self, strategy: ConflictStrategy) -> Result<SyncOutcome, SyncError> {
        if strategy == ConflictStrategy::Manual {
            return Err(SyncError::ManualStrategy);
        }
        let Some(_guard) = self.try_begin() else {
            return Ok(SyncOutcome::Skipped);
        };

        let pending = locked(&self.inner.pending).take().ok_or(SyncError::NothingPending)?;
        tracing::debug!(origin = %pending.origin, strategy = %strategy, "resolving pending conflict");
        self.commit(pending, strategy)
    }

    /// Drop the pending manual conflict, keeping the baseline
    pub fn discard_pending(&self) -> Option<PendingConflict> {
        locked(&self.inner.pending).take()
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(&self.inner.syncing))
    }

    fn run_tree_cycle(&self, tree: VisualComponent) -> Result<SyncOutcome, SyncError> {
        validate_tree(std::slice::from_ref(&tree))?;
        let baseline = self.baseline();

        let output = Serializer::new(self.inner.serializer.clone()).serialize(&tree);
        let tree_ops = diff(&baseline.tree, &tree);
        let source_ops = diff_source(
            &self.inner.mapper,
            &self.inner.source_path,
            &baseline.source,
            &output.markup,
        )?;

        self.settle(PendingConflict {
            origin: Side::Tree,
            tree,
            source: output,
            tree_ops,
            source_ops,
        })
    }

    fn run_source_cycle(&self, text: String) -> Result<SyncOutcome, SyncError> {
        let baseline = self.baseline();

        let tree = self
            .inner
            .mapper
            .parse_markup_tree(&self.inner.source_path, &text)?;
        let tree_ops = diff(&baseline.tree, &tree);
        let source_ops = diff_source(&self.inner.mapper, &self.inner.source_path, &baseline.source, &text)?;

        self.settle(PendingConflict {
            origin: Side::Source,
            tree,
            source: SerializedSource {
                markup: text,
                ..Default::default()
            },
            tree_ops,
            source_ops,
        })
    }

    /// Resolve and commit, or hold the cycle back under the manual strategy
    fn settle(&self, cycle: PendingConflict) -> Result<SyncOutcome, SyncError> {
        // A new cycle replaces whatever was waiting
        locked(&self.inner.pending).take();

        let strategy = self.config().conflict_strategy;
        if strategy != ConflictStrategy::Manual {
            return self.commit(cycle, strategy);
        }

        let conflicts = cycle.conflicts();
        tracing::debug!(count = conflicts.len(), origin = %cycle.origin, "manual conflict, awaiting resolution");
        self.inner.bus.publish_sync(&SyncEvent::SyncConflict {
            source: cycle.origin,
            tree_changes: cycle.tree_ops.clone(),
            source_changes: cycle.source_ops.clone(),
        });
        *locked(&self.inner.pending) = Some(cycle);

        Ok(SyncOutcome::Conflict { conflicts })
    }

    fn commit(&self, cycle: PendingConflict, strategy: ConflictStrategy) -> Result<SyncOutcome, SyncError> {
        let operations = resolve(cycle.tree_ops, cycle.source_ops, strategy)?;

        let event = match cycle.origin {
            Side::Tree => SyncEvent::SourceUpdated {
                code: cycle.source.markup.clone(),
                stylesheet: cycle.source.stylesheet,
                handlers: cycle.source.handlers,
                operations: operations.clone(),
            },
            Side::Source => SyncEvent::TreeUpdated {
                component_tree: cycle.tree.clone(),
                operations: operations.clone(),
            },
        };
        self.inner.bus.publish_sync(&event);

        self.commit_baseline(Baseline {
            tree: cycle.tree,
            source: cycle.source.markup,
        });
        tracing::debug!(operations = operations.len(), "baseline committed");

        Ok(SyncOutcome::Committed { operations })
    }

    fn commit_baseline(&self, baseline: Baseline) {
        *self
            .inner
            .baseline
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(baseline);
    }

    fn fail(&self, origin: Side, error: SyncError) -> SyncOutcome {
        tracing::warn!(%origin, "sync cycle failed: {}", error);
        self.inner.bus.publish_sync(&SyncEvent::SyncError {
            source: origin,
            error: error.clone(),
        });
        SyncOutcome::Failed(error)
    }
}

/// Listener that runs `f` against the engine while it is alive and in
/// automatic mode
fn automatic<F>(engine: Weak<Inner>, f: F) -> impl Fn(&SyncEvent) -> anyhow::Result<()> + Send + Sync + 'static
where
    F: Fn(&SyncEngine, &SyncEvent) + Send + Sync + 'static,
{
    move |event| {
        let Some(inner) = engine.upgrade() else {
            return Ok(());
        };
        let engine = SyncEngine { inner };
        if engine.config().sync_mode == SyncMode::Automatic {
            f(&engine, event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(strategy: ConflictStrategy) -> SyncEngine {
        SyncEngine::with_options(
            EventBus::new(),
            EngineOptions {
                config: SyncConfig {
                    conflict_strategy: strategy,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_fresh_engine_is_idle() {
        let engine = SyncEngine::new(EventBus::new());
        assert_eq!(engine.state(), SyncState::Idle);
        assert!(engine.baseline().tree.is_fragment());
        assert_eq!(engine.baseline().source, "");
    }

    #[test]
    fn test_guard_is_released_after_cycle() {
        let engine = engine_with(ConflictStrategy::PreferTree);
        assert!(engine.sync_from_tree(VisualComponent::new("a", "div")).is_committed());
        assert_eq!(engine.state(), SyncState::Idle);
        assert!(engine.sync_from_tree(VisualComponent::new("a", "span")).is_committed());
    }

    #[test]
    fn test_resolve_pending_without_conflict() {
        let engine = engine_with(ConflictStrategy::Manual);
        assert_eq!(
            engine.resolve_pending(ConflictStrategy::PreferTree),
            Err(SyncError::NothingPending)
        );
        assert_eq!(
            engine.resolve_pending(ConflictStrategy::Manual),
            Err(SyncError::ManualStrategy)
        );
    }

    #[test]
    fn test_set_config_merges() {
        let engine = SyncEngine::new(EventBus::new());
        engine.set_config(ConfigPatch {
            sync_mode: Some(SyncMode::Manual),
            conflict_strategy: None,
        });
        assert_eq!(engine.config().sync_mode, SyncMode::Manual);
        assert_eq!(engine.config().conflict_strategy, ConflictStrategy::PreferTree);
    }

    #[test]
    fn test_invalid_tree_fails_without_commit() {
        let engine = engine_with(ConflictStrategy::PreferTree);
        let tree = VisualComponent::new("a", "div").with_child(VisualComponent::new("a", "span"));

        let outcome = engine.sync_from_tree(tree);
        assert!(matches!(outcome, SyncOutcome::Failed(SyncError::InvalidTree(_))));
        assert_eq!(*engine.baseline(), Baseline::default());
    }

    #[test]
    fn test_placement_prop_is_rejected() {
        let engine = engine_with(ConflictStrategy::PreferTree);
        let tree = VisualComponent::new("a", "div").with_prop("data-y", 2.0);

        let outcome = engine.sync_from_tree(tree);
        assert!(matches!(
            outcome,
            SyncOutcome::Failed(SyncError::InvalidTree(tandem_common::CommonError::ReservedProp { .. }))
        ));
        assert_eq!(*engine.baseline(), Baseline::default());
    }
}
