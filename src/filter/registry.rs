//! Filter registration and per-phase ordering.
//!
//! # Responsibilities
//! - Group registered filters by phase
//! - Keep each phase ordered by (priority, registration order)
//! - Publish updates atomically to concurrent readers
//!
//! # Design Decisions
//! - Copy-on-write snapshot behind `ArcSwap`: readers never lock
//! - Writers are serialized; each write publishes a complete new snapshot
//! - A request holding a `PhaseFilters` keeps its snapshot alive even if a
//!   reload lands mid-phase

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::filter::{Filter, Phase};

/// Errors raised while mutating the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Strict ordering is enabled and the priority is already taken.
    #[error("filter `{rejected}` duplicates priority {priority} of `{existing}` in phase {phase}")]
    DuplicatePriority {
        phase: Phase,
        priority: i32,
        existing: String,
        rejected: String,
    },

    /// A filter was handed to a phase it does not declare.
    #[error("filter `{filter}` belongs to phase {actual}, not {expected}")]
    PhaseMismatch {
        filter: String,
        expected: Phase,
        actual: Phase,
    },
}

#[derive(Clone)]
struct Entry {
    priority: i32,
    seq: u64,
    filter: Arc<dyn Filter>,
}

#[derive(Clone, Default)]
struct Snapshot {
    phases: [Vec<Entry>; 4],
}

/// Shared, hot-reloadable set of filters.
pub struct FilterRegistry {
    current: ArcSwap<Snapshot>,
    /// Serializes writers; holds the next registration sequence number.
    next_seq: Mutex<u64>,
    strict_priorities: bool,
}

impl FilterRegistry {
    /// Create a registry where equal priorities are ordered by registration.
    pub fn new() -> Self {
        Self::with_strict_priorities(false)
    }

    /// Create a registry; when `strict` is set, equal priorities within a
    /// phase are rejected.
    pub fn with_strict_priorities(strict: bool) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            next_seq: Mutex::new(0),
            strict_priorities: strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict_priorities
    }

    /// Add a filter to its phase.
    pub fn register(&self, filter: Arc<dyn Filter>) -> Result<(), RegistryError> {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.current.load();
        let phase = filter.phase();
        let priority = filter.priority();

        if self.strict_priorities {
            if let Some(existing) = current.phases[phase.index()]
                .iter()
                .find(|e| e.priority == priority)
            {
                return Err(RegistryError::DuplicatePriority {
                    phase,
                    priority,
                    existing: existing.filter.id().to_string(),
                    rejected: filter.id().to_string(),
                });
            }
        }

        let mut updated = Snapshot::clone(&current);
        let entries = &mut updated.phases[phase.index()];
        // Insert after every entry with priority <= ours to keep registration order on ties.
        let position = entries.partition_point(|e| e.priority <= priority);
        entries.insert(
            position,
            Entry {
                priority,
                seq: *next_seq,
                filter,
            },
        );
        *next_seq += 1;

        self.current.store(Arc::new(updated));
        Ok(())
    }

    /// Atomically replace every filter of one phase.
    ///
    /// Used by configuration reload: requests see either the old list or the
    /// new one.
    pub fn replace_phase(
        &self,
        phase: Phase,
        filters: Vec<Arc<dyn Filter>>,
    ) -> Result<(), RegistryError> {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(|e| e.into_inner());

        let mut entries = Vec::with_capacity(filters.len());
        for filter in filters {
            if filter.phase() != phase {
                return Err(RegistryError::PhaseMismatch {
                    filter: filter.id().to_string(),
                    expected: phase,
                    actual: filter.phase(),
                });
            }
            entries.push(Entry {
                priority: filter.priority(),
                seq: *next_seq,
                filter,
            });
            *next_seq += 1;
        }
        entries.sort_by_key(|e| (e.priority, e.seq));

        if self.strict_priorities {
            if let Some(pair) = entries.windows(2).find(|w| w[0].priority == w[1].priority) {
                return Err(RegistryError::DuplicatePriority {
                    phase,
                    priority: pair[1].priority,
                    existing: pair[0].filter.id().to_string(),
                    rejected: pair[1].filter.id().to_string(),
                });
            }
        }

        let mut updated = Snapshot::clone(&self.current.load());
        updated.phases[phase.index()] = entries;
        self.current.store(Arc::new(updated));
        Ok(())
    }

    /// Ordered filters of a phase, pinned to the current snapshot.
    pub fn filters_for(&self, phase: Phase) -> PhaseFilters {
        PhaseFilters {
            snapshot: self.current.load_full(),
            phase,
        }
    }

    /// Total number of registered filters across all phases.
    pub fn len(&self) -> usize {
        self.current.load().phases.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Restartable, ordered view of one phase's filters.
///
/// Every call to [`PhaseFilters::iter`] walks the same snapshot from the
/// start; query the registry again to observe later registrations.
#[derive(Clone)]
pub struct PhaseFilters {
    snapshot: Arc<Snapshot>,
    phase: Phase,
}

impl PhaseFilters {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Filter>> + '_ {
        self.entries().iter().map(|e| &e.filter)
    }

    pub fn ids(&self) -> Vec<String> {
        self.iter().map(|f| f.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> &[Entry] {
        &self.snapshot.phases[self.phase.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOutcome, RequestContext};

    struct Named {
        id: &'static str,
        phase: Phase,
        priority: i32,
    }

    impl Filter for Named {
        fn id(&self) -> &str {
            self.id
        }
        fn phase(&self) -> Phase {
            self.phase
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn run(&self, _ctx: &mut RequestContext) -> FilterOutcome {
            FilterOutcome::Continue
        }
    }

    fn named(id: &'static str, phase: Phase, priority: i32) -> Arc<dyn Filter> {
        Arc::new(Named { id, phase, priority })
    }

    #[test]
    fn test_priority_then_registration_order() {
        let registry = FilterRegistry::new();
        registry.register(named("late", Phase::Pre, 10)).unwrap();
        registry.register(named("first-tie", Phase::Pre, 1)).unwrap();
        registry.register(named("negative", Phase::Pre, -5)).unwrap();
        registry.register(named("second-tie", Phase::Pre, 1)).unwrap();
        registry.register(named("post", Phase::Post, 0)).unwrap();

        let pre = registry.filters_for(Phase::Pre);
        assert_eq!(pre.ids(), vec!["negative", "first-tie", "second-tie", "late"]);
        // Restartable: walking again yields the same order.
        assert_eq!(pre.ids(), pre.iter().map(|f| f.id().to_string()).collect::<Vec<_>>());
        assert_eq!(registry.filters_for(Phase::Post).len(), 1);
        assert!(registry.filters_for(Phase::Route).is_empty());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_requery_sees_new_registration() {
        let registry = FilterRegistry::new();
        registry.register(named("a", Phase::Route, 1)).unwrap();
        let before = registry.filters_for(Phase::Route);

        registry.register(named("b", Phase::Route, 0)).unwrap();

        assert_eq!(before.ids(), vec!["a"]);
        assert_eq!(registry.filters_for(Phase::Route).ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_strict_rejects_duplicate_priority() {
        let registry = FilterRegistry::with_strict_priorities(true);
        registry.register(named("a", Phase::Pre, 1)).unwrap();
        registry.register(named("other-phase", Phase::Post, 1)).unwrap();

        let err = registry.register(named("b", Phase::Pre, 1)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicatePriority {
                phase: Phase::Pre,
                priority: 1,
                existing: "a".into(),
                rejected: "b".into(),
            }
        );
        assert_eq!(registry.filters_for(Phase::Pre).ids(), vec!["a"]);
    }

    #[test]
    fn test_replace_phase() {
        let registry = FilterRegistry::new();
        registry.register(named("pre", Phase::Pre, 0)).unwrap();
        registry.register(named("old", Phase::Route, 0)).unwrap();

        registry
            .replace_phase(Phase::Route, vec![named("new-2", Phase::Route, 2), named("new-1", Phase::Route, 1)])
            .unwrap();
        assert_eq!(registry.filters_for(Phase::Route).ids(), vec!["new-1", "new-2"]);
        assert_eq!(registry.filters_for(Phase::Pre).ids(), vec!["pre"]);

        let err = registry
            .replace_phase(Phase::Route, vec![named("wrong", Phase::Post, 0)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::PhaseMismatch { .. }));
        assert_eq!(registry.filters_for(Phase::Route).ids(), vec!["new-1", "new-2"]);
    }
}
