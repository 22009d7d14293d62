//! Concurrent submissions and commit contention.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use geo::{coord, Rect};
use landgrab::geometry::{GeoPoint, LocalProjection};
use landgrab::simulation::audit;
use landgrab::store::{CommitOutcome, CommitSet, MemoryStore, Snapshot, StoreError, TerritoryStore};
use landgrab::territory::Territory;
use landgrab::{ConquestEngine, ConquestError, EngineConfig, User, UserId};

const ORIGIN: GeoPoint = GeoPoint::new(-33.8688, 151.2093);

fn at(east: f64, north: f64) -> GeoPoint {
    LocalProjection::new(ORIGIN).inverse(coord! { x: east, y: north })
}

fn square_loop(x0: f64, y0: f64, size: f64) -> Vec<GeoPoint> {
    vec![
        at(x0, y0),
        at(x0 + size, y0),
        at(x0 + size, y0 + size),
        at(x0, y0 + size),
        at(x0, y0),
    ]
}

fn store_with_users(n: u64) -> MemoryStore {
    let store = MemoryStore::new();
    for id in 1..=n {
        store
            .register_user(User::new(UserId(id), format!("runner-{}", id), "#000000"))
            .unwrap();
    }
    store
}

/// Delegates to a [`MemoryStore`] but reports a conflict for the first
/// `conflicts` commits it sees.
struct ContendedStore {
    inner: MemoryStore,
    conflicts: usize,
    commits: AtomicUsize,
}

impl ContendedStore {
    fn new(inner: MemoryStore, conflicts: usize) -> Self {
        ContendedStore {
            inner,
            conflicts,
            commits: AtomicUsize::new(0),
        }
    }
}

impl TerritoryStore for ContendedStore {
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.user(id)
    }

    fn territory(&self, owner: UserId) -> Result<Option<Territory>, StoreError> {
        self.inner.territory(owner)
    }

    fn snapshot(&self, submitter: UserId, bounds: &Rect<f64>) -> Result<Snapshot, StoreError> {
        self.inner.snapshot(submitter, bounds)
    }

    fn commit(&self, commit: &CommitSet) -> Result<CommitOutcome, StoreError> {
        let n = self.commits.fetch_add(1, Ordering::SeqCst);
        if n < self.conflicts {
            return Ok(CommitOutcome::Conflict {
                owner: commit.attacker,
                expected: 0,
                found: 1,
            });
        }
        self.inner.commit(commit)
    }
}

#[test]
fn overlapping_parallel_submissions_leave_a_consistent_store() {
    let engine = ConquestEngine::new(store_with_users(8), EngineConfig::default());

    thread::scope(|s| {
        for id in 1..=8u64 {
            let engine = &engine;
            s.spawn(move || {
                for round in 0..3 {
                    let offset = (id as f64) * 60.0 + (round as f64) * 25.0;
                    let route = square_loop(offset, offset * 0.5, 300.0);
                    match engine.process_route(UserId(id), &route, 1200.0, 400.0) {
                        Ok(result) => assert!(result.new_area_conquered >= 0.0),
                        Err(ConquestError::ConflictExhausted { .. }) => {}
                        Err(e) => panic!("runner {} failed: {}", id, e),
                    }
                }
            });
        }
    });

    let report = audit(engine.store(), 5.0).unwrap();
    assert_eq!(report.users_checked, 8);
    assert!(report.consistent, "{:?}", report);

    let ledger_total: f64 = engine.store().conquests().unwrap().iter().map(|r| r.area_stolen).sum();
    let stats_total: f64 = (1..=8u64)
        .map(|id| engine.store().stats(UserId(id)).unwrap().area_stolen)
        .sum();
    assert!((ledger_total - stats_total).abs() < 1e-6);
}

#[test]
fn commit_succeeds_after_transient_conflicts() {
    let store = ContendedStore::new(store_with_users(1), 2);
    let engine = ConquestEngine::new(store, EngineConfig::default());

    let result = engine
        .process_route(UserId(1), &square_loop(0.0, 0.0, 200.0), 800.0, 300.0)
        .unwrap();
    assert!(result.new_area_conquered > 0.0);
    assert_eq!(engine.store().commits.load(Ordering::SeqCst), 3);

    let territory = engine.store().territory(UserId(1)).unwrap().unwrap();
    assert_eq!(territory.version, 1);
    assert_eq!(territory.area, result.total_area);
}

#[test]
fn exhausted_retries_persist_nothing() {
    let mut config = EngineConfig::default();
    config.max_commit_attempts = 3;
    let store = ContendedStore::new(store_with_users(1), usize::MAX);
    let engine = ConquestEngine::new(store, config);

    let err = engine
        .process_route(UserId(1), &square_loop(0.0, 0.0, 200.0), 800.0, 300.0)
        .unwrap_err();
    assert!(matches!(err, ConquestError::ConflictExhausted { attempts: 3 }));
    assert_eq!(err.kind(), "conflict_exhausted");
    assert!(err.is_retryable());
    assert_eq!(engine.store().commits.load(Ordering::SeqCst), 3);

    assert!(engine.store().territory(UserId(1)).unwrap().is_none());
    assert_eq!(engine.store().user(UserId(1)).unwrap().unwrap().total_area, 0.0);
    assert!(engine.store().inner.conquests().unwrap().is_empty());
}

#[test]
fn stale_snapshot_is_rejected_by_the_store() {
    let store = store_with_users(2);
    let engine = ConquestEngine::new(store, EngineConfig::default());
    let bounds = Rect::new(at(-100.0, -100.0).to_coord(), at(400.0, 400.0).to_coord());

    // Reader takes a snapshot, then a rival claims land inside the same box.
    let stale = engine.store().snapshot(UserId(1), &bounds).unwrap();
    engine
        .process_route(UserId(2), &square_loop(0.0, 0.0, 200.0), 800.0, 300.0)
        .unwrap();

    let outcome = engine
        .store()
        .commit(&CommitSet {
            attacker: UserId(1),
            claim_bounds: bounds,
            read_set: stale.read_set,
            updates: Vec::new(),
            thefts: Vec::new(),
        })
        .unwrap();
    assert!(matches!(outcome, CommitOutcome::Conflict { owner: UserId(2), .. }));
}
