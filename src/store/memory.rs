//! In-process territory store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use geo::{MultiPolygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    CommitOutcome, CommitSet, ConquestLedger, ConquestRecord, ConquestStats, Snapshot, StoreError,
    TerritoryStore,
};
use crate::protocol::geojson::MultiPolygonDocument;
use crate::territory::{Territory, User, UserId};

/// Bounding box of one owner's territory in the spatial index.
type Footprint = GeomWithData<Rectangle<[f64; 2]>, UserId>;

fn footprint(territory: &Territory) -> Option<Footprint> {
    territory.bounds().map(|b| {
        GeomWithData::new(
            Rectangle::from_corners([b.min().x, b.min().y], [b.max().x, b.max().y]),
            territory.owner,
        )
    })
}

fn envelope(bounds: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([bounds.min().x, bounds.min().y], [bounds.max().x, bounds.max().y])
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    territories: BTreeMap<UserId, Territory>,
    index: RTree<Footprint>,
    ledger: ConquestLedger,
    sequence: u64,
}

impl Inner {
    fn version(&self, owner: UserId) -> u64 {
        self.territories.get(&owner).map_or(0, |t| t.version)
    }

    fn owners_in(&self, bounds: &Rect<f64>) -> BTreeSet<UserId> {
        self.index
            .locate_in_envelope_intersecting(&envelope(bounds))
            .map(|f| f.data)
            .collect()
    }

    fn put_territory(&mut self, territory: Territory) {
        if let Some(old) = self.territories.get(&territory.owner).and_then(footprint) {
            self.index.remove(&old);
        }
        if let Some(new) = footprint(&territory) {
            self.index.insert(new);
        }
        self.territories.insert(territory.owner, territory);
    }
}

/// Serialized form of a whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    pub sequence: u64,
    pub users: Vec<User>,
    pub territories: Vec<TerritoryRecord>,
    pub conquests: Vec<ConquestRecord>,
}

/// One persisted territory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryRecord {
    pub owner: UserId,
    pub geometry: MultiPolygonDocument,
    pub area: f64,
    pub version: u64,
}

impl From<&Territory> for TerritoryRecord {
    fn from(t: &Territory) -> Self {
        TerritoryRecord {
            owner: t.owner,
            geometry: MultiPolygonDocument::from(&t.geometry),
            area: t.area,
            version: t.version,
        }
    }
}

impl TryFrom<TerritoryRecord> for Territory {
    type Error = StoreError;

    fn try_from(r: TerritoryRecord) -> Result<Self, Self::Error> {
        let geometry = MultiPolygon::try_from(r.geometry)
            .map_err(|e| StoreError::Invalid(format!("territory of user {}: {}", r.owner, e)))?;
        Ok(Territory {
            owner: r.owner,
            geometry,
            area: r.area,
            version: r.version,
        })
    }
}

/// A `RwLock`-guarded store with an R-tree over territory bounds.
///
/// Snapshots take the read lock, commits the write lock; neither is held
/// while the conquest pipeline runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Inserts a user or updates their name and color.
    ///
    /// `total_area` always stays the store's own figure.
    pub fn register_user(&self, user: User) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let total_area = inner.users.get(&user.id).map_or(0.0, |u| u.total_area);
        inner.users.insert(user.id, User { total_area, ..user });
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    pub fn territories(&self) -> Result<Vec<Territory>, StoreError> {
        Ok(self.read()?.territories.values().cloned().collect())
    }

    pub fn stats(&self, user: UserId) -> Result<ConquestStats, StoreError> {
        Ok(self.read()?.ledger.stats(user))
    }

    pub fn between(&self, attacker: UserId, defender: UserId) -> Result<f64, StoreError> {
        Ok(self.read()?.ledger.between(attacker, defender))
    }

    pub fn conquests(&self) -> Result<Vec<ConquestRecord>, StoreError> {
        Ok(self.read()?.ledger.records().to_vec())
    }

    pub fn export(&self) -> Result<StoreDocument, StoreError> {
        let inner = self.read()?;
        Ok(StoreDocument {
            sequence: inner.sequence,
            users: inner.users.values().cloned().collect(),
            territories: inner.territories.values().map(TerritoryRecord::from).collect(),
            conquests: inner.ledger.records().to_vec(),
        })
    }

    /// Replaces the whole store content with `doc`.
    pub fn restore(&self, doc: StoreDocument) -> Result<(), StoreError> {
        let mut next = Inner {
            sequence: doc.sequence,
            ledger: ConquestLedger::from_records(doc.conquests),
            ..Inner::default()
        };
        for user in doc.users {
            next.users.insert(user.id, user);
        }
        for record in doc.territories {
            let territory = Territory::try_from(record)?;
            if !next.users.contains_key(&territory.owner) {
                return Err(StoreError::Invalid(format!(
                    "territory owned by unknown user {}",
                    territory.owner
                )));
            }
            next.put_territory(territory);
        }
        *self.write()? = next;
        Ok(())
    }

    pub fn import(doc: StoreDocument) -> Result<Self, StoreError> {
        let store = MemoryStore::new();
        store.restore(doc)?;
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.export()?)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let text = fs::read_to_string(path)?;
        self.restore(serde_json::from_str(&text)?)
    }
}

impl TerritoryStore for MemoryStore {
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn territory(&self, owner: UserId) -> Result<Option<Territory>, StoreError> {
        Ok(self.read()?.territories.get(&owner).cloned())
    }

    fn snapshot(&self, submitter: UserId, bounds: &Rect<f64>) -> Result<Snapshot, StoreError> {
        let inner = self.read()?;
        let mine = inner
            .territories
            .get(&submitter)
            .cloned()
            .unwrap_or_else(|| Territory::unclaimed(submitter));

        let others: Vec<Territory> = inner
            .owners_in(bounds)
            .into_iter()
            .filter(|&owner| owner != submitter)
            .filter_map(|owner| inner.territories.get(&owner).cloned())
            .collect();

        let mut read_set = Vec::with_capacity(others.len() + 1);
        read_set.push((submitter, mine.version));
        read_set.extend(others.iter().map(|t| (t.owner, t.version)));

        let users = read_set
            .iter()
            .filter_map(|(id, _)| inner.users.get(id).map(|u| (*id, u.clone())))
            .collect();

        Ok(Snapshot {
            submitter: mine,
            others,
            users,
            read_set,
        })
    }

    fn commit(&self, commit: &CommitSet) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.write()?;

        for &(owner, expected) in &commit.read_set {
            let found = inner.version(owner);
            if found != expected {
                return Ok(CommitOutcome::Conflict { owner, expected, found });
            }
        }
        let read: BTreeSet<UserId> = commit.read_set.iter().map(|(id, _)| *id).collect();
        if let Some(owner) = inner
            .owners_in(&commit.claim_bounds)
            .into_iter()
            .find(|id| *id != commit.attacker && !read.contains(id))
        {
            return Ok(CommitOutcome::Conflict {
                owner,
                expected: 0,
                found: inner.version(owner),
            });
        }
        for update in &commit.updates {
            let found = inner.version(update.owner);
            if found != update.expected_version {
                return Ok(CommitOutcome::Conflict {
                    owner: update.owner,
                    expected: update.expected_version,
                    found,
                });
            }
            if !inner.users.contains_key(&update.owner) {
                return Err(StoreError::UnknownUser(update.owner));
            }
        }

        inner.sequence += 1;
        let sequence = inner.sequence;
        for update in &commit.updates {
            let territory = Territory {
                owner: update.owner,
                geometry: update.geometry.clone(),
                area: update.area,
                version: update.expected_version + 1,
            };
            if let Some(user) = inner.users.get_mut(&update.owner) {
                user.total_area = update.area;
            }
            debug!(owner = %update.owner, version = territory.version, area = update.area, "territory row written");
            inner.put_territory(territory);
        }
        inner.ledger.append(sequence, commit.attacker, &commit.thefts);
        if !commit.thefts.is_empty() {
            info!(
                sequence,
                attacker = %commit.attacker,
                victims = commit.thefts.len(),
                "conquest committed"
            );
        }
        Ok(CommitOutcome::Applied { sequence })
    }
}
