//! Conquest ledger: an append-only record of every committed theft.

use serde::{Deserialize, Serialize};

use crate::report::Theft;
use crate::territory::UserId;

/// Land one user took from another in one committed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConquestRecord {
    /// Commit sequence number; records of one submission share it.
    pub sequence: u64,
    pub attacker: UserId,
    pub defender: UserId,
    pub area_stolen: f64,
}

/// Per-user totals over the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConquestStats {
    /// Land this user took from others (m²).
    pub area_stolen: f64,
    /// Land others took from this user (m²).
    pub area_robbed: f64,
    pub conquests: usize,
    pub defeats: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConquestLedger {
    records: Vec<ConquestRecord>,
}

impl ConquestLedger {
    pub fn from_records(mut records: Vec<ConquestRecord>) -> Self {
        records.sort_by_key(|r| r.sequence);
        ConquestLedger { records }
    }

    pub fn append(&mut self, sequence: u64, attacker: UserId, thefts: &[Theft]) {
        self.records.extend(thefts.iter().map(|t| ConquestRecord {
            sequence,
            attacker,
            defender: t.defender,
            area_stolen: t.area_stolen,
        }));
    }

    pub fn records(&self) -> &[ConquestRecord] {
        &self.records
    }

    pub fn stats(&self, user: UserId) -> ConquestStats {
        let mut stats = ConquestStats::default();
        for r in &self.records {
            if r.attacker == user {
                stats.area_stolen += r.area_stolen;
                stats.conquests += 1;
            }
            if r.defender == user {
                stats.area_robbed += r.area_stolen;
                stats.defeats += 1;
            }
        }
        stats
    }

    /// Total land `attacker` has taken from `defender`.
    pub fn between(&self, attacker: UserId, defender: UserId) -> f64 {
        self.records
            .iter()
            .filter(|r| r.attacker == attacker && r.defender == defender)
            .map(|r| r.area_stolen)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theft(defender: u64, area: f64) -> Theft {
        Theft {
            defender: UserId(defender),
            area_stolen: area,
        }
    }

    #[test]
    fn stats_split_attack_and_defence() {
        let mut ledger = ConquestLedger::default();
        ledger.append(1, UserId(1), &[theft(2, 100.0), theft(3, 50.0)]);
        ledger.append(2, UserId(2), &[theft(1, 30.0)]);

        let a = ledger.stats(UserId(1));
        assert_eq!(a.area_stolen, 150.0);
        assert_eq!(a.area_robbed, 30.0);
        assert_eq!((a.conquests, a.defeats), (2, 1));

        let c = ledger.stats(UserId(3));
        assert_eq!(c.area_stolen, 0.0);
        assert_eq!(c.area_robbed, 50.0);

        assert_eq!(ledger.between(UserId(1), UserId(2)), 100.0);
        assert_eq!(ledger.between(UserId(2), UserId(1)), 30.0);
        assert_eq!(ledger.between(UserId(3), UserId(1)), 0.0);
    }

    #[test]
    fn from_records_orders_by_sequence() {
        let rec = |sequence| ConquestRecord {
            sequence,
            attacker: UserId(1),
            defender: UserId(2),
            area_stolen: 1.0,
        };
        let ledger = ConquestLedger::from_records(vec![rec(3), rec(1), rec(2)]);
        let seqs: Vec<u64> = ledger.records().iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
