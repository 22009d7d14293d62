//! ConquestReporter: the immutable result plus the rows to persist.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::accounting::{SettledTerritory, Settlement};
use crate::route::RouteWarning;
use crate::territory::{User, UserId};

/// One user who lost land to the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Victim {
    pub user_id: UserId,
    pub user_name: String,
    pub user_color: String,
    pub stolen_area: f64,
}

/// What a submission did, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConquestResult {
    pub new_area_conquered: f64,
    pub total_area: f64,
    pub area_stolen: f64,
    pub victims: Vec<Victim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RouteWarning>,
}

impl ConquestResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A territory row to write, guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryUpdate {
    pub owner: UserId,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
    /// 0 when the row did not exist in the snapshot.
    pub expected_version: u64,
}

impl From<SettledTerritory> for TerritoryUpdate {
    fn from(t: SettledTerritory) -> Self {
        TerritoryUpdate {
            owner: t.owner,
            geometry: t.geometry,
            area: t.area,
            expected_version: t.expected_version,
        }
    }
}

/// Land taken from one defender, destined for the conquest ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theft {
    pub defender: UserId,
    pub area_stolen: f64,
}

/// Everything one submission produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ConquestReport {
    pub result: ConquestResult,
    /// Changed rows, submitter first, then every cut territory in ascending id order.
    pub updates: Vec<TerritoryUpdate>,
    pub thefts: Vec<Theft>,
}

/// Assembles the report for a settled submission. Performs no I/O.
///
/// Victims whose user record is missing from `users` are reported with an
/// empty name and color.
pub fn assemble(
    settlement: Settlement,
    users: &BTreeMap<UserId, User>,
    warnings: Vec<RouteWarning>,
) -> ConquestReport {
    let area_stolen = settlement.area_stolen();
    let total_area = settlement.submitter.area;

    let mut victims = Vec::with_capacity(settlement.victims.len());
    let mut thefts = Vec::with_capacity(settlement.victims.len());
    let mut updates = Vec::with_capacity(settlement.victims.len() + settlement.trimmed.len() + 1);
    if settlement.submitter.changed {
        updates.push(TerritoryUpdate::from(settlement.submitter));
    }
    let mut cut = Vec::with_capacity(settlement.victims.len() + settlement.trimmed.len());
    cut.extend(settlement.trimmed.into_iter().map(TerritoryUpdate::from));
    for v in settlement.victims {
        let owner = v.territory.owner;
        let (user_name, user_color) = users
            .get(&owner)
            .map(|u| (u.name.clone(), u.color.clone()))
            .unwrap_or_default();
        victims.push(Victim {
            user_id: owner,
            user_name,
            user_color,
            stolen_area: v.stolen_area,
        });
        thefts.push(Theft {
            defender: owner,
            area_stolen: v.stolen_area,
        });
        cut.push(TerritoryUpdate::from(v.territory));
    }
    cut.sort_by_key(|u| u.owner);
    updates.extend(cut);

    ConquestReport {
        result: ConquestResult {
            new_area_conquered: settlement.new_area_conquered,
            total_area,
            area_stolen,
            victims,
            warnings,
        },
        updates,
        thefts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::SettledVictim;
    use crate::geometry::empty_multipolygon;

    fn settled(owner: u64, area: f64, prior_area: f64, changed: bool) -> SettledTerritory {
        SettledTerritory {
            owner: UserId(owner),
            geometry: empty_multipolygon(),
            area,
            prior_area,
            expected_version: owner,
            changed,
        }
    }

    fn users() -> BTreeMap<UserId, User> {
        let mut m = BTreeMap::new();
        m.insert(UserId(2), User::new(UserId(2), "Bea", "#ff0000"));
        m
    }

    #[test]
    fn victims_carry_user_details_and_sum_to_area_stolen() {
        let settlement = Settlement {
            submitter: settled(1, 900.0, 100.0, true),
            new_area_conquered: 800.0,
            victims: vec![
                SettledVictim {
                    territory: settled(2, 50.0, 250.0, true),
                    stolen_area: 200.0,
                },
                SettledVictim {
                    territory: settled(3, 0.0, 75.0, true),
                    stolen_area: 75.0,
                },
            ],
            trimmed: Vec::new(),
        };
        let report = assemble(settlement, &users(), Vec::new());
        assert_eq!(report.result.area_stolen, 275.0);
        assert_eq!(report.result.total_area, 900.0);
        assert_eq!(report.result.victims[0].user_name, "Bea");
        assert_eq!(report.result.victims[0].user_color, "#ff0000");
        assert_eq!(report.result.victims[1].user_name, "");
        let owners: Vec<u64> = report.updates.iter().map(|u| u.owner.0).collect();
        assert_eq!(owners, vec![1, 2, 3]);
        assert_eq!(report.thefts.len(), 2);
        assert_eq!(report.updates[1].expected_version, 2);
    }

    #[test]
    fn unchanged_submitter_is_not_written() {
        let settlement = Settlement {
            submitter: settled(1, 100.0, 100.0, false),
            new_area_conquered: 0.0,
            victims: Vec::new(),
            trimmed: Vec::new(),
        };
        let report = assemble(settlement, &users(), Vec::new());
        assert!(report.updates.is_empty());
        assert!(report.result.victims.is_empty());
    }

    #[test]
    fn trimmed_rows_are_written_without_a_theft() {
        let settlement = Settlement {
            submitter: settled(1, 500.0, 0.0, true),
            new_area_conquered: 500.0,
            victims: vec![SettledVictim {
                territory: settled(4, 10.0, 60.0, true),
                stolen_area: 50.0,
            }],
            trimmed: vec![settled(2, 99.7, 100.0, true)],
        };
        let report = assemble(settlement, &users(), Vec::new());
        let owners: Vec<u64> = report.updates.iter().map(|u| u.owner.0).collect();
        assert_eq!(owners, vec![1, 2, 4]);
        assert_eq!(report.updates[1].area, 99.7);
        assert_eq!(report.thefts, vec![Theft { defender: UserId(4), area_stolen: 50.0 }]);
        assert_eq!(report.result.victims.len(), 1);
        assert_eq!(report.result.area_stolen, 50.0);
    }

    #[test]
    fn json_uses_camel_case_and_omits_empty_warnings() {
        let result = ConquestResult {
            new_area_conquered: 10.5,
            total_area: 20.0,
            area_stolen: 4.0,
            victims: vec![Victim {
                user_id: UserId(7),
                user_name: "Kai".into(),
                user_color: "#00ff00".into(),
                stolen_area: 4.0,
            }],
            warnings: Vec::new(),
        };
        assert_eq!(
            result.to_json().unwrap(),
            r##"{"newAreaConquered":10.5,"totalArea":20.0,"areaStolen":4.0,"victims":[{"userId":7,"userName":"Kai","userColor":"#00ff00","stolenArea":4.0}]}"##
        );
    }

    #[test]
    fn json_includes_warnings_when_present() {
        let result = ConquestResult {
            new_area_conquered: 0.0,
            total_area: 0.0,
            area_stolen: 0.0,
            victims: Vec::new(),
            warnings: vec![RouteWarning::Teleport {
                index: 1,
                jump_meters: 3000.0,
            }],
        };
        assert!(result.to_json().unwrap().contains(r#""warnings":[{"kind":"teleport""#));
    }
}
