//! Batch simulation of many runners competing for the same neighbourhood.
//!
//! Registers a set of runners, then plays rounds in which every runner
//! submits a random closed loop near a shared centre. Submissions within a
//! round run concurrently on a rayon pool, so they race for the same rows and
//! exercise the snapshot/commit retry path. After the last round the store is
//! audited for the invariants the engine promises.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use geo::{coord, BooleanOps};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::config::EngineConfig;
use crate::engine::ConquestEngine;
use crate::geometry::{geodesic_area, rects_intersect, GeoPoint, LocalProjection};
use crate::store::{MemoryStore, StoreError, TerritoryStore};
use crate::territory::{User, UserId};

/// Runner colors, cycled by id.
const PALETTE: [&str; 8] = [
    "#e63946", "#457b9d", "#2a9d8f", "#f4a261", "#8338ec", "#ff006e", "#3a86ff", "#6a994e",
];

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of registered runners.
    pub runners: usize,
    /// Rounds; each runner submits one route per round.
    pub rounds: usize,
    /// Parallel submissions per round.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Centre of the contested area.
    pub centre: GeoPoint,
    /// Loop centres are drawn from a square of this half-size around `centre` (meters).
    pub spread_m: f64,
    /// Typical loop radius (meters).
    pub loop_radius_m: f64,
    /// Suppress per-round progress output.
    pub quiet: bool,
    pub engine: EngineConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            runners: 8,
            rounds: 5,
            threads: 4,
            seed: 0,
            centre: GeoPoint::new(51.5074, -0.1278),
            spread_m: 600.0,
            loop_radius_m: 250.0,
            quiet: false,
            engine: EngineConfig::default(),
        }
    }
}

/// One submission, written as a JSONL line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub round: usize,
    pub runner: UserId,
    /// `ok`, or the error kind.
    pub outcome: String,
    pub new_area_conquered: f64,
    pub area_stolen: f64,
    pub victims: usize,
    pub elapsed_ms: f64,
}

/// Post-run invariant check over the whole store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub users_checked: usize,
    /// Largest |user.totalArea - recomputed territory area| (m²).
    pub max_total_drift_m2: f64,
    /// Largest geodesic overlap between two users' territories (m²).
    pub max_overlap_m2: f64,
    pub consistent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub records: Vec<SubmissionRecord>,
    pub failures: BTreeMap<String, usize>,
    pub total_stolen: f64,
    pub audit: AuditReport,
}

impl SimulationReport {
    pub fn submissions(&self) -> usize {
        self.records.len()
    }
}

/// A random closed loop around a random point near `config.centre`.
pub fn random_loop(config: &SimulationConfig, rng: &mut SmallRng) -> Vec<GeoPoint> {
    let projection = LocalProjection::new(config.centre);
    let cx = rng.gen_range(-config.spread_m..=config.spread_m);
    let cy = rng.gen_range(-config.spread_m..=config.spread_m);
    let radius = config.loop_radius_m * rng.gen_range(0.5..1.5);
    let vertices = rng.gen_range(4..=9);
    let phase = rng.gen_range(0.0..std::f64::consts::TAU);

    let mut points: Vec<GeoPoint> = (0..vertices)
        .map(|i| {
            let angle = phase + std::f64::consts::TAU * i as f64 / vertices as f64;
            let r = radius * rng.gen_range(0.8..1.2);
            projection.inverse(coord! { x: cx + r * angle.cos(), y: cy + r * angle.sin() })
        })
        .collect();
    points.push(points[0]);
    points
}

fn path_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| crate::geometry::haversine_m(w[0], w[1]))
        .sum()
}

/// Runs a full simulation on a fresh [`MemoryStore`].
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationReport, StoreError> {
    let engine = ConquestEngine::new(MemoryStore::new(), config.engine.clone());
    for i in 0..config.runners {
        let id = UserId(i as u64 + 1);
        engine
            .store()
            .register_user(User::new(id, format!("runner-{}", id), PALETTE[i % PALETTE.len()]))?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.max(1))
        .build()
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    let completed = AtomicUsize::new(0);
    let mut report = SimulationReport::default();
    for round in 0..config.rounds {
        let round_start = Instant::now();
        let records: Vec<SubmissionRecord> = pool.install(|| {
            (0..config.runners)
                .into_par_iter()
                .map(|i| {
                    let mut rng = if config.seed != 0 {
                        SmallRng::seed_from_u64(config.seed.wrapping_add((round * config.runners + i) as u64))
                    } else {
                        SmallRng::from_entropy()
                    };
                    let runner = UserId(i as u64 + 1);
                    let route = random_loop(config, &mut rng);
                    let distance = path_length(&route);
                    let start = Instant::now();
                    let outcome = engine.process_route(runner, &route, distance, distance / 3.0);
                    completed.fetch_add(1, Ordering::Relaxed);
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    match outcome {
                        Ok(r) => SubmissionRecord {
                            round,
                            runner,
                            outcome: "ok".to_string(),
                            new_area_conquered: r.new_area_conquered,
                            area_stolen: r.area_stolen,
                            victims: r.victims.len(),
                            elapsed_ms,
                        },
                        Err(e) => {
                            warn!(%runner, round, error = %e, "simulated submission failed");
                            SubmissionRecord {
                                round,
                                runner,
                                outcome: e.kind().to_string(),
                                new_area_conquered: 0.0,
                                area_stolen: 0.0,
                                victims: 0,
                                elapsed_ms,
                            }
                        }
                    }
                })
                .collect()
        });
        if !config.quiet {
            let stolen: f64 = records.iter().map(|r| r.area_stolen).sum();
            eprintln!(
                "Round {}/{}: {} submissions, {:.0} m² stolen ({:.1}s)",
                round + 1,
                config.rounds,
                completed.load(Ordering::Relaxed),
                stolen,
                round_start.elapsed().as_secs_f64(),
            );
        }
        report.records.extend(records);
    }

    for r in &report.records {
        if r.outcome != "ok" {
            *report.failures.entry(r.outcome.clone()).or_default() += 1;
        }
        report.total_stolen += r.area_stolen;
    }
    report.audit = audit(engine.store(), config.engine.negligible_area_m2)?;
    Ok(report)
}

/// Checks cached totals against geometry and looks for overlapping owners.
pub fn audit(store: &MemoryStore, tolerance_m2: f64) -> Result<AuditReport, StoreError> {
    let users = store.users()?;
    let territories = store.territories()?;
    let mut report = AuditReport {
        users_checked: users.len(),
        ..AuditReport::default()
    };

    for user in &users {
        let area = store.territory(user.id)?.map_or(0.0, |t| geodesic_area(&t.geometry));
        report.max_total_drift_m2 = report.max_total_drift_m2.max((user.total_area - area).abs());
    }

    for (i, a) in territories.iter().enumerate() {
        for b in &territories[i + 1..] {
            let (Some(ba), Some(bb)) = (a.bounds(), b.bounds()) else {
                continue;
            };
            if !rects_intersect(&ba, &bb) {
                continue;
            }
            let overlap = geodesic_area(&a.geometry.intersection(&b.geometry));
            report.max_overlap_m2 = report.max_overlap_m2.max(overlap);
        }
    }

    report.consistent = report.max_total_drift_m2 <= tolerance_m2 && report.max_overlap_m2 <= tolerance_m2;
    Ok(report)
}

/// Writes submission records as JSONL (one JSON object per line).
pub fn write_jsonl<W: Write>(records: &[SubmissionRecord], out: &mut W) -> std::io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    out.flush()
}

pub fn print_summary(report: &SimulationReport) {
    let ok = report.records.iter().filter(|r| r.outcome == "ok").count();
    let mean_ms = report.records.iter().map(|r| r.elapsed_ms).sum::<f64>() / report.submissions().max(1) as f64;

    eprintln!("=== Simulation Summary ===");
    eprintln!("Submissions: {}", report.submissions());
    eprintln!("Succeeded: {}", ok);
    for (kind, n) in &report.failures {
        eprintln!("  {:>20}: {}", kind, n);
    }
    eprintln!("Total stolen: {:.0} m²", report.total_stolen);
    eprintln!("Mean latency: {:.1} ms", mean_ms);
    eprintln!(
        "Audit: {} users, max drift {:.3} m², max overlap {:.3} m², {}",
        report.audit.users_checked,
        report.audit.max_total_drift_m2,
        report.audit.max_overlap_m2,
        if report.audit.consistent { "consistent" } else { "INCONSISTENT" }
    );
}
