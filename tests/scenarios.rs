//! End-to-end conquest scenarios against an in-memory store.

use geo::{coord, BooleanOps, MultiPolygon, Polygon};
use landgrab::geometry::{geodesic_area, GeoPoint, LocalProjection};
use landgrab::report::TerritoryUpdate;
use landgrab::simulation::audit;
use landgrab::store::{CommitOutcome, CommitSet, MemoryStore, TerritoryStore};
use landgrab::{ConquestEngine, ConquestResult, EngineConfig, User, UserId};

const ORIGIN: GeoPoint = GeoPoint::new(45.4642, 9.1900);
const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);
const CARA: UserId = UserId(3);

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

fn square_polygon(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
    let ring: Vec<_> = square_loop(x0, y0, size).into_iter().map(GeoPoint::to_coord).collect();
    MultiPolygon::new(vec![Polygon::new(ring.into(), Vec::new())])
}

fn engine() -> ConquestEngine<MemoryStore> {
    let store = MemoryStore::new();
    store.register_user(User::new(ALICE, "Alice", "#e63946")).unwrap();
    store.register_user(User::new(BOB, "Bob", "#457b9d")).unwrap();
    store.register_user(User::new(CARA, "Cara", "#2a9d8f")).unwrap();
    ConquestEngine::new(store, EngineConfig::default())
}

/// Gives `owner` exactly `geometry`, bypassing the route pipeline.
fn grant(engine: &ConquestEngine<MemoryStore>, owner: UserId, geometry: MultiPolygon<f64>) -> f64 {
    let store = engine.store();
    let nowhere = geo::Rect::new(coord! { x: 179.0, y: 89.0 }, coord! { x: 179.0, y: 89.0 });
    let snapshot = store.snapshot(owner, &nowhere).unwrap();
    let area = geodesic_area(&geometry);
    let outcome = store
        .commit(&CommitSet {
            attacker: owner,
            claim_bounds: nowhere,
            read_set: snapshot.read_set,
            updates: vec![TerritoryUpdate {
                owner,
                geometry,
                area,
                expected_version: snapshot.submitter.version,
            }],
            thefts: Vec::new(),
        })
        .unwrap();
    assert!(matches!(outcome, CommitOutcome::Applied { .. }));
    area
}

fn total(engine: &ConquestEngine<MemoryStore>, user: UserId) -> f64 {
    engine.store().user(user).unwrap().unwrap().total_area
}

fn run(engine: &ConquestEngine<MemoryStore>, user: UserId, route: &[GeoPoint]) -> ConquestResult {
    engine.process_route(user, route, 0.0, 0.0).unwrap()
}

#[test]
fn empty_user_claims_a_one_kilometre_loop() {
    let e = engine();
    let result = run(&e, ALICE, &square_loop(0.0, 0.0, 1000.0));
    assert!(
        result.new_area_conquered > 0.95e6 && result.new_area_conquered < 1.1e6,
        "conquered {}",
        result.new_area_conquered
    );
    assert!(result.victims.is_empty());
    assert_eq!(result.area_stolen, 0.0);
    assert_eq!(result.total_area, result.new_area_conquered);
    assert_eq!(total(&e, ALICE), result.total_area);
}

#[test]
fn loop_around_a_rival_steals_all_of_it() {
    let e = engine();
    let bob_area = grant(&e, BOB, square_polygon(250.0, 250.0, 500.0));
    assert!((bob_area - 250_000.0).abs() / 250_000.0 < 0.01, "bob {}", bob_area);

    let result = run(&e, ALICE, &square_loop(0.0, 0.0, 1000.0));
    assert_eq!(result.victims.len(), 1);
    let victim = &result.victims[0];
    assert_eq!(victim.user_id, BOB);
    assert_eq!(victim.user_name, "Bob");
    assert_eq!(victim.user_color, "#457b9d");
    assert!((victim.stolen_area - 250_000.0).abs() / 250_000.0 < 0.02, "stolen {}", victim.stolen_area);
    assert_eq!(result.area_stolen, victim.stolen_area);

    assert_eq!(total(&e, BOB), 0.0);
    let bob = e.store().territory(BOB).unwrap().unwrap();
    assert!(bob.is_empty());
    assert_eq!(bob.version, 2);
    assert_eq!(e.store().between(ALICE, BOB).unwrap(), victim.stolen_area);
}

#[test]
fn claim_inside_own_territory_conquers_nothing() {
    let e = engine();
    let first = run(&e, ALICE, &square_loop(0.0, 0.0, 600.0));
    let version = e.store().territory(ALICE).unwrap().unwrap().version;

    let second = run(&e, ALICE, &square_loop(200.0, 200.0, 100.0));
    assert_eq!(second.new_area_conquered, 0.0);
    assert!(second.victims.is_empty());
    assert_eq!(second.total_area, first.total_area);
    assert_eq!(e.store().territory(ALICE).unwrap().unwrap().version, version);
}

#[test]
fn corridor_through_a_rival_takes_a_strip() {
    let e = engine();
    let prior = grant(&e, BOB, square_polygon(0.0, 0.0, 400.0));

    // An open east-west run straight across Bob's square.
    let result = run(&e, ALICE, &[at(-100.0, 200.0), at(500.0, 200.0)]);
    assert_eq!(result.victims.len(), 1);
    let stolen = result.victims[0].stolen_area;
    // 400 m of a 40 m corridor.
    assert!((stolen - 16_000.0).abs() / 16_000.0 < 0.02, "stolen {}", stolen);

    let bob = e.store().territory(BOB).unwrap().unwrap();
    assert_eq!(bob.geometry.0.len(), 2);
    assert!((prior - stolen - bob.area).abs() < 1e-6 * prior);
    assert_eq!(total(&e, BOB), bob.area);
}

#[test]
fn grazing_a_rival_leaves_no_land_with_two_owners() {
    let e = engine();
    let prior = grant(&e, BOB, square_polygon(0.0, 0.0, 200.0));

    // Corridors whose edges reach 5 mm into Bob's south and east sides.
    let south = run(&e, ALICE, &[at(20.0, -20.005), at(180.0, -20.005)]);
    let east = run(&e, ALICE, &[at(220.005, 20.0), at(220.005, 180.0)]);
    assert!(south.victims.is_empty() && east.victims.is_empty());
    assert_eq!(south.area_stolen + east.area_stolen, 0.0);

    let alice = e.store().territory(ALICE).unwrap().unwrap();
    let bob = e.store().territory(BOB).unwrap().unwrap();
    let shared = geodesic_area(&alice.geometry.intersection(&bob.geometry));
    assert!(shared < 1e-3, "land owned by both: {} m²", shared);

    assert_eq!(bob.version, 3);
    assert!(bob.area < prior && prior - bob.area < 2.0, "{} -> {}", prior, bob.area);
    assert_eq!(total(&e, BOB), bob.area);
    assert_eq!(e.store().stats(BOB).unwrap().defeats, 0);

    let report = audit(e.store(), 0.01).unwrap();
    assert!(report.consistent, "{:?}", report);
}

#[test]
fn theft_is_conserved_across_several_victims() {
    let e = engine();
    let bob_before = grant(&e, BOB, square_polygon(-200.0, 100.0, 300.0));
    let cara_before = grant(&e, CARA, square_polygon(500.0, 500.0, 400.0));

    let result = run(&e, ALICE, &square_loop(0.0, 0.0, 700.0));
    let ids: Vec<UserId> = result.victims.iter().map(|v| v.user_id).collect();
    assert_eq!(ids, vec![BOB, CARA]);

    let sum: f64 = result.victims.iter().map(|v| v.stolen_area).sum();
    assert_eq!(result.area_stolen, sum);
    for (victim, before) in result.victims.iter().zip([bob_before, cara_before]) {
        assert!(victim.stolen_area > 0.0);
        let after = total(&e, victim.user_id);
        assert!(after >= 0.0);
        assert!((before - victim.stolen_area - after).abs() < 1e-6 * before);
    }
}

#[test]
fn submitter_total_never_decreases() {
    let e = engine();
    let routes: Vec<(UserId, Vec<GeoPoint>)> = vec![
        (ALICE, square_loop(0.0, 0.0, 300.0)),
        (BOB, square_loop(150.0, 150.0, 300.0)),
        (ALICE, vec![at(0.0, 250.0), at(600.0, 250.0)]),
        (CARA, square_loop(-100.0, -100.0, 700.0)),
        (ALICE, square_loop(100.0, 100.0, 50.0)),
        (BOB, vec![at(300.0, -200.0), at(300.0, 800.0)]),
    ];
    for (user, route) in routes {
        let before = total(&e, user);
        let result = run(&e, user, &route);
        assert!(result.total_area >= before, "{} shrank from {} to {}", user, before, result.total_area);
        assert!(result.new_area_conquered >= 0.0);
        assert!(result.victims.iter().all(|v| v.stolen_area > 0.0));
        for id in [ALICE, BOB, CARA] {
            assert!(total(&e, id) >= 0.0);
        }
    }
}

#[test]
fn same_history_gives_identical_results() {
    let history = |e: &ConquestEngine<MemoryStore>| {
        run(e, BOB, &square_loop(100.0, 100.0, 300.0));
        run(e, CARA, &[at(-50.0, 200.0), at(600.0, 260.0)]);
        run(e, ALICE, &square_loop(0.0, 0.0, 500.0))
    };
    let a = history(&engine()).to_json().unwrap();
    let b = history(&engine()).to_json().unwrap();
    assert_eq!(a, b);
}

#[test]
fn corridor_width_is_configurable() {
    let mut narrow = engine();
    narrow.config_mut().set_option("CorridorWidth", Some("5")).unwrap();
    let wide = engine();

    let route = [at(0.0, 0.0), at(500.0, 0.0)];
    let n = narrow.process_route(ALICE, &route, 0.0, 0.0).unwrap();
    let w = wide.process_route(ALICE, &route, 0.0, 0.0).unwrap();
    assert!(n.new_area_conquered < w.new_area_conquered / 3.0);
}
