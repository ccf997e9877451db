use float_eq::assert_float_eq;
use indexmap::IndexMap;
use lumen::circuit::port_id::PortRef;
use lumen::data::LumenCtx;
use lumen::deps::arcstr::ArcStr;
use lumen::error::ErrorSource;
use lumen::layout::cell::Instance;
use lumen::layout::placement::{place_instances, PlaceSpec};
use lumengeom::Point;

mod common;
use common::stub;

const TOL: f64 = 1e-6;

fn stubs(ctx: &LumenCtx, names: &[&str]) -> IndexMap<ArcStr, Instance> {
    names
        .iter()
        .map(|&name| (ArcStr::from(name), stub(ctx, 10.).with_name(name)))
        .collect()
}

fn join(a: &str, b: &str) -> PlaceSpec {
    PlaceSpec::Join(PortRef::parse(a).unwrap(), PortRef::parse(b).unwrap())
}

#[test]
fn joins_chain_from_a_placed_instance() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a", "b", "c"]);
    let specs = [
        join("b:out", "c:in"),
        join("a:out", "b:in"),
        PlaceSpec::place("a", (5., 5.)),
    ];
    place_instances(&mut insts, &specs, TOL).unwrap();

    assert!(insts["b"].loc().approx_eq(Point::new(15., 5.), 1e-9));
    assert!(insts["c"].loc().approx_eq(Point::new(25., 5.), 1e-9));
}

#[test]
fn join_rotates_to_face_the_anchor() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a", "b"]);
    let specs = [
        PlaceSpec::Place {
            inst: "a".into(),
            position: Point::zero(),
            angle: 90.,
            flip_h: false,
            flip_v: false,
        },
        join("a:out", "b:in"),
    ];
    place_instances(&mut insts, &specs, TOL).unwrap();

    let b_in = insts["b"].port("in").unwrap();
    let b_out = insts["b"].port("out").unwrap();
    assert!(b_in.position().approx_eq(Point::new(0., 10.), 1e-9));
    assert_float_eq!(b_in.angle(), 270., abs <= 1e-9);
    assert!(b_out.position().approx_eq(Point::new(0., 20.), 1e-9));
}

#[test]
fn join_group_without_placement_is_anchored() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a", "b"]);
    place_instances(&mut insts, &[join("a:out", "b:in")], TOL).unwrap();

    assert!(insts["a"].loc().approx_eq(Point::zero(), 1e-9));
    assert!(insts["b"].loc().approx_eq(Point::new(10., 0.), 1e-9));
}

#[test]
fn relative_placements_in_a_cycle_fail() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a", "b"]);
    let specs = [
        PlaceSpec::PlaceRelative {
            port: PortRef::new("a", "in"),
            target: PortRef::new("b", "out"),
            offset: Point::new(10., 0.),
            angle: None,
        },
        PlaceSpec::PlaceRelative {
            port: PortRef::new("b", "in"),
            target: PortRef::new("a", "out"),
            offset: Point::new(10., 0.),
            angle: None,
        },
    ];
    let err = place_instances(&mut insts, &specs, TOL).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::CircularPlacement(names) if names.len() == 2));
}

#[test]
fn conflicting_absolute_placements_fail() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a"]);
    let specs = [PlaceSpec::place("a", (0., 0.)), PlaceSpec::place("a", (1., 0.))];
    let err = place_instances(&mut insts, &specs, TOL).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::ConflictingPlacement(name) if name == "a"));
}

#[test]
fn join_between_fixed_instances_is_checked() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a", "b"]);
    let ok = [
        PlaceSpec::place("a", (0., 0.)),
        PlaceSpec::place("b", (10., 0.)),
        join("a:out", "b:in"),
    ];
    place_instances(&mut insts, &ok, TOL).unwrap();

    let bad = [
        PlaceSpec::place("a", (0., 0.)),
        PlaceSpec::place("b", (12., 0.)),
        join("a:out", "b:in"),
    ];
    let err = place_instances(&mut insts, &bad, TOL).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::ConflictingPlacement(_)));
}

#[test]
fn flipped_placement_mirrors_ports() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a"]);
    let specs = [PlaceSpec::Place {
        inst: "a".into(),
        position: Point::zero(),
        angle: 0.,
        flip_h: true,
        flip_v: false,
    }];
    place_instances(&mut insts, &specs, TOL).unwrap();

    let out = insts["a"].port("out").unwrap();
    assert!(out.position().approx_eq(Point::new(-10., 0.), 1e-9));
    assert_float_eq!(out.angle(), 180., abs <= 1e-9);
}

#[test]
fn missing_instances_are_reported() {
    let ctx = LumenCtx::default();
    let mut insts = stubs(&ctx, &["a"]);
    let err = place_instances(&mut insts, &[join("a:out", "q:in")], TOL).unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::InstanceNotFound { instance, available }
            if instance == "q" && available.len() == 1
    ));
}

#[test]
fn relative_placement_of_a_fixed_instance_checks_rotation() {
    let ctx = LumenCtx::default();
    let specs = |angle: f64| {
        [
            PlaceSpec::place("a", (0., 0.)),
            PlaceSpec::Place {
                inst: "b".into(),
                position: Point::new(20., 0.),
                angle: 90.,
                flip_h: false,
                flip_v: false,
            },
            PlaceSpec::PlaceRelative {
                port: PortRef::new("b", "in"),
                target: PortRef::new("a", "out"),
                offset: Point::new(10., 0.),
                angle: Some(angle),
            },
        ]
    };

    let mut insts = stubs(&ctx, &["a", "b"]);
    place_instances(&mut insts, &specs(90.), TOL).unwrap();
    assert_float_eq!(insts["b"].orientation().angle, 90., abs <= 1e-9);

    let mut insts = stubs(&ctx, &["a", "b"]);
    let err = place_instances(&mut insts, &specs(0.), TOL).unwrap_err();
    assert!(matches!(err.source(), ErrorSource::ConflictingPlacement(name) if name == "b"));
}
