use lumen::circuit::netlist::TermRef;
use lumen::circuit::port_id::PortRef;
use lumen::data::LumenCtx;
use lumencells::celment::{Celment, CelmentParams};
use lumencells::crossing_array::{CrossingArray, CrossingArrayParams};
use lumencells::mzi::{Mzi, MziParams, PhMzi, PhMziParams};
use lumencells::mzi_string::{MziString, MziStringParams};
use lumencells::ocdc::{Ocdc, OcdcParams};
use lumencells::opa::{Opa, OpaParams};
use lumencells::routed::{RoutedOcdc, RoutedOcdcParams, RoutedOpa, RoutedOpaParams};
use lumencells::splitter_tree::{SplitterTree, SplitterTreeParams};

mod common;
use common::{
    assert_every_term_is_linked, assert_routed, electrical_ports, netlist, optical_ports, sorted,
};

#[test]
fn splitter_tree_exposes_input_and_leaves() {
    let ctx = LumenCtx::default();
    let tree = ctx
        .instantiate_layout::<SplitterTree>(&SplitterTreeParams::default())
        .unwrap();

    let mut expected = vec!["in".to_string()];
    expected.extend((1..=8).map(|i| format!("out_{i}")));
    assert_eq!(optical_ports(&tree), expected);
    assert!(electrical_ports(&tree).is_empty());
    assert_eq!(tree.cell().name(), "splitter_tree_3");

    let leaves: Vec<f64> = (1..=8)
        .map(|i| tree.port(&format!("out_{i}")).unwrap().position().y)
        .collect();
    assert!(leaves.windows(2).all(|w| w[0] < w[1]), "{leaves:?}");
    assert_eq!(netlist(tree.cell()).instances.len(), 7 + 6);
    assert_every_term_is_linked(tree.cell());
    assert_routed(tree.cell());
}

#[test]
fn single_level_tree_is_one_splitter() {
    let ctx = LumenCtx::default();
    let params = SplitterTreeParams {
        levels: 1,
        ..Default::default()
    };
    let tree = ctx.instantiate_layout::<SplitterTree>(&params).unwrap();
    assert_eq!(optical_ports(&tree), vec!["in", "out_1", "out_2"]);
    assert!(tree.cell().inst("sp_0_0").is_some());
}

#[test]
fn cramped_tree_is_rejected() {
    let ctx = LumenCtx::default();
    let params = SplitterTreeParams {
        spacing_x: 20.,
        ..Default::default()
    };
    ctx.instantiate_layout::<SplitterTree>(&params)
        .expect_err("levels overlap");
}

#[test]
fn celment_exposes_one_input_and_output_per_channel() {
    let ctx = LumenCtx::default();
    for dim in [2, 3, 4, 5] {
        let params = CelmentParams {
            dim,
            ..Default::default()
        };
        let mesh = ctx.instantiate_layout::<Celment>(&params).unwrap();

        let expected = sorted((1..=dim).flat_map(|c| [format!("in{c}"), format!("out{c}")]));
        assert_eq!(optical_ports(&mesh), expected, "dimension {dim}");

        let units = params.units();
        assert_eq!(units.len(), dim * (dim - 1) / 2);
        let expected = sorted(units.iter().flat_map(|u| {
            ["mzi_arm2_elec1", "mzi_arm2_elec2", "ht_elec1", "ht_elec2"]
                .map(|port| format!("{}_{port}", u.name()))
        }));
        assert_eq!(electrical_ports(&mesh), expected, "dimension {dim}");
        assert_every_term_is_linked(mesh.cell());
    }
}

#[test]
fn celment_inputs_face_west() {
    let ctx = LumenCtx::default();
    let mesh = ctx
        .instantiate_layout::<Celment>(&CelmentParams::default())
        .unwrap();
    for c in 1..=4 {
        let input = mesh.port(&format!("in{c}")).unwrap();
        let output = mesh.port(&format!("out{c}")).unwrap();
        assert!(input.position().x < output.position().x);
        assert!((input.angle() - 180.).abs() < 1e-6);
    }
}

#[test]
fn trivial_celment_is_rejected() {
    let ctx = LumenCtx::default();
    for dim in [0, 1] {
        let params = CelmentParams {
            dim,
            ..Default::default()
        };
        ctx.instantiate_layout::<Celment>(&params)
            .expect_err("a mesh needs two channels");
    }
}

#[test]
fn mzi_string_chains_its_mzis() {
    let ctx = LumenCtx::default();
    let string = ctx
        .instantiate_layout::<MziString>(&MziStringParams::default())
        .unwrap();
    assert_eq!(
        optical_ports(&string),
        vec![
            "in",
            "mzi_0_combiner_out2",
            "mzi_0_splitter_in2",
            "mzi_1_combiner_out2",
            "mzi_1_splitter_in2",
            "out",
        ]
    );
    let expected = sorted(
        (0..2).flat_map(|i| (1..=2).flat_map(move |a| (1..=2).map(move |e| format!("mzi_{i}_arm{a}_elec{e}")))),
    );
    assert_eq!(electrical_ports(&string), expected);
    assert_every_term_is_linked(string.cell());
    assert_routed(string.cell());
}

#[test]
fn empty_mzi_string_is_rejected() {
    let ctx = LumenCtx::default();
    let params = MziStringParams {
        mzi_nums: 0,
        ..Default::default()
    };
    ctx.instantiate_layout::<MziString>(&params)
        .expect_err("no MZIs");
}

#[test]
fn mzis_route_their_arms() {
    let ctx = LumenCtx::default();
    let mzi = ctx.instantiate_layout::<Mzi>(&MziParams::default()).unwrap();
    assert_every_term_is_linked(mzi.cell());
    assert_routed(mzi.cell());

    let ph = ctx
        .instantiate_layout::<PhMzi>(&PhMziParams::default())
        .unwrap();
    assert_every_term_is_linked(ph.cell());
    assert_routed(ph.cell());
    assert!(ph.port("out1").unwrap().position().y > ph.port("out2").unwrap().position().y);
}

#[test]
fn ocdc_ports() {
    let ctx = LumenCtx::default();
    let params = OcdcParams::default();
    let ocdc = ctx.instantiate_layout::<Ocdc>(&params).unwrap();

    let mut expected = vec!["in".to_string(), "out".to_string()];
    for tree in ["splitter", "combiner"] {
        expected.extend([1, 3, 5, 7].map(|i| format!("{tree}_out_{i}")));
    }
    for i in 0..3 {
        for j in 0..3 {
            expected.push(format!("mzis_{i}_mzi_{j}_splitter_in2"));
            expected.push(format!("mzis_{i}_mzi_{j}_combiner_out2"));
        }
    }
    assert_eq!(optical_ports(&ocdc), sorted(expected));

    let mut expected: Vec<String> = (0..=3)
        .flat_map(|i| (1..=2).map(move |e| format!("ht_wg_{i}_elec{e}")))
        .collect();
    for i in 0..3 {
        for j in 0..3 {
            for a in 1..=2 {
                for e in 1..=2 {
                    expected.push(format!("mzi_{i}_{j}_arm{a}_elec{e}"));
                }
            }
        }
    }
    assert_eq!(electrical_ports(&ocdc), sorted(expected));
    assert_every_term_is_linked(ocdc.cell());
    assert_routed(ocdc.cell());
}

#[test]
fn ocdc_arms_line_up_with_the_combiner() {
    let ctx = LumenCtx::default();
    let params = OcdcParams::default();
    let ocdc = ctx.instantiate_layout::<Ocdc>(&params).unwrap();
    let cell = ocdc.cell();
    for i in 0..params.n_strings() {
        let ht = cell.inst(&format!("ht_wg_{i}")).unwrap();
        let mzis = cell.inst(&format!("mzis_{i}")).unwrap();
        let out = mzis.port("out").unwrap().position();
        let input = ht.port("in").unwrap().position();
        assert!((input.y - out.y).abs() < 1e-6);
        assert!((input.x - out.x - params.tree.spacing_x / 2.).abs() < 1e-6);
    }
    let input = ocdc.port("in").unwrap();
    let output = ocdc.port("out").unwrap();
    assert!((input.position().y - output.position().y).abs() < 1e-6);
    assert!((output.angle()).abs() < 1e-6);
}

fn opa_terminals(n: usize) -> Vec<String> {
    sorted((0..n).flat_map(|c| [format!("hti{c}"), format!("hto{c}")]))
}

#[test]
fn opa_exposes_one_output_and_two_terminals_per_channel() {
    let ctx = LumenCtx::default();
    let params = OpaParams::default();
    let opa = ctx.instantiate_layout::<Opa>(&params).unwrap();

    let mut expected = vec!["in".to_string()];
    expected.extend((0..16).map(|c| format!("out{c}")));
    assert_eq!(optical_ports(&opa), sorted(expected));
    assert_eq!(electrical_ports(&opa), opa_terminals(16));
    assert_every_term_is_linked(opa.cell());
    assert_routed(opa.cell());

    for c in 0..16 {
        let out = opa.port(&format!("out{c}")).unwrap();
        assert!((out.position().y - params.heater_y(c)).abs() < 1e-6);
    }
}

/// Asserts that `port` of the device and its pad share an external term.
fn assert_padded(netlist: &lumen::circuit::netlist::Netlist, port: &str) {
    let external = TermRef::External(port.into());
    for id in [PortRef::new("dut", port), PortRef::new(format!("bp_{port}"), "m1")] {
        let term = TermRef::Instance(id);
        assert!(
            netlist
                .nets
                .iter()
                .any(|net| net.terms.contains(&external) && net.terms.contains(&term)),
            "{term} is not tied to {external}"
        );
    }
}

#[test]
fn routed_opa_couples_light_and_pads_every_terminal() {
    let ctx = LumenCtx::default();
    let routed = ctx
        .instantiate_layout::<RoutedOpa>(&RoutedOpaParams::default())
        .unwrap();

    let mut expected = vec!["in".to_string()];
    expected.extend((0..16).map(|c| format!("out{c}")));
    assert_eq!(optical_ports(&routed), sorted(expected));
    assert_eq!(electrical_ports(&routed), opa_terminals(16));
    assert_every_term_is_linked(routed.cell());
    assert_routed(routed.cell());

    let dut = routed.cell().inst("dut").unwrap();
    let north = dut.cell().size_info().north;
    for name in opa_terminals(16) {
        let pad = routed.port(&name).unwrap();
        assert!(pad.position().y > north + 100.);
        assert_padded(netlist(routed.cell()), &name);
    }
    let input = routed.port("in").unwrap().position();
    assert!(input.x < dut.port("in").unwrap().position().x);
}

#[test]
fn routed_ocdc_splits_its_pads_around_the_circuit() {
    let ctx = LumenCtx::default();
    let params = RoutedOcdcParams::default();
    let ocdc = ctx.instantiate_layout::<Ocdc>(&params.ocdc).unwrap();
    let routed = ctx.instantiate_layout::<RoutedOcdc>(&params).unwrap();

    assert_eq!(electrical_ports(&routed), electrical_ports(&ocdc));
    let optical = optical_ports(&routed);
    assert!(optical.contains(&"in".to_string()));
    assert!(optical.contains(&"out".to_string()));
    assert_eq!(optical.len(), optical_ports(&ocdc).len());
    assert_every_term_is_linked(routed.cell());
    assert_routed(routed.cell());

    let size = ocdc.cell().size_info();
    let center = (size.north + size.south) / 2.;
    for port in ocdc.cell().ports().filter(|p| !p.is_optical()) {
        let pad = routed.port(port.name()).unwrap();
        if port.position().y >= center {
            assert!(pad.position().y > size.north);
        } else {
            assert!(pad.position().y < size.south);
        }
        assert_padded(netlist(routed.cell()), port.name());
    }
}

#[test]
fn crossing_array_chains_rows_and_columns() {
    let ctx = LumenCtx::default();
    for levels in [1, 3, 5] {
        let params = CrossingArrayParams {
            levels,
            ..Default::default()
        };
        let array = ctx.instantiate_layout::<CrossingArray>(&params).unwrap();
        assert_eq!(optical_ports(&array).len(), 4 * levels, "{levels} levels");
        assert_eq!(
            netlist(array.cell()).instances.len(),
            params.n_crossings() + levels * (levels - 1),
        );
        assert_every_term_is_linked(array.cell());
        assert_routed(array.cell());
    }

    let array = ctx
        .instantiate_layout::<CrossingArray>(&CrossingArrayParams::default())
        .unwrap();
    let ports = optical_ports(&array);
    assert!(ports.contains(&"crossing_5_0_in1".to_string()));
    assert!(ports.contains(&"crossing_1_0_out2".to_string()));
    assert!(!ports.contains(&"crossing_4_0_in2".to_string()));
}
