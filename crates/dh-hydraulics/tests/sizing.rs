use std::collections::BTreeMap;

use approx::assert_relative_eq;
use dh_core::geometry::coord;
use dh_core::units::m;
use dh_core::FeatureId;
use dh_hydraulics::*;
use dh_layer::{
    EdgeFlag, EdgeRecord, FeatureRequest, Geometry, LayerProvider, MemoryLayer, NewFeature,
    NodeRecord,
};
use proptest::prelude::*;

fn standard_table() -> CapacityTable {
    CapacityTable::compute(
        &PipeCatalog::standard(),
        &FluidProperties::default(),
        &HydraulicLimits::default(),
        &ColebrookConfig::default(),
    )
    .unwrap()
}

#[test]
fn dn80_sweep_round_trips_through_heat_flow() {
    let fluid = FluidProperties::default();
    let limits = HydraulicLimits::default();
    let cfg = ColebrookConfig::default();
    let entry = pipe_capacity(&PipeSize::new(80, 0.0825), &fluid, &limits, &cfg);

    assert!(entry.max_velocity_mps > 0.0 && entry.max_velocity_mps < 5.0);
    // v* is a grid point of the sweep.
    let steps = entry.max_velocity_mps / 0.01;
    assert_relative_eq!(steps, steps.round(), epsilon = 1e-9);

    let recomputed = std::f64::consts::PI * (0.0825f64 / 2.0).powi(2)
        * 1000.0
        * entry.max_velocity_mps
        * 4186.0
        * 30.0
        / 1000.0;
    assert_relative_eq!(entry.max_heat_kw, recomputed, max_relative = 1e-12);

    // The grid point before v* is still below the limit.
    let prev = entry.max_velocity_mps - 0.01;
    let re = reynolds(1000.0, prev, 0.0825, 0.0009);
    let f = friction_factor(re, 0.0001 / 0.0825, &cfg);
    assert!(pressure_loss(f.value, 1000.0, 1000.0, prev, 0.0825) < 150_000.0);
    assert!(entry.pressure_loss_pa >= 150_000.0);
}

fn edge(x0: f64, x1: f64) -> NewFeature<EdgeRecord> {
    NewFeature::new(
        Geometry::line(vec![coord(x0, 0.0), coord(x1, 0.0)]),
        EdgeRecord::default(),
    )
}

fn node(x: f64, heat_kw: f64, nr_con: u32) -> NewFeature<NodeRecord> {
    NewFeature::new(
        Geometry::Point(coord(x, 0.0)),
        NodeRecord {
            heat_kw,
            nr_con,
            ..NodeRecord::default()
        },
    )
}

#[test]
fn sizing_assigns_flags_and_losses() {
    let table = standard_table();
    let largest = table.largest().unwrap().max_heat_kw;

    let mut network = MemoryLayer::from_features(
        "network",
        vec![edge(0.0, 10.0), edge(10.0, 30.0), edge(30.0, 40.0)],
    );
    let mut nodes = MemoryLayer::from_features(
        "nodes",
        vec![node(10.0, 200.0, 2), node(30.0, largest * 10.0, 1)],
    );
    let e = |i| FeatureId::from_index(i);
    let edge_nodes = BTreeMap::from([(e(0), e(0)), (e(1), e(1))]);

    let report = assign_sizes(&mut network, &mut nodes, &edge_nodes, &table, 0.62).unwrap();
    assert_eq!(report.over_capacity, vec![e(1)]);
    assert_eq!(report.unreached, vec![e(2)]);
    assert!(!report.is_complete());

    let qs = nodes.feature(e(0)).unwrap().record.qs_kw;
    assert_relative_eq!(qs, 162.0, max_relative = 1e-12);

    let sized = network.feature(e(0)).unwrap();
    assert_eq!(sized.record.qs_kw, Some(qs));
    let expected = table.smallest_sufficient(qs).unwrap();
    assert_eq!(sized.record.dn, Some(expected.dn));
    assert_eq!(report.assigned, vec![(e(0), expected.dn)]);

    let over = network.feature(e(1)).unwrap();
    assert_eq!(over.record.dn, None);
    assert!(over.record.has_flag(EdgeFlag::CapacityExceeded));
    assert!(network.feature(e(2)).unwrap().record.has_flag(EdgeFlag::Unreached));

    let loss = TwinPipeModel::default().losses().unwrap();
    let thermal = apply_thermal_losses(&mut network, &loss).unwrap();
    assert_eq!(thermal.edges, 3);
    assert_relative_eq!(thermal.total_loss_w, loss.total_w_m() * 40.0, max_relative = 1e-12);
    for f in network.features(&FeatureRequest::all()) {
        assert_eq!(f.record.loss_supply_w_m, Some(loss.supply_w_m));
    }
}

#[test]
fn resizing_clears_stale_flags() {
    let table = standard_table();
    let mut network = MemoryLayer::from_features("network", vec![edge(0.0, 5.0)]);
    let mut nodes = MemoryLayer::from_features("nodes", vec![node(5.0, 50.0, 1)]);
    let id = FeatureId::from_index(0);

    assign_sizes(&mut network, &mut nodes, &BTreeMap::new(), &table, 0.62).unwrap();
    assert!(network.feature(id).unwrap().record.has_flag(EdgeFlag::Unreached));

    let edge_nodes = BTreeMap::from([(id, id)]);
    let report = assign_sizes(&mut network, &mut nodes, &edge_nodes, &table, 0.62).unwrap();
    assert!(report.is_complete());
    assert!(network.feature(id).unwrap().record.flags.is_empty());
}

#[test]
fn bad_simultaneity_leaves_layers_untouched() {
    let table = standard_table();
    let mut network = MemoryLayer::from_features("network", vec![edge(0.0, 5.0)]);
    let mut nodes = MemoryLayer::from_features("nodes", vec![node(5.0, 50.0, 1)]);
    let result = assign_sizes(&mut network, &mut nodes, &BTreeMap::new(), &table, 1.5);
    assert!(matches!(result, Err(HydraulicsError::InvalidConfig { .. })));
    assert_eq!(nodes.feature(FeatureId::from_index(0)).unwrap().record.qs_kw, 0.0);
    assert!(network.feature(FeatureId::from_index(0)).unwrap().record.flags.is_empty());
}

proptest! {
    #[test]
    fn capacity_is_monotonic_in_diameter(
        mut diameters in prop::collection::vec(0.01f64..0.5, 2..8),
        roughness in 0.0f64..0.001,
    ) {
        diameters.sort_by(f64::total_cmp);
        diameters.dedup();
        let sizes = diameters
            .iter()
            .enumerate()
            .map(|(i, &d)| PipeSize::new(i as u32 + 1, d))
            .collect();
        let catalog = PipeCatalog::new(sizes).unwrap();
        let limits = HydraulicLimits { roughness: m(roughness), ..HydraulicLimits::default() };
        let table = CapacityTable::compute(
            &catalog,
            &FluidProperties::default(),
            &limits,
            &ColebrookConfig::default(),
        )
        .unwrap();
        for pair in table.entries().windows(2) {
            prop_assert!(pair[1].max_heat_kw >= pair[0].max_heat_kw);
        }
    }

    #[test]
    fn colebrook_converges_over_turbulent_range(
        re in 2.0e3f64..1.0e7,
        rr in 0.0f64..0.05,
    ) {
        let f = colebrook(re, rr, &ColebrookConfig::default());
        prop_assert!(f.converged);
        prop_assert!(f.value > 0.0 && f.value < 0.1);
    }
}
