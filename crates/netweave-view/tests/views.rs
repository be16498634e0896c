//! View building end to end: merge connectivity, testbench elimination,
//! stimulus promotion, and the structural invariants every SuperGraph
//! must satisfy.

use std::collections::BTreeSet;

use netweave_core::{
    CancelToken, DesignGraph, EdgeSpec, EntityClass, FlowType, NodeSpec, RelationType,
};
use netweave_view::{
    AnalysisKind, AnalysisValue, SuperClass, TimingNodeMetrics, View, ViewBuilder, ViewContext,
    ViewError,
};

/// Two FFs bridged by a LUT -> MUX chain:
///
/// ```text
/// ff1 -> lut1 -> mux1 -> ff2
/// ```
fn ff_cloud_ff() -> DesignGraph {
    let mut graph = DesignGraph::new();
    for (path, class) in [
        ("ff1", EntityClass::FlipFlop),
        ("lut1", EntityClass::Lut),
        ("mux1", EntityClass::Mux),
        ("ff2", EntityClass::FlipFlop),
    ] {
        graph.add_node(NodeSpec::new(path, class)).unwrap();
    }
    for (uid, src, dst, flow) in [
        ("e0", "ff1", "lut1", FlowType::SequentialLaunch),
        ("e1", "lut1", "mux1", FlowType::Combinational),
        ("e2", "mux1", "ff2", FlowType::Combinational),
    ] {
        graph
            .add_edge(EdgeSpec::new(
                uid,
                src,
                dst,
                RelationType::Data,
                flow,
                uid,
            ))
            .unwrap();
    }
    graph
}

#[test]
fn connectivity_merges_combinational_chain_into_one_cloud() {
    let graph = ff_cloud_ff();
    let supergraph = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();

    // ff1, ff2, and one cloud holding {lut1, mux1}.
    assert_eq!(supergraph.supernode_count(), 3);
    let cloud = supergraph
        .super_nodes
        .values()
        .find(|sn| sn.super_class == SuperClass::CombinationalCloud)
        .expect("one combinational cloud");
    let members: BTreeSet<&str> = cloud
        .member_nodes
        .iter()
        .map(|&id| graph.node(id).unwrap().uid.as_str())
        .collect();
    assert_eq!(members, BTreeSet::from(["lut1", "mux1"]));

    // Two SuperEdges: ff1 -> cloud and cloud -> ff2.
    assert_eq!(supergraph.superedge_count(), 2);
    let ff1 = supergraph
        .supernode_of(graph.node_id("ff1").unwrap())
        .unwrap();
    let ff2 = supergraph
        .supernode_of(graph.node_id("ff2").unwrap())
        .unwrap();
    assert!(supergraph.edge_between(&ff1.id, &cloud.id).is_some());
    assert!(supergraph.edge_between(&cloud.id, &ff2.id).is_some());
    assert!(supergraph.edge_between(&ff1.id, &ff2.id).is_none());
}

#[test]
fn testbench_wrapper_is_eliminated_in_design_views() {
    let mut graph = DesignGraph::new();
    graph
        .add_node(NodeSpec::new("top", EntityClass::ModuleInstance))
        .unwrap();
    graph
        .add_node(NodeSpec::new("top/tb_wrapper", EntityClass::ModuleInstance))
        .unwrap();
    graph
        .add_node(NodeSpec::new("top/core", EntityClass::ModuleInstance))
        .unwrap();
    graph
        .add_edge(EdgeSpec::new(
            "stim",
            "top/tb_wrapper",
            "top/core",
            RelationType::Data,
            FlowType::Combinational,
            "stim",
        ))
        .unwrap();

    let supergraph = ViewBuilder::new(&graph, View::Structural, ViewContext::Design)
        .build()
        .unwrap();

    let tb = graph.node_id("top/tb_wrapper").unwrap();
    assert!(supergraph.eliminated_nodes.contains(&tb));
    assert!(supergraph.supernode_of(tb).is_none());
    // Its stimulus edge found no visible source, so it was dropped.
    let stim = graph.edge_id("stim").unwrap();
    assert!(supergraph.dropped_edges.contains(&stim));
}

#[test]
fn eliminated_endpoint_is_bridged_to_nearest_visible_node() {
    // port -> (eliminated lut) -> ff: the edge into the ff should reroute
    // to the port through the eliminated hop.
    let mut graph = DesignGraph::new();
    graph
        .add_node(NodeSpec::new("din", EntityClass::IoPort))
        .unwrap();
    graph
        .add_node(NodeSpec::new("glue", EntityClass::Lut))
        .unwrap();
    graph
        .add_node(NodeSpec::new("ff", EntityClass::FlipFlop))
        .unwrap();
    graph
        .add_edge(EdgeSpec::new(
            "e_a",
            "din",
            "glue",
            RelationType::Data,
            FlowType::Combinational,
            "a",
        ))
        .unwrap();
    graph
        .add_edge(EdgeSpec::new(
            "e_b",
            "glue",
            "ff",
            RelationType::Data,
            FlowType::Combinational,
            "b",
        ))
        .unwrap();

    // Simulation.Structural merges nothing here but eliminates nothing
    // either; use Design.Structural where a lone LUT merges into a module
    // cluster. To exercise passthrough we need the LUT eliminated, which
    // Design.Physical does.
    let supergraph = ViewBuilder::new(&graph, View::Physical, ViewContext::Design)
        .build()
        .unwrap();

    let din_super = supergraph
        .supernode_of(graph.node_id("din").unwrap())
        .expect("port promoted");
    // `ff` and `glue` are both eliminated in the physical view, so both
    // edges drop; din keeps its SuperNode with no incident SuperEdges.
    assert_eq!(supergraph.superedge_count(), 0);
    assert_eq!(din_super.super_class, SuperClass::Atomic);

    // Connectivity view: glue merges into a cloud instead, nothing is
    // rerouted, and both edges survive as SuperEdges.
    let connectivity = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();
    assert_eq!(connectivity.superedge_count(), 2);
}

#[test]
fn passthrough_reroutes_across_an_eliminated_module() {
    // ff_a -> hub (ModuleInstance, eliminated in Design.Connectivity) -> ff_b
    let mut graph = DesignGraph::new();
    for (path, class) in [
        ("ff_a", EntityClass::FlipFlop),
        ("hub", EntityClass::ModuleInstance),
        ("ff_b", EntityClass::FlipFlop),
    ] {
        graph.add_node(NodeSpec::new(path, class)).unwrap();
    }
    graph
        .add_edge(EdgeSpec::new(
            "e_in",
            "ff_a",
            "hub",
            RelationType::Data,
            FlowType::SequentialLaunch,
            "into_hub",
        ))
        .unwrap();
    graph
        .add_edge(EdgeSpec::new(
            "e_out",
            "hub",
            "ff_b",
            RelationType::Data,
            FlowType::Combinational,
            "out_of_hub",
        ))
        .unwrap();

    let supergraph = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();

    // Both edges resolve to ff_a -> ff_b through the eliminated hub and
    // fold into a single SuperEdge with both member edges.
    let ff_a = supergraph
        .supernode_of(graph.node_id("ff_a").unwrap())
        .unwrap();
    let ff_b = supergraph
        .supernode_of(graph.node_id("ff_b").unwrap())
        .unwrap();
    let bridged = supergraph
        .edge_between(&ff_a.id, &ff_b.id)
        .expect("rerouted SuperEdge");
    assert_eq!(bridged.member_edges.len(), 2);
    assert_eq!(supergraph.superedge_count(), 1);
}

#[test]
fn simulation_promotes_clock_generator_over_merge_policy() {
    let mut graph = DesignGraph::new();
    graph
        .add_node(NodeSpec::new("clk_gen_main", EntityClass::RtlBlock))
        .unwrap();
    graph
        .add_node(NodeSpec::new("plain_logic", EntityClass::RtlBlock))
        .unwrap();

    let supergraph = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Simulation)
        .build()
        .unwrap();

    let gen = supergraph
        .supernode_of(graph.node_id("clk_gen_main").unwrap())
        .expect("stimulus generator survives");
    assert_eq!(gen.super_class, SuperClass::Atomic);
    assert_eq!(gen.member_nodes.len(), 1);

    let plain = supergraph
        .supernode_of(graph.node_id("plain_logic").unwrap())
        .expect("merged into a cluster");
    assert_eq!(plain.super_class, SuperClass::ModuleCluster);
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// A denser fixture exercising all three actions at once.
fn mixed_graph() -> DesignGraph {
    let mut graph = DesignGraph::new();
    for (path, class) in [
        ("clk", EntityClass::IoPort),
        ("top", EntityClass::ModuleInstance),
        ("top/ff1", EntityClass::FlipFlop),
        ("top/ff2", EntityClass::FlipFlop),
        ("top/lut1", EntityClass::Lut),
        ("top/lut2", EntityClass::Lut),
        ("top/mux1", EntityClass::Mux),
        ("top/dsp", EntityClass::Dsp),
        ("pin_a", EntityClass::PackagePin),
        ("pb0", EntityClass::Pblock),
    ] {
        graph.add_node(NodeSpec::new(path, class)).unwrap();
    }
    for (uid, src, dst, relation, flow) in [
        ("c0", "clk", "top/ff1", RelationType::Clock, FlowType::ClockTree),
        ("c1", "clk", "top/ff2", RelationType::Clock, FlowType::ClockTree),
        (
            "d0",
            "top/ff1",
            "top/lut1",
            RelationType::Data,
            FlowType::SequentialLaunch,
        ),
        (
            "d1",
            "top/lut1",
            "top/mux1",
            RelationType::Data,
            FlowType::Combinational,
        ),
        (
            "d2",
            "top/mux1",
            "top/ff2",
            RelationType::Data,
            FlowType::Combinational,
        ),
        (
            "d3",
            "top/lut2",
            "top/dsp",
            RelationType::Data,
            FlowType::Combinational,
        ),
        (
            "d4",
            "top/ff2",
            "top/lut2",
            RelationType::Data,
            FlowType::SequentialLaunch,
        ),
        (
            "p0",
            "pin_a",
            "clk",
            RelationType::PhysicalMapping,
            FlowType::Combinational,
        ),
    ] {
        graph
            .add_edge(EdgeSpec::new(uid, src, dst, relation, flow, uid))
            .unwrap();
    }
    graph
}

#[test]
fn member_sets_partition_the_visible_nodes() {
    let graph = mixed_graph();
    for view in View::ALL {
        for context in [ViewContext::Design, ViewContext::Simulation] {
            let supergraph = ViewBuilder::new(&graph, view, context).build().unwrap();

            let mut seen = BTreeSet::new();
            for supernode in supergraph.super_nodes.values() {
                for &member in &supernode.member_nodes {
                    assert!(
                        seen.insert(member),
                        "{view}/{context}: node in two SuperNodes"
                    );
                    assert!(!supergraph.eliminated_nodes.contains(&member));
                }
            }
            let visible: BTreeSet<_> = graph
                .node_ids()
                .filter(|id| !supergraph.eliminated_nodes.contains(id))
                .collect();
            assert_eq!(seen, visible, "{view}/{context}: partition mismatch");
        }
    }
}

#[test]
fn every_edge_lands_in_exactly_one_superedge_or_the_dropped_set() {
    let graph = mixed_graph();
    for view in View::ALL {
        for context in [ViewContext::Design, ViewContext::Simulation] {
            let supergraph = ViewBuilder::new(&graph, view, context).build().unwrap();

            let mut placed = BTreeSet::new();
            for superedge in supergraph.super_edges.values() {
                for &member in &superedge.member_edges {
                    assert!(
                        placed.insert(member),
                        "{view}/{context}: edge in two SuperEdges"
                    );
                }
            }
            for &dropped in &supergraph.dropped_edges {
                assert!(
                    placed.insert(dropped),
                    "{view}/{context}: dropped edge also in a SuperEdge"
                );
            }
            let all: BTreeSet<_> = graph.edge_ids().collect();
            assert_eq!(placed, all, "{view}/{context}: edge conservation broken");
        }
    }
}

#[test]
fn no_superedge_touches_an_eliminated_node() {
    let graph = mixed_graph();
    let supergraph = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();
    for superedge in supergraph.super_edges.values() {
        assert!(supergraph.super_nodes.contains_key(&superedge.source));
        assert!(supergraph.super_nodes.contains_key(&superedge.target));
        for &member in &superedge.member_nodes {
            assert!(!supergraph.eliminated_nodes.contains(&member));
        }
    }
}

#[test]
fn rebuilds_are_byte_identical() {
    let graph = mixed_graph();
    let first = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();
    let second = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();

    let json_first = serde_json::to_string(&first).unwrap();
    let json_second = serde_json::to_string(&second).unwrap();
    assert_eq!(json_first, json_second);
}

#[test]
fn structure_ignores_attached_analysis() {
    let graph = mixed_graph();
    let mut first = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();

    // Attach a bundle, then rebuild from the same graph: the structure of
    // the rebuild must match the pre-attachment structure exactly.
    let key = first.super_nodes.keys().next().unwrap().clone();
    if let Some(sn) = first.super_nodes.get_mut(&key) {
        sn.analysis.attach(
            AnalysisKind::Timing,
            AnalysisValue::TimingNode(TimingNodeMetrics {
                min_slack: -0.1,
                p5_slack: -0.1,
                max_arrival_time: 9.0,
                min_required_time: 10.0,
                critical_node_ratio: 0.5,
                near_critical_ratio: 0.5,
                timing_risk_score: Some(7.6),
            }),
        );
    }

    let rebuilt = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .build()
        .unwrap();
    assert_eq!(rebuilt.super_nodes.len(), first.super_nodes.len());
    for (id, sn) in &rebuilt.super_nodes {
        let with_bundle = &first.super_nodes[id];
        assert_eq!(sn.member_nodes, with_bundle.member_nodes);
        assert_eq!(sn.super_class, with_bundle.super_class);
        assert!(sn.analysis.is_empty());
    }
}

#[test]
fn cancelled_build_returns_interrupted() {
    let graph = mixed_graph();
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = ViewBuilder::new(&graph, View::Connectivity, ViewContext::Design)
        .with_cancel_token(cancel)
        .build();
    assert!(matches!(result, Err(ViewError::Interrupted)));
}
