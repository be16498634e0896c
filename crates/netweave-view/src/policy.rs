//! Per-node abstraction policies.
//!
//! A policy maps `(context, view, entity class)` to an action (promote,
//! merge, eliminate) plus the target super class. The static tables are
//! total over the class enum; name-based dynamic overrides apply after
//! the table lookup.

use serde::{Deserialize, Serialize};

use netweave_core::{EntityClass, Node};

use crate::model::{SuperClass, View, ViewContext};

/// What the builder does with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAction {
    Promote,
    Merge,
    Eliminate,
}

/// The action plus the super class it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePolicy {
    pub action: PolicyAction,
    pub super_class: SuperClass,
}

impl NodePolicy {
    const fn promote() -> Self {
        NodePolicy {
            action: PolicyAction::Promote,
            super_class: SuperClass::Atomic,
        }
    }

    const fn merge(super_class: SuperClass) -> Self {
        NodePolicy {
            action: PolicyAction::Merge,
            super_class,
        }
    }

    const fn eliminate() -> Self {
        NodePolicy {
            action: PolicyAction::Eliminate,
            super_class: SuperClass::Eliminated,
        }
    }
}

/// The static table lookup, before dynamic overrides.
pub fn base_policy(context: ViewContext, view: View, class: EntityClass) -> NodePolicy {
    match context {
        ViewContext::Design => design_policy(view, class),
        ViewContext::Simulation => simulation_policy(view, class),
    }
}

/// Design context: only what ends up on the die matters.
fn design_policy(view: View, class: EntityClass) -> NodePolicy {
    match view {
        // Module skeleton: instances and ports stand alone, every
        // primitive folds into its owning module.
        View::Structural => match class {
            EntityClass::ModuleInstance | EntityClass::IoPort => NodePolicy::promote(),
            EntityClass::RtlBlock
            | EntityClass::Fsm
            | EntityClass::FlipFlop
            | EntityClass::Lut
            | EntityClass::Mux
            | EntityClass::Dsp
            | EntityClass::Bram => NodePolicy::merge(SuperClass::ModuleCluster),
            EntityClass::PackagePin
            | EntityClass::Pblock
            | EntityClass::BoardConnector
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
        // Register-to-register connectivity: state elements stand alone,
        // combinational primitives collapse into clouds, hierarchy
        // dissolves (the children carry the structure).
        View::Connectivity => match class {
            EntityClass::FlipFlop
            | EntityClass::Dsp
            | EntityClass::Bram
            | EntityClass::IoPort => NodePolicy::promote(),
            EntityClass::Lut | EntityClass::Mux => {
                NodePolicy::merge(SuperClass::CombinationalCloud)
            }
            EntityClass::ModuleInstance
            | EntityClass::RtlBlock
            | EntityClass::Fsm
            | EntityClass::PackagePin
            | EntityClass::Pblock
            | EntityClass::BoardConnector
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
        // Placement view: only physically placed objects survive.
        View::Physical => match class {
            EntityClass::IoPort
            | EntityClass::Pblock
            | EntityClass::PackagePin
            | EntityClass::BoardConnector => NodePolicy::promote(),
            EntityClass::Dsp | EntityClass::Bram => NodePolicy::merge(SuperClass::ConstraintGroup),
            EntityClass::ModuleInstance
            | EntityClass::RtlBlock
            | EntityClass::Fsm
            | EntityClass::FlipFlop
            | EntityClass::Lut
            | EntityClass::Mux
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
    }
}

/// Simulation context: interfaces and state visibility; physical objects
/// have no simulation meaning anywhere.
fn simulation_policy(view: View, class: EntityClass) -> NodePolicy {
    match view {
        View::Structural => match class {
            EntityClass::ModuleInstance | EntityClass::IoPort => NodePolicy::promote(),
            EntityClass::RtlBlock
            | EntityClass::Fsm
            | EntityClass::FlipFlop
            | EntityClass::Lut
            | EntityClass::Mux
            | EntityClass::Dsp
            | EntityClass::Bram => NodePolicy::merge(SuperClass::ModuleCluster),
            EntityClass::PackagePin
            | EntityClass::Pblock
            | EntityClass::BoardConnector
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
        // State elements stay visible for waveform-level inspection.
        View::Connectivity => match class {
            EntityClass::ModuleInstance
            | EntityClass::IoPort
            | EntityClass::FlipFlop
            | EntityClass::Dsp
            | EntityClass::Bram => NodePolicy::promote(),
            EntityClass::RtlBlock | EntityClass::Fsm | EntityClass::Lut | EntityClass::Mux => {
                NodePolicy::merge(SuperClass::ModuleCluster)
            }
            EntityClass::PackagePin
            | EntityClass::Pblock
            | EntityClass::BoardConnector
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
        View::Physical => match class {
            EntityClass::ModuleInstance
            | EntityClass::RtlBlock
            | EntityClass::Fsm
            | EntityClass::FlipFlop
            | EntityClass::Lut
            | EntityClass::Mux
            | EntityClass::Dsp
            | EntityClass::Bram
            | EntityClass::IoPort
            | EntityClass::PackagePin
            | EntityClass::Pblock
            | EntityClass::BoardConnector
            | EntityClass::ClockDomain => NodePolicy::eliminate(),
        },
    }
}

/// The effective policy for a node: static table plus dynamic overrides.
pub fn node_policy(context: ViewContext, view: View, node: &Node) -> NodePolicy {
    let base = base_policy(context, view, node.entity_class);

    match context {
        // Verification scaffolding has no design meaning.
        ViewContext::Design => {
            if is_testbench_artifact(node) {
                return NodePolicy::eliminate();
            }
        }
        // Stimulus generators must stay individually visible.
        ViewContext::Simulation => {
            let name = node.local_name.to_lowercase();
            if (name.starts_with("clk_gen") || name.starts_with("reset_gen"))
                && base.action == PolicyAction::Merge
            {
                return NodePolicy::promote();
            }
        }
    }

    base
}

/// `tb_`-prefixed names, or a `testbench`/`sim` hierarchy segment.
fn is_testbench_artifact(node: &Node) -> bool {
    if node.local_name.to_lowercase().starts_with("tb_") {
        return true;
    }
    node.hier_path
        .split('/')
        .any(|segment| segment.eq_ignore_ascii_case("testbench") || segment.eq_ignore_ascii_case("sim"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::{DesignGraph, NodeSpec};

    fn node(graph: &mut DesignGraph, path: &str, class: EntityClass) -> Node {
        let id = graph.add_node(NodeSpec::new(path, class)).unwrap();
        graph.node(id).unwrap().clone()
    }

    #[test]
    fn design_connectivity_exemplar() {
        let ctx = ViewContext::Design;
        let view = View::Connectivity;
        assert_eq!(
            base_policy(ctx, view, EntityClass::FlipFlop).action,
            PolicyAction::Promote
        );
        assert_eq!(
            base_policy(ctx, view, EntityClass::Lut),
            NodePolicy::merge(SuperClass::CombinationalCloud)
        );
        assert_eq!(
            base_policy(ctx, view, EntityClass::ModuleInstance).action,
            PolicyAction::Eliminate
        );
        assert_eq!(
            base_policy(ctx, view, EntityClass::PackagePin).action,
            PolicyAction::Eliminate
        );
    }

    #[test]
    fn physical_promotes_placement_objects() {
        let ctx = ViewContext::Design;
        assert_eq!(
            base_policy(ctx, View::Physical, EntityClass::Pblock).action,
            PolicyAction::Promote
        );
        assert_eq!(
            base_policy(ctx, View::Physical, EntityClass::Dsp),
            NodePolicy::merge(SuperClass::ConstraintGroup)
        );
        assert_eq!(
            base_policy(ctx, View::Physical, EntityClass::FlipFlop).action,
            PolicyAction::Eliminate
        );
    }

    #[test]
    fn simulation_eliminates_physical_everywhere() {
        for view in View::ALL {
            for class in [
                EntityClass::PackagePin,
                EntityClass::Pblock,
                EntityClass::BoardConnector,
            ] {
                assert_eq!(
                    base_policy(ViewContext::Simulation, view, class).action,
                    PolicyAction::Eliminate,
                    "{class:?} must be eliminated in Simulation.{view}"
                );
            }
        }
    }

    #[test]
    fn design_override_eliminates_testbench_names() {
        let mut graph = DesignGraph::new();
        node(&mut graph, "top", EntityClass::ModuleInstance);
        let tb = node(&mut graph, "top/tb_wrapper", EntityClass::ModuleInstance);
        assert_eq!(
            node_policy(ViewContext::Design, View::Structural, &tb).action,
            PolicyAction::Eliminate
        );

        // `sim` must match as a whole segment, not a substring.
        let simd = node(&mut graph, "top/simd_unit", EntityClass::ModuleInstance);
        assert_eq!(
            node_policy(ViewContext::Design, View::Structural, &simd).action,
            PolicyAction::Promote
        );
        node(&mut graph, "top/sim", EntityClass::ModuleInstance);
        let under_sim = node(&mut graph, "top/sim/driver", EntityClass::RtlBlock);
        assert_eq!(
            node_policy(ViewContext::Design, View::Structural, &under_sim).action,
            PolicyAction::Eliminate
        );
    }

    #[test]
    fn simulation_override_promotes_stimulus_generators() {
        let mut graph = DesignGraph::new();
        let gen = node(&mut graph, "clk_gen_main", EntityClass::RtlBlock);
        let policy = node_policy(ViewContext::Simulation, View::Connectivity, &gen);
        assert_eq!(policy.action, PolicyAction::Promote);
        assert_eq!(policy.super_class, SuperClass::Atomic);

        // Design context does not care about stimulus generators.
        let policy = node_policy(ViewContext::Design, View::Connectivity, &gen);
        assert_eq!(policy.action, PolicyAction::Eliminate);
    }
}
