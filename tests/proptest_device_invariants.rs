//! Property-based invariant tests for device wiring and computation.
//!
//! 1. Connections never exceed a device's capacities.
//! 2. A mixer's outlet equals the sum of its inlets.
//! 3. A reactor writes inlet / outlet capacity to every outlet.
//! 4. A second update fails and leaves every outlet untouched.

use flowlink::models::{Mixer, Reactor};
use flowlink::{Device, DeviceError, Stream, FLOW_TOLERANCE};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn flow_strategy() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

fn flows_strategy() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(flow_strategy(), 1..8)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Capacity invariant
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mixer_inputs_never_exceed_capacity(capacity in 0usize..6, attempts in 0usize..12) {
        let mixer = Mixer::new(capacity);
        for i in 0..attempts {
            let result = mixer.add_input(&Stream::shared(i));
            if i < capacity {
                prop_assert!(result.is_ok());
            } else {
                let is_capacity_error = matches!(result, Err(DeviceError::CapacityExceeded { .. }));
                prop_assert!(is_capacity_error);
            }
            prop_assert!(mixer.inputs().len() <= capacity);
        }
        prop_assert_eq!(mixer.inputs().len(), attempts.min(capacity));
    }

    #[test]
    fn reactor_outputs_never_exceed_capacity(double_output: bool, attempts in 0usize..5) {
        let reactor = Reactor::new(double_output);
        for i in 0..attempts {
            let _ = reactor.add_output(&Stream::shared(i));
            prop_assert!(reactor.outputs().len() <= reactor.output_capacity());
        }
        prop_assert_eq!(reactor.outputs().len(), attempts.min(reactor.output_capacity()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2-4. Computation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mixer_outlet_is_sum_of_inlets(flows in flows_strategy()) {
        let mixer = Mixer::new(flows.len());
        for (i, flow) in flows.iter().enumerate() {
            mixer.add_input(&Stream::shared(i).with_mass_flow(*flow)).unwrap();
        }
        let outlet = Stream::shared(flows.len());
        mixer.add_output(&outlet).unwrap();

        mixer.update_outputs().unwrap();

        let expected: f64 = flows.iter().sum();
        prop_assert!((outlet.mass_flow() - expected).abs() < FLOW_TOLERANCE);
    }

    #[test]
    fn reactor_splits_evenly(inlet_flow in flow_strategy(), double_output: bool) {
        let reactor = Reactor::new(double_output);
        reactor.add_input(&Stream::shared(0).with_mass_flow(inlet_flow)).unwrap();
        let outlets: Vec<_> = (1..=reactor.output_capacity()).map(Stream::shared).collect();
        for outlet in &outlets {
            reactor.add_output(outlet).unwrap();
        }

        reactor.update_outputs().unwrap();

        let part = inlet_flow / outlets.len() as f64;
        for outlet in &outlets {
            prop_assert!((outlet.mass_flow() - part).abs() < FLOW_TOLERANCE);
        }
        let total: f64 = outlets.iter().map(|s| s.mass_flow()).sum();
        prop_assert!((total - inlet_flow).abs() < FLOW_TOLERANCE);
    }

    #[test]
    fn second_update_changes_nothing(flows in flows_strategy(), bump in flow_strategy()) {
        let mixer = Mixer::new(flows.len());
        let inlets: Vec<_> = flows
            .iter()
            .enumerate()
            .map(|(i, flow)| Stream::shared(i).with_mass_flow(*flow))
            .collect();
        for inlet in &inlets {
            mixer.add_input(inlet).unwrap();
        }
        let outlet = Stream::shared(flows.len());
        mixer.add_output(&outlet).unwrap();

        prop_assert!(mixer.update_outputs().is_ok());
        let first = outlet.mass_flow();

        inlets[0].set_mass_flow(bump);
        let second = mixer.update_outputs();
        let is_already_calculated = matches!(second, Err(DeviceError::AlreadyCalculated { .. }));
        prop_assert!(is_already_calculated);
        prop_assert_eq!(outlet.mass_flow(), first);
        prop_assert!(mixer.is_calculated());
    }
}
