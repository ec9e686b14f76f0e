//! Events emitted with the `tracing` feature enabled.
//!
//! Run with `cargo test --features tracing`.

#![cfg(feature = "tracing")]

use std::sync::{Arc, Mutex};

use flowlink::models::Mixer;
use flowlink::{Device, Stream};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Debug, Default)]
struct TraceState {
    events: Vec<(Level, String)>,
}

struct DeviceTraceCapture {
    state: Arc<Mutex<TraceState>>,
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for DeviceTraceCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.state
            .lock()
            .expect("trace lock")
            .events
            .push((*event.metadata().level(), visitor.message));
    }
}

fn count(state: &TraceState, level: Level, message: &str) -> usize {
    state.events.iter().filter(|(l, m)| *l == level && m == message).count()
}

#[test]
fn connections_updates_and_rejections_are_traced() {
    let state = Arc::new(Mutex::new(TraceState::default()));
    let subscriber =
        tracing_subscriber::registry().with(DeviceTraceCapture { state: Arc::clone(&state) });
    let _guard = tracing::subscriber::set_default(subscriber);

    let mixer = Mixer::new(2);
    mixer.add_input(&Stream::shared(1).with_mass_flow(10.0)).unwrap();
    mixer.add_input(&Stream::shared(2).with_mass_flow(5.0)).unwrap();
    mixer.add_output(&Stream::shared(3)).unwrap();
    mixer.update_outputs().unwrap();

    assert!(mixer.add_input(&Stream::shared(4)).is_err());
    assert!(mixer.update_outputs().is_err());

    let snapshot = state.lock().expect("trace lock");
    assert_eq!(count(&snapshot, Level::DEBUG, "stream connected"), 3);
    assert_eq!(count(&snapshot, Level::DEBUG, "outputs updated"), 1);
    assert_eq!(count(&snapshot, Level::WARN, "device operation rejected"), 2);
}
