//! # Flowlink: Devices and Streams for Small Process Flowsheets
//!
//! A minimal flowsheet model: unit operations (devices) connected by directed
//! material streams carrying a scalar mass flow. Each device accepts a fixed
//! number of input and output streams and computes its outputs from its inputs
//! exactly once.
//!
//! Devices hold strong handles to the streams they are connected to. Streams
//! only observe the devices at either end through weak handles, so a stream
//! never keeps a device alive.
//!
//! ## Example
//!
//! ```
//! use flowlink::{Device, Stream, FLOW_TOLERANCE};
//! use flowlink::models::{Mixer, Reactor};
//!
//! let mixer = Mixer::new(2);
//! let reactor = Reactor::new(true);
//!
//! let feed_a = Stream::shared(1).with_mass_flow(10.0);
//! let feed_b = Stream::shared(2).with_mass_flow(5.0);
//! let mixed = Stream::shared(3);
//! let top = Stream::shared(4);
//! let bottom = Stream::shared(5);
//!
//! mixer.add_input(&feed_a)?;
//! mixer.add_input(&feed_b)?;
//! mixer.add_output(&mixed)?;
//! reactor.add_input(&mixed)?;
//! reactor.add_output(&top)?;
//! reactor.add_output(&bottom)?;
//!
//! // The driver decides the order
//! mixer.update_outputs()?;
//! reactor.update_outputs()?;
//!
//! assert!((mixed.mass_flow() - 15.0).abs() < FLOW_TOLERANCE);
//! assert!((top.mass_flow() - 7.5).abs() < FLOW_TOLERANCE);
//!
//! // A device is computed only once
//! assert!(mixer.update_outputs().is_err());
//! # Ok::<(), flowlink::DeviceError>(())
//! ```
//!
//! Dropping a device leaves its streams intact; their back-references simply
//! stop resolving:
//!
//! ```
//! use flowlink::{Device, Stream};
//! use flowlink::models::Mixer;
//!
//! let stream = Stream::shared(7);
//! {
//!     let mixer = Mixer::new(1);
//!     mixer.add_output(&stream)?;
//!     assert!(stream.source_device().is_some());
//! }
//! assert!(stream.source_device().is_none());
//! # Ok::<(), flowlink::DeviceError>(())
//! ```
//!
//! ## Optional Features
//!
//! - **`tracing`**: emits `tracing` events for connections, computations and
//!   rejected operations. Without it the crate does no logging at all.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

pub mod models;

pub use models::{Mixer, Reactor};

/// Mixers have exactly one outlet.
pub const MIXER_OUTPUTS: usize = 1;

/// Reactors have exactly one inlet.
pub const REACTOR_INPUTS: usize = 1;

/// Absolute tolerance for comparing mass flows.
pub const FLOW_TOLERANCE: f64 = 0.01;

/// Prefix of generated stream names (`s7` for identifier 7).
pub const STREAM_NAME_PREFIX: &str = "s";

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by connection and computation operations.
///
/// All of them are wiring mistakes made by the caller. None of them leaves a
/// device or stream partially modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The device already holds as many streams as it accepts on that side
    #[error("{device} accepts at most {capacity} {direction} stream(s); cannot connect {stream}")]
    CapacityExceeded { device: DeviceKind, direction: PortDirection, capacity: usize, stream: String },
    /// `update_outputs` was called on a device that has already been computed
    #[error("{device} has already been calculated")]
    AlreadyCalculated { device: DeviceKind },
    /// `update_outputs` was called before any output stream was connected
    #[error("{device} has no output streams; connect outputs before updating")]
    MissingOutputs { device: DeviceKind },
    /// The computation needs more input streams than are connected
    #[error("{device} needs {required} input stream(s) but {connected} connected")]
    MissingInputs { device: DeviceKind, required: usize, connected: usize },
    /// `compute_outputs` returned a different number of values than outlets connected
    #[error("{device} computed {computed} outlet flow(s) for {expected} connected outlet(s)")]
    OutletCountMismatch { device: DeviceKind, expected: usize, computed: usize },
    /// The stream is still attached to a live device at that end
    #[error("stream {stream} is already connected as an {direction} of another live device")]
    AlreadyConnected { device: DeviceKind, direction: PortDirection, stream: String },
}

/// Side of a device a stream is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Stream flows into the device
    Input,
    /// Stream flows out of the device
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// The closed set of device variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Mixer,
    Reactor,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Mixer => f.write_str("Mixer"),
            DeviceKind::Reactor => f.write_str("Reactor"),
        }
    }
}

/// Per-device computation state.
///
/// `Uncalculated -> Calculated` is the only transition and it happens once,
/// on the first successful `update_outputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculationState {
    #[default]
    Uncalculated,
    Calculated,
}

impl CalculationState {
    /// Whether outputs have been written.
    pub fn is_calculated(self) -> bool {
        matches!(self, CalculationState::Calculated)
    }
}

impl fmt::Display for CalculationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationState::Uncalculated => f.write_str("uncalculated"),
            CalculationState::Calculated => f.write_str("calculated"),
        }
    }
}

/// Component Layer: Streams
/// Named material stream carrying a mass flow between two devices.
///
/// Streams are shared through `Rc<Stream>`: the devices a stream is connected
/// to each hold one strong handle, and so may the caller. The stream in turn
/// only keeps weak handles to its source and target devices.
///
/// # Examples
///
/// ```
/// use flowlink::Stream;
///
/// let stream = Stream::new(7);
/// assert_eq!(stream.name(), "s7");
/// assert_eq!(stream.mass_flow(), 0.0);
///
/// stream.set_mass_flow(12.5);
/// assert_eq!(stream.to_string(), "Stream s7 flow = 12.5");
/// ```
#[derive(Debug)]
pub struct Stream {
    name: RefCell<String>,
    /// Mass flow rate [kg/s]
    mass_flow: Cell<f64>,
    /// Device this stream flows out of
    source: RefCell<Option<Weak<dyn Device>>>,
    /// Device this stream flows into
    target: RefCell<Option<Weak<dyn Device>>>,
}

impl Stream {
    /// Creates an unconnected stream named `s<id>` with zero flow.
    pub fn new(id: usize) -> Self {
        Stream {
            name: RefCell::new(format!("{}{}", STREAM_NAME_PREFIX, id)),
            mass_flow: Cell::new(0.0),
            source: RefCell::new(None),
            target: RefCell::new(None),
        }
    }

    /// Creates a stream already wrapped in a shared handle.
    pub fn shared(id: usize) -> Rc<Self> {
        Rc::new(Self::new(id))
    }

    /// Sets the initial mass flow, builder style.
    pub fn with_mass_flow(self: Rc<Self>, mass_flow: f64) -> Rc<Self> {
        self.set_mass_flow(mass_flow);
        self
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Renames the stream. Names are for display only; they are not identity.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    pub fn mass_flow(&self) -> f64 {
        self.mass_flow.get()
    }

    /// Sets the mass flow. No physical plausibility check is made.
    pub fn set_mass_flow(&self, mass_flow: f64) {
        self.mass_flow.set(mass_flow);
    }

    /// Records `device` as the device this stream flows out of.
    ///
    /// Overwrites any previous source without touching that device's stream
    /// list. `Device::add_output` calls this together with registering the
    /// stream, which is the only way correct callers should use it.
    pub fn set_source_device(&self, device: Weak<dyn Device>) {
        *self.source.borrow_mut() = Some(device);
    }

    /// Records `device` as the device this stream flows into.
    ///
    /// Same overwrite semantics as [`Stream::set_source_device`].
    pub fn set_target_device(&self, device: Weak<dyn Device>) {
        *self.target.borrow_mut() = Some(device);
    }

    /// Resolves the source device, or `None` if it was never set or has been dropped.
    pub fn source_device(&self) -> Option<Rc<dyn Device>> {
        self.source.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Resolves the target device, or `None` if it was never set or has been dropped.
    pub fn target_device(&self) -> Option<Rc<dyn Device>> {
        self.target.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn device_at(&self, direction: PortDirection) -> Option<Rc<dyn Device>> {
        match direction {
            // An input of a device is a stream whose target is that device
            PortDirection::Input => self.target_device(),
            PortDirection::Output => self.source_device(),
        }
    }

    fn attach(&self, direction: PortDirection, device: Weak<dyn Device>) {
        match direction {
            PortDirection::Input => self.set_target_device(device),
            PortDirection::Output => self.set_source_device(device),
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream {} flow = {}", self.name.borrow(), self.mass_flow())
    }
}

/// Hands out streams named from a monotonically increasing counter.
///
/// # Examples
///
/// ```
/// use flowlink::StreamCounter;
///
/// let mut counter = StreamCounter::starting_at(100);
/// assert_eq!(counter.next_stream().name(), "s100");
/// assert_eq!(counter.next_stream().name(), "s101");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamCounter {
    next_id: usize,
}

impl StreamCounter {
    /// Creates a counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next_id: usize) -> Self {
        StreamCounter { next_id }
    }

    /// Identifier the next stream will get.
    pub fn peek(&self) -> usize {
        self.next_id
    }

    /// Creates a new shared stream and advances the counter.
    pub fn next_stream(&mut self) -> Rc<Stream> {
        let id = self.next_id;
        self.next_id += 1;
        Stream::shared(id)
    }
}

/// Returns whether two shared handles point at the same device.
///
/// Works across concrete and trait-object handles, e.g. an `Rc<Mixer>` held by
/// the caller and the `Rc<dyn Device>` resolved from a stream.
pub fn same_device<A: ?Sized, B: ?Sized>(a: &Rc<A>, b: &Rc<B>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Connection scaffolding shared by every device variant.
///
/// Holds the connected streams in attachment order, the fixed capacities, the
/// calculation state and a weak handle to the owning device, which is handed
/// to streams as their back-reference. Variants construct it inside
/// `Rc::new_cyclic` so the handle points at the device itself.
#[derive(Debug)]
pub struct Ports {
    this: Weak<dyn Device>,
    input_capacity: usize,
    output_capacity: usize,
    inputs: RefCell<Vec<Rc<Stream>>>,
    outputs: RefCell<Vec<Rc<Stream>>>,
    state: Cell<CalculationState>,
}

impl Ports {
    /// Creates empty ports for the device behind `this`.
    pub fn new(this: Weak<dyn Device>, input_capacity: usize, output_capacity: usize) -> Self {
        Ports {
            this,
            input_capacity,
            output_capacity,
            inputs: RefCell::new(Vec::new()),
            outputs: RefCell::new(Vec::new()),
            state: Cell::new(CalculationState::Uncalculated),
        }
    }

    pub fn input_capacity(&self) -> usize {
        self.input_capacity
    }

    pub fn output_capacity(&self) -> usize {
        self.output_capacity
    }

    pub fn state(&self) -> CalculationState {
        self.state.get()
    }

    fn slots(&self, direction: PortDirection) -> (&RefCell<Vec<Rc<Stream>>>, usize) {
        match direction {
            PortDirection::Input => (&self.inputs, self.input_capacity),
            PortDirection::Output => (&self.outputs, self.output_capacity),
        }
    }

    /// Snapshot of the streams connected on one side, in slot order.
    pub fn streams(&self, direction: PortDirection) -> Vec<Rc<Stream>> {
        self.slots(direction).0.borrow().clone()
    }

    pub fn connected(&self, direction: PortDirection) -> usize {
        self.slots(direction).0.borrow().len()
    }

    /// Appends `stream` on one side and points its back-reference here.
    ///
    /// Both checks run before anything is mutated.
    pub fn connect(
        &self,
        device: DeviceKind,
        direction: PortDirection,
        stream: &Rc<Stream>,
    ) -> DeviceResult<()> {
        let (slots, capacity) = self.slots(direction);
        let mut slots = slots.borrow_mut();

        if slots.len() >= capacity {
            return rejected(DeviceError::CapacityExceeded {
                device,
                direction,
                capacity,
                stream: stream.name(),
            });
        }
        // Expired back-references do not block reconnection
        if stream.device_at(direction).is_some() {
            return rejected(DeviceError::AlreadyConnected {
                device,
                direction,
                stream: stream.name(),
            });
        }

        slots.push(Rc::clone(stream));
        stream.attach(direction, self.this.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            device = %device,
            direction = %direction,
            stream = %stream.name(),
            slot = slots.len() - 1,
            "stream connected"
        );
        Ok(())
    }

    /// Runs one computation and writes its results to every output stream.
    ///
    /// `compute` receives the input flows in slot order and the number of
    /// connected outputs. Outputs are only written, and the state only
    /// advances, once every check and the computation itself have succeeded.
    pub fn update<F>(&self, device: DeviceKind, compute: F) -> DeviceResult<()>
    where
        F: FnOnce(&[f64], usize) -> DeviceResult<Vec<f64>>,
    {
        if self.state().is_calculated() {
            return rejected(DeviceError::AlreadyCalculated { device });
        }

        let outputs = self.outputs.borrow();
        if outputs.is_empty() {
            return rejected(DeviceError::MissingOutputs { device });
        }

        let inlet_flows: Vec<f64> = self.inputs.borrow().iter().map(|s| s.mass_flow()).collect();
        let outlet_flows = match compute(&inlet_flows, outputs.len()) {
            Ok(flows) => flows,
            Err(error) => return rejected(error),
        };
        if outlet_flows.len() != outputs.len() {
            return rejected(DeviceError::OutletCountMismatch {
                device,
                expected: outputs.len(),
                computed: outlet_flows.len(),
            });
        }

        for (stream, flow) in outputs.iter().zip(&outlet_flows) {
            stream.set_mass_flow(*flow);
        }
        self.state.set(CalculationState::Calculated);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            device = %device,
            inlets = inlet_flows.len(),
            outlets = outputs.len(),
            total_outlet_flow = outlet_flows.iter().sum::<f64>(),
            "outputs updated"
        );
        Ok(())
    }

    fn fmt_summary(&self, device: DeviceKind, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}/{} in, {}/{} out, {}]",
            device,
            self.connected(PortDirection::Input),
            self.input_capacity,
            self.connected(PortDirection::Output),
            self.output_capacity,
            self.state()
        )
    }
}

fn rejected<T>(error: DeviceError) -> DeviceResult<T> {
    #[cfg(feature = "tracing")]
    tracing::warn!(%error, "device operation rejected");
    Err(error)
}

/// A unit operation with fixed stream capacities and a computation rule.
///
/// Variants supply their [`Ports`], their kind and the pure flow computation;
/// connection handling and the once-only update contract are shared.
///
/// # Examples
///
/// ```
/// use flowlink::{Device, DeviceError, Stream};
/// use flowlink::models::Mixer;
///
/// let mixer = Mixer::new(1);
/// mixer.add_input(&Stream::shared(1))?;
///
/// let err = mixer.add_input(&Stream::shared(2)).unwrap_err();
/// assert!(matches!(err, DeviceError::CapacityExceeded { capacity: 1, .. }));
/// assert_eq!(mixer.inputs().len(), 1);
/// # Ok::<(), DeviceError>(())
/// ```
pub trait Device: fmt::Debug {
    /// Which variant this device is.
    fn kind(&self) -> DeviceKind;

    /// The device's connection scaffolding.
    fn ports(&self) -> &Ports;

    /// Computes the outlet flows from the inlet flows, without side effects.
    ///
    /// Must return exactly `n_outlets` values; any other count makes
    /// `update_outputs` fail with [`DeviceError::OutletCountMismatch`].
    fn compute_outputs(&self, inlet_flows: &[f64], n_outlets: usize) -> DeviceResult<Vec<f64>>;

    /// Connects a stream flowing into this device.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::CapacityExceeded`] if all input slots are taken.
    /// - [`DeviceError::AlreadyConnected`] if the stream already flows into a live device.
    fn add_input(&self, stream: &Rc<Stream>) -> DeviceResult<()> {
        self.ports().connect(self.kind(), PortDirection::Input, stream)
    }

    /// Connects a stream flowing out of this device.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::CapacityExceeded`] if all output slots are taken.
    /// - [`DeviceError::AlreadyConnected`] if the stream already flows out of a live device.
    fn add_output(&self, stream: &Rc<Stream>) -> DeviceResult<()> {
        self.ports().connect(self.kind(), PortDirection::Output, stream)
    }

    /// Computes and writes the output flows. Succeeds at most once per device.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::AlreadyCalculated`] on any call after a successful one.
    /// - [`DeviceError::MissingOutputs`] if no output stream is connected.
    /// - [`DeviceError::MissingInputs`] if the variant needs more inputs.
    /// - [`DeviceError::OutletCountMismatch`] if the variant computed the wrong number of flows.
    fn update_outputs(&self) -> DeviceResult<()> {
        self.ports().update(self.kind(), |inlet_flows, n_outlets| {
            self.compute_outputs(inlet_flows, n_outlets)
        })
    }

    fn input_capacity(&self) -> usize {
        self.ports().input_capacity()
    }

    fn output_capacity(&self) -> usize {
        self.ports().output_capacity()
    }

    /// Connected input streams in attachment order.
    fn inputs(&self) -> Vec<Rc<Stream>> {
        self.ports().streams(PortDirection::Input)
    }

    /// Connected output streams in attachment order.
    fn outputs(&self) -> Vec<Rc<Stream>> {
        self.ports().streams(PortDirection::Output)
    }

    fn state(&self) -> CalculationState {
        self.ports().state()
    }

    fn is_calculated(&self) -> bool {
        self.state().is_calculated()
    }
}

/// Renders a one-line summary: `Mixer [2/2 in, 1/1 out, calculated]`.
pub struct DeviceSummary<'a, D: Device + ?Sized>(pub &'a D);

impl<D: Device + ?Sized> fmt::Display for DeviceSummary<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.ports().fmt_summary(self.0.kind(), f)
    }
}
