//! Reactor model splitting one inlet over one or two outlets.
//!
//! # Example
//!
//! ```
//! use flowlink::{Device, Stream};
//! use flowlink::models::Reactor;
//!
//! let reactor = Reactor::new(true);
//! let (top, bottom) = (Stream::shared(2), Stream::shared(3));
//! reactor.add_input(&Stream::shared(1).with_mass_flow(10.0))?;
//! reactor.add_output(&top)?;
//! reactor.add_output(&bottom)?;
//!
//! reactor.update_outputs()?;
//! assert_eq!(top.mass_flow(), 5.0);
//! assert_eq!(bottom.mass_flow(), 5.0);
//! # Ok::<(), flowlink::DeviceError>(())
//! ```

use crate::*;
use std::fmt;
use std::rc::{Rc, Weak};

/// Reactor with a single inlet and one or two outlets.
///
/// Every outlet receives the inlet flow divided by the outlet capacity, so a
/// double-outlet reactor writes half the inlet flow even if only one outlet
/// is connected.
#[derive(Debug)]
pub struct Reactor {
    ports: Ports,
}

impl Reactor {
    /// Creates a reactor with two outlets if `double_output`, otherwise one.
    pub fn new(double_output: bool) -> Rc<Self> {
        let n_outlets = if double_output { 2 } else { 1 };
        Rc::new_cyclic(|this: &Weak<Reactor>| {
            let this: Weak<dyn Device> = this.clone();
            Reactor { ports: Ports::new(this, REACTOR_INPUTS, n_outlets) }
        })
    }

    pub fn is_double_output(&self) -> bool {
        self.ports.output_capacity() == 2
    }
}

impl Device for Reactor {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Reactor
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn compute_outputs(&self, inlet_flows: &[f64], n_outlets: usize) -> DeviceResult<Vec<f64>> {
        let Some(&inlet_flow) = inlet_flows.first() else {
            return Err(DeviceError::MissingInputs {
                device: DeviceKind::Reactor,
                required: REACTOR_INPUTS,
                connected: 0,
            });
        };
        let part = inlet_flow / self.output_capacity() as f64;
        Ok(vec![part; n_outlets])
    }
}

impl fmt::Display for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DeviceSummary(self))
    }
}
