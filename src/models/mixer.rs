//! Mixer model combining multiple inlet streams.
//!
//! # Example
//!
//! ```
//! use flowlink::{Device, Stream};
//! use flowlink::models::Mixer;
//!
//! let mixer = Mixer::new(2);
//! let product = Stream::shared(3);
//! mixer.add_input(&Stream::shared(1).with_mass_flow(10.0))?;
//! mixer.add_input(&Stream::shared(2).with_mass_flow(5.0))?;
//! mixer.add_output(&product)?;
//!
//! mixer.update_outputs()?;
//! assert_eq!(product.mass_flow(), 15.0);
//! # Ok::<(), flowlink::DeviceError>(())
//! ```

use crate::*;
use std::fmt;
use std::rc::{Rc, Weak};

/// Mixer combining inlet streams by summing their mass flows.
///
/// This is a multi-port unit with N inputs and 1 output.
#[derive(Debug)]
pub struct Mixer {
    ports: Ports,
}

impl Mixer {
    /// Creates a mixer accepting up to `n_inlets` input streams.
    pub fn new(n_inlets: usize) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Mixer>| {
            let this: Weak<dyn Device> = this.clone();
            Mixer { ports: Ports::new(this, n_inlets, MIXER_OUTPUTS) }
        })
    }

    /// Gets the number of inlets the mixer accepts.
    pub fn n_inlets(&self) -> usize {
        self.ports.input_capacity()
    }
}

impl Device for Mixer {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Mixer
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Mass balance: the outlet carries the sum of whatever inlets are connected.
    fn compute_outputs(&self, inlet_flows: &[f64], n_outlets: usize) -> DeviceResult<Vec<f64>> {
        let total_flow: f64 = inlet_flows.iter().sum();
        Ok(vec![total_flow; n_outlets])
    }
}

impl fmt::Display for Mixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DeviceSummary(self))
    }
}
