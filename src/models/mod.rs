//! Unit operation models.
//!
//! Each model is a separate file:
//!
//! - **Mixer**: sums any number of inlet streams into one outlet
//! - **Reactor**: splits its single inlet evenly over one or two outlets
//!
//! Models are created behind a shared handle (`Rc<Mixer>`, `Rc<Reactor>`) so
//! that they can hand streams a weak reference to themselves while connecting.
//!
//! ## Example
//!
//! ```
//! use flowlink::{Device, StreamCounter};
//! use flowlink::models::{Mixer, Reactor};
//!
//! let mut counter = StreamCounter::new();
//! let feed = counter.next_stream().with_mass_flow(10.0);
//! let top = counter.next_stream();
//! let bottom = counter.next_stream();
//!
//! let reactor = Reactor::new(true);
//! reactor.add_input(&feed)?;
//! reactor.add_output(&top)?;
//! reactor.add_output(&bottom)?;
//! reactor.update_outputs()?;
//!
//! assert_eq!(top.mass_flow(), 5.0);
//! assert_eq!(bottom.mass_flow(), 5.0);
//! assert!(Mixer::new(3).outputs().is_empty());
//! # Ok::<(), flowlink::DeviceError>(())
//! ```
//!
//! # Adding a Model
//!
//! A model owns a [`Ports`](crate::Ports) built inside `Rc::new_cyclic`,
//! reports its [`DeviceKind`](crate::DeviceKind) and implements the pure
//! `compute_outputs`. Connection handling and the once-only update are
//! inherited from [`Device`](crate::Device).

pub mod mixer;
pub mod reactor;

pub use mixer::Mixer;
pub use reactor::Reactor;
