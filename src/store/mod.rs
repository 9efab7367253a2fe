//! # In-Memory Store
//!
//! Observable values, rolling telemetry histories, control setpoints and
//! their JSON snapshots, gathered into one shared [`state::AdcsState`].

pub mod observable;
pub mod rolling;
pub mod setpoints;
pub mod snapshot;
pub mod state;

pub use observable::{ChannelListener, Listener, ListenerId, ObservableValue};
pub use rolling::{AxisChannel, AxisSeries, RollingChannelStore, ScalarChannel};
pub use state::AdcsState;
