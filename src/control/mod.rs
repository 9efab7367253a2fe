//! # Control Module
//!
//! Turns setpoint changes into testbed commands.
//!
//! This module handles:
//! - Sending validated commands over the attached transport
//! - Debouncing rapid setpoint changes
//! - Binding stepper and motor setpoints to debounced commands

pub mod debounce;
pub mod sender;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adcs::protocol::Axis;
use crate::store::observable::ListenerId;
use crate::store::state::AdcsState;
use debounce::Debouncer;
use sender::CommandSender;

struct Binding {
    axis: Axis,
    debouncer: Arc<Debouncer<f64>>,
    listener: ListenerId,
}

/// Live forwarding of stepper and motor setpoints to the testbed
///
/// Each axis gets its own debouncer, so changes on one axis never delay
/// another. Forwarding stops when the bindings are dropped.
pub struct SetpointBindings {
    stepper: Vec<Binding>,
    motor: Vec<Binding>,
}

impl std::fmt::Debug for SetpointBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetpointBindings")
            .field("stepper", &self.stepper.len())
            .field("motor", &self.motor.len())
            .finish()
    }
}

impl SetpointBindings {
    /// Subscribe to every stepper and motor setpoint in `state`
    ///
    /// Must be called inside a tokio runtime.
    pub fn bind(state: &AdcsState, sender: Arc<CommandSender>, debounce: Duration) -> Self {
        let stepper = Axis::ALL
            .iter()
            .map(|&axis| {
                let sender = sender.clone();
                let debouncer = Debouncer::spawn(debounce, move |amount: f64| {
                    let sender = sender.clone();
                    async move {
                        if let Err(e) = sender.stepper_move(axis, amount).await {
                            warn!("Stepper {} move to {} not sent: {}", axis, amount, e);
                        }
                    }
                });
                let listener = state.stepper_values.axis(axis).add_listener(&debouncer);
                Binding { axis, debouncer, listener }
            })
            .collect();

        let motor = Axis::ALL
            .iter()
            .map(|&axis| {
                let sender = sender.clone();
                let debouncer = Debouncer::spawn(debounce, move |percent: f64| {
                    let sender = sender.clone();
                    async move {
                        if let Err(e) = sender.motor_set_speed(axis, percent).await {
                            warn!("Motor {} speed {} not sent: {}", axis, percent, e);
                        }
                    }
                });
                let listener = state.motor_values.axis(axis).add_listener(&debouncer);
                Binding { axis, debouncer, listener }
            })
            .collect();

        info!("Setpoint forwarding bound ({} ms debounce)", debounce.as_millis());
        Self { stepper, motor }
    }

    /// Remove the registrations from `state` and stop forwarding
    pub fn unbind(self, state: &AdcsState) {
        for binding in &self.stepper {
            state.stepper_values.axis(binding.axis).remove_listener(binding.listener);
        }
        for binding in &self.motor {
            state.motor_values.axis(binding.axis).remove_listener(binding.listener);
        }
    }

    /// Quiet period applied before each command
    #[must_use]
    pub fn debounce(&self) -> Option<Duration> {
        self.stepper.first().map(|binding| binding.debouncer.delay())
    }
}
