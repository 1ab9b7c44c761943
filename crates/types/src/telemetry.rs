//! Telemetry samples handed from a detection source to the status sampler

use serde::{Deserialize, Serialize};

/// One telemetry sample for a single component
///
/// Every field is optional: a source fills in what the device exposes and the
/// sampler only evaluates thresholds for the values it actually received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Degrees Celsius
    pub temperature: Option<f32>,
    /// Percent, 0-100
    pub utilization: Option<f32>,
    /// Watts
    pub power_usage: Option<f32>,
    /// Free bytes (storage)
    pub free_bytes: Option<u64>,
    /// Link state (network)
    pub link_up: Option<bool>,
    /// Remaining charge in percent (battery)
    pub charge_percent: Option<f32>,
    /// Device-reported fault; forces an error status
    pub fault: Option<String>,
}

impl Reading {
    pub fn temperature(celsius: f32) -> Self {
        Self {
            temperature: Some(celsius),
            ..Self::default()
        }
    }

    pub fn with_utilization(mut self, percent: f32) -> Self {
        self.utilization = Some(percent);
        self
    }

    pub fn with_power(mut self, watts: f32) -> Self {
        self.power_usage = Some(watts);
        self
    }

    pub fn with_free_bytes(mut self, bytes: u64) -> Self {
        self.free_bytes = Some(bytes);
        self
    }

    pub fn with_link(mut self, up: bool) -> Self {
        self.link_up = Some(up);
        self
    }

    pub fn with_charge(mut self, percent: f32) -> Self {
        self.charge_percent = Some(percent);
        self
    }

    pub fn with_fault(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }
}
