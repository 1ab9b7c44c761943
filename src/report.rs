//! Text and JSON rendering of manager snapshots

use anyhow::Result;
use hwmgr_core::{HardwareComponent, HardwareEvent, MonitorId, SystemHealth};
use serde::Serialize;
use std::fmt::Write;

/// Bytes per unit constants
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn capacity(bytes: u64) -> String {
    if bytes == 0 {
        "-".to_string()
    } else {
        format!("{:.1} GB", bytes as f64 / BYTES_PER_GB)
    }
}

/// One row per component
pub fn component_table(components: &[HardwareComponent]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<10} {:<32} {:<16} {:<10} {:<10} {:>10}",
        "ID", "KIND", "NAME", "DRIVER", "STATE", "STATUS", "CAPACITY"
    );
    for c in components {
        let driver = if c.driver.name.is_empty() { "-" } else { c.driver.name.as_str() };
        let _ = writeln!(
            out,
            "{:>4}  {:<10} {:<32} {:<16} {:<10} {:<10} {:>10}",
            c.id,
            c.kind.as_str(),
            truncate(c.name(), 32),
            truncate(driver, 16),
            c.driver.state.as_str(),
            c.status.status.as_str(),
            capacity(c.identity.capacity)
        );
    }
    let _ = write!(out, "{} component(s)", components.len());
    out
}

/// One line per monitor callback
pub fn sample_line(monitor: MonitorId, c: &HardwareComponent) -> String {
    let mut line = format!(
        "[monitor {}] #{} {} '{}': {}",
        monitor,
        c.id,
        c.kind,
        truncate(c.name(), 32),
        c.status.status
    );
    if c.status.temperature != 0.0 {
        let _ = write!(line, " temp={:.1}C", c.status.temperature);
    }
    if c.status.utilization != 0.0 {
        let _ = write!(line, " util={:.1}%", c.status.utilization);
    }
    if c.status.power_usage != 0.0 {
        let _ = write!(line, " power={:.1}W", c.status.power_usage);
    }
    if c.status.error_count > 0 {
        let _ = write!(line, " errors={} ({})", c.status.error_count, c.status.last_error_message);
    }
    line
}

/// Gauge summary followed by the most recent events
pub fn health_report(health: &SystemHealth, events: &[HardwareEvent]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Health:        {}/100", health.health);
    let _ = writeln!(out, "Total errors:  {}", health.total_errors);
    let _ = writeln!(out, "Drivers:       {} loaded", health.driver_count);
    let _ = write!(
        out,
        "Events:        {} logged, {} dropped",
        health.events_logged, health.events_dropped
    );
    if !events.is_empty() {
        let _ = write!(out, "\n\nRecent events:");
        for event in events {
            let _ = write!(
                out,
                "\n  {} [{:<8}] #{:<4} {}: {}",
                event.timestamp.format("%H:%M:%S"),
                event.severity.to_string(),
                event.component_id,
                event.event_type,
                event.message
            );
        }
    }
    out
}
