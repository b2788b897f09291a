//! Device port selection.
//!
//! Thin passthrough to the backend's port enumeration. Nothing is cached:
//! every call re-queries. A failed query is logged and yields no ports, so
//! the user can still type a port or keep auto-select.

use crate::dispatcher::Backend;
use crate::logging;
use crate::session::config::Configuration;

pub const AUTO_SELECT_LABEL: &str = "Auto-select";

/// One selectable port. The auto-select option has an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOption {
    pub value: String,
    pub label: String,
}

impl PortOption {
    pub fn auto() -> Self {
        Self {
            value: String::new(),
            label: AUTO_SELECT_LABEL.to_string(),
        }
    }

    pub fn is_auto(&self) -> bool {
        self.value.is_empty()
    }
}

pub fn fetch_ports<B: Backend + ?Sized>(backend: &B) -> Vec<String> {
    match backend.list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            logging::warn(&format!("port enumeration failed: {e:#}"));
            Vec::new()
        }
    }
}

/// Auto-select first, then each distinct non-empty port in backend order.
pub fn port_options(ports: &[String]) -> Vec<PortOption> {
    let mut options = vec![PortOption::auto()];
    for port in ports {
        let port = port.trim();
        if port.is_empty() || options.iter().any(|o| o.value == port) {
            continue;
        }
        options.push(PortOption {
            value: port.to_string(),
            label: port.to_string(),
        });
    }
    options
}

/// The port to suggest when the backend sees exactly one device and the
/// configuration does not already name one.
pub fn preferred_port<'a>(ports: &'a [String], config: &Configuration) -> Option<&'a str> {
    match ports {
        [only] if config.port.is_empty() && !only.trim().is_empty() => Some(only.trim()),
        _ => None,
    }
}
