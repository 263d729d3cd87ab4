//! Non-fatal diagnostics.
//!
//! Resolution and assembly report recoverable conditions to an injected
//! [`DiagnosticSink`] instead of failing. The default sink forwards them to
//! `tracing`; [`RecordingSink`] keeps them for inspection.

use parking_lot::Mutex;
use std::fmt;
use tracing::warn;

/// A recoverable condition observed while assembling a stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A socket-binding value was not injected because the property was
    /// already set.
    OverrideRefused {
        protocol: String,
        property: String,
        attempted: String,
        existing: String,
    },
    /// A multicast address/port pair was skipped because the binding has no
    /// multicast configured.
    MulticastUnavailable {
        protocol: String,
        address_property: String,
        port_property: String,
        binding: String,
    },
    /// A live module rejected a field it does not have.
    UnsupportedField {
        protocol: String,
        field: String,
        value: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OverrideRefused {
                protocol,
                property,
                attempted,
                existing,
            } => write!(
                f,
                "cannot override {protocol}.{property} with {attempted:?}, keeping {existing:?}"
            ),
            Diagnostic::MulticastUnavailable {
                protocol,
                address_property,
                port_property,
                binding,
            } => write!(
                f,
                "cannot set {protocol}.{address_property} and {protocol}.{port_property}: \
                 socket binding {binding} has no multicast socket"
            ),
            Diagnostic::UnsupportedField {
                protocol,
                field,
                value,
            } => write!(f, "{protocol} has no field {field}, ignoring value {value:?}"),
        }
    }
}

/// Receives non-fatal diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::OverrideRefused {
                protocol, property, ..
            } => warn!(%protocol, %property, "{}", diagnostic),
            Diagnostic::MulticastUnavailable {
                protocol, binding, ..
            } => warn!(%protocol, %binding, "{}", diagnostic),
            Diagnostic::UnsupportedField {
                protocol, field, ..
            } => warn!(%protocol, %field, "{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics reported so far, oldest first.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of refused overrides for one protocol property.
    pub fn override_count(&self, protocol: &str, property: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|d| {
                matches!(d, Diagnostic::OverrideRefused { protocol: p, property: k, .. }
                    if p == protocol && k == property)
            })
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.records.lock().push(diagnostic);
    }
}
