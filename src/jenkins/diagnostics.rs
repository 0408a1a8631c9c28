use std::sync::Mutex;

use tracing::warn;

use crate::jenkins::variant::SlotKind;

/// Non-fatal findings made while decoding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnrecognizedClass {
        slot: SlotKind,
        class: String,
        plugin: Option<String>,
    },
}

/// Receiver for decode diagnostics. Implementations must tolerate concurrent calls.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::UnrecognizedClass {
                slot,
                class,
                plugin,
            } => warn!(%slot, %class, ?plugin, "unrecognised {slot} class {class}"),
        }
    }
}

/// Keeps every diagnostic in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.push(diagnostic.clone());
    }
}
