// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Pluggable diagnostic sink. Engines never hard-code eprintln!/println! for
// the conditions the spec calls "diagnostic, no mutation" (unknown-pointer,
// double-free); they emit through this seam instead, so the core can run
// silent when embedded.

use std::sync::Arc;

/// Receives diagnostic messages emitted by an engine.
///
/// Implementors must be safe to share across the threads that may call into
/// an engine concurrently.
pub trait Diagnostics: Send + Sync {
    /// Handle one diagnostic message.
    fn emit(&self, message: &str);
}

/// Writes every diagnostic to stderr. The default sink for `Factory`-built engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn emit(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Discards every diagnostic. Useful in tests and for embedding the core silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn emit(&self, _message: &str) {}
}

/// Default sink used when an engine is constructed without an explicit one.
pub fn default_sink() -> Arc<dyn Diagnostics> {
    Arc::new(StderrDiagnostics)
}
