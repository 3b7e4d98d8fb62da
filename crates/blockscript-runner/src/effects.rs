//! Side effects of the headless host.

use std::collections::BTreeMap;

use blockscript_runtime::{ExecutionContext, RuntimeValue, SideEffects};
use tracing::info;

/// Logs each request instead of performing it. Kinds listed in `denied` fail.
#[derive(Debug, Default)]
pub struct LoggingEffects {
    denied: Vec<String>,
}

impl LoggingEffects {
    /// `denied` is a comma separated list of kinds to reject.
    pub fn new(denied: &str) -> Self {
        Self {
            denied: denied
                .split(',')
                .map(str::trim)
                .filter(|kind| !kind.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl SideEffects for LoggingEffects {
    fn perform(
        &mut self,
        kind: &str,
        parameters: &BTreeMap<String, RuntimeValue>,
        context: &ExecutionContext,
    ) -> Result<(), String> {
        if self.denied.iter().any(|denied| denied == kind) {
            return Err(format!("{kind} is disabled on this host"));
        }
        let rendered = parameters
            .iter()
            .map(|(name, value)| format!("{name}={}", value.as_text()))
            .collect::<Vec<_>>()
            .join(", ");
        info!("{} requested {}({})", context.actor(), kind, rendered);
        Ok(())
    }
}
