//! Check-mode view of a chain: what would run, without running it.

use serde::Serialize;

use crate::service::chain::ServiceChain;

/// One service as it would be executed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub position: usize,
    pub name: String,
    pub depends_on: Option<String>,
    pub endpoint: Option<String>,
    pub probe: &'static str,
    pub probe_target: Option<String>,
    pub max_attempts: u32,
    pub timeout_secs: Option<u64>,
    pub register: Vec<String>,
    pub start: Option<String>,
}

/// Describe every step of the chain in execution order.
pub fn plan(chain: &ServiceChain) -> Vec<PlanEntry> {
    chain
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let service = &entry.service;
            let target = service.probe.target();
            PlanEntry {
                position: index + 1,
                name: service.name.clone(),
                depends_on: service.depends_on.clone(),
                endpoint: service.endpoint.as_ref().map(|e| e.to_string()),
                probe: service.probe.kind(),
                probe_target: (!target.is_empty()).then_some(target),
                max_attempts: entry.retry.max_attempts,
                timeout_secs: entry.retry.timeout.map(|t| t.as_secs()),
                register: service
                    .registration_commands()
                    .into_iter()
                    .map(|(_, spec)| spec.to_string())
                    .collect(),
                start: service.start.as_ref().map(|s| s.to_string()),
            }
        })
        .collect()
}

/// Human-readable rendering, one block per service.
pub fn render_text(entries: &[PlanEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{}. {}", entry.position, entry.name));
        if let Some(dep) = &entry.depends_on {
            out.push_str(&format!(" (after {})", dep));
        }
        out.push('\n');

        match &entry.probe_target {
            Some(target) => out.push_str(&format!(
                "   wait:     {} {} (max {} attempts)\n",
                entry.probe, target, entry.max_attempts
            )),
            None => out.push_str("   wait:     none\n"),
        }
        for command in &entry.register {
            out.push_str(&format!("   register: {}\n", command));
        }
        if let Some(start) = &entry.start {
            out.push_str(&format!("   start:    {}\n", start));
        }
    }
    out
}
