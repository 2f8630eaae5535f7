use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single reference attached to a normalized vulnerability.
///
/// At most one scoring system is populated per reference; which one is
/// decided by the normalization precedence in the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityReference {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub references: Vec<VulnerabilityReference>,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for reference in &self.references {
            if let (Some(system), Some(severity)) =
                (&reference.scoring_system, &reference.severity)
            {
                write!(f, " ({system}: {severity})")?;
            }
            write!(f, "\n    {}", reference.url)?;
        }
        Ok(())
    }
}

/// Wall-clock window of one pipeline invocation, shared by every package
/// queried in that invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdvisorSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Per-package outcome of an advisory run. One invocation produces either
/// findings for every matched package or a failure marker for every input
/// package, never a mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvisorResult {
    Findings {
        summary: AdvisorSummary,
        vulnerabilities: Vec<Vulnerability>,
    },
    Failed {
        summary: AdvisorSummary,
        message: String,
    },
}

impl AdvisorResult {
    pub fn summary(&self) -> &AdvisorSummary {
        match self {
            AdvisorResult::Findings { summary, .. } => summary,
            AdvisorResult::Failed { summary, .. } => summary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorCapability {
    Vulnerabilities,
}

/// Static identity and capability metadata for an advice provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorDetails {
    pub provider: String,
    pub capabilities: Vec<AdvisorCapability>,
}

impl AdvisorDetails {
    pub fn vulnerabilities(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            capabilities: vec![AdvisorCapability::Vulnerabilities],
        }
    }
}
