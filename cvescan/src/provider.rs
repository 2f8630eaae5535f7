use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::advisory::{
    AdvisorDetails, AdvisorResult, AdvisorSummary, Vulnerability, VulnerabilityReference,
};
use crate::client::{ComponentReportApi, ComponentVulnerability, CveManagerClient, DEFAULT_BASE_URL};
use crate::package::{Package, PackageCoordinate};

/// The number of coordinates sent to the CVE Manager service in one request.
pub const BULK_REQUEST_SIZE: usize = 128;

/// A provider of vulnerability advisories for a list of packages.
///
/// The returned mapping holds a one-element result list per matched package.
/// A package absent from the mapping had no records at the service, which is
/// also the only signal for "no known vulnerabilities".
#[async_trait]
pub trait AdviceProvider: std::fmt::Debug + Send + Sync {
    async fn retrieve_package_findings(
        &self,
        packages: &[Package],
    ) -> HashMap<Package, Vec<AdvisorResult>>;

    fn details(&self) -> &AdvisorDetails;
}

#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub server_url: Option<String>,
}

pub fn create_provider(
    name: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn AdviceProvider>> {
    match name {
        "cve-manager" => Ok(Arc::new(CveManagerProvider::new(
            config.server_url.clone(),
        ))),
        other => bail!("unknown advisor: {other} (valid: cve-manager)"),
    }
}

/// Advice provider backed by the CVE Manager bulk component-report endpoint.
pub struct CveManagerProvider {
    details: AdvisorDetails,
    server_url: String,
    // Built on first use and reused for the provider's lifetime.
    service: OnceLock<Arc<dyn ComponentReportApi>>,
}

impl std::fmt::Debug for CveManagerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CveManagerProvider")
            .field("details", &self.details)
            .field("server_url", &self.server_url)
            .finish_non_exhaustive()
    }
}

impl CveManagerProvider {
    pub fn new(server_url: Option<String>) -> Self {
        Self {
            details: AdvisorDetails::vulnerabilities("CveManager"),
            server_url: server_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            service: OnceLock::new(),
        }
    }

    /// Construct with a pre-built query service instead of the lazy HTTP
    /// client. Used by tests to substitute a stub.
    pub fn with_service(service: Arc<dyn ComponentReportApi>) -> Self {
        let provider = Self::new(None);
        let _ = provider.service.set(service);
        provider
    }

    fn service(&self) -> &Arc<dyn ComponentReportApi> {
        self.service
            .get_or_init(|| Arc::new(CveManagerClient::new(self.server_url.clone())))
    }

    /// Query all coordinates in consecutive batches of at most
    /// [`BULK_REQUEST_SIZE`], strictly in input order, one request at a time.
    ///
    /// The first failing batch aborts the run and discards every record
    /// accumulated so far: a partially populated index would under-report
    /// vulnerabilities for packages in unprocessed batches while looking like
    /// a complete scan.
    async fn query_all(
        &self,
        coordinates: &[PackageCoordinate],
    ) -> Result<Vec<ComponentVulnerability>> {
        let service = self.service();
        let mut records = Vec::new();
        for batch in coordinates.chunks(BULK_REQUEST_SIZE) {
            debug!(batch = batch.len(), "querying component report");
            records.extend(service.component_report(batch).await?);
        }
        Ok(records)
    }
}

#[async_trait]
impl AdviceProvider for CveManagerProvider {
    #[instrument(skip(self, packages), fields(packages = packages.len()))]
    async fn retrieve_package_findings(
        &self,
        packages: &[Package],
    ) -> HashMap<Package, Vec<AdvisorResult>> {
        if packages.is_empty() {
            return HashMap::new();
        }

        let start_time = Utc::now();
        let coordinates: Vec<PackageCoordinate> =
            packages.iter().map(Package::coordinate).collect();

        match self.query_all(&coordinates).await {
            Ok(records) => {
                let summary = AdvisorSummary {
                    start_time,
                    end_time: Utc::now(),
                };
                let index = index_by_coordinate(records);
                debug!(components = index.len(), "component report collected");
                assemble_results(packages, &index, summary)
            }
            Err(e) => {
                warn!(error = %e, "component report run failed");
                let summary = AdvisorSummary {
                    start_time,
                    end_time: Utc::now(),
                };
                failed_results(packages, summary, &e)
            }
        }
    }

    fn details(&self) -> &AdvisorDetails {
        &self.details
    }
}

/// Group raw records by their coordinate. Records for an already-seen
/// coordinate are appended, never merged or replaced, so duplicates from the
/// service survive verbatim.
fn index_by_coordinate(
    records: Vec<ComponentVulnerability>,
) -> HashMap<String, Vec<ComponentVulnerability>> {
    let mut index: HashMap<String, Vec<ComponentVulnerability>> = HashMap::new();
    for record in records {
        index.entry(record.purl.clone()).or_default().push(record);
    }
    index
}

/// Join the index back onto the input packages. Packages without an index
/// entry are omitted entirely; that omission is the clean-bill signal.
fn assemble_results(
    packages: &[Package],
    index: &HashMap<String, Vec<ComponentVulnerability>>,
    summary: AdvisorSummary,
) -> HashMap<Package, Vec<AdvisorResult>> {
    packages
        .iter()
        .filter_map(|package| {
            let records = index.get(package.coordinate().as_str())?;
            let result = AdvisorResult::Findings {
                summary,
                vulnerabilities: records.iter().map(normalize).collect(),
            };
            Some((package.clone(), vec![result]))
        })
        .collect()
}

/// Report the same failure for every input package. No partial data from
/// earlier successful batches is ever mixed in.
fn failed_results(
    packages: &[Package],
    summary: AdvisorSummary,
    error: &anyhow::Error,
) -> HashMap<Package, Vec<AdvisorResult>> {
    let message = format!("{error:#}");
    packages
        .iter()
        .map(|package| {
            let result = AdvisorResult::Failed {
                summary,
                message: message.clone(),
            };
            (package.clone(), vec![result])
        })
        .collect()
}

/// Convert one raw service record into a normalized vulnerability with a
/// single reference. CVSS3 data wins outright over CVSS2 when both are
/// present; the scoring system tag is taken from the vector itself.
fn normalize(record: &ComponentVulnerability) -> Vulnerability {
    let (scoring_system, severity) = match (&record.cvss3_vector, &record.cvss2_vector) {
        (Some(v3), _) if !v3.is_empty() => (
            Some(v3.split('/').next().unwrap_or(v3).to_string()),
            record.cvss3_score.map(|score| score.to_string()),
        ),
        (_, Some(v2)) if !v2.is_empty() => (
            Some("CVSS:2.0".to_string()),
            record.cvss2_score.map(|score| score.to_string()),
        ),
        _ => (None, None),
    };

    Vulnerability {
        id: record.cve_num.clone(),
        references: vec![VulnerabilityReference {
            url: record.cve_url.clone(),
            scoring_system,
            severity,
        }],
    }
}
