use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::package::PackageCoordinate;

pub const DEFAULT_BASE_URL: &str = "https://sbom.test.osinfra.cn";

/// One raw vulnerability record as returned by the CVE Manager service.
/// Kept verbatim; normalization happens later in the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVulnerability {
    pub purl: String,
    pub cve_num: String,
    pub cve_url: String,
    #[serde(default)]
    pub cvss2_vector: Option<String>,
    #[serde(default)]
    pub cvss2_score: Option<f64>,
    #[serde(default)]
    pub cvss3_vector: Option<String>,
    #[serde(default)]
    pub cvss3_score: Option<f64>,
}

#[derive(Serialize)]
struct ComponentReportRequest<'a> {
    components: &'a [PackageCoordinate],
}

#[derive(Deserialize)]
struct ComponentReport {
    #[serde(default)]
    data: Vec<ComponentVulnerability>,
}

/// Query capability for one batch of coordinates. The provider depends on
/// this seam so tests can substitute a stub service for the live client.
#[async_trait]
pub trait ComponentReportApi: Send + Sync {
    async fn component_report(
        &self,
        coordinates: &[PackageCoordinate],
    ) -> Result<Vec<ComponentVulnerability>>;
}

#[derive(Clone)]
pub struct CveManagerClient {
    client: reqwest::Client,
    base_url: String,
}

impl CveManagerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("cvescan")
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    fn report_url(&self) -> String {
        format!("{}/componentReport", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ComponentReportApi for CveManagerClient {
    #[instrument(skip(self, coordinates), fields(batch = coordinates.len()))]
    async fn component_report(
        &self,
        coordinates: &[PackageCoordinate],
    ) -> Result<Vec<ComponentVulnerability>> {
        let url = self.report_url();
        let body = ComponentReportRequest {
            components: coordinates,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} returned HTTP {status}");
        }

        let report: ComponentReport = response
            .json()
            .await
            .with_context(|| format!("failed to parse component report from {url}"))?;

        Ok(report.data)
    }
}
