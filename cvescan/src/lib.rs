pub mod advisory;
pub mod client;
pub mod output;
pub mod package;
pub mod provider;

pub use advisory::{AdvisorDetails, AdvisorResult, AdvisorSummary, Vulnerability};
pub use client::{ComponentReportApi, CveManagerClient, DEFAULT_BASE_URL};
pub use package::{Package, PackageCoordinate};
pub use provider::{AdviceProvider, BULK_REQUEST_SIZE, CveManagerProvider, ProviderConfig, create_provider};
