use std::collections::HashMap;

use serde::Serialize;

use crate::advisory::AdvisorResult;
use crate::package::Package;

#[derive(Serialize)]
pub struct PackageReport {
    pub package: Package,
    pub results: Vec<AdvisorResult>,
}

/// Flatten the result mapping into report entries, in input-package order.
/// Packages the service returned nothing for are omitted, mirroring the
/// mapping itself.
pub fn report_entries(
    packages: &[Package],
    mut results: HashMap<Package, Vec<AdvisorResult>>,
) -> Vec<PackageReport> {
    packages
        .iter()
        .filter_map(|package| {
            let results = results.remove(package)?;
            Some(PackageReport {
                package: package.clone(),
                results,
            })
        })
        .collect()
}

pub trait OutputFormatter {
    fn write_results(
        &self,
        entries: &[PackageReport],
        writer: &mut dyn std::io::Write,
    ) -> std::io::Result<()>;
}

pub struct TextOutput;

impl OutputFormatter for TextOutput {
    fn write_results(
        &self,
        entries: &[PackageReport],
        writer: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        for entry in entries {
            writeln!(writer, "{}", entry.package)?;
            for result in &entry.results {
                match result {
                    AdvisorResult::Findings {
                        vulnerabilities, ..
                    } => {
                        if vulnerabilities.is_empty() {
                            writeln!(writer, "  vulnerabilities: none")?;
                        }
                        for vulnerability in vulnerabilities {
                            writeln!(writer, "  {vulnerability}")?;
                        }
                    }
                    AdvisorResult::Failed { summary, message } => {
                        writeln!(
                            writer,
                            "  failed: {message} ({} .. {})",
                            summary.start_time, summary.end_time
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn write_results(
        &self,
        entries: &[PackageReport],
        writer: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, entries)?;
        writeln!(writer)?;
        Ok(())
    }
}

pub fn formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput)
    } else {
        Box::new(TextOutput)
    }
}
