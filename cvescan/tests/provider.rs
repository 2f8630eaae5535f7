use cvescan::advisory::AdvisorResult;
use cvescan::package::Package;
use cvescan::provider::{AdviceProvider, CveManagerProvider};

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn make_packages(count: usize) -> Vec<Package> {
    (0..count)
        .map(|i| format!("pkg:npm/pkg-{i}@1.0.0").parse().unwrap())
        .collect()
}

fn provider_for(server: &MockServer) -> CveManagerProvider {
    CveManagerProvider::new(Some(server.uri()))
}

#[tokio::test]
async fn end_to_end_findings_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "purl": "pkg:npm/pkg-0@1.0.0",
                "cveNum": "CVE-2021-1234",
                "cveUrl": "https://example.com/CVE-2021-1234",
                "cvss3Vector": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:N/A:N",
                "cvss3Score": 7.5
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let packages = make_packages(2);
    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&packages).await;

    assert_eq!(results.len(), 1);
    let AdvisorResult::Findings {
        vulnerabilities, ..
    } = &results[&packages[0]][0]
    else {
        panic!("expected findings");
    };
    assert_eq!(vulnerabilities[0].id, "CVE-2021-1234");
    assert_eq!(
        vulnerabilities[0].references[0].scoring_system,
        Some("CVSS:3.1".to_string())
    );
}

#[tokio::test]
async fn large_input_is_split_into_bounded_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let packages = make_packages(130);
    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&packages).await;
    assert!(results.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(first["components"].as_array().unwrap().len(), 128);
    assert_eq!(second["components"].as_array().unwrap().len(), 2);
    assert_eq!(first["components"][0], "pkg:npm/pkg-0@1.0.0");
    assert_eq!(second["components"][1], "pkg:npm/pkg-129@1.0.0");
}

#[tokio::test]
async fn server_error_fails_every_package() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let packages = make_packages(3);
    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&packages).await;

    assert_eq!(results.len(), 3);
    for package in &packages {
        let AdvisorResult::Failed { message, .. } = &results[package][0] else {
            panic!("expected failure for {package}");
        };
        assert!(message.contains("500"), "unexpected message: {message}");
    }
}

#[tokio::test]
async fn malformed_response_body_fails_every_package() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let packages = make_packages(2);
    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&packages).await;

    assert_eq!(results.len(), 2);
    for package in &packages {
        assert!(matches!(
            &results[package][0],
            AdvisorResult::Failed { .. }
        ));
    }
}

#[tokio::test]
async fn later_batch_failure_discards_earlier_batch_data() {
    let server = MockServer::start().await;

    // The second batch holds pkg-128 and pkg-129; fail it specifically.
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .and(body_string_contains("pkg:npm/pkg-129@1.0.0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "purl": "pkg:npm/pkg-0@1.0.0",
                "cveNum": "CVE-BATCH-1",
                "cveUrl": "https://example.com/CVE-BATCH-1"
            }]
        })))
        .mount(&server)
        .await;

    let packages = make_packages(130);
    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&packages).await;

    assert_eq!(results.len(), 130);
    for package in &packages {
        assert!(
            matches!(&results[package][0], AdvisorResult::Failed { .. }),
            "no batch-1 data may survive for {package}"
        );
    }
}

#[tokio::test]
async fn empty_package_list_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/componentReport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let results = provider.retrieve_package_findings(&[]).await;
    assert!(results.is_empty());
}
