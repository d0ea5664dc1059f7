//! Integration tests for the generation pipeline using wiremock

mod common;

use std::time::{Duration, Instant};

use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::MockBackends;
use terragate::archive::MergeLimits;
use terragate::clients::ServiceClient;
use terragate::config::Endpoints;
use terragate::errors::{ArchiveError, ArchiveSide, PipelineError, Service, ServiceError};
use terragate::pipeline::{Pipeline, UploadRequest};

fn client(backends: &MockBackends, timeout: Duration) -> ServiceClient {
    ServiceClient::new(backends.endpoints(), timeout).unwrap()
}

fn pipeline(backends: &MockBackends) -> Pipeline {
    Pipeline::new(client(backends, Duration::from_secs(5)))
}

fn upload(archive: Vec<u8>) -> UploadRequest {
    UploadRequest {
        archive: Bytes::from(archive),
        filename: "repo.zip".to_string(),
        instruction: Some("deploy to aws".to_string()),
    }
}

/// Mount happy-path mocks for the two serial stages.
async fn mount_tail_stages(backends: &MockBackends, generated: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"provider": "aws"})))
        .mount(&backends.suggestion)
        .await;

    Mock::given(method("POST"))
        .and(path("/terraform"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(generated))
        .mount(&backends.terraform)
        .await;
}

#[tokio::test]
async fn pipeline_merges_generated_files_into_the_upload() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .and(body_json(json!({"instruction": "deploy to aws"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"language": "python"})))
        .expect(1)
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .and(header("Content-Type", "application/zip"))
        .and(header("X-Filename", "repo.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"framework": "flask"})))
        .expect(1)
        .mount(&backends.codebase)
        .await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .and(body_json(json!({
            "language_context": {"language": "python"},
            "codebase_context": {"framework": "flask"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"provider": "aws"})))
        .expect(1)
        .mount(&backends.suggestion)
        .await;

    let generated = common::build_zip(&[("main.tf", b"resource {}"), ("app.py", b"generated")]);
    Mock::given(method("POST"))
        .and(path("/terraform"))
        .and(body_json(json!({"suggestion": {"provider": "aws"}})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(generated))
        .expect(1)
        .mount(&backends.terraform)
        .await;

    let base = common::build_zip(&[("app.py", b"original"), ("README.md", b"docs")]);
    let merged = pipeline(&backends).execute(upload(base.clone())).await.unwrap();

    // The codebase-context service got the raw upload, byte for byte.
    let requests = backends.codebase.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, base);

    let entries = common::entry_map(&merged);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries["app.py"], b"generated");
    assert_eq!(entries["README.md"], b"docs");
    assert_eq!(entries["main.tf"], b"resource {}");
}

#[tokio::test]
async fn missing_instruction_sends_an_empty_body() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    mount_tail_stages(&backends, common::build_zip(&[("main.tf", b"x")])).await;

    let mut request = upload(common::build_zip(&[("app.py", b"y")]));
    request.instruction = None;

    pipeline(&backends).execute(request).await.unwrap();
}

#[tokio::test]
async fn context_extractions_run_concurrently() {
    let backends = MockBackends::start().await;

    let delayed = |body: serde_json::Value| {
        ResponseTemplate::new(200)
            .set_body_json(body)
            .set_delay(Duration::from_millis(500))
    };

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(delayed(json!({"language": "go"})))
        .expect(1)
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(delayed(json!({"framework": "none"})))
        .expect(1)
        .mount(&backends.codebase)
        .await;

    mount_tail_stages(&backends, common::build_zip(&[("main.tf", b"x")])).await;

    let started = Instant::now();
    pipeline(&backends)
        .execute(upload(common::build_zip(&[("go.mod", b"module x")])))
        .await
        .unwrap();

    // Sequential extraction would take at least a full second.
    assert!(
        started.elapsed() < Duration::from_millis(900),
        "context extractions did not overlap: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn suggestion_waits_for_the_slower_extraction() {
    // Whichever extraction finishes last, the suggestion stage must see both
    // contexts. Run one pass per ordering.
    for (language_delay, codebase_delay) in [(300u64, 0u64), (0, 300)] {
        let backends = MockBackends::start().await;

        Mock::given(method("POST"))
            .and(path("/language"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"language": "rust"}))
                    .set_delay(Duration::from_millis(language_delay)),
            )
            .mount(&backends.language)
            .await;

        Mock::given(method("POST"))
            .and(path("/codebase"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"framework": "axum"}))
                    .set_delay(Duration::from_millis(codebase_delay)),
            )
            .mount(&backends.codebase)
            .await;

        Mock::given(method("POST"))
            .and(path("/suggest"))
            .and(body_json(json!({
                "language_context": {"language": "rust"},
                "codebase_context": {"framework": "axum"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"provider": "aws"})))
            .expect(1)
            .mount(&backends.suggestion)
            .await;

        Mock::given(method("POST"))
            .and(path("/terraform"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(common::build_zip(&[("main.tf", b"x")])),
            )
            .mount(&backends.terraform)
            .await;

        pipeline(&backends)
            .execute(upload(common::build_zip(&[("app.py", b"y")])))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn failed_context_stage_stops_the_pipeline() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    // The serial stages must never be reached.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.suggestion)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.terraform)
        .await;

    let err = pipeline(&backends)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    match err {
        PipelineError::Stage(ServiceError::Status { service, status }) => {
            assert_eq!(service, Service::LanguageContext);
            assert_eq!(status, 500);
        }
        other => panic!("expected a status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn language_context_error_wins_when_both_extractions_fail() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backends.codebase)
        .await;

    let err = pipeline(&backends)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "language_context");
    assert_eq!(err.cause(), "status_code");
}

#[tokio::test]
async fn failed_suggestion_stage_never_calls_generation() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.language)
        .await;
    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&backends.suggestion)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.terraform)
        .await;

    let err = pipeline(&backends)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "deployment_suggestion");
    assert!(matches!(
        err,
        PipelineError::Stage(ServiceError::Status { status: 422, .. })
    ));
}

#[tokio::test]
async fn non_object_context_is_a_malformed_response() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("just a string")))
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    let err = pipeline(&backends)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "language_context");
    assert_eq!(err.cause(), "malformed_response");
}

#[tokio::test]
async fn slow_backend_is_a_timeout() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&backends.language)
        .await;

    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    let pipeline = Pipeline::new(client(&backends, Duration::from_millis(200)));
    let err = pipeline
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Stage(ServiceError::Timeout {
            service: Service::LanguageContext,
            ..
        })
    ));
    assert_eq!(err.cause(), "timeout");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let base = common::unreachable_url();
    let endpoints = Endpoints {
        language_context: base.join("language").unwrap(),
        codebase_context: base.join("codebase").unwrap(),
        deployment_suggestion: base.join("suggest").unwrap(),
        terraform_generation: base.join("terraform").unwrap(),
    };

    let clients = ServiceClient::new(endpoints, Duration::from_secs(2)).unwrap();
    let err = Pipeline::new(clients)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "language_context");
    assert_eq!(err.cause(), "transport");
}

#[tokio::test]
async fn invalid_generated_archive_fails_the_merge_stage() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.language)
        .await;
    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;
    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.suggestion)
        .await;

    Mock::given(method("POST"))
        .and(path("/terraform"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not a zip"))
        .mount(&backends.terraform)
        .await;

    let err = pipeline(&backends)
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "merge");
    assert!(matches!(
        err,
        PipelineError::Merge(ArchiveError::Malformed {
            which: ArchiveSide::Overlay,
            ..
        })
    ));
}

#[tokio::test]
async fn merge_limits_bound_the_pipeline_output() {
    let backends = MockBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/language"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.language)
        .await;
    Mock::given(method("POST"))
        .and(path("/codebase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backends.codebase)
        .await;

    mount_tail_stages(
        &backends,
        common::build_zip(&[("huge.tf", &[0u8; 4096][..])]),
    )
    .await;

    let limits = MergeLimits {
        max_total_bytes: 512,
        ..MergeLimits::default()
    };
    let pipeline = Pipeline::with_limits(client(&backends, Duration::from_secs(5)), limits);

    let err = pipeline
        .execute(upload(common::build_zip(&[("app.py", b"x")])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "merge");
    assert_eq!(err.cause(), "limit_exceeded");
}
