mod common;

use std::sync::{Arc, Mutex};

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use support_bundle_core::contract::{MockOptionsProvider, MockTransport, RequestBody};
use support_bundle_core::create::{create_bundle, BundleId};
use support_bundle_core::error::BundleError;
use support_bundle_core::options::DefaultOptions;

fn source() -> MockTransport {
    let mut transport = MockTransport::new();
    transport
        .expect_base_url()
        .return_const("http://source/artifactory/".to_string());
    transport
}

#[tokio::test]
async fn returns_the_id_verbatim() {
    let mut transport = source();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Ok(common::ok_json(r#"{"id": "  bundle-20240517 "}"#)));

    let id = create_bundle(&transport, "foo", &common::clock(), &DefaultOptions)
        .await
        .expect("creation should succeed");
    assert_eq!(id, BundleId::new("  bundle-20240517 "));
}

#[tokio::test]
async fn posts_case_number_and_timestamp_as_json() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();

    let mut transport = source();
    transport
        .expect_send()
        .withf(|req| {
            req.method == Method::POST
                && req.path == "api/system/support/bundle"
                && req.content_type == Some("application/json")
        })
        .times(1)
        .returning(move |req| {
            if let RequestBody::Bytes(bytes) = req.body {
                *sink.lock().unwrap() = serde_json::from_slice(&bytes).ok();
            }
            Ok(common::ok_json(r#"{"id": "1"}"#))
        });

    create_bundle(&transport, "12345", &common::clock(), &DefaultOptions)
        .await
        .unwrap();

    let body = captured.lock().unwrap().clone().expect("json body sent");
    assert_eq!(body["name"], "JFrog Support Case number 12345");
    assert_eq!(body["description"], "Generated on 2024-05-17 08:30:00 UTC");
    assert_eq!(body["parameters"], json!({}));
}

#[tokio::test]
async fn forwards_provider_parameters() {
    let mut options = MockOptionsProvider::new();
    options.expect_parameters().times(1).returning(|| {
        let mut params = serde_json::Map::new();
        params.insert("thread_dump".into(), json!({"count": 1}));
        params
    });

    let mut transport = source();
    transport
        .expect_send()
        .withf(|req| match &req.body {
            RequestBody::Bytes(bytes) => {
                let body: Value = serde_json::from_slice(bytes).unwrap();
                body["parameters"]["thread_dump"]["count"] == 1
            }
            _ => false,
        })
        .times(1)
        .returning(|_| Ok(common::ok_json(r#"{"id": "p"}"#)));

    let id = create_bundle(&transport, "c", &common::clock(), &options)
        .await
        .unwrap();
    assert_eq!(id.as_str(), "p");
}

#[tokio::test]
async fn non_ok_status_fails_without_retry() {
    for code in [
        StatusCode::CREATED,
        StatusCode::BAD_REQUEST,
        StatusCode::UNAUTHORIZED,
        StatusCode::INTERNAL_SERVER_ERROR,
    ] {
        let mut transport = source();
        transport
            .expect_send()
            .times(1)
            .returning(move |_| Ok(common::status(code)));

        let err = create_bundle(&transport, "foo", &common::clock(), &DefaultOptions)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BundleError::UnexpectedStatus { status } if status == code),
            "unexpected error for {code}: {err:?}"
        );
    }
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    for body in ["not json", "[1, 2]", r#"{"name": "x"}"#, r#"{"id": 7}"#] {
        let mut transport = source();
        let owned = body.to_string();
        transport
            .expect_send()
            .times(1)
            .returning(move |_| Ok(common::ok_json(&owned)));

        let err = create_bundle(&transport, "foo", &common::clock(), &DefaultOptions)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BundleError::MalformedResponse(_)),
            "body {body:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn transport_errors_propagate() {
    let mut transport = source();
    transport.expect_send().times(1).returning(|_| {
        Err(support_bundle_core::error::TransportError::Request {
            url: "http://source/artifactory/api/system/support/bundle".into(),
            message: "connection refused".into(),
        })
    });

    let err = create_bundle(&transport, "foo", &common::clock(), &DefaultOptions)
        .await
        .unwrap_err();
    assert!(matches!(err, BundleError::Transport(_)));
    assert!(err.to_string().contains("connection refused"));
}
