use std::sync::Arc;

use httpmock::Method::PATCH;
use httpmock::prelude::*;
use riverbill_charging::models::{CustomerChange, ViewInvoiceResponse};
use riverbill_charging::{
    ChargingModule, ChargingModuleClient, ChargingModuleInfo, Response, StaticToken,
};
use riverbill_shared::ChargingModuleConfig;
use serde_json::json;
use uuid::Uuid;

fn client(server: &MockServer, token: &str) -> ChargingModuleClient {
    let config = ChargingModuleConfig {
        base_url: server.base_url(),
        token: token.to_string(),
        timeout_secs: 5,
    };
    ChargingModuleClient::new(&config, Arc::new(StaticToken::new(token))).unwrap()
}

#[tokio::test]
async fn create_bill_run_posts_region_and_ruleset() {
    let server = MockServer::start_async().await;
    let bill_run_id = Uuid::new_v4();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3/wrls/bill-runs")
            .header("authorization", "Bearer cm-token")
            .json_body(json!({ "region": "A", "ruleset": "sroc" }));
        then.status(201)
            .header("x-cma-git-commit", "273604040a47e0977b0579a0fef0f09726d95e39")
            .header("x-cma-docker-tag", "ghcr.io/defra/sroc-charging-module-api:v0.19.0")
            .json_body(json!({ "billRun": { "id": bill_run_id, "billRunNumber": 10004 } }));
    });

    let result = client(&server, "cm-token").create_bill_run("A").await;

    mock.assert();
    assert!(result.succeeded);
    match result.response {
        Response::Http {
            status_code,
            body,
            info,
        } => {
            assert_eq!(status_code, 201);
            assert_eq!(body["billRun"]["billRunNumber"], 10004);
            assert_eq!(
                info,
                ChargingModuleInfo {
                    git_commit: Some("273604040a47e0977b0579a0fef0f09726d95e39".to_string()),
                    docker_tag: Some("ghcr.io/defra/sroc-charging-module-api:v0.19.0".to_string()),
                }
            );
        }
        Response::Error(message) => panic!("unexpected error {message}"),
    }
}

#[tokio::test]
async fn approve_and_send_use_patch() {
    let server = MockServer::start_async().await;
    let bill_run_id = Uuid::new_v4();

    let approve = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("/v3/wrls/bill-runs/{bill_run_id}/approve"));
        then.status(204);
    });
    let send = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("/v3/wrls/bill-runs/{bill_run_id}/send"));
        then.status(204);
    });

    let client = client(&server, "cm-token");
    assert!(client.approve_bill_run(bill_run_id).await.succeeded);
    assert!(client.send_bill_run(bill_run_id).await.succeeded);

    approve.assert();
    send.assert();
}

#[tokio::test]
async fn failed_request_keeps_status_and_body() {
    let server = MockServer::start_async().await;
    let bill_run_id = Uuid::new_v4();

    server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("/v3/wrls/bill-runs/{bill_run_id}/approve"));
        then.status(409).json_body(json!({
            "statusCode": 409,
            "error": "Conflict",
            "message": "Bill run cannot be approved because its status is pending."
        }));
    });

    let result = client(&server, "cm-token").approve_bill_run(bill_run_id).await;

    assert!(!result.succeeded);
    assert_eq!(result.status_code(), Some(409));
    assert!(result.body_text().contains("status is pending"));
}

#[tokio::test]
async fn reissue_and_view_bill_paths() {
    let server = MockServer::start_async().await;
    let bill_run_id = Uuid::new_v4();
    let invoice_id = Uuid::new_v4();
    let reissued_id = Uuid::new_v4();

    let rebill = server.mock(|when, then| {
        when.method(PATCH).path(format!(
            "/v3/wrls/bill-runs/{bill_run_id}/invoices/{invoice_id}/rebill"
        ));
        then.status(201).json_body(json!({
            "invoices": [
                { "id": Uuid::new_v4(), "rebilledType": "C" },
                { "id": reissued_id, "rebilledType": "R" }
            ]
        }));
    });
    let view = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v3/wrls/bill-runs/{bill_run_id}/invoices/{reissued_id}"));
        then.status(200).json_body(json!({
            "invoice": {
                "id": reissued_id,
                "creditLineValue": 0,
                "debitLineValue": 2500,
                "rebilledType": "R",
                "licences": []
            }
        }));
    });

    let client = client(&server, "cm-token");
    assert!(client.reissue_bill(bill_run_id, invoice_id).await.succeeded);

    let invoice: ViewInvoiceResponse = client
        .view_bill(bill_run_id, reissued_id)
        .await
        .parse("view bill")
        .unwrap();

    rebill.assert();
    view.assert();
    assert_eq!(invoice.invoice.debit_line_value, 2500);
}

#[tokio::test]
async fn customer_change_and_files() {
    let server = MockServer::start_async().await;

    let change_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3/wrls/customer-changes")
            .json_body_partial(r#"{ "customerReference": "A12345678A", "postcode": "BS1 5AH" }"#);
        then.status(201);
    });
    let files_mock = server.mock(|when, then| {
        when.method(GET).path("/v3/wrls/customer-files/30");
        then.status(200).json_body(json!([]));
    });

    let change = CustomerChange {
        region: "A".to_string(),
        customer_reference: "A12345678A".to_string(),
        customer_name: "Mr J Smith".to_string(),
        address_line1: "1 River Lane".to_string(),
        address_line2: None,
        address_line3: None,
        address_line4: None,
        address_line5: None,
        address_line6: None,
        postcode: "BS1 5AH".to_string(),
    };

    let client = client(&server, "cm-token");
    assert!(client.create_customer_change(&change).await.succeeded);
    assert!(client.view_customer_files(30).await.succeeded);

    change_mock.assert();
    files_mock.assert();
}

#[tokio::test]
async fn health_and_missing_token() {
    let server = MockServer::start_async().await;
    let health = server.mock(|when, then| {
        when.method(GET).path("/status");
        then.status(200).json_body(json!({ "status": "alive" }));
    });

    assert!(client(&server, "cm-token").view_health().await.succeeded);
    health.assert();

    let result = client(&server, "").view_health().await;
    assert!(!result.succeeded);
    assert!(matches!(result.response, Response::Error(_)));
    health.assert_hits(1);
}

#[tokio::test]
async fn unreachable_service_is_an_error_envelope() {
    let config = ChargingModuleConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        token: "cm-token".to_string(),
        timeout_secs: 2,
    };
    let client = ChargingModuleClient::new(&config, Arc::new(StaticToken::new("cm-token"))).unwrap();

    let result = client.view_bill_run(Uuid::new_v4()).await;

    assert!(!result.succeeded);
    assert_eq!(result.status_code(), None);
}
