//! Integration tests for the ARM client using wiremock
//!
//! These tests drive the client against mocked Resource Manager endpoints:
//! authentication headers, paging, error decoding and long-running
//! operation polling.

use azurerm_provider::azure::{ArmClient, ArmError, AzureCredentials, CloudEnvironment};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{bearer_token, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
const SERVER_ID: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.AnalysisServices/servers/srv";

fn client(server: &MockServer) -> ArmClient {
    ArmClient::new(
        AzureCredentials::static_token("test-token"),
        CloudEnvironment::public().with_resource_manager(&server.uri()),
        SUBSCRIPTION,
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(10))
}

mod requests {
    use super::*;

    /// GET sends the bearer token, a request ID and the api-version
    #[tokio::test]
    async fn test_get_sends_auth_and_api_version() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .and(query_param("api-version", "2017-08-01"))
            .and(bearer_token("test-token"))
            .and(header_exists("x-ms-client-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "srv" })))
            .expect(1)
            .mount(&server)
            .await;

        let body: Value = client(&server).get(SERVER_ID, "2017-08-01").await.unwrap();
        assert_eq!(body["name"], "srv");
    }

    /// Error envelopes decode into code and message
    #[tokio::test]
    async fn test_error_envelope_is_decoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ResourceNotFound", "message": "The Resource was not found." }
            })))
            .mount(&server)
            .await;

        let err = client(&server).get::<Value>(SERVER_ID, "2017-08-01").await.unwrap_err();
        assert!(err.was_not_found());
        match err {
            ArmError::Api { code, message, .. } => {
                assert_eq!(code, "ResourceNotFound");
                assert_eq!(message, "The Resource was not found.");
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    /// A rejected token is refreshed once and the request retried
    #[tokio::test]
    async fn test_unauthorized_refreshes_token() {
        let server = MockServer::start().await;
        let environment = CloudEnvironment::public()
            .with_resource_manager(&server.uri())
            .with_active_directory(&server.uri());

        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "stale", "expires_in": 3600 })))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "fresh", "expires_in": 3600 })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .and(bearer_token("stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "ExpiredAuthenticationToken", "message": "The access token expiry has passed." }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .and(bearer_token("fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "srv" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ArmClient::new(
            AzureCredentials::client_secret(&environment, "tenant", "client", "secret"),
            environment.clone(),
            SUBSCRIPTION,
        )
        .unwrap();

        let body: Value = client.get(SERVER_ID, "2017-08-01").await.unwrap();
        assert_eq!(body["name"], "srv");
    }

    /// A static token is not retried when rejected
    #[tokio::test]
    async fn test_unauthorized_static_token_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "InvalidAuthenticationToken", "message": "The access token is invalid." }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).get::<Value>(SERVER_ID, "2017-08-01").await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    }

    /// Listing follows nextLink until it is absent
    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        let collection = format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Advisor/recommendations");

        Mock::given(method("GET"))
            .and(path(collection.as_str()))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [{ "name": "c" }] })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(collection.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "name": "a" }, { "name": "b" }],
                "nextLink": format!("{}{}?api-version=2023-01-01&page=2", server.uri(), collection)
            })))
            .mount(&server)
            .await;

        let items: Vec<Value> = client(&server).list(&collection, "2023-01-01", &[]).await.unwrap();
        let names: Vec<&str> = items.iter().filter_map(|i| i["name"].as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}

mod long_running_operations {
    use super::*;

    /// PUT polls the Azure-AsyncOperation URL until it succeeds
    #[tokio::test]
    async fn test_put_waits_for_async_operation() {
        let server = MockServer::start().await;
        let operation = format!("{}/operations/op1", server.uri());

        Mock::given(method("PUT"))
            .and(path(SERVER_ID))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", operation.as_str())
                    .set_body_json(json!({ "properties": { "provisioningState": "Provisioning" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
            .mount(&server)
            .await;

        client(&server)
            .put(SERVER_ID, "2017-08-01", &json!({ "location": "westeurope" }))
            .await
            .unwrap();
    }

    /// A failed operation surfaces its error message
    #[tokio::test]
    async fn test_failed_operation_is_an_error() {
        let server = MockServer::start().await;
        let operation = format!("{}/operations/op2", server.uri());

        Mock::given(method("PUT"))
            .and(path(SERVER_ID))
            .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "error": { "code": "QuotaExceeded", "message": "Not enough capacity in region" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .put(SERVER_ID, "2017-08-01", &json!({}))
            .await
            .unwrap_err();
        match err {
            ArmError::OperationFailed { message, .. } => assert_eq!(message, "Not enough capacity in region"),
            other => panic!("expected a failed operation, got {other:?}"),
        }
    }

    /// DELETE accepted with a Location header polls until the location stops answering 202
    #[tokio::test]
    async fn test_delete_polls_location() {
        let server = MockServer::start().await;
        let location = format!("{}/operationResults/del1", server.uri());

        Mock::given(method("DELETE"))
            .and(path(SERVER_ID))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationResults/del1"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationResults/del1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete(SERVER_ID, "2017-08-01").await.unwrap();
    }

    /// Without headers, PUT polls the resource until provisioningState is terminal
    #[tokio::test]
    async fn test_put_polls_provisioning_state() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVER_ID))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "properties": { "provisioningState": "Updating" } })),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(SERVER_ID))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "properties": { "provisioningState": "Succeeded" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server).put(SERVER_ID, "2017-08-01", &json!({})).await.unwrap();
    }
}
