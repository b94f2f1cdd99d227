#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use policy_broker::{
	_preludet::*,
	auth::ReqwestTokenManager,
	http::ReqwestTransportErrorMapper,
	policy::{
		PathTemplate, PolicyEndpoint, ReqwestPolicyClient, RuleAction, RuleRef, RuleSpec,
		SddcLocator, discover_policy_endpoint,
	},
};

const RULE_PATH: &str = "/policy/cgw/default/temp-rule";
const BEARER: &str = "Bearer access-1";

async fn mock_token_endpoint(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/authorize");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-1\",\"expires_in\":1800}");
		})
		.await
}

fn setup(server: &MockServer) -> (Arc<ReqwestTokenManager>, ReqwestPolicyClient) {
	let tokens = build_reqwest_test_tokens(&server.url("/authorize"));
	let client = build_reqwest_test_client(&server.url("/policy"), Arc::clone(&tokens));

	(tokens, client)
}

fn reference() -> RuleRef {
	RuleRef::parse("cgw", "default", "temp-rule").expect("Rule reference fixture should parse.")
}

fn temporary_rule(display_name: &str) -> RuleSpec {
	RuleSpec::builder()
		.action(RuleAction::Allow)
		.display_name(display_name)
		.scope("/infra/labels/cgw-all")
		.match_any()
		.build()
		.expect("Rule fixture should build.")
}

fn rule_json(display_name: &str) -> serde_json::Value {
	json!({
		"action": "ALLOW",
		"display_name": display_name,
		"scope": ["/infra/labels/cgw-all"],
		"services": ["ANY"],
		"source_groups": ["ANY"],
		"destination_groups": ["ANY"],
	})
}

#[tokio::test]
async fn put_then_get_round_trips_the_rule() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server).await;
	let (_, client) = setup(&server);
	let put_mock = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path(RULE_PATH)
				.header("authorization", BEARER)
				.header("content-type", "application/json")
				.json_body(rule_json("Temporary Rule"));
			then.status(200);
		})
		.await;
	let get_mock = server
		.mock_async(|when, then| {
			let mut body = rule_json("Temporary Rule");

			body["id"] = json!("temp-rule");
			body["_revision"] = json!(0);

			when.method(GET).path(RULE_PATH).header("authorization", BEARER);
			then.status(200).header("content-type", "application/json").json_body(body);
		})
		.await;
	let spec = temporary_rule("Temporary Rule");

	client.put_rule(&reference(), &spec).await.expect("Put should succeed.");

	let observed = client.get_rule(&reference()).await.expect("Get should succeed.");

	assert_eq!(observed, spec);

	put_mock.assert_async().await;
	get_mock.assert_async().await;
	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_rule_is_not_found_on_get_but_deletes_cleanly() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let (_, client) = setup(&server);
	let get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(RULE_PATH);
			then.status(404).body("{\"error_message\":\"not found\"}");
		})
		.await;
	let delete_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path(RULE_PATH).header("authorization", BEARER);
			then.status(404);
		})
		.await;
	let err = client.get_rule(&reference()).await.expect_err("Missing rule must fail.");

	assert!(matches!(&err, ClientError::NotFound { path } if path == RULE_PATH));
	assert!(!err.is_retryable());

	client.delete_rule(&reference()).await.expect("Deleting a missing rule should succeed.");
	client.delete_rule(&reference()).await.expect("Repeated delete should succeed.");

	get_mock.assert_calls_async(1).await;
	delete_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn persistent_unauthorized_retries_once() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server).await;
	let (_, client) = setup(&server);
	let get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(RULE_PATH);
			then.status(401);
		})
		.await;
	let err = client.get_rule(&reference()).await.expect_err("Rejected token must fail.");

	assert!(matches!(err, ClientError::Unauthorized { status: 401 }));

	get_mock.assert_calls_async(2).await;
	token_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn forbidden_then_success_renews_the_token() {
	let server = MockServer::start_async().await;
	let stale_token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/authorize");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"stale\",\"expires_in\":1800}");
		})
		.await;
	let (tokens, client) = setup(&server);

	tokens.ensure_valid_token().await.expect("Seeding exchange should succeed.");
	stale_token_mock.delete_async().await;

	let token_mock = mock_token_endpoint(&server).await;
	let rejected_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path(RULE_PATH).header("authorization", "Bearer stale");
			then.status(403);
		})
		.await;
	let accepted_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path(RULE_PATH).header("authorization", BEARER);
			then.status(200);
		})
		.await;

	client.delete_rule(&reference()).await.expect("Delete should succeed after renewal.");

	rejected_mock.assert_calls_async(1).await;
	accepted_mock.assert_calls_async(1).await;
	token_mock.assert_calls_async(1).await;

	assert_eq!(
		tokens.cached_token().map(|token| token.value.expose().to_owned()),
		Some("access-1".to_owned())
	);
}

#[tokio::test]
async fn error_statuses_are_classified() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let (_, client) = setup(&server);
	let _put_mock = server
		.mock_async(|when, then| {
			when.method(PATCH).path(RULE_PATH);
			then.status(400).body("{\"error_message\":\"invalid scope\"}");
		})
		.await;
	let _get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(RULE_PATH);
			then.status(503).header("retry-after", "30").body("maintenance");
		})
		.await;
	let err = client
		.put_rule(&reference(), &temporary_rule("Temporary Rule"))
		.await
		.expect_err("Bad request must fail.");

	match &err {
		ClientError::RejectedRequest { status, body } => {
			assert_eq!(*status, 400);
			assert!(body.contains("invalid scope"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(!err.is_retryable());

	let err = client.get_rule(&reference()).await.expect_err("Unavailable service must fail.");

	match &err {
		ClientError::ServerError { status, body, retry_after } => {
			assert_eq!(*status, 503);
			assert_eq!(body, "maintenance");
			assert_eq!(*retry_after, Some(Duration::seconds(30)));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_rule_body_is_reported() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let (_, client) = setup(&server);
	let _get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(RULE_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "action": "PAUSE", "display_name": "x" }));
		})
		.await;
	let err = client.get_rule(&reference()).await.expect_err("Unknown action must fail.");

	match err {
		ClientError::MalformedResponse { source } =>
			assert_eq!(source.path().to_string(), "action"),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn token_failure_skips_the_resource_call() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/authorize");
			then.status(401).body("{\"message\":\"revoked\"}");
		})
		.await;
	let (_, client) = setup(&server);
	let get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(RULE_PATH);
			then.status(200);
		})
		.await;
	let err = client.get_rule(&reference()).await.expect_err("Token failure must propagate.");

	assert!(matches!(err, ClientError::Auth(AuthError::RejectedCredential { status: 401, .. })));

	get_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn nsx_template_targets_gateway_policy_rules() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let tokens = build_reqwest_test_tokens(&server.url("/authorize"));
	let endpoint = PolicyEndpoint::builder(
		Url::parse(&server.url("/sks-nsxt-manager")).expect("Base URL should parse."),
	)
	.path_template(PathTemplate::nsx_gateway_rules())
	.verify_tls(false)
	.request_timeout(std::time::Duration::from_secs(5))
	.build()
	.expect("Endpoint should build.");
	let client = ReqwestPolicyClient::reqwest(endpoint, tokens).expect("Client should build.");
	let put_mock = server
		.mock_async(|when, then| {
			when.method(PATCH).path(
				"/sks-nsxt-manager/policy/api/v1/infra/domains/cgw/gateway-policies/default/rules/temp-rule",
			);
			then.status(200);
		})
		.await;

	client
		.put_rule(&reference(), &temporary_rule("Temporary Rule - Updated Name"))
		.await
		.expect("Put should succeed.");

	put_mock.assert_async().await;
}

#[tokio::test]
async fn discovery_reads_the_public_nsx_url() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let tokens = build_reqwest_test_tokens(&server.url("/authorize"));
	let sddc_path = format!("/vmc/api/orgs/{TEST_ORG_ID}/sddcs/{TEST_SDDC_ID}");
	let sddc_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(sddc_path.as_str()).header("authorization", BEARER);
			then.status(200).header("content-type", "application/json").json_body(json!({
				"id": TEST_SDDC_ID,
				"resource_config": {
					"nsx_api_public_endpoint_url": "https://nsx.example.com/vmc/reverse-proxy/api/orgs/o/sddcs/s/sks-nsxt-manager",
					"nsx_mgr_url": "https://nsx.example.com",
				},
			}));
		})
		.await;
	let locator = SddcLocator::for_credential(
		Url::parse(&server.base_url()).expect("VMC URL should parse."),
		tokens.credential(),
	);
	let url = discover_policy_endpoint(
		&locator,
		tokens,
		Arc::new(test_reqwest_http_client()),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.await
	.expect("Discovery should succeed.");

	assert_eq!(url.host_str(), Some("nsx.example.com"));
	assert!(url.path().ends_with("/sks-nsxt-manager"));

	sddc_mock.assert_async().await;
}

#[tokio::test]
async fn discovery_without_nsx_url_is_malformed() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token_endpoint(&server).await;
	let tokens = build_reqwest_test_tokens(&server.url("/authorize"));
	let sddc_path = format!("/vmc/api/orgs/{TEST_ORG_ID}/sddcs/{TEST_SDDC_ID}");
	let _sddc_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(sddc_path.as_str());
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "resource_config": {} }));
		})
		.await;
	let locator = SddcLocator::for_credential(
		Url::parse(&server.base_url()).expect("VMC URL should parse."),
		tokens.credential(),
	);
	let err = discover_policy_endpoint(
		&locator,
		tokens,
		Arc::new(test_reqwest_http_client()),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.await
	.expect_err("Missing NSX URL must fail.");

	assert!(matches!(err, ClientError::MalformedResponse { .. }));
	assert!(!err.is_retryable());
}
