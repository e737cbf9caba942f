// std
use std::{fs, path::PathBuf};
// crates.io
use httpmock::prelude::*;
// self
use federated_credential::{
	_preludet::*,
	auth::{Audience, TokenRequestOptions},
	config::ExpiryMode,
	identity::{
		FileIdentitySource, IdentityError, IdentitySourceFactory, MetadataIdentityFactory,
	},
};

const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

fn audience() -> Audience {
	Audience::new(TEST_AUDIENCE).expect("Test audience should be valid.")
}

fn temp_token_path(name: &str) -> PathBuf {
	std::env::temp_dir().join(format!("federated-credential-{}-{name}.jwt", std::process::id()))
}

fn metadata_factory(server: &MockServer) -> MetadataIdentityFactory {
	MetadataIdentityFactory::with_base_url(
		test_reqwest_http_client().0,
		Url::parse(&server.base_url()).expect("Mock metadata URL should parse."),
	)
}

#[test]
fn file_source_refuses_to_bind_without_a_file() {
	let source = FileIdentitySource::new(temp_token_path("missing"));
	let err = match source.bind(&audience()) {
		Ok(_) => panic!("Missing token files must fail to bind."),
		Err(e) => e,
	};

	assert!(matches!(err, IdentityError::Unavailable { transient: false, .. }));
}

#[tokio::test]
async fn file_source_rereads_rotated_tokens() {
	let path = temp_token_path("rotated");

	fs::write(&path, "first-token\n").expect("Token file should be writable.");

	let source =
		FileIdentitySource::new(&path).bind(&audience()).expect("Existing file should bind.");
	let first = source.identity_token().await.expect("First read should succeed.");

	fs::write(&path, "  second-token  ").expect("Token file should be writable.");

	let second = source.identity_token().await.expect("Second read should succeed.");

	fs::write(&path, "\n").expect("Token file should be writable.");

	let empty = source.identity_token().await.expect_err("Blank files must be rejected.");

	fs::remove_file(&path).expect("Token file should be removable.");

	let gone = source.identity_token().await.expect_err("Deleted files must be reported.");

	assert_eq!(first.token.expose(), "first-token");
	assert_eq!(second.token.expose(), "second-token");
	assert!(matches!(empty, IdentityError::EmptyToken));
	assert!(matches!(gone, IdentityError::Io { .. }));
	assert!(!gone.is_transient());
}

#[tokio::test]
async fn metadata_source_requests_audience_bound_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(IDENTITY_PATH)
				.query_param("audience", TEST_AUDIENCE)
				.query_param("format", "full")
				.header("metadata-flavor", "Google");
			then.status(200).body("metadata-jwt\n");
		})
		.await;
	let source =
		metadata_factory(&server).bind(&audience()).expect("Metadata source should bind.");
	let token = source.identity_token().await.expect("Metadata fetch should succeed.");

	assert_eq!(token.token.expose(), "metadata-jwt");

	mock.assert_async().await;
}

#[tokio::test]
async fn metadata_source_reports_status_failures() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY_PATH);
			then.status(503).body("warming up");
		})
		.await;
	let source =
		metadata_factory(&server).bind(&audience()).expect("Metadata source should bind.");
	let err = source.identity_token().await.expect_err("503 responses must surface.");

	match &err {
		IdentityError::Status { status, body } => {
			assert_eq!(*status, 503);
			assert_eq!(body, "warming up");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(err.is_transient());

	mock.assert_async().await;
}

#[tokio::test]
async fn metadata_identity_flows_into_the_exchange() {
	let server = MockServer::start_async().await;
	let identity = server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY_PATH).query_param("audience", TEST_AUDIENCE);
			then.status(200).body("metadata-jwt");
		})
		.await;
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path(test_token_path());
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"federated\",\"expires_in\":3600}");
		})
		.await;
	let credential = build_reqwest_test_credential(
		&server.base_url(),
		ExpiryMode::Relative,
		&metadata_factory(&server),
	);
	let options = TokenRequestOptions::for_scope("https://management.azure.com/.default");
	let token = credential.get_token(&options).await.expect("Federated exchange should succeed.");

	assert_eq!(token.token.expose(), "federated");

	identity.assert_async().await;
	exchange.assert_async().await;
}
