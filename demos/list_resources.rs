//! Reads a virtual machine and lists the storage accounts of a subscription using an access
//! token obtained through workload identity federation from the compute metadata server.
//!
//! Required environment: `AZURE_CLIENT_ID`, `AZURE_TENANT_ID`, `AZURE_SUBSCRIPTION_ID`,
//! `RESOURCE_GROUP`, `VM_NAME`. `AZURE_FEDERATION_AUDIENCE` defaults to
//! `api://AzureADTokenExchange`.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::WrapErr};
use serde_json::Value;
// self
use federated_credential::{
	adapter::ReqwestFederatedCredential,
	auth::TokenRequestOptions,
	config::AdapterConfig,
	credential::TokenCredential,
	ext::{BearerSigner, authorize},
	identity::MetadataIdentityFactory,
	reqwest::Client,
};

const MANAGEMENT: &str = "https://management.azure.com";
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
const DEFAULT_AUDIENCE: &str = "api://AzureADTokenExchange";

fn required(name: &str) -> Result<String> {
	env::var(name).wrap_err_with(|| format!("{name} must be set"))
}

async fn get_json(
	credential: &dyn TokenCredential,
	client: &Client,
	url: String,
) -> Result<Value> {
	let options = TokenRequestOptions::for_scope(MANAGEMENT_SCOPE);
	let request = authorize(credential, &options, &BearerSigner, client.get(url)).await?;
	let response = request.send().await?.error_for_status()?;

	Ok(serde_json::from_str(&response.text().await?)?)
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let subscription = required("AZURE_SUBSCRIPTION_ID")?;
	let resource_group = required("RESOURCE_GROUP")?;
	let vm_name = required("VM_NAME")?;
	let audience = env::var("AZURE_FEDERATION_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.into());
	let config =
		AdapterConfig::new(required("AZURE_CLIENT_ID")?, required("AZURE_TENANT_ID")?, audience);
	let credential: Arc<dyn TokenCredential> = Arc::new(ReqwestFederatedCredential::create(
		config,
		&MetadataIdentityFactory::from_env()?,
	)?);
	let client = Client::new();
	let vm = get_json(
		credential.as_ref(),
		&client,
		format!(
			"{MANAGEMENT}/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{vm_name}?api-version=2024-07-01"
		),
	)
	.await?;

	println!(
		"VM {} in {} ({})",
		vm["name"].as_str().unwrap_or(&vm_name),
		vm["location"].as_str().unwrap_or("unknown location"),
		vm["properties"]["hardwareProfile"]["vmSize"].as_str().unwrap_or("unknown size"),
	);

	let accounts = get_json(
		credential.as_ref(),
		&client,
		format!(
			"{MANAGEMENT}/subscriptions/{subscription}/providers/Microsoft.Storage/storageAccounts?api-version=2023-05-01"
		),
	)
	.await?;

	for account in accounts["value"].as_array().into_iter().flatten() {
		println!(
			"storage account {} ({})",
			account["name"].as_str().unwrap_or("<unnamed>"),
			account["location"].as_str().unwrap_or("unknown location"),
		);
	}

	Ok(())
}
