//! Walks one compute-gateway firewall rule through create, read, update, and delete against
//! a VMware Cloud SDDC, waiting after every write until the policy API reflects it.
//!
//! ```sh
//! VMC_REFRESH_TOKEN=... cargo run --example firewall_rule_crud --features tracing -- \
//! 	--rule_name temp-rule --org_id <org> --sddc_id <sddc>
//! ```

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
use url::Url;
// self
use policy_broker::{
	auth::{CSP_AUTHORIZATION_URL, Credential, ReqwestTokenManager},
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper, TlsPolicy},
	policy::{
		PathTemplate, PolicyEndpoint, ReqwestPolicyClient, RuleAction, RuleId, RuleRef, RuleSpec,
		SddcLocator, discover_policy_endpoint,
	},
};

#[derive(Debug, Parser)]
#[command(name = "firewall_rule_crud")]
#[command(about = "Create, read, update, and delete a temporary NSX-T gateway firewall rule")]
struct Args {
	/// Identifier of the temporary rule.
	#[arg(long = "rule_name")]
	rule_name: String,
	/// Organization owning the SDDC.
	#[arg(long = "org_id")]
	org_id: String,
	/// SDDC hosting the NSX-T manager.
	#[arg(long = "sddc_id")]
	sddc_id: String,
	/// CSP API refresh token.
	#[arg(long = "refresh_token", env = "VMC_REFRESH_TOKEN", hide_env_values = true)]
	refresh_token: String,
	/// VMware Cloud control plane.
	#[arg(long = "vmc_url", default_value = SddcLocator::VMC_URL)]
	vmc_url: Url,
	/// CSP authorization endpoint.
	#[arg(long = "csp_url", default_value = CSP_AUTHORIZATION_URL)]
	csp_url: Url,
	/// Skip certificate and hostname verification (lab endpoints only).
	#[arg(long)]
	insecure: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let args = Args::parse();
	let tls = TlsPolicy::from_verify(!args.insecure);

	if !tls.verifies() {
		tracing::warn!("TLS verification is disabled; bearer tokens can be intercepted");
	}

	let credential =
		Credential::new(args.refresh_token, args.csp_url, args.org_id, args.sddc_id);
	let tokens = Arc::new(ReqwestTokenManager::new(credential, tls)?);
	let locator = SddcLocator::for_credential(args.vmc_url, tokens.credential());
	let policy_url = discover_policy_endpoint(
		&locator,
		tokens.clone(),
		Arc::new(ReqwestHttpClient::from_policy(tls, None)?),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.await?;

	tracing::info!(%policy_url, "discovered NSX policy endpoint");

	let endpoint = PolicyEndpoint::builder(policy_url)
		.path_template(PathTemplate::nsx_gateway_rules())
		.tls(tls)
		.request_timeout(std::time::Duration::from_secs(30))
		.build()?;
	let client = ReqwestPolicyClient::reqwest(endpoint, tokens)?
		.with_call_deadline(std::time::Duration::from_secs(60));
	let target = RuleRef::compute_gateway(RuleId::new(&args.rule_name)?);
	let rule = RuleSpec::builder()
		.action(RuleAction::Allow)
		.display_name("Temporary Rule")
		.scope("/infra/labels/cgw-all")
		.match_any()
		.build()?;

	client.put_rule(&target, &rule).await?;
	tracing::info!(%target, "rule created");

	let created = client.wait_for_rule(&target, |_| true).await?;

	tracing::info!(%target, ?created, "rule read back");

	let updated = RuleSpec { display_name: "Temporary Rule - Updated Name".into(), ..created };

	client.put_rule(&target, &updated).await?;

	let observed = client
		.wait_for_rule(&target, |spec| spec.display_name == updated.display_name)
		.await?;

	tracing::info!(%target, display_name = %observed.display_name, "rule updated");

	client.delete_rule(&target).await?;
	client.wait_for_absence(&target).await?;
	tracing::info!(%target, "rule deleted");

	Ok(())
}
