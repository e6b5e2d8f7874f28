//! CLI subcommands.
//!
//! Artifacts travel as JSON: signing commands print them (or write them to
//! `--out`), submitting and verifying commands read them from `--artifact`
//! or from stdin.

use alloy::primitives::{Address, U256};
use chrono::DateTime;
use clap::{Subcommand, ValueEnum};
use permit_core::{DepositPermitRequest, PermitToolkit, PurchasePermitRequest};
use permit_types::utils::u256_serde::parse_u256;
use permit_types::{format_token_amount, DepositPermitArtifact, PurchasePermitArtifact};
use permit_verifier::precheck::{precheck_deposit, precheck_purchase};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Sign an ERC-2612 permit depositing VALUE into the bank
	SignDeposit {
		/// Amount in the token's smallest unit
		#[arg(long, value_parser = parse_u256)]
		value: U256,
		/// Unix seconds; defaults to now plus the configured validity
		#[arg(long, value_parser = parse_u256)]
		deadline: Option<U256>,
		/// Write the artifact here instead of stdout
		#[arg(long)]
		out: Option<PathBuf>,
	},
	/// Sign a purchase permit for BUYER and TOKEN_ID (whitelisted issuers only)
	SignBuy {
		#[arg(long)]
		buyer: Address,
		#[arg(long, value_parser = parse_u256)]
		token_id: U256,
		#[arg(long, value_parser = parse_u256)]
		deadline: Option<U256>,
		#[arg(long)]
		out: Option<PathBuf>,
	},
	/// Submit a deposit permit; the configured account sends the transaction
	SubmitDeposit {
		/// Artifact file; stdin when absent
		#[arg(long)]
		artifact: Option<PathBuf>,
	},
	/// Submit a purchase permit; the configured account must be the buyer
	SubmitBuy {
		#[arg(long)]
		artifact: Option<PathBuf>,
	},
	/// Pre-check an artifact against current chain state
	Verify {
		#[arg(long, value_enum)]
		kind: PermitKind,
		#[arg(long)]
		artifact: Option<PathBuf>,
	},
	/// Show all market listings
	Listings,
	/// Run the HTTP API from the [api] section
	Serve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PermitKind {
	Deposit,
	Purchase,
}

async fn read_input(path: Option<&Path>) -> Result<String, std::io::Error> {
	match path {
		Some(path) => tokio::fs::read_to_string(path).await,
		None => {
			let mut input = String::new();
			tokio::io::stdin().read_to_string(&mut input).await?;
			Ok(input)
		},
	}
}

async fn write_output(path: Option<&Path>, json: String) -> Result<(), std::io::Error> {
	match path {
		Some(path) => {
			tokio::fs::write(path, format!("{}\n", json)).await?;
			tracing::info!(path = %path.display(), "Wrote permit artifact");
			Ok(())
		},
		None => {
			println!("{}", json);
			Ok(())
		},
	}
}

fn describe_deadline(deadline: U256) -> String {
	u64::try_from(deadline)
		.ok()
		.and_then(|secs| i64::try_from(secs).ok())
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
		.map(|at| at.to_rfc3339())
		.unwrap_or_else(|| deadline.to_string())
}

/// Runs every subcommand except `serve`.
pub async fn run(command: Command, toolkit: &PermitToolkit) -> Result<(), Box<dyn Error>> {
	match command {
		Command::SignDeposit {
			value,
			deadline,
			out,
		} => {
			let artifact = toolkit
				.issuer
				.issue_deposit_permit(DepositPermitRequest {
					value: Some(value),
					deadline,
				})
				.await?;
			tracing::info!(
				expires = %describe_deadline(artifact.deadline),
				amount = %format_token_amount(&artifact.value.to_string(), 18),
				"Deposit permit ready"
			);
			write_output(out.as_deref(), artifact.to_json_pretty()?).await?;
		},
		Command::SignBuy {
			buyer,
			token_id,
			deadline,
			out,
		} => {
			let artifact = toolkit
				.issuer
				.issue_purchase_permit(PurchasePermitRequest {
					buyer: Some(buyer),
					token_id: Some(token_id),
					deadline,
				})
				.await?;
			tracing::info!(expires = %describe_deadline(artifact.deadline), "Purchase permit ready");
			write_output(out.as_deref(), artifact.to_json_pretty()?).await?;
		},
		Command::SubmitDeposit { artifact } => {
			let artifact = DepositPermitArtifact::from_json(&read_input(artifact.as_deref()).await?)?;
			let handle = toolkit
				.submitter
				.submit_deposit(toolkit.signer_address, &artifact)
				.await?;
			let balance = toolkit.verifier.deposited(artifact.owner).await?;
			println!("{}", serde_json::json!({ "txHash": handle, "deposited": balance.to_string() }));
		},
		Command::SubmitBuy { artifact } => {
			let artifact = PurchasePermitArtifact::from_json(&read_input(artifact.as_deref()).await?)?;
			let handle = toolkit
				.submitter
				.submit_purchase(toolkit.signer_address, &artifact)
				.await?;
			println!("{}", serde_json::json!({ "txHash": handle }));
		},
		Command::Verify { kind, artifact } => {
			let input = read_input(artifact.as_deref()).await?;
			let verifier = toolkit.verifier.as_ref();
			let report = match kind {
				PermitKind::Deposit => {
					let artifact = DepositPermitArtifact::from_json(&input)?;
					precheck_deposit(verifier, &toolkit.contracts, &artifact).await?
				},
				PermitKind::Purchase => {
					let artifact = PurchasePermitArtifact::from_json(&input)?;
					precheck_purchase(verifier, &toolkit.contracts, &artifact).await?
				},
			};
			if !report.is_clean() {
				tracing::warn!(findings = report.findings.len(), "Permit is likely to be rejected");
			}
			println!("{}", serde_json::to_string_pretty(&report)?);
		},
		Command::Listings => {
			let listings = toolkit.verifier.listings().await?;
			println!("{}", serde_json::to_string_pretty(&listings)?);
		},
		Command::Serve => {
			return Err("serve is handled by the service entry point".into());
		},
	}
	Ok(())
}
