//! HTTP server for the permit API.
//!
//! Exposes the issuer side of the purchase-permit flow plus read-only
//! helpers. Deposit permits are never signed here: the owner signs those
//! with their own key through the CLI.

use crate::apis::{
	self,
	error::ApiError,
	permits::{PurchasePermitBody, VerifyBody},
};
use axum::{
	extract::State,
	http::{HeaderValue, Method},
	response::Json,
	routing::{get, post},
	Router,
};
use permit_config::ApiConfig;
use permit_core::PermitToolkit;
use permit_types::{Listing, PurchasePermitArtifact};
use permit_verifier::precheck::PrecheckReport;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
	pub toolkit: Arc<PermitToolkit>,
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, Box<dyn std::error::Error>> {
	if allowed_origins.is_empty() {
		return Ok(CorsLayer::permissive());
	}
	let origins = allowed_origins
		.iter()
		.map(|origin| origin.parse::<HeaderValue>())
		.collect::<Result<Vec<_>, _>>()?;
	Ok(CorsLayer::new()
		.allow_origin(origins)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers(Any))
}

pub fn router(
	api_config: &ApiConfig,
	toolkit: Arc<PermitToolkit>,
) -> Result<Router, Box<dyn std::error::Error>> {
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/permits/purchase", post(handle_purchase_permit))
				.route("/permits/verify", post(handle_verify))
				.route("/listings", get(handle_listings)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(&api_config.allowed_origins)?),
		)
		.with_state(AppState { toolkit });
	Ok(app)
}

pub async fn start_server(
	api_config: ApiConfig,
	toolkit: Arc<PermitToolkit>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, toolkit)?;

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Permit API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/permits/purchase.
async fn handle_purchase_permit(
	State(state): State<AppState>,
	Json(body): Json<PurchasePermitBody>,
) -> Result<Json<PurchasePermitArtifact>, ApiError> {
	match apis::permits::issue_purchase_permit(body, &state.toolkit).await {
		Ok(artifact) => Ok(Json(artifact)),
		Err(e) => {
			tracing::warn!("Purchase permit request failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/permits/verify. The report is advisory.
async fn handle_verify(
	State(state): State<AppState>,
	Json(body): Json<VerifyBody>,
) -> Result<Json<PrecheckReport>, ApiError> {
	Ok(Json(apis::permits::verify_artifact(body, &state.toolkit).await?))
}

/// Handles GET /api/listings.
async fn handle_listings(State(state): State<AppState>) -> Result<Json<Vec<Listing>>, ApiError> {
	match apis::permits::get_listings(&state.toolkit).await {
		Ok(listings) => Ok(Json(listings)),
		Err(e) => {
			tracing::warn!("Listing query failed: {}", e);
			Err(e)
		},
	}
}
