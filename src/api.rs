//! REST API for the packing service.
//!
//! Provides HTTP endpoints that turn a list of ordered items into shipment
//! packages. Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::cart::{Cart, CartError};
use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{Item, ItemId, ItemSpec, Package};
use crate::optimizer::{BalanceReport, PackMan, PackingResult};
use crate::subset::SubsetStrategy;
use crate::types::{Grams, Money, Priced, Weighted};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
    catalog: Arc<Vec<ItemSpec>>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>packman API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// `items` is the cart content in order of admission.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "name": "Item 1", "price": 10.0, "weight": 200 },
            { "name": "Item 2", "price": 100.0, "weight": 20 }
        ]
    })
)]
pub struct PackRequest {
    pub items: Vec<ItemSpec>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    cart: Cart,
}

impl ValidatedPackRequest {
    fn item_count(&self) -> usize {
        self.cart.len()
    }
}

impl PackRequest {
    /// Admits every item through a fresh cart. The first failure aborts.
    fn into_validated(self, config: &OptimizerConfig) -> Result<ValidatedPackRequest, CartError> {
        let mut cart = Cart::new(config.packing_config().limits);
        for spec in self.items {
            cart.add(spec)?;
        }
        Ok(ValidatedPackRequest { cart })
    }
}

/// Response structure with all packages.
///
/// # Fields
/// * `packages` - Packages in final order
/// * `totals` - Sums over all packages
/// * `estimated_count` - Package count implied by the cart totals
/// * `extra_packages` - Packages opened beyond the estimate
/// * `balance` - Outcome of the weight balancing pass
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub packages: Vec<PackedPackage>,
    pub totals: PackTotals,
    pub estimated_count: usize,
    pub extra_packages: usize,
    pub balance: BalanceReport,
}

#[derive(Serialize, ToSchema)]
pub struct PackTotals {
    pub packages: usize,
    pub weight: Grams,
    pub price: Money,
    pub shipping_cost: Money,
}

/// Single package with its items and shipping figures.
#[derive(Serialize, ToSchema)]
pub struct PackedPackage {
    /// Package number (1-based)
    pub id: usize,
    pub items: Vec<PackedItem>,
    pub weight: Grams,
    pub price: Money,
    pub shipping_cost: Money,
    pub cost_per_gram: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PackedItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
    pub weight: Grams,
}

impl From<&Item> for PackedItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id(),
            name: item.name().to_string(),
            price: item.price(),
            weight: item.weight(),
        }
    }
}

impl PackedPackage {
    fn from_package(id: usize, package: &Package) -> Self {
        Self {
            id,
            items: package.items().iter().map(PackedItem::from).collect(),
            weight: package.weight(),
            price: package.price(),
            shipping_cost: package.shipping_cost(),
            cost_per_gram: package.cost_per_gram(),
        }
    }
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: &PackingResult) -> Self {
        Self {
            packages: result
                .packages
                .iter()
                .enumerate()
                .map(|(i, package)| PackedPackage::from_package(i + 1, package))
                .collect(),
            totals: PackTotals {
                packages: result.package_count(),
                weight: result.total_weight(),
                price: result.total_price(),
                shipping_cost: result.total_shipping_cost(),
            },
            estimated_count: result.estimated_count,
            extra_packages: result.extra_packages,
            balance: result.balance.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn cart_error(err: CartError) -> Response {
    let error = match err {
        CartError::ItemRejected { .. } => "Item rejected",
        CartError::Invalid(_) => "Invalid input data",
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, err.to_string())
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    config: &OptimizerConfig,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated(config).map_err(|err| {
        warn!("⚠️ Pack request refused: {}", err);
        cart_error(err)
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_catalog),
    components(
        schemas(
            PackRequest,
            PackResponse,
            PackTotals,
            PackedPackage,
            PackedItem,
            ErrorResponse,
            ItemSpec,
            ItemId,
            BalanceReport,
            SubsetStrategy
        )
    ),
    tags((name = "packing", description = "Endpoints for shipment packaging"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/catalog", get(handle_catalog))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
    catalog: Vec<ItemSpec>,
) -> std::io::Result<()> {
    let state = ApiState {
        optimizer_config,
        catalog: Arc::new(catalog),
    };
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let display_host = config.display_host().to_string();
    info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /pack, POST /pack_stream, GET /catalog");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Admits the items through a cart and returns the balanced packages.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Successfully packed items", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or item above the package caps",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, &state.optimizer_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!("📥 New pack request: {} items", request.item_count());
    let result =
        PackMan::from_cart(&request.cart, state.optimizer_config.packing_config()).get_packages();
    info!(
        "📦 Result: {} packages (estimated {}), shipping {:.2}",
        result.package_count(),
        result.estimated_count,
        result.total_shipping_cost()
    );
    if !result.balance.exact {
        info!(
            "💡 Balancing used an approximate subset search for {} pairs",
            result.balance.heuristic_pairs
        );
    }

    let response = PackResponse::from_packing_result(&result);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams allocation events in real-time as Server-Sent Events.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams allocation events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or item above the package caps",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, &state.optimizer_config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let packing_config = state.optimizer_config.packing_config();

    tokio::task::spawn_blocking(move || {
        let cart = request.cart;
        PackMan::from_cart(&cart, packing_config).get_packages_with_progress(|evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // Receiver gone: remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /catalog endpoint.
#[utoipa::path(
    get,
    path = "/catalog",
    responses(
        (status = 200, description = "Items available for ordering", body = [ItemSpec])
    ),
    tag = "packing"
)]
async fn handle_catalog(State(state): State<ApiState>) -> Json<Vec<ItemSpec>> {
    Json(state.catalog.as_ref().clone())
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::PackingConfig;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/pack", "/pack_stream", "/catalog"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["PackRequest", "PackResponse", "ErrorResponse", "ItemSpec"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn pack_request_parses_items() {
        let json = r#"{
            "items": [
                {"name": "Item 1", "price": 10.0, "weight": 200},
                {"name": "Item 1", "price": 10.0, "weight": 200}
            ]
        }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        let validated = request
            .into_validated(&OptimizerConfig::default())
            .expect("Should validate successfully");
        assert_eq!(validated.item_count(), 2);
        let ids: Vec<_> = validated.cart.items().iter().map(|i| i.id()).collect();
        assert_ne!(ids[0], ids[1], "duplicate names must get distinct identities");
    }

    #[test]
    fn pack_request_rejects_negative_weight() {
        let json = r#"{"items": [{"name": "Odd", "price": 1.0, "weight": -5}]}"#;
        assert!(serde_json::from_str::<PackRequest>(json).is_err());
    }

    #[test]
    fn pack_request_rejects_item_above_caps() {
        let request = PackRequest {
            items: vec![
                ItemSpec::new("Fine", 10.0, 100),
                ItemSpec::new("Anvil", 10.0, 5001),
            ],
        };
        let err = request
            .into_validated(&OptimizerConfig::default())
            .expect_err("Anvil must be rejected");
        assert!(matches!(err, CartError::ItemRejected { ref name, .. } if name == "Anvil"));

        let response = cart_error(err);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn response_reports_packages_in_order() {
        let mut cart = Cart::default();
        for (name, price, weight) in [("X", 50.0, 1000), ("Y", 50.0, 1000), ("Z", 100.0, 3000)] {
            cart.add(ItemSpec::new(name, price, weight)).unwrap();
        }
        let result = PackMan::from_cart(&cart, PackingConfig::default()).get_packages();
        let response = PackResponse::from_packing_result(&result);

        assert_eq!(response.packages.len(), 1);
        assert_eq!(response.packages[0].id, 1);
        assert_eq!(response.packages[0].weight, 5000);
        assert_eq!(response.packages[0].shipping_cost, 20.0);
        assert_eq!(response.totals.weight, 5000);
        assert_eq!(response.estimated_count, 1);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["packages"][0]["items"][0]["name"], "Z");
        assert_eq!(value["balance"]["exact"], true);
    }
}
