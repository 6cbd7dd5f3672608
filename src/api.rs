//! REST API for the carton suggestion service.
//!
//! Provides HTTP endpoints for the surrounding business-document layer.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::assignment::{AssignmentItem, AssignmentView, PlacedUnit};
use crate::config::{ApiConfig, EngineSettings};
use crate::controller::{
    self, PackingError, PackingPlan, UnpackedItem, validate_packing_request,
};
use crate::model::{CartonType, Item, ItemEntry, Placement};
use crate::optimizer::PackingStrategy;

#[derive(Clone)]
struct ApiState {
    engine_settings: EngineSettings,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>cartonize API Docs</title>
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
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Request structure for the carton suggestion endpoints.
///
/// `strategy` and `enable_3d` fall back to the configured defaults when
/// omitted.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            {
                "item": {
                    "id": "WIDGET-A",
                    "length": 10.0, "width": 10.0, "height": 10.0,
                    "weight": 1.0, "volume": 1000.0
                },
                "quantity": 100
            }
        ],
        "cartons": [
            {
                "id": "BOX-M",
                "length": 100.0, "width": 100.0, "height": 100.0,
                "volume": 1000000.0, "weight_limit": 1000.0, "cost_per_unit": 1.0
            }
        ],
        "strategy": "minimize_cartons",
        "enable_3d": true
    })
)]
pub struct PackRequest {
    pub items: Vec<ItemEntry>,
    pub cartons: Vec<CartonType>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub strategy: Option<PackingStrategy>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub enable_3d: Option<bool>,
}

struct ResolvedPackRequest {
    items: Vec<ItemEntry>,
    cartons: Vec<CartonType>,
    strategy: PackingStrategy,
    enable_3d: bool,
}

impl PackRequest {
    /// Applies configured defaults and validates the payload.
    fn resolve(self, settings: &EngineSettings) -> Result<ResolvedPackRequest, PackingError> {
        validate_packing_request(&self.items, &self.cartons)?;
        Ok(ResolvedPackRequest {
            items: self.items,
            cartons: self.cartons,
            strategy: self.strategy.unwrap_or_else(|| settings.default_strategy()),
            enable_3d: self.enable_3d.unwrap_or_else(|| settings.default_enable_3d()),
        })
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

fn validation_error(err: &PackingError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    settings: &EngineSettings,
) -> Result<ResolvedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    payload.resolve(settings).map_err(|err| validation_error(&err))
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            PackingPlan,
            AssignmentView,
            AssignmentItem,
            PlacedUnit,
            UnpackedItem,
            ErrorResponse,
            Item,
            ItemEntry,
            CartonType,
            Placement,
            PackingStrategy
        )
    ),
    tags((name = "packing", description = "Endpoints for carton suggestion"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, engine_settings: EngineSettings) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { engine_settings };

    let app = Router::new()
        // API endpoints
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /pack");
    println!("   - POST /pack_stream");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /pack endpoint.
///
/// Takes items with quantities and a carton catalog and returns the
/// aggregate packing plan.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Carton suggestion computed", body = PackingPlan),
        (
            status = 422,
            description = "Invalid request payload",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, &state.engine_settings) {
        Ok(request) => request,
        Err(response) => return response,
    };

    println!(
        "📥 New pack request: {} item entries, {} carton types",
        request.items.len(),
        request.cartons.len()
    );

    let config = state.engine_settings.engine_config();
    let plan = match controller::suggest_cartons(
        &request.items,
        &request.cartons,
        request.strategy,
        request.enable_3d,
        &config,
    ) {
        Ok(plan) => plan,
        Err(err) => return validation_error(&err),
    };

    println!(
        "📦 Result: {} cartons across {} patterns, {} unpacked item entries",
        plan.total_cartons,
        plan.unique_patterns,
        plan.unpacked_items.len()
    );

    (StatusCode::OK, Json(plan)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams engine events in real-time as Server-Sent Events
/// (text/event-stream) while the run executes on a blocking task.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams packing events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = 422,
            description = "Invalid request payload",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, &state.engine_settings) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let config = state.engine_settings.engine_config();

    tokio::task::spawn_blocking(move || {
        let _ = controller::suggest_cartons_with_progress(
            &request.items,
            &request.cartons,
            request.strategy,
            request.enable_3d,
            &config,
            |event| {
                if let Ok(json) = serde_json::to_string(event) {
                    // A closed receiver just drops the remaining events.
                    let _ = tx.blocking_send(json);
                }
            },
        );
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

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
