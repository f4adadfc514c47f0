use crate::config::Config;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use yard_core::{
    CheckHealthOperation, GetSlotByNumberOperationRequest, GetSlotOperation,
    GetSlotOperationOutcome, GetSlotOperationRequest, ListSlotsOperation,
    ListSlotsOperationRequest, OccupancyOperation, OccupancyOperationOutcome,
    OccupancyOperationRequest, RegisterSlotOperation, RegisterSlotOperationRequest, Result, Slot,
    SlotState, SlotStore, Transition, YardError,
};

pub struct ServerState {
    pub register: RegisterSlotOperation,
    pub occupancy: OccupancyOperation,
    pub get_slot: GetSlotOperation,
    pub list_slots: ListSlotsOperation,
    pub health: CheckHealthOperation,
}

impl ServerState {
    pub fn new(store: Arc<SlotStore>, config: &Config) -> Self {
        Self {
            register: RegisterSlotOperation::new(store.clone(), config.allocation.policy()),
            occupancy: OccupancyOperation::new(
                store.clone(),
                config.occupancy.occupied_color.clone(),
            ),
            get_slot: GetSlotOperation::new(store.clone()),
            list_slots: ListSlotsOperation::new(store.clone()),
            health: CheckHealthOperation::new(store),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SlotResponse {
    id: i64,
    warehouse: String,
    color: String,
    default_color: String,
    assignation_number: i64,
    state: SlotState,
    created_at: String,
    updated_at: String,
}

impl From<&Slot> for SlotResponse {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id(),
            warehouse: slot.warehouse().to_string(),
            color: slot.color().to_string(),
            default_color: slot.default_color().to_string(),
            assignation_number: slot.number(),
            state: slot.state(),
            created_at: slot.created_at().to_rfc3339(),
            updated_at: slot.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterSlotBody {
    color: String,
}

#[derive(Debug, Deserialize)]
struct OccupancyBody {
    warehouse: String,
    color: String,
    #[serde(alias = "assignationNumber", alias = "assignation_number")]
    number: i64,
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/yms/yard/healthz", get(health_handler))
        .route("/yms/yard/", get(list_all_slots))
        // "free" and "occupy" are reserved warehouse names, so GET here is a 400
        .route(
            "/yms/yard/free/",
            get(|state: State<Arc<ServerState>>| list_slots_in(state, "free")).post(free_slot),
        )
        .route(
            "/yms/yard/occupy/",
            get(|state: State<Arc<ServerState>>| list_slots_in(state, "occupy")).post(occupy_slot),
        )
        .route(
            "/yms/yard/:warehouse/",
            get(list_warehouse_slots).post(register_slot),
        )
        .route("/yms/yard/:warehouse/:id", get(get_slot))
        .route(
            "/yms/yard/:warehouse/number/:number",
            get(get_slot_by_number),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<()> {
    let store = Arc::new(SlotStore::new(
        config.storage.db_path.clone(),
        config.storage.busy_timeout(),
    )?);
    tracing::info!("Opened slot store at {:?}", store.db_path());

    let state = Arc::new(ServerState::new(store, &config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("Server listening on {}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
}

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let resp = ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    };
    (status, Json(resp)).into_response()
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let resp = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(resp)).into_response()
}

fn status_for(error: &YardError) -> StatusCode {
    match error {
        YardError::Validation(_) => StatusCode::BAD_REQUEST,
        YardError::AllocationFailed {
            retryable: true, ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        other if other.is_conflict() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: YardError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    }
    failure(status, error.to_string())
}

fn group_response(groups: BTreeMap<String, Vec<Slot>>) -> BTreeMap<String, Vec<SlotResponse>> {
    groups
        .into_iter()
        .map(|(key, slots)| (key, slots.iter().map(SlotResponse::from).collect()))
        .collect()
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.health.run().await {
        (StatusCode::OK, Json(true))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(false))
    }
}

async fn get_slot(
    State(state): State<Arc<ServerState>>,
    Path((warehouse, id)): Path<(String, String)>,
) -> Response {
    let Ok(id) = id.trim().parse::<i64>() else {
        return failure(StatusCode::BAD_REQUEST, format!("invalid slot id: {}", id));
    };

    match state
        .get_slot
        .run(GetSlotOperationRequest { id, warehouse })
        .await
    {
        Ok(GetSlotOperationOutcome::Found(slot)) => {
            success(StatusCode::OK, SlotResponse::from(&slot))
        }
        Ok(GetSlotOperationOutcome::NotFound) => {
            failure(StatusCode::NOT_FOUND, "slot not found")
        }
        Err(error) => error_response(error),
    }
}

async fn get_slot_by_number(
    State(state): State<Arc<ServerState>>,
    Path((warehouse, number)): Path<(String, String)>,
) -> Response {
    let Ok(number) = number.trim().parse::<i64>() else {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("invalid assignation number: {}", number),
        );
    };

    match state
        .get_slot
        .run_by_number(GetSlotByNumberOperationRequest { warehouse, number })
        .await
    {
        Ok(GetSlotOperationOutcome::Found(slot)) => {
            success(StatusCode::OK, SlotResponse::from(&slot))
        }
        Ok(GetSlotOperationOutcome::NotFound) => {
            failure(StatusCode::NOT_FOUND, "slot not found")
        }
        Err(error) => error_response(error),
    }
}

async fn list_warehouse_slots(
    state: State<Arc<ServerState>>,
    Path(warehouse): Path<String>,
) -> Response {
    list_slots_in(state, warehouse).await
}

async fn list_slots_in(
    State(state): State<Arc<ServerState>>,
    warehouse: impl Into<String>,
) -> Response {
    let warehouse = warehouse.into();
    match state
        .list_slots
        .run(ListSlotsOperationRequest {
            warehouse: Some(warehouse),
        })
        .await
    {
        Ok(result) => success(StatusCode::OK, group_response(result.by_color())),
        Err(error) => error_response(error),
    }
}

async fn list_all_slots(State(state): State<Arc<ServerState>>) -> Response {
    match state
        .list_slots
        .run(ListSlotsOperationRequest::default())
        .await
    {
        Ok(result) => success(StatusCode::OK, group_response(result.by_warehouse())),
        Err(error) => error_response(error),
    }
}

async fn register_slot(
    State(state): State<Arc<ServerState>>,
    Path(warehouse): Path<String>,
    payload: std::result::Result<Json<RegisterSlotBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!(
                    "invalid slot body, expected {{\"color\": \"#0000ff\"}}: {}",
                    rejection.body_text()
                ),
            );
        }
    };

    match state
        .register
        .run(RegisterSlotOperationRequest {
            warehouse,
            color: body.color,
        })
        .await
    {
        Ok(slot) => success(StatusCode::CREATED, SlotResponse::from(&slot)),
        Err(error) => error_response(error),
    }
}

async fn free_slot(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<OccupancyBody>, JsonRejection>,
) -> Response {
    apply_transition(&state, Transition::Free, payload).await
}

async fn occupy_slot(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<OccupancyBody>, JsonRejection>,
) -> Response {
    apply_transition(&state, Transition::Occupy, payload).await
}

async fn apply_transition(
    state: &ServerState,
    transition: Transition,
    payload: std::result::Result<Json<OccupancyBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!(
                    "invalid slot body, expected {{\"warehouse\": \"AXM\", \"color\": \"#0000ff\", \"number\": 1}}: {}",
                    rejection.body_text()
                ),
            );
        }
    };

    let request = OccupancyOperationRequest {
        warehouse: body.warehouse,
        color: body.color,
        number: body.number,
    };

    match state.occupancy.run(transition, request).await {
        Ok(OccupancyOperationOutcome::Updated(slot)) => {
            success(StatusCode::OK, SlotResponse::from(&slot))
        }
        Ok(OccupancyOperationOutcome::NotFound) => {
            failure(StatusCode::NOT_FOUND, "slot does not exist")
        }
        Err(error) => error_response(error),
    }
}
