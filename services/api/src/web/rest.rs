//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI document.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_tab_handler,
        close_tab_handler,
    ),
    components(
        schemas(CreateTabResponse)
    ),
    tags(
        (name = "Handwriting Evaluator API", description = "Tab lifecycle endpoints. Everything else runs over the /ws WebSocket.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after a tab is opened.
#[derive(Serialize, ToSchema)]
pub struct CreateTabResponse {
    pub tab_id: Uuid,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Open a new browser tab.
///
/// The returned id scopes the transient session store. Every WebSocket
/// connection of that tab must send it in its `init` message.
#[utoipa::path(
    post,
    path = "/tabs",
    responses(
        (status = 201, description = "Tab opened", body = CreateTabResponse)
    )
)]
pub async fn create_tab_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let tab_id = app_state.tabs.open().await;
    (StatusCode::CREATED, Json(CreateTabResponse { tab_id }))
}

/// Close a browser tab, discarding its transient session store.
#[utoipa::path(
    delete,
    path = "/tabs/{tab_id}",
    responses(
        (status = 204, description = "Tab closed"),
        (status = 404, description = "No such tab")
    ),
    params(
        ("tab_id" = Uuid, Path, description = "The id returned when the tab was opened.")
    )
)]
pub async fn close_tab_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tab_id): Path<Uuid>,
) -> StatusCode {
    if app_state.tabs.close(tab_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
