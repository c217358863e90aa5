use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use finlink_core::{
    account_links::{AccountLinkServiceTrait, NewAccountLink},
    accounts::CategorizationServiceTrait,
    reconciliation::{ReconcileReport, ReconciliationServiceTrait},
    transactions::TransactionSyncServiceTrait,
};

use crate::{
    auth::{require_operator, require_user, AuthenticatedUser},
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{AccountLinkResponse, AccountsResponse, TaskResponse, TransactionsResponse},
    scheduler::{run_task, ScheduledTask},
};

pub async fn healthz() -> &'static str {
    "ok"
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<Json<AccountsResponse>> {
    let accounts = state
        .categorization_service
        .get_categorized_accounts(&user_id)
        .await?;
    Ok(Json(AccountsResponse { accounts }))
}

async fn create_account_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(payload): Json<NewAccountLink>,
) -> ApiResult<Json<AccountLinkResponse>> {
    let link = state
        .account_link_service
        .create_account_link(payload, &user_id)
        .await?;
    Ok(Json(AccountLinkResponse {
        account: link.to_record()?,
    }))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<Json<TransactionsResponse>> {
    let transactions = state.transaction_service.get_transactions(&user_id).await?;
    Ok(Json(TransactionsResponse {
        transactions: transactions.into_iter().map(|record| record.data).collect(),
    }))
}

async fn sync_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ReconcileReport>> {
    let report = state.reconciliation_service.reconcile_user(&user_id).await?;
    Ok(Json(report))
}

async fn run_named_task(
    State(state): State<Arc<AppState>>,
    Path(task): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let task: ScheduledTask = task.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(run_task(&state, task).await))
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let protected = Router::new()
        .route("/accounts", get(list_accounts).post(create_account_link))
        .route("/transactions", get(list_transactions))
        .route("/sync", post(sync_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    // Cross-user tasks; operators only.
    let operator = Router::new()
        .route("/tasks/{task}", post(run_named_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_operator));

    let api = Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
        .merge(operator);

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
