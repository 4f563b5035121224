use crate::errors::AppError;
use crate::models::{
    BootstrapRequest, GoalRequest, IntakeRequest, RetryRequest, SessionView,
};
use crate::shell::{Shell, ViewState};
use crate::state::AppState;
use crate::theme::ThemeParams;
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, State},
    response::Html,
};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

pub async fn index() -> Html<String> {
    Html(render_index(&ThemeParams::default()))
}

pub async fn bootstrap(
    State(state): State<AppState>,
    Json(payload): Json<BootstrapRequest>,
) -> Json<SessionView> {
    let context = if state.mock_host {
        payload.context.with_mock_host()
    } else {
        payload.context
    };
    let date = payload.date.unwrap_or_else(today);

    let (id, shell) = state
        .sessions
        .lock()
        .await
        .insert(Shell::new(context, date));

    let mut shell = shell.lock().await;
    shell.bootstrap(state.store.as_ref()).await;
    Json(session_view(id, &shell))
}

pub async fn retry(
    State(state): State<AppState>,
    Json(payload): Json<RetryRequest>,
) -> Result<Json<SessionView>, AppError> {
    let (id, shell) = find_session(&state, &payload.session).await?;
    let mut shell = shell.lock().await;
    shell
        .retry(state.store.as_ref(), payload.date.unwrap_or_else(today))
        .await?;
    Ok(Json(session_view(id, &shell)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let (id, shell) = find_session(&state, &session).await?;
    let shell = shell.lock().await;
    Ok(Json(session_view(id, &shell)))
}

pub async fn add_intake(
    State(state): State<AppState>,
    Json(payload): Json<IntakeRequest>,
) -> Result<Json<SessionView>, AppError> {
    let (id, shell) = find_session(&state, &payload.session).await?;
    let mut shell = shell.lock().await;
    let date = payload.date.unwrap_or_else(today);
    if let Err(err) = shell
        .add_water(
            state.store.as_ref(),
            &payload.amount,
            payload.request_id.as_deref(),
            date,
        )
        .await
    {
        warn!(session = %id, "add water failed: {err}");
        return Err(err.into());
    }
    Ok(Json(session_view(id, &shell)))
}

pub async fn set_goal(
    State(state): State<AppState>,
    Json(payload): Json<GoalRequest>,
) -> Result<Json<SessionView>, AppError> {
    let (id, shell) = find_session(&state, &payload.session).await?;
    let mut shell = shell.lock().await;
    if let Err(err) = shell.set_goal(state.store.as_ref(), &payload.goal).await {
        warn!(session = %id, "goal update failed: {err}");
        return Err(err.into());
    }
    Ok(Json(session_view(id, &shell)))
}

async fn find_session(
    state: &AppState,
    raw: &str,
) -> Result<(Uuid, Arc<Mutex<Shell>>), AppError> {
    let id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::not_found("unknown session"))?;
    let shell = state
        .sessions
        .lock()
        .await
        .get(&id)
        .ok_or_else(|| AppError::not_found("unknown session"))?;
    Ok((id, shell))
}

fn session_view(id: Uuid, shell: &Shell) -> SessionView {
    let error = match shell.view() {
        ViewState::Error(view) => Some(view.clone()),
        _ => None,
    };
    SessionView {
        session: id.to_string(),
        state: shell.view().name(),
        error,
        dashboard: shell.dashboard(),
        theme: ThemeParams::from_context(shell.context()),
        appearance: shell.context().appearance(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
