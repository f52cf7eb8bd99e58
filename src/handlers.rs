use crate::errors::AppError;
use crate::models::{
    AnalyticsResponse, LoginRequest, ResponsibleOption, ResponsibleTasksResponse, SearchResponse,
    SelectedResponsibles, SessionResponse, TaskListResponse,
};
use crate::query::{SortDirection, parse_day};
use crate::session::INVALID_LOGIN_MESSAGE;
use crate::state::AppState;
use crate::views::{self, PICK_RESPONSIBLE_MESSAGE, SearchParams, TaskListParams};
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{Value, json};

const TASKS_ERROR: &str = "Ошибка загрузки задач";
const SEARCH_ERROR: &str = "Ошибка поиска задач";
const ANALYTICS_ERROR: &str = "Не удалось загрузить аналитику";
const LOGIN_REQUIRED: &str = "Требуется вход";

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<i64>,
    pub responsible: Option<i64>,
    pub group: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub group: Option<i64>,
    pub responsible: Option<i64>,
    pub status: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsibleQuery {
    pub responsible: Option<i64>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    match state
        .session
        .login(payload.username.trim(), &payload.password)
        .await?
    {
        Some(token) => Ok(Json(SessionResponse {
            authenticated: true,
            token: Some(token),
        })),
        None => Err(AppError::unauthorized(INVALID_LOGIN_MESSAGE)),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.session.logout(token).await?;
    }
    Ok(Json(SessionResponse {
        authenticated: false,
        token: None,
    }))
}

pub async fn get_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>, AppError> {
    require_login(&state, &headers).await?;

    // an untouched filter form means "today"
    let today = Local::now().date_naive();
    let dates_given = query.from.is_some() || query.to.is_some();
    let params = TaskListParams {
        status: query.status.unwrap_or(0),
        responsible: query.responsible.unwrap_or(0),
        group: query.group,
        from: if dates_given { parse_day(query.from.as_deref()) } else { Some(today) },
        to: if dates_given { parse_day(query.to.as_deref()) } else { Some(today) },
        sort: query.sort.unwrap_or_else(|| "DEADLINE".to_string()),
        direction: query
            .direction
            .as_deref()
            .and_then(SortDirection::parse)
            .unwrap_or(SortDirection::Asc),
        search: query.search.unwrap_or_default(),
    };

    let response = views::load_task_list(&state, &params)
        .await
        .map_err(|err| AppError::upstream(TASKS_ERROR, err))?;
    Ok(Json(response))
}

pub async fn get_latest_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<TaskListResponse>>, AppError> {
    require_login(&state, &headers).await?;
    Ok(Json(state.latest.lock().await.clone()))
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    require_login(&state, &headers).await?;

    let params = SearchParams {
        title: query.title.unwrap_or_default(),
        group: query.group,
        responsible: query.responsible.unwrap_or(0),
        status: query.status.unwrap_or(0),
        from: parse_day(query.from.as_deref()),
        to: parse_day(query.to.as_deref()),
        page: query.page.unwrap_or(1),
    };

    let response = views::run_search(&state, &params)
        .await
        .map_err(|err| AppError::upstream(SEARCH_ERROR, err))?;
    Ok(Json(response))
}

pub async fn get_responsibles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResponsibleOption>>, AppError> {
    require_login(&state, &headers).await?;
    Ok(Json(state.directory.lock().await.list()))
}

pub async fn get_responsible_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ResponsibleQuery>,
) -> Result<Json<ResponsibleTasksResponse>, AppError> {
    require_login(&state, &headers).await?;

    let responsible = query.responsible.unwrap_or(0);
    if responsible <= 0 {
        return Err(AppError::bad_request(PICK_RESPONSIBLE_MESSAGE));
    }

    let response = views::load_responsible_tasks(&state, responsible)
        .await
        .map_err(|err| AppError::upstream(TASKS_ERROR, err))?;
    Ok(Json(response))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsResponse>, AppError> {
    require_login(&state, &headers).await?;

    let response = views::load_analytics(&state)
        .await
        .map_err(|err| AppError::upstream(ANALYTICS_ERROR, err))?;
    Ok(Json(response))
}

pub async fn get_selected_responsibles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SelectedResponsibles>, AppError> {
    require_login(&state, &headers).await?;
    Ok(Json(SelectedResponsibles {
        ids: state.session.selected_responsibles().await,
    }))
}

pub async fn put_selected_responsibles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SelectedResponsibles>,
) -> Result<Json<SelectedResponsibles>, AppError> {
    require_login(&state, &headers).await?;
    let ids = state.session.set_selected_responsibles(&payload.ids).await?;
    Ok(Json(SelectedResponsibles { ids }))
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn require_login(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if state.session.is_authenticated(bearer_token(headers)).await {
        Ok(())
    } else {
        Err(AppError::unauthorized(LOGIN_REQUIRED))
    }
}
