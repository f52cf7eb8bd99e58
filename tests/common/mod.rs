#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Records per response, as the real API pages at 50.
pub const SERVER_PAGE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum TotalStyle {
    #[default]
    TopLevel,
    Nested,
    Absent,
}

/// Minimal stand-in for `tasks.task.list`: pages by `start`, filters by
/// `filter[TITLE]` (substring) and `filter[RESPONSIBLE_ID]`, ignores the rest.
#[derive(Clone, Default)]
pub struct FakeApi {
    pub tasks: Arc<Vec<Value>>,
    pub total: TotalStyle,
    pub with_next: bool,
    pub fail_start: Option<String>,
    pub fail_title: Option<String>,
    pub api_error: bool,
    pub raw_body: Option<&'static str>,
    /// Serve empty pages from this offset on while still reporting the full total.
    pub stop_after: Option<usize>,
    pub requests: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Value>) -> Self {
        Self {
            tasks: Arc::new(tasks),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<Vec<(String, String)>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn starts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|params| param(params, "start").unwrap_or_default())
            .collect()
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/rest/tasks.task.list", get(list_tasks))
            .with_state(self)
    }
}

pub fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

async fn list_tasks(State(api): State<FakeApi>, Query(params): Query<Vec<(String, String)>>) -> Response {
    api.requests.lock().unwrap().push(params.clone());

    let start_text = param(&params, "start").unwrap_or_else(|| "0".to_string());
    let title = param(&params, "filter[TITLE]");

    if api.fail_start.as_deref() == Some(start_text.as_str())
        || (api.fail_title.is_some() && api.fail_title == title)
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "INTERNAL_ERROR", "error_description": "boom" })),
        )
            .into_response();
    }
    if let Some(raw) = api.raw_body {
        return (StatusCode::OK, raw).into_response();
    }
    if api.api_error {
        return Json(json!({ "error": "ACCESS_DENIED", "error_description": "Нет доступа" })).into_response();
    }

    let responsible = param(&params, "filter[RESPONSIBLE_ID]");
    let matching: Vec<&Value> = api
        .tasks
        .iter()
        .filter(|task| match &title {
            Some(marker) => task["title"]
                .as_str()
                .is_some_and(|t| t.to_lowercase().contains(&marker.to_lowercase())),
            None => true,
        })
        .filter(|task| match &responsible {
            Some(id) => task["responsible"]["id"].as_str() == Some(id.as_str()),
            None => true,
        })
        .collect();

    let start: usize = start_text.parse().unwrap_or(0);
    let served = api.stop_after.map_or(matching.len(), |limit| limit.min(matching.len()));
    let page: Vec<Value> = matching[..served]
        .iter()
        .skip(start)
        .take(SERVER_PAGE)
        .map(|task| (*task).clone())
        .collect();

    let mut body = json!({ "result": { "tasks": page } });
    match api.total {
        TotalStyle::TopLevel => body["total"] = json!(matching.len()),
        TotalStyle::Nested => body["result"]["total"] = json!(matching.len()),
        TotalStyle::Absent => {}
    }
    if api.with_next && start + SERVER_PAGE < matching.len() {
        body["next"] = json!(start + SERVER_PAGE);
    }
    Json(body).into_response()
}

/// Serves `api` on a random local port from the current runtime and returns
/// the REST base URL.
pub async fn spawn_fake_api(api: FakeApi) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api.router()).await.unwrap();
    });
    format!("http://{addr}/rest")
}

/// Like [`spawn_fake_api`] but on a dedicated thread and runtime, so the API
/// outlives any single `#[tokio::test]`.
pub fn spawn_fake_api_thread(api: FakeApi) -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let url = spawn_fake_api(api).await;
            tx.send(url).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

/// `count` active tasks of group 174: every third is milling (`фр.`), every
/// third turning (`ток.`), the rest other; two hours each; alternating
/// between two responsibles.
pub fn sample_tasks(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|id| {
            let title = match id % 3 {
                0 => format!("Корпус {id} фр."),
                1 => format!("Вал {id} ток."),
                _ => format!("Чертёж {id}"),
            };
            let (responsible_id, name) = if id % 2 == 0 {
                ("7", "Иванов Иван")
            } else {
                ("8", "Петров Пётр")
            };
            json!({
                "id": id.to_string(),
                "title": title,
                "realStatus": "3",
                "durationPlan": "2",
                "responsibleId": responsible_id,
                "responsible": { "id": responsible_id, "name": name, "icon": "/avatar.png" },
                "endDatePlan": format!("2025-08-{:02}T18:00:00+03:00", (id % 28) + 1),
                "deadline": format!("2025-08-{:02}T18:00:00+03:00", (id % 28) + 1)
            })
        })
        .collect()
}
