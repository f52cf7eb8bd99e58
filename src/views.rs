//! The dashboard's data views, composed from the fetch/classify core.

use crate::classify::{Aggregation, AggregationBucket, BucketDef, classify_by_id_sets, classify_by_match};
use crate::config::{Headcounts, Settings};
use crate::directory::initials;
use crate::errors::QueryError;
use crate::models::{
    AnalyticsResponse, BucketView, DisplayTimeView, ResponsibleTasksResponse, SearchResponse, StatusOption,
    Task, TaskGroup, TaskListResponse, TaskStatus, TaskView, parse_timestamp,
};
use crate::paginate::{fetch_all, fetch_all_joined};
use crate::query::{SortDirection, TaskQuery};
use crate::state::AppState;
use crate::timefmt::{DisplayTime, TimeScale, working_days};
use chrono::{Local, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::info;

pub const NO_RESPONSIBLE_LABEL: &str = "Без исполнителя";
pub const PICK_RESPONSIBLE_MESSAGE: &str = "Пожалуйста, выберите исполнителя.";
pub const NO_TASKS_FOR_RESPONSIBLE_MESSAGE: &str = "Задачи для выбранного исполнителя не найдены.";
pub const MILLING_MARKER: &str = "фр.";
pub const TURNING_MARKER: &str = "ток.";

const SORT_FIELDS: [&str; 3] = ["ID", "TITLE", "DEADLINE"];
const ACTIVE_STATUSES: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::InProgress];

#[derive(Debug, Clone)]
pub struct TaskListParams {
    pub status: i64,
    pub responsible: i64,
    pub group: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: String,
    pub direction: SortDirection,
    pub search: String,
}

impl TaskListParams {
    /// Today's tasks ordered by deadline, the view the auto-refresh keeps warm.
    pub fn today() -> Self {
        let today = Local::now().date_naive();
        Self {
            status: 0,
            responsible: 0,
            group: None,
            from: Some(today),
            to: Some(today),
            sort: "DEADLINE".to_string(),
            direction: SortDirection::Asc,
            search: String::new(),
        }
    }
}

pub fn task_list_query(params: &TaskListParams, settings: &Settings) -> TaskQuery {
    let sort = SORT_FIELDS
        .iter()
        .find(|field| field.eq_ignore_ascii_case(params.sort.trim()))
        .copied()
        .unwrap_or("DEADLINE");

    let mut query = TaskQuery::new("tasks")
        .filter("GROUP_ID", params.group.unwrap_or(settings.group_id))
        .filter_not("RESPONSIBLE_ID", settings.excluded_responsible);
    if params.status != 0 {
        query = query.filter("REAL_STATUS", params.status);
    }
    if params.responsible != 0 {
        query = query.filter("RESPONSIBLE_ID", params.responsible);
    }
    // overlap of [START_DATE_PLAN, END_DATE_PLAN] with the requested days
    query
        .date_range("END_DATE_PLAN", "START_DATE_PLAN", params.from, params.to)
        .order(sort, params.direction)
}

pub async fn load_task_list(state: &AppState, params: &TaskListParams) -> Result<TaskListResponse, QueryError> {
    let query = task_list_query(params, &state.settings);
    let tasks = fetch_all(state.source.as_ref(), &query, state.settings.page_options()).await?;

    let mut directory = state.directory.lock().await;
    directory.observe(&tasks).await;

    let tasks = filter_by_title(tasks, &params.search);
    Ok(TaskListResponse {
        total: tasks.len(),
        groups: group_by_responsible(tasks),
        responsibles: directory.list(),
        statuses: status_options(),
    })
}

/// Runs the default view and stores it as the latest snapshot.
pub async fn refresh_latest(state: &AppState) -> Result<(), QueryError> {
    let snapshot = load_task_list(state, &TaskListParams::today()).await?;
    info!("refreshed task list: {} tasks", snapshot.total);
    *state.latest.lock().await = Some(snapshot);
    Ok(())
}

pub fn filter_by_title(tasks: Vec<Task>, search: &str) -> Vec<Task> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return tasks;
    }
    tasks
        .into_iter()
        .filter(|task| task.title.to_lowercase().contains(&needle))
        .collect()
}

/// Groups in order of first appearance; tasks keep their server order.
pub fn group_by_responsible(tasks: Vec<Task>) -> Vec<TaskGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<TaskGroup> = Vec::new();
    for task in tasks {
        let name = task.responsible_name().unwrap_or(NO_RESPONSIBLE_LABEL).to_string();
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            groups.push(TaskGroup {
                responsible: name,
                tasks: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].tasks.push(TaskView::from(task));
    }
    groups
}

pub fn status_options() -> Vec<StatusOption> {
    TaskStatus::ALL
        .iter()
        .map(|status| StatusOption {
            value: status.code(),
            label: if *status == TaskStatus::Unknown {
                "Все задачи"
            } else {
                status.label()
            },
            color: status.color(),
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub title: String,
    pub group: Option<i64>,
    pub responsible: i64,
    pub status: i64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: usize,
}

pub fn search_query(params: &SearchParams) -> TaskQuery {
    let mut query = TaskQuery::new("search");
    if !params.title.trim().is_empty() {
        query = query.filter("TITLE", params.title.trim());
    }
    if let Some(group) = params.group.filter(|group| *group != 0) {
        query = query.filter("GROUP_ID", group);
    }
    if params.responsible != 0 {
        query = query.filter("RESPONSIBLE_ID", params.responsible);
    }
    if params.status != 0 {
        query = query.filter("REAL_STATUS", params.status);
    }
    query
        .date_range("DEADLINE", "DEADLINE", params.from, params.to)
        .select(["ID", "TITLE", "STATUS", "RESPONSIBLE_ID", "DEADLINE", "DURATION_PLAN"])
        .order("ID", SortDirection::Asc)
}

pub async fn run_search(state: &AppState, params: &SearchParams) -> Result<SearchResponse, QueryError> {
    let options = state.settings.page_options();
    let tasks = fetch_all(state.source.as_ref(), &search_query(params), options).await?;
    Ok(search_page(tasks, params.page, options.page_size as usize))
}

/// Totals over every fetched record, with only the requested (1-based) page
/// of them returned.
pub fn search_page(tasks: Vec<Task>, page: usize, page_size: usize) -> SearchResponse {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_hours: f64 = tasks.iter().map(|task| task.duration_plan).sum();
    let total = tasks.len();
    let tasks = tasks
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(TaskView::from)
        .collect();
    SearchResponse {
        page,
        page_size,
        total,
        tasks,
        total_hours,
        working_days: working_days(total_hours),
    }
}

pub fn responsible_query(responsible: i64, settings: &Settings) -> TaskQuery {
    TaskQuery::new(format!("responsible {responsible}"))
        .filter("GROUP_ID", settings.group_id)
        .filter("RESPONSIBLE_ID", responsible)
        .filter_any("REAL_STATUS", ACTIVE_STATUSES.iter().map(|s| s.code()))
        .order("END_DATE_PLAN", SortDirection::Asc)
        .order("DEADLINE", SortDirection::Asc)
        .select([
            "ID",
            "TITLE",
            "STATUS",
            "DEADLINE",
            "START_DATE_PLAN",
            "END_DATE_PLAN",
            "RESPONSIBLE_ID",
            "REAL_STATUS",
            "GROUP_ID",
            "responsible.icon",
            "DURATION_PLAN",
        ])
}

pub async fn load_responsible_tasks(
    state: &AppState,
    responsible: i64,
) -> Result<ResponsibleTasksResponse, QueryError> {
    let query = responsible_query(responsible, &state.settings);
    let tasks = sort_by_plan(fetch_all(state.source.as_ref(), &query, state.settings.page_options()).await?);

    let icon = tasks
        .first()
        .and_then(|task| task.responsible.as_ref())
        .and_then(|r| r.icon.clone());

    let mut directory = state.directory.lock().await;
    directory.observe(&tasks).await;
    let name = directory.name(responsible).map(String::from);

    Ok(ResponsibleTasksResponse {
        responsible_id: responsible,
        initials: initials(name.as_deref().unwrap_or_default()),
        name,
        icon,
        message: tasks.is_empty().then(|| NO_TASKS_FOR_RESPONSIBLE_MESSAGE.to_string()),
        tasks: tasks.into_iter().map(TaskView::from).collect(),
    })
}

/// Orders by planned end (falling back to the deadline). Dated tasks come
/// first; the sort is stable so undated ones keep their order.
pub fn sort_by_plan(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| match (plan_date(a), plan_date(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    tasks
}

fn plan_date(task: &Task) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    parse_timestamp(task.end_date_plan.as_deref()).or_else(|| parse_timestamp(task.deadline.as_deref()))
}

pub fn analytics_buckets(headcounts: Headcounts) -> [BucketDef; 2] {
    [
        BucketDef::title_marker("Фрезерные работы", "#2196F3", MILLING_MARKER).with_headcount(headcounts.milling),
        BucketDef::title_marker("Токарные работы", "#FF9800", TURNING_MARKER).with_headcount(headcounts.turning),
    ]
}

pub fn analytics_queries(settings: &Settings) -> [TaskQuery; 3] {
    let base = |label: &str| {
        TaskQuery::new(label)
            .filter("GROUP_ID", settings.group_id)
            .filter_any("REAL_STATUS", ACTIVE_STATUSES.iter().map(|s| s.code()))
            .select(["ID", "TITLE", "STATUS", "DURATION_PLAN"])
    };
    [
        base("all"),
        base("milling").filter("TITLE", MILLING_MARKER),
        base("turning").filter("TITLE", TURNING_MARKER),
    ]
}

pub async fn load_analytics(state: &AppState) -> Result<AnalyticsResponse, QueryError> {
    let settings = &state.settings;
    let queries = analytics_queries(settings);
    let mut results = fetch_all_joined(state.source.as_ref(), &queries, settings.page_options()).await?;

    let turning = results.pop().unwrap_or_default();
    let milling = results.pop().unwrap_or_default();
    let base = results.pop().unwrap_or_default();

    Ok(analytics(&base, milling, turning, settings.headcounts))
}

pub fn analytics(base: &[Task], milling: Vec<Task>, turning: Vec<Task>, headcounts: Headcounts) -> AnalyticsResponse {
    let [milling_def, turning_def] = analytics_buckets(headcounts);
    let scale = TimeScale::default();

    let by_title = classify_by_match(base, &[milling_def.clone(), turning_def.clone()], headcounts.other);
    let by_id = classify_by_id_sets(
        base,
        &[(milling_def, milling), (turning_def, turning)],
        headcounts.other,
    );

    AnalyticsResponse {
        total_hours: by_id.total_hours,
        total_display: display(scale.display(by_id.total_hours)),
        buckets: bucket_views(&by_id, scale),
        by_title: bucket_views(&by_title, scale),
        inconsistent_records: by_id.inconsistent_records,
    }
}

fn bucket_views(aggregation: &Aggregation, scale: TimeScale) -> Vec<BucketView> {
    aggregation
        .all_buckets()
        .map(|bucket| bucket_view(bucket, scale))
        .collect()
}

fn bucket_view(bucket: &AggregationBucket, scale: TimeScale) -> BucketView {
    let per_person_hours = bucket.per_person_hours();
    BucketView {
        label: bucket.label.clone(),
        color: bucket.color.clone(),
        total_hours: bucket.total_hours,
        per_person_hours,
        display: display(scale.display(per_person_hours)),
    }
}

fn display(time: DisplayTime) -> DisplayTimeView {
    DisplayTimeView {
        days: time.days,
        remainder_hours: time.remainder_hours,
    }
}
