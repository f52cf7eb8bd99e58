use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Task status codes of the task API. `Unknown` doubles as "all statuses"
/// in filter lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i64", from = "i64")]
pub enum TaskStatus {
    #[default]
    Unknown,
    New,
    Pending,
    InProgress,
    SupposedlyCompleted,
    Completed,
    Deferred,
    Declined,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Unknown,
        TaskStatus::New,
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::SupposedlyCompleted,
        TaskStatus::Completed,
        TaskStatus::Deferred,
        TaskStatus::Declined,
    ];

    /// Codes outside the known set map to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::New,
            2 => Self::Pending,
            3 => Self::InProgress,
            4 => Self::SupposedlyCompleted,
            5 => Self::Completed,
            6 => Self::Deferred,
            7 => Self::Declined,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::New => 1,
            Self::Pending => 2,
            Self::InProgress => 3,
            Self::SupposedlyCompleted => 4,
            Self::Completed => 5,
            Self::Deferred => 6,
            Self::Declined => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Неизвестный статус",
            Self::New => "Новые",
            Self::Pending => "Ждут выполнения",
            Self::InProgress => "В работе",
            Self::SupposedlyCompleted => "Предположительно завершены",
            Self::Completed => "Завершены",
            Self::Deferred => "Отложены",
            Self::Declined => "Отклонены",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::New | Self::Completed => "#4CAF50",
            Self::Pending => "#FF9800",
            Self::InProgress => "#2196F3",
            Self::SupposedlyCompleted => "#9C27B0",
            Self::Deferred => "#FF5722",
            Self::Declined => "#F44336",
            Self::Unknown => "#757575",
        }
    }
}

impl From<i64> for TaskStatus {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<TaskStatus> for i64 {
    fn from(status: TaskStatus) -> Self {
        status.code()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Responsible {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub icon: Option<String>,
}

/// A task record after boundary normalization. Nothing downstream reads the
/// raw, alias-laden API payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: Option<i64>,
    pub title: String,
    pub status: TaskStatus,
    pub duration_plan: f64,
    pub responsible_id: Option<i64>,
    pub responsible: Option<Responsible>,
    pub start_date_plan: Option<String>,
    pub end_date_plan: Option<String>,
    pub deadline: Option<String>,
}

impl Task {
    pub fn responsible_name(&self) -> Option<&str> {
        self.responsible
            .as_ref()
            .and_then(|r| r.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// True when the planned end falls after the deadline.
    pub fn is_overdue(&self) -> bool {
        match (
            parse_timestamp(self.end_date_plan.as_deref()),
            parse_timestamp(self.deadline.as_deref()),
        ) {
            (Some(end), Some(deadline)) => end > deadline,
            _ => false,
        }
    }
}

pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value).ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusOption {
    pub value: i64,
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsibleOption {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub status_label: &'static str,
    pub status_color: &'static str,
    pub overdue: bool,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            status_label: task.status.label(),
            status_color: task.status.color(),
            overdue: task.is_overdue(),
            task,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskGroup {
    pub responsible: String,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    pub total: usize,
    pub groups: Vec<TaskGroup>,
    pub responsibles: Vec<ResponsibleOption>,
    pub statuses: Vec<StatusOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub tasks: Vec<TaskView>,
    pub total_hours: f64,
    pub working_days: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsibleTasksResponse {
    pub responsible_id: i64,
    pub name: Option<String>,
    pub initials: String,
    pub icon: Option<String>,
    pub tasks: Vec<TaskView>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplayTimeView {
    pub days: i64,
    pub remainder_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketView {
    pub label: String,
    pub color: String,
    pub total_hours: f64,
    pub per_person_hours: f64,
    pub display: DisplayTimeView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    pub total_hours: f64,
    pub total_display: DisplayTimeView,
    pub buckets: Vec<BucketView>,
    pub by_title: Vec<BucketView>,
    pub inconsistent_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectedResponsibles {
    pub ids: Vec<i64>,
}
