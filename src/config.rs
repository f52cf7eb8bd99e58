use crate::client::ClientOptions;
use crate::paginate::PageOptions;
use crate::session::Credentials;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub data_path: PathBuf,
    pub api_url: String,
    pub group_id: i64,
    pub page_size: u64,
    pub max_pages: usize,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub excluded_responsible: i64,
    pub refresh_minutes: u64,
    pub credentials: Credentials,
    pub headcounts: Headcounts,
}

#[derive(Debug, Clone, Copy)]
pub struct Headcounts {
    pub milling: u32,
    pub turning: u32,
    pub other: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: PathBuf::from("data/state.json"),
            api_url: "http://127.0.0.1:9090/rest".to_string(),
            group_id: 174,
            page_size: 50,
            max_pages: 1000,
            http_timeout: Duration::from_secs(30),
            max_retries: 0,
            excluded_responsible: 196,
            refresh_minutes: 5,
            credentials: Credentials {
                username: "gros".to_string(),
                password: "5544".to_string(),
            },
            headcounts: Headcounts {
                milling: 1,
                turning: 1,
                other: 1,
            },
        }
    }
}

impl Settings {
    /// Reads the environment; unset or unparseable variables keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            data_path: env::var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            api_url: non_empty("TASKS_API_URL").unwrap_or(defaults.api_url),
            group_id: parsed("TASKS_GROUP_ID").unwrap_or(defaults.group_id),
            page_size: parsed::<u64>("TASKS_PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            max_pages: parsed::<usize>("TASKS_MAX_PAGES")
                .filter(|pages| *pages > 0)
                .unwrap_or(defaults.max_pages),
            http_timeout: parsed::<u64>("TASKS_HTTP_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            max_retries: parsed("TASKS_MAX_RETRIES").unwrap_or(defaults.max_retries),
            excluded_responsible: parsed("TASKS_EXCLUDED_RESPONSIBLE")
                .unwrap_or(defaults.excluded_responsible),
            refresh_minutes: parsed("REFRESH_MINUTES").unwrap_or(defaults.refresh_minutes),
            credentials: Credentials {
                username: non_empty("DASHBOARD_USER").unwrap_or(defaults.credentials.username),
                password: non_empty("DASHBOARD_PASSWORD").unwrap_or(defaults.credentials.password),
            },
            headcounts: Headcounts {
                milling: parsed("MILLING_HEADCOUNT").unwrap_or(defaults.headcounts.milling),
                turning: parsed("TURNING_HEADCOUNT").unwrap_or(defaults.headcounts.turning),
                other: parsed("OTHER_HEADCOUNT").unwrap_or(defaults.headcounts.other),
            },
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.http_timeout,
            max_retries: self.max_retries,
            ..ClientOptions::default()
        }
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }

    pub fn refresh_period(&self) -> Option<Duration> {
        (self.refresh_minutes > 0).then(|| Duration::from_secs(self.refresh_minutes * 60))
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    non_empty(key).and_then(|value| value.trim().parse().ok())
}
