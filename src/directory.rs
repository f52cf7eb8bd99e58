//! Responsible-person directory: id → display name, learned from fetched
//! tasks and persisted as a full snapshot after every observation.

use crate::models::{ResponsibleOption, Task};
use crate::storage::KeyValueStore;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

pub const RESPONSIBLE_MAP_KEY: &str = "responsibleMap";
pub const ALL_RESPONSIBLES_LABEL: &str = "Все исполнители";
pub const PICK_RESPONSIBLE_LABEL: &str = "Выберите исполнителя";
pub const UNKNOWN_RESPONSIBLE_LABEL: &str = "Неизвестный исполнитель";

pub struct ResponsibleDirectory {
    store: Arc<dyn KeyValueStore>,
    names: BTreeMap<i64, String>,
    options: Vec<ResponsibleOption>,
}

impl ResponsibleDirectory {
    /// Loads the persisted map under the same rule `observe` writes by: a
    /// positive id and a trimmed, non-blank name. An unparseable blob yields
    /// an empty directory.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let names = match store.get(RESPONSIBLE_MAP_KEY).await {
            Some(raw) => parse_snapshot(&raw),
            None => BTreeMap::new(),
        };
        let options = build_options(&names);
        Self {
            store,
            names,
            options,
        }
    }

    /// Upserts every task carrying a positive responsible id and a non-blank
    /// name (trimmed, last write wins), then persists and rebuilds the list.
    /// Persistence failures are logged and do not fail the observation.
    pub async fn observe<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        for task in tasks {
            let Some(id) = task.responsible_id.filter(|id| *id > 0) else {
                continue;
            };
            if let Some(name) = task.responsible_name() {
                self.names.insert(id, name.to_string());
            }
        }

        self.options = build_options(&self.names);
        self.persist().await;
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn display_name(&self, id: i64) -> &str {
        self.name(id).unwrap_or(UNKNOWN_RESPONSIBLE_LABEL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sorted by name, prefixed with the "all responsibles" sentinel (id 0).
    pub fn list(&self) -> Vec<ResponsibleOption> {
        self.list_with_sentinel(ALL_RESPONSIBLES_LABEL)
    }

    pub fn list_with_sentinel(&self, sentinel: &str) -> Vec<ResponsibleOption> {
        let mut list = Vec::with_capacity(self.options.len() + 1);
        list.push(ResponsibleOption {
            id: 0,
            label: sentinel.to_string(),
        });
        list.extend(self.options.iter().cloned());
        list
    }

    async fn persist(&self) {
        let payload: BTreeMap<String, &str> = self
            .names
            .iter()
            .map(|(id, name)| (id.to_string(), name.as_str()))
            .collect();
        let result = match serde_json::to_string(&payload) {
            Ok(json) => self.store.set(RESPONSIBLE_MAP_KEY, json).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            error!("failed to persist responsible directory: {err}");
        }
    }
}

fn parse_snapshot(raw: &str) -> BTreeMap<i64, String> {
    let object = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(object)) => object,
        Ok(_) => {
            warn!("stored responsible directory is not an object; starting empty");
            return BTreeMap::new();
        }
        Err(err) => {
            warn!("stored responsible directory is unreadable: {err}");
            return BTreeMap::new();
        }
    };

    object
        .into_iter()
        .filter_map(|(key, value)| {
            let id = key.trim().parse::<i64>().ok().filter(|id| *id > 0)?;
            let name = value.as_str()?.trim();
            (!name.is_empty()).then(|| (id, name.to_string()))
        })
        .collect()
}

fn build_options(names: &BTreeMap<i64, String>) -> Vec<ResponsibleOption> {
    let mut options: Vec<ResponsibleOption> = names
        .iter()
        .map(|(id, name)| ResponsibleOption {
            id: *id,
            label: name.clone(),
        })
        .collect();
    options.sort_by(|a, b| compare_names(&a.label, &b.label));
    options
}

/// Alphabetical order for Russian names: case-insensitive, with `ё` sorted
/// alongside `е`.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

/// First letter of each word, upper-cased; `?` for a blank name.
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}
