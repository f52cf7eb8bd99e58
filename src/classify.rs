//! Bucketing of task durations.

use crate::models::Task;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const OTHER_LABEL: &str = "Прочие";
pub const OTHER_COLOR: &str = "#9E9E9E";

#[derive(Clone)]
pub enum Matcher {
    /// Case-insensitive substring of the title.
    TitleContains(String),
    ResponsibleIn(BTreeSet<i64>),
    Predicate(Arc<dyn Fn(&Task) -> bool + Send + Sync>),
}

impl Matcher {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::TitleContains(marker) => task.title.to_lowercase().contains(&marker.to_lowercase()),
            Self::ResponsibleIn(ids) => task.responsible_id.is_some_and(|id| ids.contains(&id)),
            Self::Predicate(predicate) => predicate(task),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleContains(marker) => f.debug_tuple("TitleContains").field(marker).finish(),
            Self::ResponsibleIn(ids) => f.debug_tuple("ResponsibleIn").field(ids).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BucketDef {
    pub label: String,
    pub color: String,
    pub matcher: Matcher,
    /// People sharing the bucket's work; `0` is treated as `1`.
    pub headcount: u32,
}

impl BucketDef {
    pub fn new(label: impl Into<String>, color: impl Into<String>, matcher: Matcher) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
            matcher,
            headcount: 1,
        }
    }

    pub fn title_marker(label: impl Into<String>, color: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::new(label, color, Matcher::TitleContains(marker.into()))
    }

    pub fn with_headcount(mut self, headcount: u32) -> Self {
        self.headcount = headcount;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationBucket {
    pub label: String,
    pub color: String,
    pub total_hours: f64,
    pub headcount: u32,
}

impl AggregationBucket {
    pub fn per_person_hours(&self) -> f64 {
        per_person(self.total_hours, self.headcount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub total_hours: f64,
    pub buckets: Vec<AggregationBucket>,
    pub other: AggregationBucket,
    /// Sub-fetch records whose id is absent from the base set.
    pub inconsistent_records: usize,
}

impl Aggregation {
    pub fn all_buckets(&self) -> impl Iterator<Item = &AggregationBucket> {
        self.buckets.iter().chain(std::iter::once(&self.other))
    }
}

pub fn per_person(hours: f64, headcount: u32) -> f64 {
    hours / f64::from(headcount.max(1))
}

pub fn total_duration<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> f64 {
    tasks.into_iter().map(|task| task.duration_plan).sum()
}

pub fn classify_by_match(base: &[Task], defs: &[BucketDef], other_headcount: u32) -> Aggregation {
    let buckets = defs
        .iter()
        .map(|def| bucket(def, total_duration(base.iter().filter(|t| def.matcher.matches(t)))))
        .collect();

    let other_hours = total_duration(
        base.iter()
            .filter(|task| !defs.iter().any(|def| def.matcher.matches(task))),
    );

    Aggregation {
        total_hours: total_duration(base),
        buckets,
        other: other_bucket(other_hours, other_headcount),
        inconsistent_records: 0,
    }
}

// Base records without an id can never be claimed and land in "other".
pub fn classify_by_id_sets(
    base: &[Task],
    named: &[(BucketDef, Vec<Task>)],
    other_headcount: u32,
) -> Aggregation {
    let base_ids: HashSet<i64> = base.iter().filter_map(|task| task.id).collect();

    let mut claimed = HashSet::new();
    let mut inconsistent_records = 0;
    let mut buckets = Vec::with_capacity(named.len());

    for (def, tasks) in named {
        for id in tasks.iter().filter_map(|task| task.id) {
            if !base_ids.contains(&id) {
                inconsistent_records += 1;
            }
            claimed.insert(id);
        }
        buckets.push(bucket(def, total_duration(tasks)));
    }

    if inconsistent_records > 0 {
        warn!("{inconsistent_records} sub-fetch records are missing from the base set");
    }

    let other_hours = total_duration(
        base.iter()
            .filter(|task| task.id.is_none_or(|id| !claimed.contains(&id))),
    );

    Aggregation {
        total_hours: total_duration(base),
        buckets,
        other: other_bucket(other_hours, other_headcount),
        inconsistent_records,
    }
}

fn bucket(def: &BucketDef, total_hours: f64) -> AggregationBucket {
    AggregationBucket {
        label: def.label.clone(),
        color: def.color.clone(),
        total_hours,
        headcount: def.headcount,
    }
}

fn other_bucket(total_hours: f64, headcount: u32) -> AggregationBucket {
    AggregationBucket {
        label: OTHER_LABEL.to_string(),
        color: OTHER_COLOR.to_string(),
        total_hours,
        headcount,
    }
}
