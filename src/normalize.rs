//! Raw task records arrive camelCase or UPPER_SNAKE depending on `select[]`.

use crate::models::{Responsible, Task, TaskStatus};
use serde_json::Value;

/// Status aliases in precedence order. The first one that is present and not
/// `null` decides, even when it fails to parse.
const STATUS_ALIASES: [&str; 5] = ["real_status", "realStatus", "status", "STATUS", "REAL_STATUS"];

pub fn normalize_duration(record: &Value) -> f64 {
    let raw = first_present(record, &["durationPlan", "DURATION_PLAN"]);
    let hours = match raw {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if hours.is_finite() && hours > 0.0 {
        hours
    } else {
        0.0
    }
}

pub fn normalize_status(record: &Value) -> TaskStatus {
    let code = match first_present(record, &STATUS_ALIASES) {
        Some(Value::Number(number)) => number.as_i64().unwrap_or(0),
        Some(Value::String(text)) => parse_leading_int(text).unwrap_or(0),
        _ => 0,
    };
    TaskStatus::from_code(code)
}

/// Canonical integer id. `None` means "absent or unparseable" and is never
/// conflated with a real id of `0`.
pub fn normalize_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn normalize_task(record: &Value) -> Task {
    let responsible = record
        .get("responsible")
        .filter(|value| value.is_object())
        .map(|value| Responsible {
            id: normalize_id(value.get("id")),
            name: string_field(value, &["name"]),
            icon: string_field(value, &["icon"]).filter(|icon| !icon.is_empty()),
        });

    let responsible_id = responsible
        .as_ref()
        .and_then(|r| r.id)
        .or_else(|| normalize_id(first_present(record, &["responsibleId", "RESPONSIBLE_ID"])));

    Task {
        id: normalize_id(first_present(record, &["id", "ID"])),
        title: string_field(record, &["title", "TITLE"]).unwrap_or_default(),
        status: normalize_status(record),
        duration_plan: normalize_duration(record),
        responsible_id,
        responsible,
        start_date_plan: string_field(record, &["startDatePlan", "START_DATE_PLAN"]),
        end_date_plan: string_field(record, &["endDatePlan", "END_DATE_PLAN"]),
        deadline: string_field(record, &["deadline", "DEADLINE"]),
    }
}

fn first_present<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

fn string_field(record: &Value, keys: &[&str]) -> Option<String> {
    match first_present(record, keys)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_durations_normalize_to_zero() {
        assert_eq!(normalize_duration(&json!({})), 0.0);
        assert_eq!(normalize_duration(&json!({ "durationPlan": null })), 0.0);
        assert_eq!(normalize_duration(&json!({ "durationPlan": "" })), 0.0);
        assert_eq!(normalize_duration(&json!({ "durationPlan": "abc" })), 0.0);
        assert_eq!(normalize_duration(&json!({ "durationPlan": "-4" })), 0.0);
        assert_eq!(normalize_duration(&json!({ "durationPlan": [1] })), 0.0);
    }

    #[test]
    fn numeric_durations_parse() {
        assert_eq!(normalize_duration(&json!({ "durationPlan": "12.5" })), 12.5);
        assert_eq!(normalize_duration(&json!({ "durationPlan": 8 })), 8.0);
        assert_eq!(normalize_duration(&json!({ "DURATION_PLAN": " 3 " })), 3.0);
    }

    #[test]
    fn first_status_alias_wins() {
        let record = json!({ "real_status": 3, "status": "9" });
        assert_eq!(normalize_status(&record), TaskStatus::InProgress);

        let upper = json!({ "STATUS": "2", "REAL_STATUS": "5" });
        assert_eq!(normalize_status(&upper), TaskStatus::Pending);

        let null_skipped = json!({ "real_status": null, "realStatus": "5" });
        assert_eq!(normalize_status(&null_skipped), TaskStatus::Completed);
    }

    #[test]
    fn unparseable_or_unknown_status_is_zero() {
        assert_eq!(normalize_status(&json!({})).code(), 0);
        assert_eq!(normalize_status(&json!({ "status": "x" })).code(), 0);
        // a present but broken alias does not fall through to the next one
        assert_eq!(normalize_status(&json!({ "status": "x", "STATUS": "3" })).code(), 0);
        assert_eq!(normalize_status(&json!({ "status": 99 })).code(), 0);
    }

    #[test]
    fn ids_distinguish_absent_from_zero() {
        assert_eq!(normalize_id(Some(&json!("42"))), Some(42));
        assert_eq!(normalize_id(Some(&json!(7))), Some(7));
        assert_eq!(normalize_id(Some(&json!(0))), Some(0));
        assert_eq!(normalize_id(Some(&json!("abc"))), None);
        assert_eq!(normalize_id(Some(&json!(null))), None);
        assert_eq!(normalize_id(None), None);
    }

    #[test]
    fn task_reads_camel_and_upper_snake_shapes() {
        let camel = normalize_task(&json!({
            "id": "15",
            "title": "Деталь фр.",
            "realStatus": "3",
            "durationPlan": "4.5",
            "responsible": { "id": "7", "name": "Иванов", "icon": "/i.png" },
            "endDatePlan": "2025-08-08T18:00:00+03:00"
        }));
        assert_eq!(camel.id, Some(15));
        assert_eq!(camel.title, "Деталь фр.");
        assert_eq!(camel.status, TaskStatus::InProgress);
        assert_eq!(camel.duration_plan, 4.5);
        assert_eq!(camel.responsible_id, Some(7));
        assert_eq!(camel.responsible_name(), Some("Иванов"));

        let upper = normalize_task(&json!({
            "ID": 16,
            "TITLE": "Вал ток.",
            "STATUS": "2",
            "RESPONSIBLE_ID": "9",
            "DEADLINE": "2025-08-09T18:00:00+03:00"
        }));
        assert_eq!(upper.id, Some(16));
        assert_eq!(upper.title, "Вал ток.");
        assert_eq!(upper.responsible_id, Some(9));
        assert!(upper.responsible.is_none());
        assert_eq!(upper.deadline.as_deref(), Some("2025-08-09T18:00:00+03:00"));
    }

    #[test]
    fn normalization_is_deterministic() {
        let record = json!({ "id": "x", "durationPlan": "abc", "status": "?" });
        assert_eq!(normalize_task(&record), normalize_task(&record));
    }
}
