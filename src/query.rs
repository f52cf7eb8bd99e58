use chrono::{Local, NaiveDate, NaiveTime, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Filter, projection and ordering of one logical fetch. The paginator passes
/// these through untouched; only the `start` offset is added per page.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    label: String,
    params: Vec<(String, String)>,
}

impl TaskQuery {
    /// `label` names the fetch in logs and in the error surfaced on failure.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            params: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// `filter[FIELD]=value`
    pub fn filter(self, field: &str, value: impl ToString) -> Self {
        self.param(format!("filter[{field}]"), value)
    }

    /// `filter[>=FIELD]=value`
    pub fn filter_ge(self, field: &str, value: impl ToString) -> Self {
        self.param(format!("filter[>={field}]"), value)
    }

    /// `filter[<=FIELD]=value`
    pub fn filter_le(self, field: &str, value: impl ToString) -> Self {
        self.param(format!("filter[<={field}]"), value)
    }

    /// `filter[!FIELD]=value`
    pub fn filter_not(self, field: &str, value: impl ToString) -> Self {
        self.param(format!("filter[!{field}]"), value)
    }

    /// Repeated `filter[FIELD][]` keys, matched as "any of".
    pub fn filter_any<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self = self.param(format!("filter[{field}][]"), value);
        }
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self = self.param("select[]".to_string(), field.as_ref());
        }
        self
    }

    pub fn order(self, field: &str, direction: SortDirection) -> Self {
        self.param(format!("order[{field}]"), direction.as_str())
    }

    /// Inclusive day range on `lower_field`/`upper_field`. Bounds are swapped
    /// when given in reverse order.
    pub fn date_range(
        self,
        lower_field: &str,
        upper_field: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Self {
        let (from, to) = ordered_range(from, to);
        let mut query = self;
        if let Some(line) = from.and_then(|day| range_bound(day, Bound::Lower, &Local)) {
            query = query.filter_ge(lower_field, line);
        }
        if let Some(line) = to.and_then(|day| range_bound(day, Bound::Upper, &Local)) {
            query = query.filter_le(upper_field, line);
        }
        query
    }

    fn param(mut self, key: String, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

pub fn ordered_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match (from, to) {
        (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
        other => other,
    }
}

/// `YYYY-MM-DDTHH:mm:ss±hh:mm` for the start (00:00:00) or end (23:59:59) of
/// `day` in `tz`. `None` when that wall-clock time does not exist in `tz`.
pub fn range_bound<Tz: TimeZone>(day: NaiveDate, bound: Bound, tz: &Tz) -> Option<String> {
    let time = match bound {
        Bound::Lower => NaiveTime::from_hms_opt(0, 0, 0)?,
        Bound::Upper => NaiveTime::from_hms_opt(23, 59, 59)?,
    };
    let local = tz.from_local_datetime(&day.and_time(time)).earliest()?;
    Some(local.fixed_offset().format("%Y-%m-%dT%H:%M:%S%:z").to_string())
}

/// Parses a `YYYY-MM-DD` form value; blank or invalid input means "no bound".
pub fn parse_day(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
