//! Transaction history query extraction
//!
//! Result count, transaction type and period. Periods are expressed in the
//! bank's local time: an explicit `DD/MM/YYYY` date, a French month name,
//! or by default the current month up to now.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};
use regex::Regex;

use bank_assistant_config::domain::HistoryPatterns;
use bank_assistant_core::{Parameters, Slot};

use crate::error::{Result, TextProcessingError};
use crate::pattern;

pub struct HistoryExtractor {
    count_patterns: Vec<Regex>,
    single_patterns: Vec<Regex>,
    date_pattern: Regex,
    month_pattern: Regex,
    months: Vec<(String, u32)>,
    types: Vec<(Regex, String)>,
    default_limit: i64,
    max_limit: i64,
    min_year: i32,
}

impl HistoryExtractor {
    pub fn from_config(config: &HistoryPatterns) -> Result<Self> {
        if config.months.is_empty() {
            return Err(TextProcessingError::InvalidConfig(
                "history.months is empty".to_string(),
            ));
        }
        let names: Vec<String> = config.months.keys().map(|m| regex::escape(m)).collect();
        let month_pattern = pattern::compile(&format!(
            r"\b(?:mois\s+d[e']\s*)?(?P<month>{})(?:\s+(?P<year>\d{{4}}))?\b",
            names.join("|")
        ))?;

        let types = config
            .transaction_types
            .iter()
            .map(|t| Ok((pattern::compile(&t.pattern)?, t.value.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            count_patterns: pattern::compile_all(&config.count_patterns)?,
            single_patterns: pattern::compile_all(&config.single_patterns)?,
            date_pattern: pattern::compile(&config.date_pattern)?,
            month_pattern,
            months: config.months.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            types,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            min_year: config.min_year,
        })
    }

    pub fn default_limit(&self) -> i64 {
        self.default_limit
    }

    pub fn max_limit(&self) -> i64 {
        self.max_limit
    }

    /// Fill `params` with history slots found in `text`
    pub fn extract(&self, text: &str, now: DateTime<FixedOffset>, params: &mut Parameters) {
        match self.requested_count(text) {
            Some(count) => {
                params.insert(Slot::Limit, count);
                params.insert(Slot::UserRequestedCount, true);
            }
            None => params.insert(Slot::Limit, self.default_limit),
        }

        if let Some(kind) = self
            .types
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, v)| v.clone())
        {
            params.insert(Slot::TransactionType, kind);
        }

        let offset = *now.offset();
        if let Some((start, end)) = self.specific_date(text, offset) {
            params.insert(Slot::StartDate, start);
            params.insert(Slot::EndDate, end);
            params.insert(Slot::SpecificDate, true);
        } else if let Some((start, end, name)) = self.month_period(text, now) {
            params.insert(Slot::StartDate, start);
            params.insert(Slot::EndDate, end);
            params.insert(Slot::PeriodName, name);
        } else if let Some(start) = day_start(offset, now.date_naive().with_day(1)) {
            params.insert(Slot::StartDate, start);
            params.insert(Slot::EndDate, now);
        }
    }

    /// Count as written, unclamped
    fn requested_count(&self, text: &str) -> Option<i64> {
        if self.single_patterns.iter().any(|re| re.is_match(text)) {
            return Some(1);
        }
        self.count_patterns.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.name("value"))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    fn specific_date(
        &self,
        text: &str,
        offset: FixedOffset,
    ) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let caps = self.date_pattern.captures(text)?;
        let day: u32 = caps.name("day")?.as_str().parse().ok()?;
        let month: u32 = caps.name("month")?.as_str().parse().ok()?;
        let year: i32 = caps.name("year")?.as_str().parse().ok()?;
        if year < self.min_year {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some((day_start(offset, Some(date))?, day_end(offset, Some(date))?))
    }

    fn month_period(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>, String)> {
        let caps = self.month_pattern.captures(text)?;
        let name = caps.name("month")?.as_str().to_lowercase();
        let month = self.months.iter().find(|(m, _)| *m == name)?.1;
        let year = caps
            .name("year")
            .and_then(|y| y.as_str().parse().ok())
            .filter(|y| *y >= self.min_year)
            .unwrap_or_else(|| now.year());

        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let offset = *now.offset();
        Some((
            day_start(offset, Some(first))?,
            day_end(offset, next.pred_opt())?,
            format!("{} {}", name, year),
        ))
    }
}

fn day_start(offset: FixedOffset, date: Option<NaiveDate>) -> Option<DateTime<FixedOffset>> {
    let naive = date?.and_hms_opt(0, 0, 0)?;
    offset.from_local_datetime(&naive).single()
}

fn day_end(offset: FixedOffset, date: Option<NaiveDate>) -> Option<DateTime<FixedOffset>> {
    let naive = date?.and_hms_opt(23, 59, 59)?;
    offset.from_local_datetime(&naive).single()
}
