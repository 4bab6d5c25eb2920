//! Recurring payment details: frequency, day of month, service

use regex::Regex;

use bank_assistant_config::domain::{FrequencyPattern, ServiceEntry};
use bank_assistant_core::Frequency;

use crate::error::Result;
use crate::pattern;

pub struct ScheduleExtractor {
    frequencies: Vec<(Regex, Frequency)>,
    exact_date: Vec<Regex>,
    services: Vec<(Regex, String)>,
}

impl ScheduleExtractor {
    pub fn from_config(
        frequencies: &[FrequencyPattern],
        exact_date: &[String],
        services: &[ServiceEntry],
    ) -> Result<Self> {
        let frequencies = frequencies
            .iter()
            .map(|f| Ok((pattern::compile(&f.pattern)?, f.value)))
            .collect::<Result<Vec<_>>>()?;
        let services = services
            .iter()
            .map(|s| Ok((pattern::literal_word(&s.key)?, s.name.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            frequencies,
            exact_date: pattern::compile_all(exact_date)?,
            services,
        })
    }

    pub fn frequency(&self, text: &str) -> Option<Frequency> {
        self.frequencies
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, f)| *f)
    }

    /// Day of month as written; range checking is left to validation
    pub fn exact_date(&self, text: &str) -> Option<i64> {
        self.exact_date.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.name("value"))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    /// Display name of a recurring-payment service
    pub fn service(&self, text: &str) -> Option<&str> {
        self.services
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, name)| name.as_str())
    }
}
