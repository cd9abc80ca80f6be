// src/clock.rs
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Source of "now" for ID generation, "today" lookups and the seed.
/// The system clock in production, a settable fixed clock in tests.
#[derive(Clone, Default)]
pub struct Clock {
    fixed: Option<Arc<Mutex<NaiveDateTime>>>,
}

impl Clock {
    pub fn system() -> Self {
        Self { fixed: None }
    }

    pub fn fixed(datetime_str: &str) -> Result<Self, chrono::ParseError> {
        let dt = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")?;
        Ok(Self {
            fixed: Some(Arc::new(Mutex::new(dt))),
        })
    }

    pub fn set_time(&self, datetime_str: &str) -> Result<(), chrono::ParseError> {
        let dt = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")?;
        if let Some(fixed) = &self.fixed {
            *fixed.lock().unwrap_or_else(|e| e.into_inner()) = dt;
        }
        Ok(())
    }

    pub fn now_dt(&self) -> NaiveDateTime {
        match &self.fixed {
            Some(fixed) => *fixed.lock().unwrap_or_else(|e| e.into_inner()),
            None => Local::now().naive_local(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now_dt().date()
    }

    pub fn now_millis(&self) -> i64 {
        self.now_dt().and_utc().timestamp_millis()
    }

    /// `<prefix>_<millis>`, bumped until it does not collide with `taken`.
    pub fn generate_id<'a, I>(&self, prefix: &str, taken: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let taken: HashSet<&str> = taken.into_iter().collect();
        let mut stamp = self.now_millis();
        loop {
            let candidate = format!("{}_{}", prefix, stamp);
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            stamp += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_configured_day() {
        let clock = Clock::fixed("2024-02-29 08:30:00").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        clock.set_time("2024-03-01 00:00:00").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn generated_ids_skip_taken_values() {
        let clock = Clock::fixed("2024-01-01 00:00:00").unwrap();
        let first = clock.generate_id("pr", std::iter::empty());
        let second = clock.generate_id("pr", [first.as_str()]);

        assert!(first.starts_with("pr_"));
        assert_ne!(first, second);
    }
}
