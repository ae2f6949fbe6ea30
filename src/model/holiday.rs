use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HolidayKind {
    National,
    Religious,
    State,
    Public,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Holiday {
    #[schema(example = "2026-01-26", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Republic Day")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HolidayKind,
}

/// Read-only source of public holidays.
pub trait HolidayCalendar: Send + Sync {
    /// Holidays with `start <= date <= end`, ordered by date.
    fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Holiday>;
}

pub struct StaticHolidays {
    entries: Vec<Holiday>,
}

static BUILTIN: Lazy<Vec<Holiday>> = Lazy::new(|| {
    use HolidayKind::*;
    let table: &[(&str, &str, HolidayKind)] = &[
        ("2025-01-26", "Republic Day", National),
        ("2025-03-14", "Holi", Religious),
        ("2025-03-31", "Eid ul-Fitr", Religious),
        ("2025-04-10", "Mahavir Jayanti", Religious),
        ("2025-04-14", "Ambedkar Jayanti", National),
        ("2025-04-18", "Good Friday", Religious),
        ("2025-05-01", "Gujarat Day", State),
        ("2025-05-12", "Buddha Purnima", Religious),
        ("2025-06-07", "Eid ul-Adha", Religious),
        ("2025-08-15", "Independence Day", National),
        ("2025-08-16", "Parsi New Year", Religious),
        ("2025-08-27", "Janmashtami", Religious),
        ("2025-09-06", "Ganesh Chaturthi", Religious),
        ("2025-10-02", "Gandhi Jayanti", National),
        ("2025-10-02", "Dussehra", Religious),
        ("2025-10-21", "Diwali", Religious),
        ("2025-10-22", "Gujarati New Year", State),
        ("2025-11-05", "Guru Nanak Jayanti", Religious),
        ("2025-12-25", "Christmas", Religious),
        ("2026-01-26", "Republic Day", National),
        ("2026-03-03", "Holi", Religious),
        ("2026-03-21", "Eid ul-Fitr", Religious),
        ("2026-03-30", "Mahavir Jayanti", Religious),
        ("2026-04-03", "Good Friday", Religious),
        ("2026-04-14", "Ambedkar Jayanti", National),
        ("2026-05-01", "Gujarat Day", State),
        ("2026-05-28", "Eid ul-Adha", Religious),
        ("2026-05-31", "Buddha Purnima", Religious),
        ("2026-08-05", "Parsi New Year", Religious),
        ("2026-08-15", "Independence Day", National),
        ("2026-08-15", "Janmashtami", Religious),
        ("2026-08-25", "Ganesh Chaturthi", Religious),
        ("2026-09-21", "Dussehra", Religious),
        ("2026-10-02", "Gandhi Jayanti", National),
        ("2026-10-09", "Diwali", Religious),
        ("2026-10-10", "Gujarati New Year", State),
        ("2026-11-24", "Guru Nanak Jayanti", Religious),
        ("2026-12-25", "Christmas", Religious),
    ];

    table
        .iter()
        .filter_map(|(date, name, kind)| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .map(|date| Holiday {
                    date,
                    name: name.to_string(),
                    kind: *kind,
                })
        })
        .collect()
});

impl StaticHolidays {
    pub fn new(mut entries: Vec<Holiday>) -> Self {
        entries.sort_by_key(|h| h.date);
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN.clone())
    }

    /// Loads a JSON array of `{date, name, type}` objects.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading holiday file {}", path.display()))?;
        let entries: Vec<Holiday> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing holiday file {}", path.display()))?;
        Ok(Self::new(entries))
    }
}

impl HolidayCalendar for StaticHolidays {
    fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Holiday> {
        self.entries
            .iter()
            .filter(|h| start <= h.date && h.date <= end)
            .cloned()
            .collect()
    }
}
