//! Flexible genealogy dates.
//!
//! # Responsibility
//! - Represent partial, qualified dates recorded in solar or lunar calendars.
//! - Define the calendar conversion boundary; no calendar math lives here.
//!
//! # Invariants
//! - `calendar_type` decides which field group (solar or lunar) is
//!   authoritative.
//! - A non-blank `display_string` overrides the structured fields for display.

use serde::{Deserialize, Serialize};

/// Calendar whose fields are authoritative for one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarType {
    #[default]
    Solar,
    Lunar,
}

/// Precision qualifier attached to a recorded date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateQualifier {
    #[default]
    Exact,
    About,
    Before,
    After,
}

/// Solar (Gregorian) date parts. Month and day may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarDate {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

/// Lunar date parts. Month and day may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarDate {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub leap_month: bool,
}

/// External calendar conversion collaborator.
///
/// Implementations are pure functions; `None` means the date cannot be
/// converted (for example, a partial date the converter does not support).
pub trait CalendarConverter {
    fn solar_to_lunar(&self, date: SolarDate) -> Option<LunarDate>;
    fn lunar_to_solar(&self, date: LunarDate) -> Option<SolarDate>;
}

/// Partial, calendar-aware, qualified date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexibleDate {
    pub calendar_type: CalendarType,
    pub solar_year: Option<i32>,
    pub solar_month: Option<u8>,
    pub solar_day: Option<u8>,
    pub lunar_year: Option<i32>,
    pub lunar_month: Option<u8>,
    pub lunar_day: Option<u8>,
    pub lunar_leap_month: bool,
    pub qualifier: DateQualifier,
    /// Free-text rendering that wins over structured fields when non-blank.
    pub display_string: Option<String>,
    pub note: Option<String>,
}

impl FlexibleDate {
    /// Year-only solar date.
    pub fn solar_year(year: i32) -> Self {
        Self {
            solar_year: Some(year),
            ..Self::default()
        }
    }

    pub fn solar(year: i32, month: Option<u8>, day: Option<u8>) -> Self {
        Self {
            solar_year: Some(year),
            solar_month: month,
            solar_day: day,
            ..Self::default()
        }
    }

    pub fn lunar(year: i32, month: Option<u8>, day: Option<u8>) -> Self {
        Self {
            calendar_type: CalendarType::Lunar,
            lunar_year: Some(year),
            lunar_month: month,
            lunar_day: day,
            ..Self::default()
        }
    }

    pub fn with_qualifier(mut self, qualifier: DateQualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    /// Authoritative year, falling back to the other calendar's year.
    ///
    /// Solar and lunar years differ by at most one around new year, which is
    /// close enough for plausibility checks.
    pub fn year(&self) -> Option<i32> {
        match self.calendar_type {
            CalendarType::Solar => self.solar_year.or(self.lunar_year),
            CalendarType::Lunar => self.lunar_year.or(self.solar_year),
        }
    }

    /// Returns whether no structured or free-text value is present.
    pub fn is_empty(&self) -> bool {
        self.solar_year.is_none()
            && self.lunar_year.is_none()
            && self.solar_month.is_none()
            && self.lunar_month.is_none()
            && self
                .display_string
                .as_deref()
                .map_or(true, |value| value.trim().is_empty())
    }

    /// Human-readable rendering, `dd/mm/yyyy` of the authoritative calendar.
    pub fn display(&self) -> String {
        if let Some(display) = self.display_string.as_deref() {
            if !display.trim().is_empty() {
                return display.trim().to_string();
            }
        }

        let (year, month, day) = match self.calendar_type {
            CalendarType::Solar => (self.solar_year, self.solar_month, self.solar_day),
            CalendarType::Lunar => (self.lunar_year, self.lunar_month, self.lunar_day),
        };

        let mut parts = Vec::new();
        if let Some(day) = day {
            parts.push(format!("{day:02}"));
        }
        if let Some(month) = month {
            parts.push(format!("{month:02}"));
        }
        if let Some(year) = year {
            parts.push(year.to_string());
        }
        if parts.is_empty() {
            return String::new();
        }

        let mut rendered = match self.qualifier {
            DateQualifier::Exact => String::new(),
            DateQualifier::About => "about ".to_string(),
            DateQualifier::Before => "before ".to_string(),
            DateQualifier::After => "after ".to_string(),
        };
        rendered.push_str(&parts.join("/"));
        if self.calendar_type == CalendarType::Lunar {
            if self.lunar_leap_month {
                rendered.push_str(" (lunar, leap month)");
            } else {
                rendered.push_str(" (lunar)");
            }
        }
        rendered
    }

    /// Fills the non-authoritative calendar fields through `converter`.
    ///
    /// The authoritative side is never modified. When the converter cannot
    /// handle the date, the value is returned unchanged.
    pub fn complete_with(&self, converter: &dyn CalendarConverter) -> Self {
        let mut completed = self.clone();
        match self.calendar_type {
            CalendarType::Solar => {
                let Some(year) = self.solar_year else {
                    return completed;
                };
                let solar = SolarDate {
                    year,
                    month: self.solar_month,
                    day: self.solar_day,
                };
                if let Some(lunar) = converter.solar_to_lunar(solar) {
                    completed.lunar_year = Some(lunar.year);
                    completed.lunar_month = lunar.month;
                    completed.lunar_day = lunar.day;
                    completed.lunar_leap_month = lunar.leap_month;
                }
            }
            CalendarType::Lunar => {
                let Some(year) = self.lunar_year else {
                    return completed;
                };
                let lunar = LunarDate {
                    year,
                    month: self.lunar_month,
                    day: self.lunar_day,
                    leap_month: self.lunar_leap_month,
                };
                if let Some(solar) = converter.lunar_to_solar(lunar) {
                    completed.solar_year = Some(solar.year);
                    completed.solar_month = solar.month;
                    completed.solar_day = solar.day;
                }
            }
        }
        completed
    }
}
