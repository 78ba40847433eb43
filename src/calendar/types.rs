use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::TimeOfDay;
use crate::error::{Result, SchedulerError};

/// A bookable service in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>, duration_minutes: u32, color: impl Into<String>) -> Self {
        ServiceDefinition {
            name: name.into(),
            duration_minutes,
            color: color.into(),
            price: None,
            active: true,
        }
    }

    #[cfg(test)]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SchedulerError::malformed("service name is required"));
        }
        if self.duration_minutes == 0 {
            return Err(SchedulerError::malformed(format!(
                "service '{}' must last at least one minute",
                self.name
            )));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(SchedulerError::malformed(format!(
                    "service '{}' has an invalid price",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A pause inside a working day (lunch, cleaning...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Opening window of one weekday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: TimeOfDay,
    pub close: TimeOfDay,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaks: Vec<BreakInterval>,
}

impl DayHours {
    pub fn new(open: TimeOfDay, close: TimeOfDay) -> Self {
        DayHours {
            open,
            close,
            breaks: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_break(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.breaks.push(BreakInterval { start, end });
        self
    }

    /// open < close, every break inside the window, breaks pairwise disjoint.
    pub fn validate(&self) -> Result<()> {
        if self.open >= self.close {
            return Err(SchedulerError::malformed(format!(
                "opening time {} must be before closing time {}",
                self.open, self.close
            )));
        }
        let mut breaks = self.breaks.clone();
        breaks.sort_by_key(|b| b.start);
        for b in &breaks {
            if b.start >= b.end {
                return Err(SchedulerError::malformed(format!(
                    "break {}-{} ends before it starts",
                    b.start, b.end
                )));
            }
            if b.start < self.open || b.end > self.close {
                return Err(SchedulerError::malformed(format!(
                    "break {}-{} is outside {}-{}",
                    b.start, b.end, self.open, self.close
                )));
            }
        }
        for pair in breaks.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(SchedulerError::malformed(format!(
                    "breaks {}-{} and {}-{} overlap",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                )));
            }
        }
        Ok(())
    }
}

/// Weekday (0 = Sunday .. 6 = Saturday) to opening hours; `None` or a missing entry means closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessHours {
    days: BTreeMap<u8, Option<DayHours>>,
}

impl BusinessHours {
    pub fn closed_all_week() -> Self {
        BusinessHours {
            days: (0..7).map(|d| (d, None)).collect(),
        }
    }

    pub fn with_day(mut self, weekday: u8, hours: Option<DayHours>) -> Self {
        self.days.insert(weekday, hours);
        self
    }

    pub fn day(&self, weekday: u8) -> Option<&DayHours> {
        self.days.get(&weekday).and_then(|h| h.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        for (weekday, hours) in &self.days {
            if *weekday > 6 {
                return Err(SchedulerError::malformed(format!(
                    "weekday {} is out of range 0-6",
                    weekday
                )));
            }
            if let Some(hours) = hours {
                hours.validate()?;
            }
        }
        Ok(())
    }
}

/// Dates on which the salon is closed whatever the weekday
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.dates.remove(&date)
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        HolidaySet {
            dates: iter.into_iter().collect(),
        }
    }
}

/// Capacity and timing rules. `max_concurrent_appointments` must always be stated explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policies {
    pub max_concurrent_appointments: u32,
    pub default_duration_minutes: u32,
    #[serde(default)]
    pub buffer_minutes: u32,
}

impl Policies {
    pub fn new(max_concurrent_appointments: u32) -> Self {
        Policies {
            max_concurrent_appointments,
            default_duration_minutes: 30,
            buffer_minutes: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_appointments < 1 {
            return Err(SchedulerError::malformed("capacity must be at least 1"));
        }
        if self.default_duration_minutes == 0 {
            return Err(SchedulerError::malformed("default duration must be at least one minute"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalonInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
}

/// The `businessConfig` collection: everything the calendar model reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessConfig {
    #[serde(default)]
    pub info: SalonInfo,
    pub policies: Policies,
    #[serde(default)]
    pub hours: BusinessHours,
    #[serde(default)]
    pub holidays: HolidaySet,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

impl BusinessConfig {
    /// A closed-all-week salon with no services.
    pub fn new(policies: Policies) -> Self {
        BusinessConfig {
            info: SalonInfo::default(),
            policies,
            hours: BusinessHours::closed_all_week(),
            holidays: HolidaySet::default(),
            services: Vec::new(),
        }
    }

    /// Typical salon week: Mon-Fri 09:00-19:00, Sat 09:00-14:00, three services.
    pub fn starter(capacity: u32) -> Self {
        let nine = TimeOfDay::from_minutes(9 * 60);
        let weekday = TimeOfDay::from_minutes(19 * 60);
        let saturday = TimeOfDay::from_minutes(14 * 60);
        let mut hours = BusinessHours::closed_all_week();
        if let (Some(open), Some(close), Some(sat_close)) = (nine, weekday, saturday) {
            for day in 1..=5 {
                hours = hours.with_day(day, Some(DayHours::new(open, close)));
            }
            hours = hours.with_day(6, Some(DayHours::new(open, sat_close)));
        }
        BusinessConfig {
            hours,
            services: vec![
                ServiceDefinition::new("Corte de Cabello", 30, "#3b82f6"),
                ServiceDefinition::new("Coloración", 90, "#ef4444"),
                ServiceDefinition::new("Peinado", 45, "#10b981"),
            ],
            ..BusinessConfig::new(Policies::new(capacity))
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.policies.validate()?;
        self.hours.validate()?;
        for service in &self.services {
            service.validate()?;
        }
        Ok(())
    }

    /// Replaces the service with the same name or appends a new one.
    pub fn upsert_service(&mut self, service: ServiceDefinition) {
        match self.services.iter_mut().find(|s| s.name == service.name) {
            Some(existing) => *existing = service,
            None => self.services.push(service),
        }
    }
}
