//! Statistics query parameters and results.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::normalize_health_plan;

/// Sentinel label meaning "no filter" in selection lists.
pub const ALL: &str = "All";

/// A filter that is either unset or pinned to one value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Interpret a selection-list label. `"All"` and blank mean no filter;
    /// any other label is kept exactly as given.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == ALL {
            Selection::All
        } else {
            Selection::Only(label.to_string())
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(value) => Some(value),
        }
    }
}

/// Date range plus optional patient and health-plan filters.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    /// First day included
    pub start: NaiveDate,
    /// Last day included
    pub end: NaiveDate,
    pub patient: Selection,
    pub health_plan: Selection,
}

impl StatsQuery {
    /// Unfiltered query over `[start, end]`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            patient: Selection::All,
            health_plan: Selection::All,
        }
    }

    pub fn for_patient(mut self, name: &str) -> Self {
        self.patient = Selection::from_label(name);
        self
    }

    pub fn for_health_plan(mut self, plan: &str) -> Self {
        self.health_plan = Selection::from_label(plan);
        self
    }

    /// Health-plan filter in stored (upper-case) form.
    pub(crate) fn normalized_health_plan(&self) -> Option<String> {
        normalize_health_plan(self.health_plan.value())
    }
}

/// Appointment counts and therapist income for a period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncomeStatistics {
    /// Appointments matching the query
    pub total_appointments: u64,
    /// Appointment count per health plan; `None` groups patients without one
    pub by_health_plan: BTreeMap<Option<String>, u64>,
    /// Σ clinic_value × therapist_percentage / 100 over linked appointments
    pub therapist_income: f64,
    /// Appointments in range whose patient no longer exists. Counted in the
    /// total but excluded from the breakdown and from income.
    pub unlinked_appointments: u64,
}

impl IncomeStatistics {
    /// `"PLAN: n, PLAN: n"`, or `"None"` when there is no breakdown.
    pub fn plan_summary(&self) -> String {
        if self.by_health_plan.is_empty() {
            return "None".to_string();
        }
        self.by_health_plan
            .iter()
            .map(|(plan, count)| format!("{}: {}", plan.as_deref().unwrap_or("None"), count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render an amount as Brazilian reais, e.g. `R$ 90.00`.
pub fn format_currency(amount: f64) -> String {
    format!("R$ {:.2}", amount)
}
