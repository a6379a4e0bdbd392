use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive calendar window a traveler is available to depart in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// Number of days in the window, inclusive of both endpoints.
    pub fn span_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Intersection of two windows, if they share at least one day.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        if from <= to {
            Some(DateRange { from, to })
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.intersect(other).is_some()
    }
}

/// A traveler's per-person budget window. Either bound may be absent,
/// meaning unbounded on that side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BudgetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl BudgetRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min >= 0.0 && min <= max,
            (Some(min), None) => min >= 0.0,
            (None, Some(max)) => max >= 0.0,
            (None, None) => true,
        }
    }

    /// Whether two budget windows admit a common price point.
    pub fn overlaps(&self, other: &BudgetRange) -> bool {
        let low = self.min.unwrap_or(0.0).max(other.min.unwrap_or(0.0));
        let high = self
            .max
            .unwrap_or(f64::INFINITY)
            .min(other.max.unwrap_or(f64::INFINITY));
        low <= high
    }
}
