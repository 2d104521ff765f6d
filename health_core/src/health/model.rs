//! Result model shared by procedures, registries and the reporting endpoint

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Up => write!(f, "UP"),
            HealthStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// The independent aggregation groups a procedure can be registered under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Liveness,
    Readiness,
}

impl Category {
    /// Fixed order used whenever more than one registry is locked at once.
    pub const ALL: [Category; 3] = [Category::General, Category::Liveness, Category::Readiness];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Liveness => "liveness",
            Category::Readiness => "readiness",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl std::fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown health category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" | "health" => Ok(Category::General),
            "live" | "liveness" => Ok(Category::Liveness),
            "ready" | "readiness" => Ok(Category::Readiness),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Scalar payload attached to a check result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DataValue {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Flag(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Number(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Number(value.into())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, DataValue>,
}

impl CheckResult {
    pub fn named(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            data: BTreeMap::new(),
        }
    }

    pub fn up(name: impl Into<String>) -> Self {
        Self::named(name, HealthStatus::Up)
    }

    pub fn down(name: impl Into<String>) -> Self {
        Self::named(name, HealthStatus::Down)
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Combined verdict for one aggregate call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateReport {
    pub status: HealthStatus,
    pub checks: Vec<CheckResult>,
}

impl AggregateReport {
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Up,
            checks: Vec::new(),
        }
    }

    /// Appends a result; any DOWN result turns the whole report DOWN.
    pub fn add_check(&mut self, result: CheckResult) {
        if result.status == HealthStatus::Down {
            self.status = HealthStatus::Down;
        }
        self.checks.push(result);
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    pub fn find(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }
}

impl Default for AggregateReport {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<CheckResult> for AggregateReport {
    fn from_iter<I: IntoIterator<Item = CheckResult>>(iter: I) -> Self {
        let mut report = AggregateReport::new();
        for result in iter {
            report.add_check(result);
        }
        report
    }
}
