use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Protocol,
    Error,
    Context,
    Performance,
}

impl std::fmt::Display for TestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestCategory::Protocol => "protocol",
            TestCategory::Error => "error",
            TestCategory::Context => "context",
            TestCategory::Performance => "performance",
        };
        write!(f, "{}", s)
    }
}

/// Immutable once registered; drives one `TestResult` when executed.
#[derive(Debug, Clone)]
pub struct ConformanceTestCase {
    pub name: String,
    pub category: TestCategory,
    pub timeout: std::time::Duration,
    pub filter: Option<String>,
    pub required_methods: Vec<String>,
}

impl ConformanceTestCase {
    pub fn new(name: impl Into<String>, category: TestCategory) -> Self {
        ConformanceTestCase {
            name: name.into(),
            category,
            timeout: std::time::Duration::from_secs(10),
            filter: None,
            required_methods: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_required_methods(mut self, methods: &[&str]) -> Self {
        self.required_methods = methods.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether this case's name matches an optional filter regex.
    pub fn matches_filter(&self, pattern: &regex::Regex) -> bool {
        pattern.is_match(&self.name)
    }
}

/// Immutable once execution finishes. `Error` indicates an
/// infrastructure/crash condition, never an assertion failure (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Skip => "skip",
            TestStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub category: TestCategory,
    pub status: TestStatus,
    pub duration: std::time::Duration,
    pub error: Option<String>,
}

impl TestResult {
    pub fn pass(name: impl Into<String>, category: TestCategory, duration: std::time::Duration) -> Self {
        TestResult { name: name.into(), category, status: TestStatus::Pass, duration, error: None }
    }

    pub fn fail(
        name: impl Into<String>,
        category: TestCategory,
        duration: std::time::Duration,
        reason: impl Into<String>,
    ) -> Self {
        TestResult {
            name: name.into(),
            category,
            status: TestStatus::Fail,
            duration,
            error: Some(reason.into()),
        }
    }

    pub fn error(
        name: impl Into<String>,
        category: TestCategory,
        duration: std::time::Duration,
        reason: impl Into<String>,
    ) -> Self {
        TestResult {
            name: name.into(),
            category,
            status: TestStatus::Error,
            duration,
            error: Some(reason.into()),
        }
    }

    pub fn skip(name: impl Into<String>, category: TestCategory, reason: impl Into<String>) -> Self {
        TestResult {
            name: name.into(),
            category,
            status: TestStatus::Skip,
            duration: std::time::Duration::ZERO,
            error: Some(reason.into()),
        }
    }
}
