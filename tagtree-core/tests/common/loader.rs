//! Fixture loading from YAML files

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    pub input: String,
    #[serde(default)]
    pub rules: Option<RuleConfig>,
    pub events: Vec<ExpectedEvent>,
}

/// Tag syntax rules for a case: a preset name (`html`, `strict_xml`) or a
/// map from tag name to allowed close modes. The key `*` sets the default.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleConfig {
    Preset(String),
    Tags(BTreeMap<String, Vec<String>>),
}

/// Expected outline event - either a bare name or [name, content]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExpectedEvent {
    /// Event with no content (End)
    Bare(String),
    /// Content event [EventName, "content"]
    WithContent(String, String),
}

impl ExpectedEvent {
    pub fn name(&self) -> &str {
        match self {
            ExpectedEvent::Bare(name) => name,
            ExpectedEvent::WithContent(name, _) => name,
        }
    }

    pub fn is_error(&self) -> bool {
        self.name() == "Error"
    }
}

impl TestCase {
    /// Error cases expect exactly one `[Error, Code]` event.
    pub fn expects_error(&self) -> bool {
        self.events.iter().any(ExpectedEvent::is_error)
    }
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}
