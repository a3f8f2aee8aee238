//! Rules file (recolour.yaml) parsing.
//!
//! The rules file holds the ordered rule list plus engine and preview
//! settings. YAML is the default; files ending in `.json` are read as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{Slicing, DEFAULT_CHUNK_PIXELS};
use crate::error::{RecolourError, Result};
use crate::types::{ColourRule, RuleList};

/// Rules file looked up in the working directory.
pub const RULES_FILENAME: &str = "recolour.yaml";

/// Contents of a rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesFile {
    /// Rules in priority order.
    pub rules: Vec<ColourRule>,

    /// Pixels processed per incremental step.
    #[serde(default = "default_chunk_pixels")]
    pub chunk_pixels: usize,

    /// Quiet period after an edit before the preview re-runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default output path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

fn default_chunk_pixels() -> usize {
    DEFAULT_CHUNK_PIXELS
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for RulesFile {
    fn default() -> Self {
        Self {
            rules: vec![],
            chunk_pixels: default_chunk_pixels(),
            debounce_ms: default_debounce_ms(),
            output: None,
        }
    }
}

impl RulesFile {
    /// Starter file written by `recolour init`.
    pub fn starter() -> Self {
        Self {
            rules: vec![ColourRule::default()],
            ..Default::default()
        }
    }

    /// Load a rules file, choosing JSON or YAML by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RecolourError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read rules file: {}", e),
        })?;

        if is_json(path) {
            Self::parse_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parse a rules file from YAML.
    pub fn parse(content: &str) -> Result<Self> {
        // An empty document is a file with no settings
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| RecolourError::Parse {
            message: format!("Invalid rules file: {}", e),
            help: Some(format!("Check {} syntax", RULES_FILENAME)),
        })
    }

    /// Parse a rules file from JSON.
    pub fn parse_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| RecolourError::Parse {
            message: format!("Invalid rules file: {}", e),
            help: Some("Check JSON syntax".to_string()),
        })
    }

    /// Serialize in the format implied by `path`.
    pub fn to_string_for(&self, path: &Path) -> Result<String> {
        let encoded = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| e.to_string())
        } else {
            serde_yaml::to_string(self).map_err(|e| e.to_string())
        };

        encoded.map_err(|message| RecolourError::Parse {
            message: format!("Failed to serialize rules: {}", message),
            help: None,
        })
    }

    /// The rules as an ordered list.
    pub fn rule_list(&self) -> RuleList {
        RuleList::from(self.rules.clone())
    }

    pub fn slicing(&self) -> Slicing {
        Slicing::Pixels(self.chunk_pixels)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_rules_file() {
        let yaml = r##"
rules:
  - from: "#ff0000"
    to: "#00ff00"
    tolerance: 30
  - from: "#ffffff"
    tolerance: 5
    make_transparent: true
chunk_pixels: 2500
debounce_ms: 150
output: out/result.png
"##;
        let file = RulesFile::parse(yaml).unwrap();

        assert_eq!(file.rules.len(), 2);
        assert_eq!(file.rules[0], ColourRule::replace("#ff0000", "#00ff00", 30.0));
        assert!(file.rules[1].make_transparent);
        assert_eq!(file.slicing(), Slicing::Pixels(2500));
        assert_eq!(file.debounce(), Duration::from_millis(150));
        assert_eq!(file.output, Some(PathBuf::from("out/result.png")));
    }

    #[test]
    fn test_parse_empty_rules_file() {
        let file = RulesFile::parse("").unwrap();
        assert_eq!(file, RulesFile::default());
        assert_eq!(file.chunk_pixels, DEFAULT_CHUNK_PIXELS);
        assert_eq!(file.debounce_ms, 300);
    }

    #[test]
    fn test_parse_keeps_invalid_colours() {
        let file = RulesFile::parse("rules:\n  - from: notacolor\n    to: \"#000000\"\n").unwrap();
        assert_eq!(file.rules.len(), 1);
        assert!(!file.rules[0].is_valid());
    }

    #[test]
    fn test_parse_rejects_bad_yaml() {
        assert!(RulesFile::parse("rules: [").is_err());
        assert!(RulesFile::parse("rules:\n  - to: \"#000000\"\n").is_err());
    }

    #[test]
    fn test_parse_json_with_camel_case_flag() {
        let json = r##"{"rules": [{"from": "#000000", "to": "#ffffff", "tolerance": 0, "makeTransparent": false}]}"##;
        let file = RulesFile::parse_json(json).unwrap();
        assert_eq!(file.rules[0], ColourRule::replace("#000000", "#ffffff", 0.0));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempdir().unwrap();
        let starter = RulesFile::starter();

        for name in ["rules.yaml", "rules.json"] {
            let path = dir.path().join(name);
            std::fs::write(&path, starter.to_string_for(&path).unwrap()).unwrap();
            assert_eq!(RulesFile::load(&path).unwrap(), starter, "{}", name);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = RulesFile::load(Path::new("/nonexistent/recolour.yaml")).unwrap_err();
        assert!(matches!(err, RecolourError::Io { .. }));
    }

    #[test]
    fn test_starter_has_default_rule() {
        let list = RulesFile::starter().rule_list();
        assert_eq!(list, RuleList::default());
    }
}
