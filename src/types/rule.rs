//! Colour substitution rules and the ordered rule list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecolourError, Result};

use super::colour::{parse_colour, Colour};

/// Tolerance given to new rules.
pub const DEFAULT_TOLERANCE: f64 = 30.0;

/// A single source → target (or source → transparent) substitution.
///
/// Colours are kept as the text the user typed so that a half-edited value
/// survives in the list. Rules whose colours do not parse are skipped by the
/// engine rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColourRule {
    /// Source colour to match.
    pub from: String,

    /// Replacement colour, ignored when `make_transparent` is set.
    #[serde(default = "default_to")]
    pub to: String,

    /// Maximum RGB distance from `from` that still counts as a match.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Zero the alpha of matching pixels instead of replacing RGB.
    #[serde(default, alias = "makeTransparent")]
    pub make_transparent: bool,
}

fn default_to() -> String {
    "#000000".to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Default for ColourRule {
    fn default() -> Self {
        Self::replace("#ff0000", "#00ff00", DEFAULT_TOLERANCE)
    }
}

impl ColourRule {
    /// A rule replacing `from` with `to`.
    pub fn replace(from: impl Into<String>, to: impl Into<String>, tolerance: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            tolerance,
            make_transparent: false,
        }
    }

    /// A rule making `from` transparent.
    pub fn transparent(from: impl Into<String>, tolerance: f64) -> Self {
        Self {
            from: from.into(),
            to: default_to(),
            tolerance,
            make_transparent: true,
        }
    }

    /// Parsed source colour, if the text is a valid colour.
    pub fn from_colour(&self) -> Option<Colour> {
        parse_colour(&self.from)
    }

    /// Parsed target colour. Always `None` for transparency rules.
    pub fn to_colour(&self) -> Option<Colour> {
        if self.make_transparent {
            None
        } else {
            parse_colour(&self.to)
        }
    }

    /// Whether the engine will use this rule.
    pub fn is_valid(&self) -> bool {
        self.from_colour().is_some() && (self.make_transparent || self.to_colour().is_some())
    }

    /// Apply a single field edit.
    pub fn apply_edit(&mut self, edit: RuleEdit) {
        match edit {
            RuleEdit::From(from) => self.from = from,
            RuleEdit::To(to) => self.to = to,
            RuleEdit::Tolerance(tolerance) => self.tolerance = tolerance,
            RuleEdit::MakeTransparent(flag) => self.make_transparent = flag,
        }
    }
}

/// Parses `FROM:TO:TOLERANCE`, where `TO` may be `transparent` and
/// `:TOLERANCE` may be omitted.
///
/// Only the shape of the text is checked here; colours that do not parse
/// still produce a rule, which the engine then ignores.
impl FromStr for ColourRule {
    type Err = RecolourError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();

        let (from, to, tolerance) = match parts.as_slice() {
            [from, to] => (*from, *to, DEFAULT_TOLERANCE),
            [from, to, tolerance] => {
                let tolerance = tolerance.trim().parse::<f64>().map_err(|_| RecolourError::Parse {
                    message: format!("Invalid tolerance in rule {:?}: {}", s, tolerance),
                    help: Some("Tolerance is a number, e.g. #ff0000:#00ff00:30".to_string()),
                })?;
                (*from, *to, tolerance)
            }
            _ => {
                return Err(RecolourError::Parse {
                    message: format!("Invalid rule: {:?}", s),
                    help: Some(
                        "Use FROM:TO[:TOLERANCE] or FROM:transparent[:TOLERANCE]".to_string(),
                    ),
                })
            }
        };

        if to.eq_ignore_ascii_case("transparent") {
            Ok(Self::transparent(from, tolerance))
        } else {
            Ok(Self::replace(from, to, tolerance))
        }
    }
}

impl fmt::Display for ColourRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.make_transparent {
            write!(f, "{} -> transparent (±{})", self.from, self.tolerance)
        } else {
            write!(f, "{} -> {} (±{})", self.from, self.to, self.tolerance)
        }
    }
}

/// A change to one field of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEdit {
    From(String),
    To(String),
    Tolerance(f64),
    MakeTransparent(bool),
}

/// An ordered list of rules. Position is priority: the first matching rule
/// wins for each pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleList {
    rules: Vec<ColourRule>,
}

impl Default for RuleList {
    /// A list holding the single default rule.
    fn default() -> Self {
        Self {
            rules: vec![ColourRule::default()],
        }
    }
}

impl RuleList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule at the lowest priority.
    pub fn push(&mut self, rule: ColourRule) {
        self.rules.push(rule);
    }

    /// Insert a rule at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, rule: ColourRule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Remove the rule at `index`.
    pub fn remove(&mut self, index: usize) -> Option<ColourRule> {
        if index < self.rules.len() {
            Some(self.rules.remove(index))
        } else {
            None
        }
    }

    /// Edit the rule at `index`. Returns false if there is no such rule.
    pub fn update(&mut self, index: usize, edit: RuleEdit) -> bool {
        match self.rules.get_mut(index) {
            Some(rule) => {
                rule.apply_edit(edit);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&ColourRule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColourRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn as_slice(&self) -> &[ColourRule] {
        &self.rules
    }

    /// Rules the engine will skip, with their positions.
    pub fn invalid(&self) -> impl Iterator<Item = (usize, &ColourRule)> {
        self.rules.iter().enumerate().filter(|(_, r)| !r.is_valid())
    }

    /// Whether any rule the engine will use makes pixels transparent.
    pub fn has_transparency(&self) -> bool {
        self.rules.iter().any(|r| r.make_transparent && r.is_valid())
    }
}

impl From<Vec<ColourRule>> for RuleList {
    fn from(rules: Vec<ColourRule>) -> Self {
        Self { rules }
    }
}

impl Extend<ColourRule> for RuleList {
    fn extend<T: IntoIterator<Item = ColourRule>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a ColourRule;
    type IntoIter = std::slice::Iter<'a, ColourRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
