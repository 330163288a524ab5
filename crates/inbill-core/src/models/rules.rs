//! Partner and exclusion rules loaded from the JSON rule file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, ExtractionError};

/// Currencies supported by amount extraction patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "HUF")]
    Huf,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    /// Parse a currency tag as written in a rule file.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "HUF" => Some(Currency::Huf),
            "EUR" => Some(Currency::Eur),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Huf => "HUF",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

/// Date format tags a due-date pattern may carry.
///
/// Parsing is driven by the tag, never by auto-detection, so `9/15/2025`
/// cannot be misread as the 9th of month 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormatTag {
    /// Hungarian dotted order, e.g. `2025.09.15`.
    #[serde(rename = "YYYY.MM.DD")]
    YearMonthDayDotted,
    /// ISO order, e.g. `2025-09-15`.
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDayDashed,
    /// US order, e.g. `9/15/2025`.
    #[serde(rename = "M/D/YYYY")]
    MonthDayYear,
    /// European order, e.g. `15.9.2025`.
    #[serde(rename = "D.M.YYYY")]
    DayMonthYear,
}

impl DateFormatTag {
    /// Parse a format tag as written in a rule file.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "YYYY.MM.DD" => Some(DateFormatTag::YearMonthDayDotted),
            "YYYY-MM-DD" => Some(DateFormatTag::YearMonthDayDashed),
            "M/D/YYYY" => Some(DateFormatTag::MonthDayYear),
            "D.M.YYYY" => Some(DateFormatTag::DayMonthYear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateFormatTag::YearMonthDayDotted => "YYYY.MM.DD",
            DateFormatTag::YearMonthDayDashed => "YYYY-MM-DD",
            DateFormatTag::MonthDayYear => "M/D/YYYY",
            DateFormatTag::DayMonthYear => "D.M.YYYY",
        }
    }
}

/// An amount extraction pattern with the currency its captures denote.
///
/// The currency is kept as the raw configured string and validated when the
/// rule is first used, so one bad rule cannot take down the whole rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountPattern {
    /// Regex applied to the document text. One capture group for a plain
    /// token, three when digits arrive split across groups.
    pub pattern: String,

    /// Currency tag, one of `HUF`, `EUR`, `USD`.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "HUF".to_string()
}

/// A due-date extraction pattern tagged with its date format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDatePattern {
    /// Regex applied to the document text. Either three capture groups
    /// (year/month/day parts in pattern order) or one group holding the
    /// whole date token.
    pub pattern: String,

    /// Format tag, e.g. `YYYY.MM.DD` or `M/D/YYYY`. Validated lazily.
    #[serde(default)]
    pub format: String,
}

/// A single partner's matching and extraction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerRule {
    /// Unique rule identifier.
    pub name: String,

    /// Free-text description of the partner.
    pub description: String,

    /// Sender matchers: exact address or domain suffix, case-insensitive.
    pub sender_patterns: Vec<String>,

    /// Subject matchers: case-insensitive substring containment.
    pub subject_patterns: Vec<String>,

    /// Only attachments whose filename starts with this prefix are
    /// processed. Also acts as a scoring criterion when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_prefix: Option<String>,

    /// Primary amount patterns, applied in order; first match wins.
    pub amount_patterns: Vec<AmountPattern>,

    /// Secondary EUR patterns for dual-currency invoices.
    pub eur_amount_patterns: Vec<String>,

    /// Due-date patterns, applied in order; first match wins.
    pub due_date_patterns: Vec<DueDatePattern>,

    /// Prefix used in the renamed destination filename.
    pub filename_prefix: String,

    /// Destination folder name under the year segment.
    pub folder: String,

    /// Payment-type label written to the ledger.
    pub payment_type: String,

    /// Description written to the ledger (falls back to `description`).
    pub ledger_description: String,
}

impl Default for PartnerRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            sender_patterns: Vec::new(),
            subject_patterns: Vec::new(),
            attachment_prefix: None,
            amount_patterns: Vec::new(),
            eur_amount_patterns: Vec::new(),
            due_date_patterns: Vec::new(),
            filename_prefix: String::new(),
            folder: String::new(),
            payment_type: default_payment_type(),
            ledger_description: String::new(),
        }
    }
}

fn default_payment_type() -> String {
    "Vállalati számla".to_string()
}

impl PartnerRule {
    /// Number of scoring criteria this rule configures.
    pub fn criteria_count(&self) -> usize {
        let mut count = 0;
        if !self.sender_patterns.is_empty() {
            count += 1;
        }
        if !self.subject_patterns.is_empty() {
            count += 1;
        }
        if self.attachment_prefix.is_some() {
            count += 1;
        }
        count
    }

    /// Validate the extraction patterns this rule carries.
    ///
    /// A failure here is fatal to this rule only; other rules keep working.
    pub fn validate_patterns(&self) -> Result<(), ExtractionError> {
        for amount in &self.amount_patterns {
            if Currency::parse(&amount.currency).is_none() {
                return Err(ExtractionError::UnsupportedCurrency {
                    rule: self.name.clone(),
                    currency: amount.currency.clone(),
                });
            }
            self.compile_check(&amount.pattern)?;
        }
        for pattern in &self.eur_amount_patterns {
            self.compile_check(pattern)?;
        }
        for due in &self.due_date_patterns {
            if DateFormatTag::parse(&due.format).is_none() {
                return Err(ExtractionError::UnknownDateFormat {
                    rule: self.name.clone(),
                    tag: due.format.clone(),
                });
            }
            self.compile_check(&due.pattern)?;
        }
        Ok(())
    }

    fn compile_check(&self, pattern: &str) -> Result<(), ExtractionError> {
        regex::Regex::new(pattern).map(|_| ()).map_err(|e| {
            ExtractionError::InvalidPattern {
                rule: self.name.clone(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn apply_defaults(&mut self) {
        if self.filename_prefix.is_empty() {
            self.filename_prefix = self.name.clone();
        }
        if self.folder.is_empty() {
            self.folder = self.name.clone();
        }
        if self.ledger_description.is_empty() {
            self.ledger_description = self.description.clone();
        }
    }
}

/// Drops a message before classification when its sender (and subject, when
/// specified) matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionRule {
    /// Sender matcher: exact address or domain suffix, case-insensitive.
    pub sender_pattern: String,

    /// Optional subject substring that must also match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_pattern: Option<String>,

    /// Why this exclusion exists, for the logs.
    #[serde(default)]
    pub reason: String,
}

/// The full rule file: partner rules in declaration order plus exclusions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<PartnerRule>,

    #[serde(default, rename = "exclusion_rules")]
    pub exclusions: Vec<ExclusionRule>,
}

impl RuleSet {
    /// Load rules from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parse rules from a JSON string. `origin` names the source in errors.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut set: RuleSet = serde_json::from_str(json).map_err(|e| ConfigError::Json {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        for rule in &mut set.rules {
            rule.apply_defaults();
        }
        set.validate()?;
        Ok(set)
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&PartnerRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.name.is_empty() {
                return Err(ConfigError::MissingField {
                    rule: format!("#{}", index + 1),
                    field: "name".to_string(),
                });
            }
            if rule.sender_patterns.is_empty() && rule.subject_patterns.is_empty() {
                return Err(ConfigError::MissingField {
                    rule: rule.name.clone(),
                    field: "sender_patterns or subject_patterns".to_string(),
                });
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRule(rule.name.clone()));
            }
        }
        for (index, exclusion) in self.exclusions.iter().enumerate() {
            if exclusion.sender_pattern.is_empty() {
                return Err(ConfigError::MissingField {
                    rule: format!("exclusion #{}", index + 1),
                    field: "sender_pattern".to_string(),
                });
            }
        }
        Ok(())
    }
}
