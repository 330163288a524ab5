//! Message classification against the partner rule table.
//!
//! Exclusion rules run first; a hit drops the message before any scoring.
//! Scoring counts matched criterion kinds (sender, subject, attachment
//! prefix when configured) and divides by the kinds the rule configures, so
//! a single-criterion rule that fully matches scores 1.0 and a two-criterion
//! rule matching one scores 0.5. A rule with zero matched criteria is never
//! selected, no matter how sparse the field is.

use tracing::debug;

use crate::models::message::CandidateMessage;
use crate::models::rules::{ExclusionRule, PartnerRule, RuleSet};

/// Which criterion kind a pattern matched, for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Sender,
    Subject,
    AttachmentPrefix,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Sender => "sender",
            MatchField::Subject => "subject",
            MatchField::AttachmentPrefix => "attachment_prefix",
        }
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Name of the best-matching rule, if any criterion matched.
    pub rule: Option<String>,

    /// Matched criterion kinds over configured kinds, in [0, 1].
    pub confidence: f32,

    /// (criterion, pattern) pairs that matched, for logging.
    pub matched: Vec<(MatchField, String)>,

    /// The message hit an exclusion rule before scoring.
    pub excluded: bool,

    /// Reason attached to the exclusion rule that fired.
    pub exclusion_reason: Option<String>,
}

impl ClassificationResult {
    pub fn is_match(&self) -> bool {
        self.rule.is_some()
    }

    fn excluded(reason: &str) -> Self {
        Self {
            rule: None,
            confidence: 0.0,
            matched: Vec::new(),
            excluded: true,
            exclusion_reason: Some(reason.to_string()),
        }
    }

    fn unmatched() -> Self {
        Self {
            rule: None,
            confidence: 0.0,
            matched: Vec::new(),
            excluded: false,
            exclusion_reason: None,
        }
    }
}

/// True when the sender address matches an exact-address or domain-suffix
/// pattern, case-insensitively.
///
/// `vodafone.hu` matches `noreply@vodafone.hu` and `x@mail.vodafone.hu` but
/// not `x@notvodafone.hu`.
pub fn sender_matches(address: &str, pattern: &str) -> bool {
    let address = address.to_lowercase();
    let pattern = pattern.trim().trim_start_matches('@').to_lowercase();
    if pattern.is_empty() {
        return false;
    }
    if address == pattern {
        return true;
    }
    match address.rsplit_once('@') {
        Some((_, domain)) => domain == pattern || domain.ends_with(&format!(".{pattern}")),
        None => false,
    }
}

fn subject_matches(subject: &str, pattern: &str) -> bool {
    !pattern.is_empty() && subject.to_lowercase().contains(&pattern.to_lowercase())
}

fn attachment_prefix_matches(message: &CandidateMessage, prefix: &str) -> bool {
    message
        .attachments
        .iter()
        .any(|a| a.file_name.to_lowercase().starts_with(&prefix.to_lowercase()))
}

fn exclusion_hits(message: &CandidateMessage, exclusion: &ExclusionRule) -> bool {
    if !sender_matches(&message.sender_address(), &exclusion.sender_pattern) {
        return false;
    }
    match &exclusion.subject_pattern {
        Some(pattern) => subject_matches(&message.subject, pattern),
        None => true,
    }
}

struct Candidate<'a> {
    rule: &'a PartnerRule,
    confidence: f32,
    criteria: usize,
    matched: Vec<(MatchField, String)>,
}

fn score<'a>(message: &CandidateMessage, rule: &'a PartnerRule) -> Option<Candidate<'a>> {
    let mut matched = Vec::new();
    let address = message.sender_address();

    if let Some(pattern) = rule
        .sender_patterns
        .iter()
        .find(|p| sender_matches(&address, p))
    {
        matched.push((MatchField::Sender, pattern.clone()));
    }
    if let Some(pattern) = rule
        .subject_patterns
        .iter()
        .find(|p| subject_matches(&message.subject, p))
    {
        matched.push((MatchField::Subject, pattern.clone()));
    }
    if let Some(prefix) = &rule.attachment_prefix {
        if attachment_prefix_matches(message, prefix) {
            matched.push((MatchField::AttachmentPrefix, prefix.clone()));
        }
    }

    if matched.is_empty() {
        return None;
    }

    let criteria = rule.criteria_count();
    let confidence = (matched.len() as f32 / criteria.max(1) as f32).min(1.0);
    Some(Candidate {
        rule,
        confidence,
        criteria,
        matched,
    })
}

/// Classify one message against the rule table.
///
/// Pure function; the same contract serves inbox polling and the manual flow
/// with its synthetic message.
pub fn classify(message: &CandidateMessage, rules: &RuleSet) -> ClassificationResult {
    for exclusion in &rules.exclusions {
        if exclusion_hits(message, exclusion) {
            debug!(
                "Message '{}' excluded by '{}': {}",
                message.id, exclusion.sender_pattern, exclusion.reason
            );
            return ClassificationResult::excluded(&exclusion.reason);
        }
    }

    let mut best: Option<Candidate> = None;
    for rule in &rules.rules {
        let Some(candidate) = score(message, rule) else {
            continue;
        };
        let replace = match &best {
            None => true,
            Some(current) => {
                candidate.confidence > current.confidence
                    || (candidate.confidence == current.confidence
                        && candidate.criteria > current.criteria)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }

    match best {
        Some(candidate) => {
            debug!(
                "Message '{}' matched rule '{}' (confidence {:.2})",
                message.id, candidate.rule.name, candidate.confidence
            );
            ClassificationResult {
                rule: Some(candidate.rule.name.clone()),
                confidence: candidate.confidence,
                matched: candidate.matched,
                excluded: false,
                exclusion_reason: None,
            }
        }
        None => ClassificationResult::unmatched(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::AttachmentMeta;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn message(sender: &str, subject: &str) -> CandidateMessage {
        CandidateMessage {
            id: "msg-1".to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            attachments: vec![AttachmentMeta {
                id: "att-1".to_string(),
                file_name: "vodafone_szamla.pdf".to_string(),
                size: 1024,
            }],
            received_at: Utc::now(),
        }
    }

    fn rule(name: &str, senders: &[&str], subjects: &[&str]) -> PartnerRule {
        PartnerRule {
            name: name.to_string(),
            sender_patterns: senders.iter().map(|s| s.to_string()).collect(),
            subject_patterns: subjects.iter().map(|s| s.to_string()).collect(),
            ..PartnerRule::default()
        }
    }

    fn ruleset(rules: Vec<PartnerRule>) -> RuleSet {
        RuleSet {
            rules,
            exclusions: Vec::new(),
        }
    }

    #[test]
    fn test_sender_domain_suffix() {
        assert!(sender_matches("noreply@vodafone.hu", "vodafone.hu"));
        assert!(sender_matches("x@mail.vodafone.hu", "vodafone.hu"));
        assert!(sender_matches("NoReply@Vodafone.HU", "vodafone.hu"));
        assert!(!sender_matches("x@notvodafone.hu", "vodafone.hu"));
        assert!(!sender_matches("vodafone.hu@attacker.com", "vodafone.hu"));
    }

    #[test]
    fn test_sender_exact_address() {
        assert!(sender_matches("noreply@vodafone.hu", "noreply@vodafone.hu"));
        assert!(!sender_matches("other@vodafone.hu", "noreply@vodafone.hu"));
    }

    #[test]
    fn test_single_criterion_full_match() {
        let rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &[])]);
        let result = classify(&message("noreply@vodafone.hu", "Számla"), &rules);
        assert_eq!(result.rule.as_deref(), Some("vodafone"));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_partial_match_halves_confidence() {
        let rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &["havi számla"])]);
        let result = classify(&message("noreply@vodafone.hu", "Egyéb tárgy"), &rules);
        assert_eq!(result.rule.as_deref(), Some("vodafone"));
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_zero_matches_never_selected() {
        let rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &[])]);
        let result = classify(&message("billing@hetzner.com", "Invoice"), &rules);
        assert_eq!(result.rule, None);
        assert!(!result.is_match());
        assert!(!result.excluded);
    }

    #[test]
    fn test_tie_prefers_more_criteria() {
        // Both score 1.0; the two-criterion rule is the more specific match.
        let rules = ruleset(vec![
            rule("loose", &["vodafone.hu"], &[]),
            rule("strict", &["vodafone.hu"], &["számla"]),
        ]);
        let result = classify(&message("noreply@vodafone.hu", "Havi számla"), &rules);
        assert_eq!(result.rule.as_deref(), Some("strict"));
    }

    #[test]
    fn test_exact_tie_keeps_declaration_order() {
        let rules = ruleset(vec![
            rule("first", &["vodafone.hu"], &[]),
            rule("second", &["vodafone.hu"], &[]),
        ]);
        let result = classify(&message("noreply@vodafone.hu", "Számla"), &rules);
        assert_eq!(result.rule.as_deref(), Some("first"));
    }

    #[test]
    fn test_attachment_prefix_criterion() {
        let mut with_prefix = rule("vodafone", &["vodafone.hu"], &[]);
        with_prefix.attachment_prefix = Some("vodafone_".to_string());
        let rules = ruleset(vec![with_prefix]);

        let result = classify(&message("noreply@vodafone.hu", "Számla"), &rules);
        assert_eq!(result.confidence, 1.0);
        assert!(result
            .matched
            .iter()
            .any(|(f, _)| *f == MatchField::AttachmentPrefix));

        // prefix configured but no attachment carries it
        let mut other = message("noreply@vodafone.hu", "Számla");
        other.attachments[0].file_name = "other.pdf".to_string();
        let result = classify(&other, &rules);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_exclusion_wins_over_match() {
        let mut rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &[])]);
        rules.exclusions.push(ExclusionRule {
            sender_pattern: "vodafone.hu".to_string(),
            subject_pattern: None,
            reason: "marketing".to_string(),
        });

        let result = classify(&message("noreply@vodafone.hu", "Akciós ajánlat"), &rules);
        assert!(result.excluded);
        assert_eq!(result.rule, None);
        assert_eq!(result.exclusion_reason.as_deref(), Some("marketing"));
    }

    #[test]
    fn test_exclusion_subject_constraint() {
        let mut rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &[])]);
        rules.exclusions.push(ExclusionRule {
            sender_pattern: "vodafone.hu".to_string(),
            subject_pattern: Some("hírlevél".to_string()),
            reason: "newsletter".to_string(),
        });

        // subject constraint not met, exclusion does not fire
        let result = classify(&message("noreply@vodafone.hu", "Havi számla"), &rules);
        assert!(!result.excluded);
        assert_eq!(result.rule.as_deref(), Some("vodafone"));

        let result = classify(&message("noreply@vodafone.hu", "Heti hírlevél"), &rules);
        assert!(result.excluded);
    }

    #[test]
    fn test_display_name_sender_form() {
        let rules = ruleset(vec![rule("vodafone", &["vodafone.hu"], &[])]);
        let result = classify(
            &message("Vodafone Ügyfélszolgálat <noreply@vodafone.hu>", "Számla"),
            &rules,
        );
        assert_eq!(result.rule.as_deref(), Some("vodafone"));
    }
}
