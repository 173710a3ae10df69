// Score extraction - maps free-form critic text to a 0-10 quality score

use regex::Regex;
use std::sync::LazyLock;

/// Fallback when the critic approves outright but gives no number
pub const APPROVED_SCORE: f64 = 8.5;
/// Fallback when the critic approves with minor revisions
pub const MINOR_REVISIONS_SCORE: f64 = 7.0;
/// Fallback when nothing in the text can be trusted
pub const LOW_CONFIDENCE_SCORE: f64 = 6.0;

// Ordered by priority, first pattern with an in-range capture wins.
static SCORE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\boverall\s+score\b[^0-9\n]{0,24}?\b(\d{1,2}(?:[.,]\d+)?)\b(?:\s*/\s*10\b)?",
        r"(?i)\bscore\b[^0-9\n]{0,24}?\b(\d{1,2}(?:[.,]\d+)?)\b\s*/\s*10\b",
        r"\b(\d{1,2}(?:[.,]\d+)?)\b\s*/\s*10\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("score pattern compiles"))
    .collect()
});

static APPROVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(NOT\s+)?APPROVED\b(\s+WITH\b)?").expect("approval pattern compiles")
});

static MINOR_REVISIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAPPROVED\s+WITH\s+(?:MINOR\s+)?REVISIONS?\b")
        .expect("minor revisions pattern compiles")
});

static MAJOR_REVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bMAJOR\s+REVISIONS?\s+(?:IS\s+|ARE\s+)?REQUIRED\b|\bREQUIRES?\s+(?:A\s+)?MAJOR\s+REVISIONS?\b")
        .expect("major revision pattern compiles")
});

/// Extract a score in [0, 10] from critic text, falling back to verdict heuristics
pub fn extract_score(text: &str) -> f64 {
    numeric_score(text).unwrap_or_else(|| Verdict::scan(text).fallback_score())
}

/// The first explicit numeric score, if the text carries one
pub fn numeric_score(text: &str) -> Option<f64> {
    SCORE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .find_map(|caps| caps.get(1).and_then(|m| parse_score(m.as_str())))
    })
}

fn parse_score(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|score| (0.0..=10.0).contains(score))
}

/// Approval markers found in a critique
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    /// A bare `APPROVED` not negated and not qualified by `WITH ...`
    pub approved: bool,
    pub approved_with_revisions: bool,
    pub major_revision: bool,
}

impl Verdict {
    pub fn scan(text: &str) -> Self {
        let approved = APPROVAL
            .captures_iter(text)
            .any(|caps| caps.get(1).is_none() && caps.get(2).is_none());

        Self {
            approved,
            approved_with_revisions: MINOR_REVISIONS.is_match(text),
            major_revision: MAJOR_REVISION.is_match(text),
        }
    }

    /// The critic considers the draft acceptable without major rework
    pub fn accepts(&self) -> bool {
        (self.approved || self.approved_with_revisions) && !self.major_revision
    }

    pub fn fallback_score(&self) -> f64 {
        if self.approved && !self.major_revision {
            APPROVED_SCORE
        } else if self.approved_with_revisions {
            MINOR_REVISIONS_SCORE
        } else {
            LOW_CONFIDENCE_SCORE
        }
    }
}
