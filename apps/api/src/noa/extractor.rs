//! Turns a free-text model reply into a `Recommendation`.
//!
//! The reply loosely follows the template in `noa::prompts` but is never trusted to.
//! Extraction is a fixed list of independent rules; each one looks for its own
//! section and reports a `ParseOutcome`. A rule that finds nothing leaves its field
//! empty and never stops the others from running. Extracted codes are taken
//! verbatim: there is no lookup against a canonical NOA table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::noa::models::Recommendation;

// ────────────────────────────────────────────────────────────────────────────
// Patterns
// ────────────────────────────────────────────────────────────────────────────

/// `NOA 702 – Promotion |` / `NOA 721 - Reassignment.`
static NOA_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bNOA\s+(\d+)\s*[–-]\s*([^|.\n]+?)(?:\s*\||\.|$)").expect("valid NOA regex")
});

/// `LAC: 5 CFR 335.103.`: a period only ends the citation when followed by
/// whitespace or the end of the line.
static LAC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bLAC:\s*([^?.\s][^?\n]*?)\s*(?:\.(?:\s|$)|\?|$)").expect("valid LAC regex")
});

/// Clarifications bounded by the `Required` section marker.
static CLARIFICATIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(?i:clarifications):\s*(.*?)\bRequired\b").expect("valid clarifications regex")
});

/// Looser clarifications pattern used when the `Required` marker is missing.
static CLARIFICATIONS_LOOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)clarifications:\s*(.*?)(?:\.|\bOPM NOA Remarks\b|$)")
        .expect("valid loose clarifications regex")
});

static QUESTION_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?+").expect("valid split regex"));

/// Required fields bounded by the remarks section.
static FIELDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Required\s+SF-?50(?:\s+fields?)?\s*:\s*(.*?)\s*OPM NOA Remarks")
        .expect("valid fields regex")
});

/// Required fields running to a period before `OPM` or to the end of the reply.
static FIELDS_LOOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Required\s+SF-?50(?:\s+fields?)?\s*:\s*(.*?)(?:\.\s*(?:OPM|$)|$)")
        .expect("valid loose fields regex")
});

static FIELD_LIST_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]").expect("valid split regex"));

static FIELD_AND_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("valid split regex"));

/// Remarks run to the end, a blank line, or a new `Label:` line.
static REMARKS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)OPM NOA Remarks:\s*(.*?)(?:\n[ \t]*\n|\n[A-Z][a-z]+:|$)")
        .expect("valid remarks regex")
});

static REMARK_CODES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bremark codes?:\s*([^.]+?)(?:\.|$)").expect("valid remark codes regex")
});

static REMARK_CODES_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[,;]|\band\b").expect("valid split regex"));

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Result of a single extraction rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// The primary pattern matched.
    Matched(T),
    /// Only the looser fallback pattern matched.
    Recovered(T),
    /// Nothing usable was found.
    Absent,
}

impl<T> ParseOutcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ParseOutcome::Matched(_) => OutcomeKind::Matched,
            ParseOutcome::Recovered(_) => OutcomeKind::Recovered,
            ParseOutcome::Absent => OutcomeKind::Absent,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ParseOutcome::Matched(v) | ParseOutcome::Recovered(v) => Some(v),
            ParseOutcome::Absent => None,
        }
    }

    fn or_recover(self, fallback: impl FnOnce() -> Option<T>) -> Self {
        match self {
            ParseOutcome::Absent => fallback().map_or(ParseOutcome::Absent, ParseOutcome::Recovered),
            found => found,
        }
    }
}

impl<T> From<Option<T>> for ParseOutcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParseOutcome::Absent, ParseOutcome::Matched)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Matched,
    Recovered,
    Absent,
}

/// Per-field record of which rule produced each part of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub code: OutcomeKind,
    pub legal_authority: OutcomeKind,
    pub clarifications: OutcomeKind,
    pub required_fields: OutcomeKind,
    pub remarks: OutcomeKind,
    pub remark_codes: OutcomeKind,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub recommendation: Recommendation,
    pub report: ExtractionReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Runs every extraction rule over `raw`. Never fails.
pub fn extract(raw: &str) -> Extraction {
    let code = extract_code(raw);
    let legal_authority = extract_legal_authority(raw);
    let clarifications = extract_clarifications(raw);
    let required_fields = extract_required_fields(raw);
    let remarks = extract_remarks(raw);
    let remark_codes = extract_remark_codes(raw);

    let report = ExtractionReport {
        code: code.kind(),
        legal_authority: legal_authority.kind(),
        clarifications: clarifications.kind(),
        required_fields: required_fields.kind(),
        remarks: remarks.kind(),
        remark_codes: remark_codes.kind(),
    };
    debug!(?report, "Extracted recommendation from model reply");

    let (noa_code, label) = code.into_option().unwrap_or_default();
    let recommendation = Recommendation {
        noa_code,
        label,
        legal_authority_code: legal_authority.into_option(),
        clarifications: clarifications.into_option().unwrap_or_default(),
        required_fields: required_fields.into_option(),
        remarks_text: remarks.into_option(),
        remark_codes: remark_codes.into_option(),
    };

    Extraction {
        recommendation,
        report,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

pub fn extract_code(raw: &str) -> ParseOutcome<(String, String)> {
    NOA_CODE_RE
        .captures(raw)
        .and_then(|caps| {
            let code = caps.get(1)?.as_str().trim().to_string();
            let label = caps.get(2)?.as_str().trim().to_string();
            // Code and label are only meaningful together.
            (!code.is_empty() && !label.is_empty()).then_some((code, label))
        })
        .into()
}

pub fn extract_legal_authority(raw: &str) -> ParseOutcome<String> {
    LAC_RE
        .captures(raw)
        .and_then(|caps| non_empty(caps.get(1)?.as_str().trim()))
        .into()
}

pub fn extract_clarifications(raw: &str) -> ParseOutcome<Vec<String>> {
    let primary: ParseOutcome<Vec<String>> = CLARIFICATIONS_RE
        .captures(raw)
        .and_then(|caps| non_empty_list(split_questions(caps.get(1)?.as_str())))
        .into();

    primary.or_recover(|| {
        CLARIFICATIONS_LOOSE_RE
            .captures(raw)
            .and_then(|caps| non_empty_list(split_questions(caps.get(1)?.as_str())))
    })
}

pub fn extract_required_fields(raw: &str) -> ParseOutcome<Vec<String>> {
    let primary: ParseOutcome<Vec<String>> = FIELDS_RE
        .captures(raw)
        .and_then(|caps| non_empty_list(split_fields(caps.get(1)?.as_str())))
        .into();

    primary.or_recover(|| {
        FIELDS_LOOSE_RE
            .captures(raw)
            .and_then(|caps| non_empty_list(split_fields(caps.get(1)?.as_str())))
    })
}

pub fn extract_remarks(raw: &str) -> ParseOutcome<String> {
    REMARKS_RE
        .captures(raw)
        .and_then(|caps| non_empty(&collapse_whitespace(caps.get(1)?.as_str())))
        .into()
}

pub fn extract_remark_codes(raw: &str) -> ParseOutcome<Vec<String>> {
    REMARK_CODES_RE
        .captures(raw)
        .and_then(|caps| {
            let codes = REMARK_CODES_SPLIT_RE
                .split(caps.get(1)?.as_str())
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            non_empty_list(codes)
        })
        .into()
}

// ────────────────────────────────────────────────────────────────────────────
// Text helpers
// ────────────────────────────────────────────────────────────────────────────

/// Collapses every whitespace run (newlines included) into one space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a clarifications section into trimmed questions, each ending in one `?`.
fn split_questions(section: &str) -> Vec<String> {
    QUESTION_SPLIT_RE
        .split(section)
        .filter_map(|fragment| {
            let cleaned = collapse_whitespace(fragment);
            let cleaned = cleaned.trim_end_matches('.').trim_end();
            (!cleaned.is_empty()).then(|| format!("{cleaned}?"))
        })
        .collect()
}

/// Splits a required-fields section into clean field names.
fn split_fields(section: &str) -> Vec<String> {
    let text = collapse_whitespace(section);
    let text = text.trim_end_matches('.').trim_end();

    let mut fragments: Vec<&str> = FIELD_LIST_SPLIT_RE.split(text).collect();
    if fragments.len() == 1 && text.to_lowercase().contains(" and ") {
        fragments = FIELD_AND_SPLIT_RE.split(text).collect();
    }

    fragments
        .into_iter()
        .map(clean_field)
        .filter(|f| is_meaningful_field(f))
        .collect()
}

fn clean_field(fragment: &str) -> String {
    let mut field = fragment.trim().trim_end_matches('.').trim_end();
    for conjunction in ["and ", "or "] {
        if field.len() > conjunction.len()
            && field.is_char_boundary(conjunction.len())
            && field[..conjunction.len()].eq_ignore_ascii_case(conjunction)
        {
            field = field[conjunction.len()..].trim_start();
        }
    }
    field.to_string()
}

fn is_meaningful_field(field: &str) -> bool {
    field.chars().count() >= 2
        && !field.eq_ignore_ascii_case("and")
        && !field.eq_ignore_ascii_case("or")
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn non_empty_list(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
