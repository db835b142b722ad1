// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Field parser: OCR tokens to labeled card fields
//!
//! Pattern checks return a [`PatternMatch`] so that "nothing there" and
//! "something ID-shaped that is not a valid ID" stay distinguishable.
//! Positional assignment (first token is the name, second the guardian
//! name) is isolated behind [`FieldMapper`].

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use super::adapters::OcrToken;

/// Number of digits in a CNIC
pub const CNIC_DIGITS: usize = 13;

/// Offset of the CNIC inside the card's QR payload layout
const QR_CNIC_RANGE: std::ops::Range<usize> = 12..25;

/// Digit runs this long that fail the CNIC pattern are reported as malformed
const MALFORMED_CNIC_MIN_DIGITS: usize = 10;

/// Labels printed on the card that OCR picks up alongside the values
const CARD_LABELS: &[&str] = &[
    "/",
    "pakistan",
    "islamic republic of pakistan",
    "name",
    "father name",
    "husband name",
    "gender",
    "country of stay",
    "identity number",
    "date of birth",
    "date of issue",
    "date of expiry",
    "date",
    "of expiry",
    "signature",
    "holder's signature",
    "united arab emirates",
];

// `\d` would admit any Unicode digit; card numbers are ASCII only
fn cnic_candidate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9][0-9-]*[0-9]").expect("valid CNIC candidate pattern"))
}

fn cnic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[0-9]{13}|[0-9]{5}-[0-9]{7}-[0-9])$").expect("valid CNIC pattern"))
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([0-9]{2})\s*[.\-/ ]?\s*([0-9]{2})\s*[.\-/ ]?\s*([0-9]{4})\b")
            .expect("valid date pattern")
    })
}

/// Result of a single pattern check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternMatch<T> {
    /// Fully matched; carries the normalized value
    Matched(T),
    /// Nothing shaped like the pattern was present
    NotFound,
    /// Something shaped like the pattern was present but failed it; carries the raw text
    Malformed(String),
}

impl<T> PatternMatch<T> {
    pub fn matched(self) -> Option<T> {
        match self {
            PatternMatch::Matched(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_matched(&self) -> Option<&T> {
        match self {
            PatternMatch::Matched(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, PatternMatch::Matched(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, PatternMatch::Malformed(_))
    }

    /// Keep the first `Matched`; otherwise prefer `Malformed` over `NotFound`
    fn merge(self, next: impl FnOnce() -> PatternMatch<T>) -> PatternMatch<T> {
        match self {
            PatternMatch::Matched(_) => self,
            PatternMatch::Malformed(raw) => match next() {
                PatternMatch::Matched(value) => PatternMatch::Matched(value),
                _ => PatternMatch::Malformed(raw),
            },
            PatternMatch::NotFound => next(),
        }
    }
}

/// A calendar date read from the card, kept as its eight source digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDate {
    digits: String,
    date: NaiveDate,
}

impl CardDate {
    /// Source digits with separators stripped (`DDMMYYYY`)
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Compact `DDMMYY` form: day and month verbatim, century trimmed
    pub fn compact(&self) -> String {
        format!("{}{}", &self.digits[..4], &self.digits[6..])
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Check a single token for a CNIC
///
/// Accepts 13 contiguous digits or the 5-7-1 hyphen grouping anywhere in the
/// token. The matched value is returned as bare digits.
pub fn match_cnic(text: &str) -> PatternMatch<String> {
    let mut malformed = None;

    for candidate in cnic_candidate_regex().find_iter(text) {
        let raw = candidate.as_str();
        if cnic_regex().is_match(raw) {
            return PatternMatch::Matched(raw.chars().filter(|c| c.is_ascii_digit()).collect());
        }

        let digit_count = raw.chars().filter(|c| c.is_ascii_digit()).count();
        if malformed.is_none() && digit_count >= MALFORMED_CNIC_MIN_DIGITS {
            malformed = Some(raw.to_string());
        }
    }

    match malformed {
        Some(raw) => PatternMatch::Malformed(raw),
        None => PatternMatch::NotFound,
    }
}

/// Find every date-shaped substring in a token, in order of appearance
pub fn match_dates(text: &str) -> Vec<PatternMatch<CardDate>> {
    date_regex()
        .captures_iter(text)
        .map(|caps| {
            let raw = caps[0].to_string();
            let digits = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);

            let parsed = match (
                caps[1].parse::<u32>(),
                caps[2].parse::<u32>(),
                caps[3].parse::<i32>(),
            ) {
                (Ok(day), Ok(month), Ok(year)) => NaiveDate::from_ymd_opt(year, month, day),
                _ => None,
            };

            match parsed {
                Some(date) => PatternMatch::Matched(CardDate { digits, date }),
                None => PatternMatch::Malformed(raw),
            }
        })
        .collect()
}

/// Extract the CNIC carried in a QR payload
///
/// The whole payload is tried first, then the fixed CNIC field of the card's
/// QR layout, then the first 13-digit run anywhere in the payload.
pub fn match_qr_cnic(payload: &str) -> PatternMatch<String> {
    let trimmed = payload.trim();
    if cnic_regex().is_match(trimmed) {
        return PatternMatch::Matched(trimmed.chars().filter(|c| c.is_ascii_digit()).collect());
    }

    if let Some(field) = trimmed.get(QR_CNIC_RANGE) {
        if field.len() == CNIC_DIGITS && field.chars().all(|c| c.is_ascii_digit()) {
            return PatternMatch::Matched(field.to_string());
        }
    }

    match match_cnic(trimmed) {
        PatternMatch::Matched(value) => PatternMatch::Matched(value),
        _ if trimmed.is_empty() => PatternMatch::NotFound,
        _ => PatternMatch::Malformed(trimmed.to_string()),
    }
}

/// True when the token is one of the labels printed on the card
pub fn is_card_label(text: &str) -> bool {
    let normalized = normalize_whitespace(text).to_lowercase();
    CARD_LABELS.contains(&normalized.as_str())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A candidate that looked like a field but failed its pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNote {
    pub field: &'static str,
    pub raw: String,
}

/// Fields read from the front of the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontFields {
    pub name: Option<String>,
    pub guardian_name: Option<String>,
    pub cnic: PatternMatch<String>,
    pub notes: Vec<ParseNote>,
}

/// Fields read from the back of the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackFields {
    pub date_of_birth: Option<CardDate>,
    pub date_of_issue: Option<CardDate>,
    pub date_of_expiry: Option<CardDate>,
    pub cnic: PatternMatch<String>,
    pub notes: Vec<ParseNote>,
}

/// Strategy that assigns semantic roles to OCR tokens
pub trait FieldMapper: Send + Sync {
    fn map_front(&self, tokens: &[OcrToken]) -> FrontFields;
    fn map_back(&self, tokens: &[OcrToken]) -> BackFields;
}

/// Assigns roles by token order
///
/// Front: the first two text tokens are the name and guardian name; the first
/// CNIC-shaped token is the ID number. Back: the first three dates are birth,
/// issue and expiry; the first CNIC-shaped token is the back CNIC.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalMapper;

impl PositionalMapper {
    fn value_tokens(tokens: &[OcrToken]) -> impl Iterator<Item = &str> {
        tokens
            .iter()
            .map(|t| t.text.trim())
            .filter(|text| !text.is_empty() && !is_card_label(text))
    }

    fn scan_cnic<'a>(
        texts: impl Iterator<Item = &'a str>,
        field: &'static str,
        notes: &mut Vec<ParseNote>,
    ) -> PatternMatch<String> {
        let mut result = PatternMatch::NotFound;
        for text in texts {
            let found = match_cnic(text);
            if let PatternMatch::Malformed(raw) = &found {
                notes.push(ParseNote {
                    field,
                    raw: raw.clone(),
                });
            }
            result = result.merge(|| found);
            if result.is_matched() {
                break;
            }
        }
        result
    }
}

impl FieldMapper for PositionalMapper {
    fn map_front(&self, tokens: &[OcrToken]) -> FrontFields {
        let mut notes = Vec::new();

        // ID- or date-shaped tokens are never names
        let mut names = Self::value_tokens(tokens)
            .filter(|text| matches!(match_cnic(text), PatternMatch::NotFound))
            .filter(|text| match_dates(text).is_empty())
            .map(normalize_whitespace);

        let name = names.next();
        let guardian_name = names.next();

        let cnic = Self::scan_cnic(Self::value_tokens(tokens), "Id Card Number", &mut notes);

        FrontFields {
            name,
            guardian_name,
            cnic,
            notes,
        }
    }

    fn map_back(&self, tokens: &[OcrToken]) -> BackFields {
        let mut notes = Vec::new();
        let mut slots: Vec<Option<CardDate>> = Vec::with_capacity(3);
        const DATE_FIELDS: [&str; 3] = ["Date Of Birth", "Date Of Issue", "Date Of Expiry"];

        // A malformed date still occupies its slot so later dates keep their roles
        'tokens: for text in Self::value_tokens(tokens) {
            for found in match_dates(text) {
                if slots.len() == DATE_FIELDS.len() {
                    break 'tokens;
                }
                match found {
                    PatternMatch::Matched(date) => slots.push(Some(date)),
                    PatternMatch::Malformed(raw) => {
                        notes.push(ParseNote {
                            field: DATE_FIELDS[slots.len()],
                            raw,
                        });
                        slots.push(None);
                    }
                    PatternMatch::NotFound => {}
                }
            }
        }

        let mut slots = slots.into_iter();
        let date_of_birth = slots.next().flatten();
        let date_of_issue = slots.next().flatten();
        let date_of_expiry = slots.next().flatten();

        let cnic = Self::scan_cnic(Self::value_tokens(tokens), "back CNIC", &mut notes);

        BackFields {
            date_of_birth,
            date_of_issue,
            date_of_expiry,
            cnic,
            notes,
        }
    }
}
