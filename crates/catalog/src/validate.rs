use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::config::CheckConfig;
use crate::error::CatalogError;
use crate::model::{Catalog, Message, Status, Translation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Plural form count differs from what the language rule needs.
    NumerusArity { expected: usize, found: usize },
    /// A `%1`..`%99` marker that only one side uses.
    PlaceMarkerMismatch { marker: String },
    /// Same source and comment twice within one context.
    DuplicateMessage,
    EmptyFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub context: String,
    pub source: String,
    pub kind: IssueKind,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: ", self.context, self.source)?;
        match &self.kind {
            IssueKind::NumerusArity { expected, found } => {
                write!(f, "expected {expected} numerus form(s), found {found}")
            }
            IssueKind::PlaceMarkerMismatch { marker } => {
                write!(f, "place marker {marker} differs between source and translation")
            }
            IssueKind::DuplicateMessage => f.write_str("duplicate message"),
            IssueKind::EmptyFinished => f.write_str("finished translation is empty"),
        }
    }
}

/// Runs the enabled checks over every live message. Obsolete and vanished
/// messages are history and never reported.
/// （對每則現行訊息執行啟用的檢查；已過時與已消失訊息不回報。）
pub fn validate(catalog: &Catalog, checks: &CheckConfig) -> Result<Vec<Issue>, CatalogError> {
    let expected_forms = catalog.numerus_rule()?.form_count();
    let mut issues = Vec::new();
    for context in &catalog.contexts {
        let mut seen = HashSet::new();
        for message in context.messages.iter().filter(|message| message.status.is_live()) {
            let mut report = |kind| {
                issues.push(Issue {
                    context: context.name.clone(),
                    source: message.source.clone(),
                    kind,
                })
            };

            if checks.duplicates
                && !seen.insert((message.source.as_str(), message.comment_or_empty()))
            {
                report(IssueKind::DuplicateMessage);
            }
            match &message.translation {
                Translation::Plural(forms) => {
                    if checks.numerus_arity && forms.len() != expected_forms {
                        report(IssueKind::NumerusArity {
                            expected: expected_forms,
                            found: forms.len(),
                        });
                    }
                }
                Translation::Singular(text) => {
                    if checks.empty_finished
                        && message.status == Status::Finished
                        && text.is_empty()
                    {
                        report(IssueKind::EmptyFinished);
                    }
                }
            }
            if checks.place_markers {
                for marker in place_marker_mismatches(message) {
                    report(IssueKind::PlaceMarkerMismatch { marker });
                }
            }
        }
    }
    Ok(issues)
}

fn place_marker_mismatches(message: &Message) -> Vec<String> {
    let expected = place_markers(&message.source);
    let texts: Vec<&str> = match &message.translation {
        Translation::Singular(text) => vec![text.as_str()],
        Translation::Plural(forms) => forms.iter().map(String::as_str).collect(),
    };
    let mut mismatched = BTreeSet::new();
    for text in texts.into_iter().filter(|text| !text.is_empty()) {
        let found = place_markers(text);
        mismatched.extend(expected.symmetric_difference(&found).copied());
    }
    mismatched
        .into_iter()
        .map(|number| format!("%{number}"))
        .collect()
}

/// Numbers of the `%1`..`%99` markers in `text`, including the localized
/// `%L1` spelling.
fn place_markers(text: &str) -> BTreeSet<u32> {
    let bytes = text.as_bytes();
    let mut markers = BTreeSet::new();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] != b'%' {
            index += 1;
            continue;
        }
        let mut digits_start = index + 1;
        if bytes.get(digits_start) == Some(&b'L') {
            digits_start += 1;
        }
        let digits_end = bytes[digits_start..]
            .iter()
            .take(2)
            .take_while(|byte| byte.is_ascii_digit())
            .count()
            + digits_start;
        if digits_end > digits_start {
            if let Ok(number) = text[digits_start..digits_end].parse::<u32>() {
                if number > 0 {
                    markers.insert(number);
                }
            }
            index = digits_end;
        } else {
            index += 1;
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_collected() {
        assert_eq!(place_markers("%1: %n flight(s)"), BTreeSet::from([1]));
        assert_eq!(place_markers("%L2 of %1, 100%"), BTreeSet::from([1, 2]));
        assert_eq!(place_markers("%12%3"), BTreeSet::from([12, 3]));
        assert!(place_markers("%0 and %%").is_empty());
    }

    #[test]
    fn missing_marker_in_one_form_is_reported() {
        let message = Message::plural(
            "%1: %n flight(s)",
            ["%1: %n Flug", "%n Flüge"],
            Status::Finished,
        );
        assert_eq!(place_marker_mismatches(&message), vec!["%1".to_string()]);
    }

    #[test]
    fn empty_translation_has_no_marker_issue() {
        let message = Message::singular("%1: no flights", "", Status::Unfinished);
        assert!(place_marker_mismatches(&message).is_empty());
    }
}
