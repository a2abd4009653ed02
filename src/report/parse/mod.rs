//! Reverse direction: table cells back into Field Store values.
//!
//! Parsers are anchored on the fixed strings in [`crate::report::labels`].
//! A parser that cannot find its anchors returns `None`, and the pass stays
//! silent for that group.

pub mod exam;
pub mod operation;

use regex::{Captures, Regex};

use crate::document::html;
use crate::document::model::{Block, Document, Paragraph};
use crate::report::Mode;
use crate::report::arbiter::FieldGroup;
use crate::report::events::EditorEvent;
use crate::report::fields::{DiagnosisField, FieldStore, Normalize, RecommendationsField};
use crate::report::labels;
use crate::report::layout::{RowMap, Section, Visibility};

pub(crate) fn captures<'t>(pattern: &str, text: &'t str) -> Option<Captures<'t>> {
    Regex::new(pattern).ok()?.captures(text)
}

/// First capture group of `pattern`, trimmed.
pub(crate) fn capture(pattern: &str, text: &str) -> Option<String> {
    captures(pattern, text)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
}

pub fn cell_text(doc: &Document, map: &RowMap, section: Section, col: usize) -> Option<String> {
    Some(doc.cell(map.cell(section, 0, col)?)?.plain_text())
}

pub fn cell_blocks<'d>(
    doc: &'d Document,
    map: &RowMap,
    section: Section,
    col: usize,
) -> Option<&'d [Block]> {
    Some(doc.cell(map.cell(section, 0, col)?)?.blocks.as_slice())
}

/// Serializes rich cell content; content without visible blocks is the empty string.
pub fn rich_text(blocks: &[Block]) -> String {
    let all_empty = blocks
        .iter()
        .all(|b| matches!(b, Block::Paragraph(p) if p.is_empty()));
    if all_empty {
        String::new()
    } else {
        html::blocks_to_html(blocks)
    }
}

/// Canonical form of a stored fragment, comparable with [`rich_text`] output.
pub fn canonical_rich(fragment: &str) -> String {
    rich_text(&html::html_to_blocks(fragment))
}

fn trim_paragraph_start(p: &mut Paragraph) {
    while let Some(first) = p.runs.first_mut() {
        let trimmed = first.text.trim_start();
        if trimmed.is_empty() {
            p.runs.remove(0);
        } else {
            first.text = trimmed.to_string();
            break;
        }
    }
}

/// Removes `prefix` from the start of the paragraph's text, across run boundaries.
fn strip_paragraph_prefix(p: &mut Paragraph, prefix: &str) -> bool {
    trim_paragraph_start(p);
    if !p.text().starts_with(prefix) {
        return false;
    }
    let mut remaining = prefix.len();
    while remaining > 0 {
        let Some(first) = p.runs.first_mut() else {
            break;
        };
        if first.text.len() <= remaining {
            remaining -= first.text.len();
            p.runs.remove(0);
        } else {
            first.text = first.text[remaining..].to_string();
            remaining = 0;
        }
    }
    trim_paragraph_start(p);
    true
}

/// Strips a leading labelled paragraph. Drops it when nothing but the label was there.
fn take_leading_label(blocks: &mut Vec<Block>, label: &str) -> bool {
    let Some(Block::Paragraph(first)) = blocks.first_mut() else {
        return false;
    };
    if !strip_paragraph_prefix(first, label) {
        return false;
    }
    if first.is_empty() {
        blocks.remove(0);
    }
    true
}

pub fn diagnosis(blocks: &[Block], current: &DiagnosisField, mode: Mode) -> DiagnosisField {
    let mut blocks = blocks.to_vec();
    let label = labels::DIAGNOSIS_LABEL.trim_end();
    match mode {
        Mode::Examination => {
            let no_acute = take_leading_label(&mut blocks, labels::NO_ACUTE_PATHOLOGY);
            let show_label = take_leading_label(&mut blocks, label);
            DiagnosisField {
                text: rich_text(&blocks),
                show_label,
                no_acute_pathology: no_acute,
            }
        }
        Mode::Operation => {
            take_leading_label(&mut blocks, label);
            DiagnosisField {
                text: rich_text(&blocks),
                ..current.clone()
            }
        }
    }
}

pub fn recommendations(label: Option<&str>, text: &[Block]) -> RecommendationsField {
    RecommendationsField {
        text: rich_text(text),
        show_label: label.is_some_and(|l| l.trim() == labels::RECOMMENDATIONS_LABEL),
    }
}

pub fn op_recommendations(blocks: &[Block]) -> RecommendationsField {
    let mut blocks = blocks.to_vec();
    let show_label = take_leading_label(&mut blocks, labels::RECOMMENDATIONS_LABEL);
    RecommendationsField {
        text: rich_text(&blocks),
        show_label,
    }
}

fn same_diagnosis(stored: &DiagnosisField, parsed: &DiagnosisField) -> bool {
    stored.show_label == parsed.show_label
        && stored.no_acute_pathology == parsed.no_acute_pathology
        && canonical_rich(&stored.text) == parsed.text
}

fn same_recommendations(stored: &RecommendationsField, parsed: &RecommendationsField) -> bool {
    stored.show_label == parsed.show_label && canonical_rich(&stored.text) == parsed.text
}

/// Stores `parsed` when it differs from `slot` and builds the matching event.
fn commit<T: PartialEq + Clone>(
    slot: &mut T,
    parsed: T,
    event: impl FnOnce(T) -> EditorEvent,
) -> Option<EditorEvent> {
    if *slot == parsed {
        return None;
    }
    *slot = parsed.clone();
    Some(event(parsed))
}

/// Re-reads one group's cells. Returns the event to raise when its value changed.
pub fn parse_group(
    doc: &Document,
    map: &RowMap,
    group: FieldGroup,
    store: &mut FieldStore,
    vis: &Visibility,
) -> Option<EditorEvent> {
    let mode = vis.mode();
    let text = |section: Section, col: usize| cell_text(doc, map, section, col);

    match (group, mode) {
        (FieldGroup::Date, _) => {
            let parsed = exam::date(&text(Section::Header, 0)?, &store.date).normalized();
            commit(&mut store.date, parsed, EditorEvent::DateChanged)
        }
        (FieldGroup::Specialty, _) => {
            let parsed =
                exam::specialty(&text(Section::Header, 1)?, &store.specialty)?.normalized();
            commit(&mut store.specialty, parsed, EditorEvent::SpecialtyChanged)
        }
        (FieldGroup::Indicators, Mode::Examination) => {
            let parsed =
                exam::indicators(&text(Section::Indicators, 0)?, &store.indicators)?.normalized();
            commit(&mut store.indicators, parsed, EditorEvent::IndicatorsChanged)
        }
        (FieldGroup::Complaints, Mode::Examination) => {
            let parsed =
                exam::complaints(&text(Section::Indicators, 1)?, &store.complaints)?.normalized();
            commit(
                &mut store.complaints,
                parsed,
                EditorEvent::ComplaintsAnamnesisChanged,
            )
        }
        (FieldGroup::Consent, Mode::Examination) => {
            let parsed = exam::consent(&text(Section::Consent, 0)?);
            commit(&mut store.consent, parsed, EditorEvent::ConsentChanged)
        }
        (FieldGroup::Objective, Mode::Examination) => {
            let parsed =
                exam::objective(&text(Section::Objective, 0)?, &store.objective)?.normalized();
            commit(&mut store.objective, parsed, EditorEvent::ObjectiveChanged)
        }
        (FieldGroup::Surdology, Mode::Examination) => {
            let parsed =
                exam::surdology(&text(Section::Surdology, 0)?, &store.surdology)?.normalized();
            commit(&mut store.surdology, parsed, EditorEvent::SurdologyChanged)
        }
        (FieldGroup::Diagnosis, _) => {
            let blocks = cell_blocks(doc, map, Section::Diagnosis, 0)?;
            let slot = store.diagnosis.get_mut(mode);
            let parsed = diagnosis(blocks, slot, mode);
            if same_diagnosis(slot, &parsed) {
                return None;
            }
            *slot = parsed.clone();
            Some(EditorEvent::DiagnosisChanged(parsed))
        }
        (FieldGroup::Recommendations, _) => {
            let parsed = match mode {
                Mode::Examination => {
                    let body = cell_blocks(doc, map, Section::Recommendations, 1)?;
                    let label = text(Section::Recommendations, 0);
                    recommendations(label.as_deref(), body)
                }
                Mode::Operation => {
                    op_recommendations(cell_blocks(doc, map, Section::OpRecommendations, 0)?)
                }
            };
            let slot = store.recommendations.get_mut(mode);
            if same_recommendations(slot, &parsed) {
                return None;
            }
            *slot = parsed.clone();
            Some(EditorEvent::RecommendationsChanged(parsed))
        }
        (FieldGroup::Repeat, _) => {
            let parsed = match mode {
                Mode::Examination => exam::repeat(&text(Section::Repeat, 0)?, &store.repeat),
                Mode::Operation => exam::repeat_line(&text(Section::OpExtra, 0)?, &store.repeat),
            }?
            .normalized();
            commit(&mut store.repeat, parsed, EditorEvent::RepeatChanged)
        }
        (FieldGroup::SickLeave, _) => {
            let source = match mode {
                Mode::Examination => text(Section::SickLeave, 0)?,
                Mode::Operation => text(Section::OpExtra, 0)?,
            };
            let parsed = exam::sick_leave(&source, &store.sick_leave)?.normalized();
            commit(&mut store.sick_leave, parsed, EditorEvent::SickLeaveChanged)
        }
        (FieldGroup::Signature, _) => {
            let parsed =
                exam::signature(&text(Section::Signature, 0)?, &store.signature)?.normalized();
            commit(&mut store.signature, parsed, EditorEvent::SignatureChanged)
        }
        (FieldGroup::Operation, Mode::Operation) => {
            let preop = text(Section::Operation, 0)
                .and_then(|t| operation::preop(&t, &store.operation));
            let base = preop.clone().unwrap_or_else(|| store.operation.clone());
            let described = text(Section::OpDescription, 0)
                .and_then(|t| operation::description(&t, &base));
            let parsed = described.or(preop)?.normalized();
            commit(&mut store.operation, parsed, EditorEvent::OperationDataChanged)
        }
        (FieldGroup::OpStaff, Mode::Operation) => {
            let parsed =
                operation::staff(&text(Section::OpStaff, 0)?, &store.op_staff)?.normalized();
            commit(&mut store.op_staff, parsed, EditorEvent::OperationStaffChanged)
        }
        _ => None,
    }
}
