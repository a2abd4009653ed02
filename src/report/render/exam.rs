use crate::document::html;
use crate::document::model::{Block, ParagraphAlignment, RunStyle};
use crate::report::Mode;
use crate::report::fields::{
    ComplaintsField, DateField, DiagnosisField, IndicatorsField, ObjectiveField,
    RecommendationsField, RepeatField, SickLeaveField, SignatureField, SpecialtyField,
    SurdologyField,
};
use crate::report::labels;
use crate::report::render::CellWriter;

pub fn date_cell(date: &DateField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.plain(&date.date);
    if date.time_enabled {
        w.plain(labels::TIME_SEPARATOR).plain(&date.time);
    }
    w.finish()
}

/// Header title for a specialty: the default one has a fixed title, others are upper-cased.
pub fn specialty_title(specialty: &SpecialtyField, mode: Mode) -> String {
    let mut title = if specialty.name == labels::DEFAULT_SPECIALTY {
        labels::DEFAULT_SPECIALTY_TITLE.to_string()
    } else {
        specialty.name.to_uppercase()
    };
    if mode == Mode::Operation {
        title.push_str(labels::PREOP_SUFFIX);
    }
    if specialty.cito {
        title.push_str(labels::CITO_SUFFIX);
    }
    title
}

pub fn specialty_cell(specialty: &SpecialtyField, mode: Mode) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Center)
        .bold(&specialty_title(specialty, mode));
    w.finish()
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        labels::PLACEHOLDER
    } else {
        value
    }
}

pub fn indicators_cell(ind: &IndicatorsField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.plain(&format!(
        "{}{}{}",
        labels::AD_PREFIX,
        or_placeholder(&ind.ad),
        labels::AD_SUFFIX
    ));
    w.newline().plain(&format!(
        "{}{}{}",
        labels::TEMP_PREFIX,
        or_placeholder(&ind.temp),
        labels::TEMP_SUFFIX
    ));
    if !ind.weight.trim().is_empty() {
        w.newline().plain(&format!(
            "{}{}{}",
            labels::WEIGHT_PREFIX,
            ind.weight,
            labels::WEIGHT_SUFFIX
        ));
    }
    if ind.paid_service {
        w.newline().newline().plain(labels::PAID_SERVICE);
    }
    w.finish()
}

pub fn complaints_cell(c: &ComplaintsField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if c.no_complaints {
        w.plain(labels::NO_COMPLAINTS);
    } else {
        w.plain(labels::COMPLAINTS_LABEL).plain(&c.complaints);
    }
    w.newline();
    if c.show_anamnesis_label {
        w.plain(labels::ANAMNESIS_LABEL);
    }
    w.plain(&c.anamnesis);
    if c.no_card {
        w.newline().bold(labels::NO_CARD);
    }
    w.finish()
}

pub fn consent_cell(consent: bool) -> Vec<Block> {
    let mut w = CellWriter::new();
    if consent {
        w.styled(labels::CONSENT_TEXT, &RunStyle::sized(labels::CONSENT_FONT_PT));
    }
    w.finish()
}

pub fn objective_cell(obj: &ObjectiveField) -> Vec<Block> {
    let marker = labels::OTHER_MARKER.to_string();
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Center)
        .bold(labels::OBJECTIVE_HEADER);
    if !obj.other_vis {
        w.plain(&marker);
    }
    w.newline().align(ParagraphAlignment::Left);

    for (i, site) in obj.shown_sites().enumerate() {
        if i > 0 {
            w.newline();
        }
        match site.label() {
            Some(label) => {
                w.bold(label).plain(" ").plain(obj.value(site));
            }
            None => {
                w.plain(&marker).plain(obj.value(site));
            }
        }
    }
    w.finish()
}

/// First surdology line: the set measurements joined by `"; "`.
pub fn hearing_line(s: &SurdologyField) -> String {
    let mut parts = Vec::new();
    if !s.sr.trim().is_empty() {
        parts.push(format!("{}{}{}", labels::WHISPER_PREFIX, s.sr, labels::METRES_SUFFIX));
    }
    if !s.rr.trim().is_empty() {
        parts.push(format!("{}{}{}", labels::SPEECH_PREFIX, s.rr, labels::METRES_SUFFIX));
    }
    if let Some(arrow) = s.wc128.arrow() {
        parts.push(format!("{} {arrow}", labels::WC128));
    }
    if let Some(arrow) = s.wc512.arrow() {
        parts.push(format!("{} {arrow}", labels::WC512));
    }
    parts.extend(s.rn.render(labels::RINNE));
    parts.extend(s.fd.render(labels::FEDERICI));
    parts.join(labels::PARTS_SEPARATOR)
}

pub fn surdology_cell(s: &SurdologyField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if !s.enabled {
        return w.finish();
    }
    w.plain(&hearing_line(s));
    if s.timp.enabled {
        if !w.is_empty() {
            w.newline();
        }
        w.plain(&format!(
            "{}{}{}{}.",
            labels::TIMP_PREFIX,
            s.timp.ad,
            labels::TIMP_MIDDLE,
            s.timp.as_
        ));
    }
    if s.avg.enabled {
        if !w.is_empty() {
            w.newline();
        }
        w.plain(&format!(
            "{}{}{}{}{}",
            labels::AVG_PREFIX,
            s.avg.ad,
            labels::AVG_MIDDLE,
            s.avg.as_,
            labels::AVG_SUFFIX
        ));
    }
    w.finish()
}

pub fn diagnosis_cell(d: &DiagnosisField) -> Vec<Block> {
    let has_text = !html::is_blank(&d.text);
    let mut w = CellWriter::new();
    if d.no_acute_pathology {
        w.bold(labels::NO_ACUTE_PATHOLOGY);
        if d.show_label || has_text {
            w.newline();
        }
    }
    if d.show_label {
        w.bold(labels::DIAGNOSIS_LABEL).plain(" ");
    }
    if has_text {
        w.rich(&d.text);
    }
    w.finish()
}

/// Label cell and text cell of the recommendations row.
pub fn recommendations_cells(r: &RecommendationsField) -> (Vec<Block>, Vec<Block>) {
    let mut label = CellWriter::new();
    if r.show_label {
        label.bold(labels::RECOMMENDATIONS_LABEL);
    }
    let mut text = CellWriter::new();
    if !html::is_blank(&r.text) {
        text.rich(&r.text);
    }
    (label.finish(), text.finish())
}

/// `"{date} {time}"` with empty parts left out.
pub fn repeat_when(r: &RepeatField) -> String {
    [r.date.trim(), r.time.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn repeat_cell(r: &RepeatField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if r.enabled {
        w.bold(labels::REPEAT_LABEL).newline().plain(&repeat_when(r));
    }
    w.finish()
}

/// The issued sentence and, for a parent, the parent's details line.
pub fn sick_leave_lines(s: &SickLeaveField) -> Vec<String> {
    let range = format!(
        "{}{}{}{}.",
        labels::DATE_FROM,
        s.date_from,
        labels::DATE_TO,
        s.date_to
    );
    let first = match (s.parent, s.continued) {
        (true, true) => format!(
            "{} {}{}{}{range}",
            labels::SICK_LEAVE_PARENT_CONTINUED,
            s.prev_number,
            labels::SICK_LEAVE_CONTINUATION_NUMBER,
            s.number
        ),
        (true, false) => format!(
            "{} {} {}{range}",
            labels::SICK_LEAVE_PARENT,
            labels::NUMBER_SIGN,
            s.number
        ),
        (false, true) => format!(
            "{} {}{}{}{range}",
            labels::SICK_LEAVE_CONTINUED,
            s.prev_number,
            labels::SICK_LEAVE_CONTINUATION_NUMBER,
            s.number
        ),
        (false, false) => format!(
            "{} {} {}{range}",
            labels::SICK_LEAVE,
            labels::NUMBER_SIGN,
            s.number
        ),
    };
    let mut lines = vec![first];
    if s.parent {
        lines.push(format!(
            "{}, {}{}{}{}{}",
            s.parent_fio,
            s.parent_dob,
            labels::PARENT_DOB_SUFFIX,
            s.address,
            labels::PARENT_JOB,
            s.job
        ));
    }
    lines
}

pub fn sick_leave_cell(s: &SickLeaveField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if s.issued {
        w.plain(&sick_leave_lines(s).join("\n"));
    }
    w.finish()
}

pub fn signature_cell(sig: &SignatureField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Right).plain(&format!(
        "{}{}{}",
        sig.specialty,
        labels::SIGNATURE_LINE,
        sig.doctor_name
    ));
    w.finish()
}
