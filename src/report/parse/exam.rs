use regex::escape;

use crate::report::fields::{
    ComplaintsField, DateField, IndicatorsField, ObjectiveField, RepeatField, SickLeaveField,
    SignPair, SignatureField, Site, SpecialtyField, SurdologyField, TuningFork,
};
use crate::report::labels;
use crate::report::parse::{capture, captures};

pub fn date(text: &str, current: &DateField) -> DateField {
    let line = text.lines().next().unwrap_or_default();
    let mut parsed = current.clone();
    match line.split_once(labels::TIME_SEPARATOR) {
        Some((date, time)) => {
            parsed.date = date.trim().to_string();
            parsed.time = time.trim().to_string();
            parsed.time_enabled = true;
        }
        None => {
            parsed.date = line.trim().to_string();
            parsed.time_enabled = false;
        }
    }
    parsed
}

pub fn specialty(text: &str, current: &SpecialtyField) -> Option<SpecialtyField> {
    let mut title = text.lines().next()?.trim_end();
    let cito = match title.strip_suffix(labels::CITO_SUFFIX) {
        Some(rest) => {
            title = rest;
            true
        }
        None => false,
    };
    if let Some(rest) = title.strip_suffix(labels::PREOP_SUFFIX) {
        title = rest;
    }
    let title = title.trim();
    let name = if title == labels::DEFAULT_SPECIALTY_TITLE {
        labels::DEFAULT_SPECIALTY.to_string()
    } else if title == current.name.to_uppercase() {
        current.name.clone()
    } else {
        title.to_string()
    };
    Some(SpecialtyField { name, cito })
}

fn unplaceholder(value: Option<String>) -> String {
    match value {
        Some(v) if v != labels::PLACEHOLDER => v,
        _ => String::new(),
    }
}

fn between(prefix: &str, suffix: &str) -> String {
    format!("{}(.*?){}", escape(prefix), escape(suffix))
}

pub fn indicators(text: &str, current: &IndicatorsField) -> Option<IndicatorsField> {
    let ad = capture(&between(labels::AD_PREFIX, labels::AD_SUFFIX), text);
    let temp = capture(&between(labels::TEMP_PREFIX, labels::TEMP_SUFFIX), text);
    if ad.is_none() && temp.is_none() {
        log::debug!("indicators cell has no anchors");
        return None;
    }
    let weight = capture(&between(labels::WEIGHT_PREFIX, labels::WEIGHT_SUFFIX), text);
    Some(IndicatorsField {
        ad: unplaceholder(ad),
        temp: unplaceholder(temp),
        weight: weight.unwrap_or_default(),
        paid_service: text.contains(labels::PAID_SERVICE),
        ..current.clone()
    })
}

pub fn complaints(text: &str, current: &ComplaintsField) -> Option<ComplaintsField> {
    let mut body = text.to_string();
    let no_card = match body.rfind(labels::NO_CARD) {
        Some(pos) => {
            body.truncate(pos);
            while body.ends_with('\n') {
                body.pop();
            }
            true
        }
        None => false,
    };

    let anamnesis_anchor = format!("\n{}", labels::ANAMNESIS_LABEL.trim_end());
    let (head, anamnesis, show_label) = match body.find(anamnesis_anchor.as_str()) {
        Some(pos) => (
            &body[..pos],
            &body[pos + anamnesis_anchor.len()..],
            true,
        ),
        None => match body.split_once('\n') {
            Some((head, rest)) => (head, rest, false),
            None => (body.as_str(), "", false),
        },
    };

    let mut parsed = current.clone();
    if let Some(value) = head.strip_prefix(labels::COMPLAINTS_LABEL.trim_end()) {
        parsed.no_complaints = false;
        parsed.complaints = value.trim().to_string();
    } else if head.starts_with(labels::NO_COMPLAINTS) {
        parsed.no_complaints = true;
    } else {
        log::debug!("complaints cell has no anchors");
        return None;
    }
    parsed.anamnesis = anamnesis.trim().to_string();
    parsed.show_anamnesis_label = show_label;
    parsed.no_card = no_card;
    Some(parsed)
}

pub fn consent(text: &str) -> bool {
    text.contains(labels::CONSENT_ANCHOR)
}

/// Offset-sort-slice over the labels of visible applicable sites.
pub fn objective(text: &str, current: &ObjectiveField) -> Option<ObjectiveField> {
    let marker = labels::OTHER_MARKER.to_string();
    let candidates: Vec<Site> = current.shown_sites().collect();
    let mut anchors: Vec<(usize, usize, Site)> = candidates
        .iter()
        .filter_map(|&site| {
            let needle = site.label().unwrap_or(marker.as_str());
            text.find(needle)
                .map(|start| (start, start + needle.len(), site))
        })
        .collect();
    if anchors.is_empty() {
        log::debug!("objective cell has no visible labels");
        return None;
    }
    anchors.sort_by_key(|&(start, _, _)| start);

    let mut parsed = current.clone();
    for &site in &candidates {
        parsed.set(site, String::new(), true);
    }
    for (i, &(_, end, site)) in anchors.iter().enumerate() {
        let stop = anchors
            .get(i + 1)
            .map(|&(next, _, _)| next)
            .unwrap_or(text.len())
            .max(end);
        let value = labels::strip_markers(&text[end..stop]);
        parsed.set(site, value.trim().to_string(), true);
    }
    Some(parsed)
}

pub fn surdology(text: &str, current: &SurdologyField) -> Option<SurdologyField> {
    let metres = |prefix: &str| {
        capture(
            &format!(
                "(?m){}(.*?){}(?:;|$)",
                escape(prefix),
                escape(labels::METRES_SUFFIX)
            ),
            text,
        )
    };
    let arrow = |name: &str| {
        capture(
            &format!(
                "{} ({}|{}|{})",
                escape(name),
                labels::ARROW_LEFT,
                labels::ARROW_CENTER,
                labels::ARROW_RIGHT
            ),
            text,
        )
    };
    let signs = |name: &str| {
        captures(&format!(r"([+-]?){}([+-]?)", escape(name)), text).map(|caps| {
            let side = |i| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
            SignPair::from_signs(side(1), side(2))
        })
    };

    let sr = metres(labels::WHISPER_PREFIX);
    let rr = metres(labels::SPEECH_PREFIX);
    let wc128 = arrow(labels::WC128);
    let wc512 = arrow(labels::WC512);
    let rn = signs(labels::RINNE);
    let fd = signs(labels::FEDERICI);
    let timp = captures(
        &format!(
            r"(?m)^{}(.*?){}(.*?)\.\s*$",
            escape(labels::TIMP_PREFIX),
            escape(labels::TIMP_MIDDLE)
        ),
        text,
    );
    let avg = captures(
        &format!(
            "{}(.*?){}(.*?){}",
            escape(labels::AVG_PREFIX),
            escape(labels::AVG_MIDDLE),
            escape(labels::AVG_SUFFIX)
        ),
        text,
    );

    let found = sr.is_some()
        || rr.is_some()
        || wc128.is_some()
        || wc512.is_some()
        || rn.is_some()
        || fd.is_some()
        || timp.is_some()
        || avg.is_some();
    if !found && !text.trim().is_empty() {
        log::debug!("surdology cell has no anchors");
        return None;
    }

    let group = |caps: &regex::Captures<'_>, i| {
        caps.get(i)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    let mut parsed = current.clone();
    parsed.sr = sr.unwrap_or_default();
    parsed.rr = rr.unwrap_or_default();
    parsed.wc128 = wc128
        .map(|a| TuningFork::from_arrow(&a))
        .unwrap_or_default();
    parsed.wc512 = wc512
        .map(|a| TuningFork::from_arrow(&a))
        .unwrap_or_default();
    parsed.rn = rn.unwrap_or_default();
    parsed.fd = fd.unwrap_or_default();
    parsed.timp.enabled = timp.is_some();
    if let Some(caps) = &timp {
        parsed.timp.ad = group(caps, 1);
        parsed.timp.as_ = group(caps, 2);
    }
    parsed.avg.enabled = avg.is_some();
    if let Some(caps) = &avg {
        parsed.avg.ad = group(caps, 1);
        parsed.avg.as_ = group(caps, 2);
    }
    Some(parsed)
}

/// Splits `"{date}[ {time}]"`. A trailing `H:MM` token is the time, even
/// with no date in front of it.
fn split_when(when: &str) -> (String, String) {
    let when = when.trim();
    if let Some(caps) = captures(r"^(?:(.*\S)[ \t]+)?(\d{1,2}:\d{2})$", when) {
        let date = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return (date.to_string(), caps[2].to_string());
    }
    match when.split_once([' ', '\t']) {
        Some((date, time)) => (date.to_string(), time.trim().to_string()),
        None => (when.to_string(), String::new()),
    }
}

/// The label line's remainder, and the line below it.
fn repeat_lines(text: &str) -> Option<(String, Option<String>)> {
    let caps = captures(
        &format!(
            r"(?m){}:?[ \t]*([^\n]*)$(?:\n([^\n]*))?",
            escape(labels::REPEAT_LABEL)
        ),
        text,
    )?;
    let rest = caps.get(1).map(|m| m.as_str().trim().to_string())?;
    Some((rest, caps.get(2).map(|m| m.as_str().to_string())))
}

/// Examination cell: the label on its own line, date and time on the next.
/// Text typed after the label on the same line is read as well.
pub fn repeat(text: &str, current: &RepeatField) -> Option<RepeatField> {
    let (rest, next) = repeat_lines(text)?;
    let when = if rest.is_empty() {
        next.unwrap_or_default()
    } else {
        rest
    };
    let (date, time) = split_when(&when);
    Some(RepeatField {
        enabled: current.enabled,
        date,
        time,
    })
}

/// Operation extra cell: label, date and time share one line. The line
/// below belongs to the sick-leave sentence.
pub fn repeat_line(text: &str, current: &RepeatField) -> Option<RepeatField> {
    let (rest, _) = repeat_lines(text)?;
    let (date, time) = split_when(&rest);
    Some(RepeatField {
        enabled: current.enabled,
        date,
        time,
    })
}

pub fn sick_leave(text: &str, current: &SickLeaveField) -> Option<SickLeaveField> {
    let variants = [
        (labels::SICK_LEAVE_PARENT_CONTINUED, true, true),
        (labels::SICK_LEAVE_PARENT, true, false),
        (labels::SICK_LEAVE_CONTINUED, false, true),
        (labels::SICK_LEAVE, false, false),
    ];
    let lines: Vec<&str> = text.lines().collect();
    let (index, rest, parent, continued) = lines.iter().enumerate().find_map(|(i, line)| {
        variants.iter().find_map(|&(prefix, parent, continued)| {
            line.strip_prefix(prefix)
                .map(|rest| (i, rest, parent, continued))
        })
    })?;

    let range = format!(
        r"(?P<num>.*?){}(?P<from>.*?){}(?P<to>.*?)\.?$",
        escape(labels::DATE_FROM),
        escape(labels::DATE_TO)
    );
    let pattern = if continued {
        format!(
            r"(?i)^ ?(?P<prev>.*?){}\s?{range}",
            escape(labels::SICK_LEAVE_CONTINUATION_NUMBER.trim_end())
        )
    } else {
        format!(r"(?i)^ ?{}\s?{range}", escape(labels::NUMBER_SIGN))
    };
    let Some(caps) = captures(&pattern, rest) else {
        log::debug!("sick leave sentence did not match its template");
        return None;
    };
    let named = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    let mut parsed = current.clone();
    parsed.parent = parent;
    parsed.continued = continued;
    parsed.number = named("num");
    parsed.date_from = named("from");
    parsed.date_to = named("to");
    if continued {
        parsed.prev_number = named("prev");
    }

    if parent && let Some(line) = lines.get(index + 1) {
        let pattern = format!(
            r"^(?P<fio>.*?), (?P<dob>.*?){}(?P<addr>.*?){}(?P<job>.*)$",
            escape(labels::PARENT_DOB_SUFFIX),
            escape(labels::PARENT_JOB)
        );
        if let Some(caps) = captures(&pattern, line) {
            let named = |name: &str| {
                caps.name(name)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            };
            parsed.parent_fio = named("fio");
            parsed.parent_dob = named("dob");
            parsed.address = named("addr");
            parsed.job = named("job");
        }
    }
    Some(parsed)
}

pub fn signature(text: &str, current: &SignatureField) -> Option<SignatureField> {
    let line = text.lines().next()?;
    let (specialty, doctor) = line.split_once(labels::SIGNATURE_LINE.trim())?;
    Some(SignatureField {
        specialty: specialty.trim().to_string(),
        doctor_name: doctor.trim().to_string(),
        visible: current.visible,
    })
}
