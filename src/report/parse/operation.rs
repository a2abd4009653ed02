use regex::escape;

use crate::report::fields::{GeneralCondition, OpStaffField, OperationField};
use crate::report::labels;
use crate::report::parse::capture;

const VITAL_LABELS: [&str; 4] = [
    labels::GENERAL_CONDITION,
    labels::OP_AD_PREFIX,
    labels::PULSE_PREFIX,
    labels::OP_TEMP_PREFIX,
];

fn joined(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

/// Preoperative cell. Lines are classified by their leading labels, so the
/// free text in between may span several lines.
pub fn preop(text: &str, current: &OperationField) -> Option<OperationField> {
    let lines: Vec<&str> = text.split('\n').collect();
    let header = lines
        .iter()
        .position(|l| l.trim() == labels::PREOP_HEADER);
    let st_localis = lines
        .iter()
        .position(|l| l.starts_with(labels::ST_LOCALIS));
    if header.is_none() && st_localis.is_none() {
        log::debug!("preoperative cell has no anchors");
        return None;
    }

    let start = header.map(|h| h + 1).unwrap_or(0);
    let st_index = st_localis.unwrap_or(lines.len()).max(start);
    let pre = &lines[start..st_index];
    let vitals_index = pre
        .iter()
        .rposition(|l| VITAL_LABELS.iter().any(|v| l.starts_with(v)));
    let consent_index = pre
        .iter()
        .position(|l| l.starts_with(labels::CONSENT_ANCHOR));
    let complaints_end = [vitals_index, consent_index]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(pre.len());

    let mut parsed = current.clone();
    parsed.complaints_anamnesis = joined(&pre[..complaints_end]);
    parsed.informed_consent = consent_index.is_some();

    let vitals = vitals_index.map(|i| pre[i]).unwrap_or_default();
    let vital = |prefix: &str, suffix: &str| {
        capture(
            &format!("{}(.*?){}", escape(prefix), escape(suffix)),
            vitals,
        )
        .unwrap_or_default()
    };
    parsed.general_condition = capture(
        &format!("{}(.*?)(?:;|$)", escape(labels::GENERAL_CONDITION)),
        vitals,
    )
    .map(|label| GeneralCondition::from_label(&label))
    .unwrap_or(GeneralCondition::Unspecified);
    parsed.ad = vital(labels::OP_AD_PREFIX, labels::OP_AD_SUFFIX);
    parsed.pulse = vital(labels::PULSE_PREFIX, labels::PULSE_SUFFIX);
    parsed.temp = vital(labels::OP_TEMP_PREFIX, labels::OP_TEMP_SUFFIX);

    let intervention = lines
        .iter()
        .skip(st_index)
        .position(|l| l.starts_with(labels::INTERVENTION_LABEL))
        .map(|i| i + st_index);
    let objective_end = intervention.unwrap_or(lines.len());
    parsed.objective_examination = match st_localis {
        Some(st) => {
            let block = joined(&lines[st..objective_end.max(st)]);
            block
                .strip_prefix(labels::ST_LOCALIS)
                .unwrap_or(block.as_str())
                .trim()
                .to_string()
        }
        None => String::new(),
    };

    let tail_start = intervention.unwrap_or(objective_end);
    let consent_line = lines
        .iter()
        .skip(tail_start)
        .position(|l| l.starts_with(labels::INTERVENTION_CONSENT))
        .map(|i| i + tail_start);
    parsed.intervention_consent = consent_line.is_some();
    parsed.intervention = match intervention {
        Some(i) => {
            let block = joined(&lines[i..consent_line.unwrap_or(lines.len())]);
            block
                .strip_prefix(labels::INTERVENTION_LABEL)
                .unwrap_or(block.as_str())
                .trim()
                .to_string()
        }
        None => String::new(),
    };
    Some(parsed)
}

/// Number line, then the name line, then the description.
pub fn description(text: &str, current: &OperationField) -> Option<OperationField> {
    let lines: Vec<&str> = text.split('\n').collect();
    let prefix = labels::OP_NUMBER_PREFIX.trim_end();
    let index = lines.iter().position(|l| l.contains(prefix))?;
    let (_, number) = lines[index].split_once(prefix)?;

    let mut parsed = current.clone();
    parsed.op_number = number.trim().to_string();
    parsed.op_name = lines
        .get(index + 1)
        .map(|l| l.trim().to_string())
        .unwrap_or_default();
    parsed.op_description = lines
        .get(index + 2..)
        .map(joined)
        .unwrap_or_default();
    Some(parsed)
}

pub fn staff(text: &str, current: &OpStaffField) -> Option<OpStaffField> {
    let line_of = |prefix: &str| {
        capture(
            &format!(r"{}[ \t]*(.*)", escape(prefix.trim_end())),
            text,
        )
    };
    let operator = line_of(labels::OPERATOR_PREFIX);
    let nurse = line_of(labels::NURSE_PREFIX);
    if operator.is_none() && nurse.is_none() {
        log::debug!("staff cell has no anchors");
        return None;
    }
    Some(OpStaffField {
        operator: operator.unwrap_or_else(|| current.operator.clone()),
        nurse: nurse.unwrap_or_else(|| current.nurse.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::Block;
    use crate::report::render::operation as render;

    fn text(blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sample() -> OperationField {
        OperationField {
            complaints_anamnesis: "заложенность носа\nболеет год".to_string(),
            informed_consent: true,
            general_condition: GeneralCondition::Moderate,
            ad: "125/80".to_string(),
            pulse: "80".to_string(),
            temp: "36.7".to_string(),
            objective_examination: "искривление перегородки\nвлево".to_string(),
            intervention: "септопластика".to_string(),
            intervention_consent: true,
            op_number: "12".to_string(),
            op_name: "Септопластика".to_string(),
            op_description: "Под местной анестезией\nвыполнено".to_string(),
        }
    }

    #[test]
    fn preop_and_description_round_trip() {
        let value = sample();
        let preop_text = text(&render::operation_cell(&value));
        let parsed = preop(&preop_text, &OperationField::default()).unwrap();
        let described_text = text(&render::description_cell(&value));
        let parsed = description(&described_text, &parsed).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn unset_vitals_and_consents_round_trip() {
        let value = OperationField {
            general_condition: GeneralCondition::Unspecified,
            informed_consent: false,
            intervention_consent: false,
            complaints_anamnesis: String::new(),
            ..sample()
        };
        let parsed = preop(&text(&render::operation_cell(&value)), &sample()).unwrap();
        assert_eq!(parsed.general_condition, GeneralCondition::Unspecified);
        assert!(!parsed.informed_consent);
        assert!(!parsed.intervention_consent);
        assert!(parsed.complaints_anamnesis.is_empty());
        assert_eq!(parsed.ad, "125/80");
    }

    #[test]
    fn staff_round_trips() {
        let value = OpStaffField {
            operator: "Иванов И.И.".to_string(),
            nurse: "Петрова А.А.".to_string(),
        };
        let parsed = staff(&text(&render::staff_cell(&value)), &OpStaffField::default()).unwrap();
        assert_eq!(parsed, value);
        assert!(staff("", &value).is_none());
    }
}
