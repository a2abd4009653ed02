use crate::document::html;
use crate::document::model::{Block, ParagraphAlignment, RunStyle};
use crate::report::fields::{
    DiagnosisField, GeneralCondition, OpStaffField, OperationField, RecommendationsField,
    RepeatField, SickLeaveField,
};
use crate::report::labels;
use crate::report::render::{CellWriter, exam};

/// Bold label and plain value of each set vital, in print order.
pub fn vitals(op: &OperationField) -> Vec<(&'static str, String)> {
    let mut parts = Vec::new();
    if op.general_condition != GeneralCondition::Unspecified {
        parts.push((
            labels::GENERAL_CONDITION,
            op.general_condition.label().to_string(),
        ));
    }
    if !op.ad.trim().is_empty() {
        parts.push((labels::OP_AD_PREFIX, format!("{}{}", op.ad, labels::OP_AD_SUFFIX)));
    }
    if !op.pulse.trim().is_empty() {
        parts.push((labels::PULSE_PREFIX, format!("{}{}", op.pulse, labels::PULSE_SUFFIX)));
    }
    if !op.temp.trim().is_empty() {
        parts.push((
            labels::OP_TEMP_PREFIX,
            format!("{}{}", op.temp, labels::OP_TEMP_SUFFIX),
        ));
    }
    parts
}

pub fn operation_cell(op: &OperationField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Center)
        .bold(labels::PREOP_HEADER)
        .newline()
        .align(ParagraphAlignment::Left);

    if !op.complaints_anamnesis.trim().is_empty() {
        w.plain(&op.complaints_anamnesis).newline();
    }
    if op.informed_consent {
        w.styled(labels::CONSENT_TEXT, &RunStyle::sized(labels::CONSENT_FONT_PT))
            .newline();
    }

    let parts = vitals(op);
    for (i, (label, value)) in parts.iter().enumerate() {
        if i > 0 {
            w.plain(labels::PARTS_SEPARATOR);
        }
        w.bold(label).plain(value);
    }
    if !parts.is_empty() {
        w.newline();
    }

    w.bold(labels::ST_LOCALIS)
        .plain(" ")
        .plain(&op.objective_examination)
        .newline()
        .newline();
    w.bold(labels::INTERVENTION_LABEL)
        .plain(" ")
        .plain(&op.intervention);
    if op.intervention_consent {
        w.newline().plain(labels::INTERVENTION_CONSENT);
    }
    w.finish()
}

pub fn description_cell(op: &OperationField) -> Vec<Block> {
    let has_description = !op.op_description.trim().is_empty();
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Center)
        .bold(&format!("{}{}", labels::OP_NUMBER_PREFIX, op.op_number));
    if has_description || !op.op_name.trim().is_empty() {
        w.newline().bold(&op.op_name);
    }
    if has_description {
        w.newline()
            .align(ParagraphAlignment::Left)
            .plain(&op.op_description);
    }
    w.finish()
}

/// The label is always shown in operation mode and the no-acute notice never is.
pub fn diagnosis_cell(d: &DiagnosisField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.bold(labels::DIAGNOSIS_LABEL).plain(" ");
    if !html::is_blank(&d.text) {
        w.rich(&d.text);
    }
    w.finish()
}

pub fn staff_cell(staff: &OpStaffField) -> Vec<Block> {
    let mut w = CellWriter::new();
    w.align(ParagraphAlignment::Right)
        .plain(&format!("{}{}", labels::OPERATOR_PREFIX, staff.operator))
        .newline()
        .plain(&format!("{}{}", labels::NURSE_PREFIX, staff.nurse));
    w.finish()
}

pub fn recommendations_cell(r: &RecommendationsField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if r.show_label {
        w.bold(labels::RECOMMENDATIONS_LABEL).plain(" ");
    }
    if !html::is_blank(&r.text) {
        w.rich(&r.text);
    }
    w.finish()
}

pub fn extra_cell(repeat: &RepeatField, sick_leave: &SickLeaveField) -> Vec<Block> {
    let mut w = CellWriter::new();
    if repeat.enabled {
        w.bold(labels::REPEAT_LABEL)
            .plain(&format!(" {}", exam::repeat_when(repeat)));
    }
    if sick_leave.issued {
        if !w.is_empty() {
            w.newline();
        }
        w.plain(&exam::sick_leave_lines(sick_leave).join("\n"));
    }
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(blocks: &[Block]) -> Vec<String> {
        blocks.iter().map(Block::plain_text).collect()
    }

    #[test]
    fn preop_cell_follows_print_order() {
        let op = OperationField {
            complaints_anamnesis: "боль в ухе".to_string(),
            informed_consent: false,
            ad: "120/80".to_string(),
            pulse: "72".to_string(),
            objective_examination: "отек".to_string(),
            intervention: "парацентез".to_string(),
            ..OperationField::default()
        };
        assert_eq!(
            lines(&operation_cell(&op)),
            vec![
                "Показания к оперативному вмешательству:",
                "боль в ухе",
                "Общее состояние: Удовлетворительное; АД: 120/80 мм.рт.ст; Пульс: 72 в минуту",
                "St. localis: отек",
                "",
                "С лечебно-диагностической целью показано: парацентез",
                "Суть вмешательства разъяснена. Получено письменное согласие пациента.",
            ]
        );
    }

    #[test]
    fn description_name_line_appears_with_description() {
        let op = OperationField {
            op_number: "7".to_string(),
            op_description: "ход операции".to_string(),
            ..OperationField::default()
        };
        assert_eq!(
            lines(&description_cell(&op)),
            vec!["Оперативное вмешательство № 7", "", "ход операции"]
        );
        let bare = OperationField {
            op_number: "7".to_string(),
            ..OperationField::default()
        };
        assert_eq!(lines(&description_cell(&bare)), vec!["Оперативное вмешательство № 7"]);
    }

    #[test]
    fn op_recommendations_render_text_without_label() {
        let r = RecommendationsField {
            text: "<p>покой</p>".to_string(),
            show_label: false,
        };
        assert_eq!(lines(&recommendations_cell(&r)), vec!["покой"]);
    }

    #[test]
    fn extra_cell_puts_repeat_on_one_line() {
        let repeat = RepeatField {
            enabled: true,
            date: "10.02.2025".to_string(),
            time: "09:00".to_string(),
        };
        let sick = SickLeaveField::default();
        assert_eq!(
            lines(&extra_cell(&repeat, &sick)),
            vec!["Повторный прием 10.02.2025 09:00"]
        );
    }
}
