//! Every fixed string the report renders. Renderers write these and the
//! reverse parsers search for them, so the two can never drift apart.

/// Ends each objective line in older documents; stripped from parsed values.
pub const LINE_MARKER: char = '\u{200B}';
/// Anchors the free-form "other" objective text.
pub const OTHER_MARKER: char = '\u{200C}';

pub const DEFAULT_SPECIALTY: &str = "Врач-оториноларинголог";
pub const DEFAULT_SPECIALTY_TITLE: &str = "Осмотр ОТОРИНОЛАРИНГОЛОГА";
pub const PREOP_SUFFIX: &str = " / Предоперационный осмотр";
pub const CITO_SUFFIX: &str = " (Осмотр по Cito!)";
pub const TIME_SEPARATOR: &str = "    ";

pub const PLACEHOLDER: &str = "_______";
pub const AD_PREFIX: &str = "АД: ";
pub const AD_SUFFIX: &str = " мм. рт. ст.";
pub const TEMP_PREFIX: &str = "t° тела: ";
pub const TEMP_SUFFIX: &str = " С°";
pub const WEIGHT_PREFIX: &str = "Вес: ";
pub const WEIGHT_SUFFIX: &str = " кг";
pub const PAID_SERVICE: &str = "Пациент осмотрен на платной основе.";

pub const COMPLAINTS_LABEL: &str = "Жалобы: ";
pub const NO_COMPLAINTS: &str = "Жалоб на момент осмотра не предъявляет.";
pub const ANAMNESIS_LABEL: &str = "Анамнез: ";
pub const NO_CARD: &str = "Пациент на приеме без амбулаторной карты!";

pub const CONSENT_TEXT: &str = "На основании частей первой и второй статьи 44 закона Республики Беларусь от 18 июня 1993 года N 2435-XII \"О здравоохранении\" пациент устно проинформирован о необходимости проведения простых диагностических исследований, консультаций и от пациента получено устное информированное добровольное согласие на проведение диагностических исследований, консультаций.";
/// Leading words of the consent sentence, enough to recognise it after edits.
pub const CONSENT_ANCHOR: &str = "На основании частей первой";
pub const CONSENT_FONT_PT: f32 = 7.0;

pub const OBJECTIVE_HEADER: &str = "ОБЪЕКТИВНЫЙ ОСМОТР";
pub const AD_EAR: &str = "AD - ";
pub const AS_EAR: &str = "AS - ";
pub const AD_AS_EARS: &str = "AD/AS - ";
pub const NASI: &str = "Nasi - ";
pub const PHARYNX: &str = "Pharynx - ";
pub const NASI_PHARYNX: &str = "Nasi, pharynx - ";
pub const LARYNX: &str = "Larynx - ";

pub const WHISPER_PREFIX: &str = "Ш.Р. AD/AS = ";
pub const SPEECH_PREFIX: &str = "Р.Р. AD/AS = ";
pub const METRES_SUFFIX: &str = " м";
pub const WC128: &str = "Wc128";
pub const WC512: &str = "Wc512";
pub const ARROW_LEFT: &str = "←";
pub const ARROW_CENTER: &str = "↔";
pub const ARROW_RIGHT: &str = "→";
pub const RINNE: &str = "Rn";
pub const FEDERICI: &str = "Fd";
pub const PARTS_SEPARATOR: &str = "; ";
pub const TIMP_PREFIX: &str = "Тимпанометрия: AD - ";
pub const TIMP_MIDDLE: &str = "; AS - ";
pub const AVG_PREFIX: &str = "Среднее арифметическое на речевых частотах: AD=";
pub const AVG_MIDDLE: &str = " Дб; AS=";
pub const AVG_SUFFIX: &str = " Дб";

pub const NO_ACUTE_PATHOLOGY: &str = "Острой ЛОР патологии на момент осмотра не выявлено.";
pub const DIAGNOSIS_LABEL: &str = "ДИАГНОЗ: ";
pub const RECOMMENDATIONS_LABEL: &str = "РЕКОМЕНДОВАНО:";
pub const REPEAT_LABEL: &str = "Повторный прием";

pub const SICK_LEAVE_PARENT_CONTINUED: &str =
    "Родителю/опекуну ребенка выдано продолжение листка нетрудоспособности";
pub const SICK_LEAVE_PARENT: &str = "Родителю/опекуну ребенка выдан листок нетрудоспособности";
pub const SICK_LEAVE_CONTINUED: &str = "Пациенту выдано продолжение листка нетрудоспособности";
pub const SICK_LEAVE: &str = "Пациенту выдан листок нетрудоспособности";
pub const SICK_LEAVE_CONTINUATION_NUMBER: &str = ": Л/Н № ";
pub const NUMBER_SIGN: &str = "№";
pub const DATE_FROM: &str = " с ";
pub const DATE_TO: &str = " по ";
pub const PARENT_DOB_SUFFIX: &str = " г.р.; Проживает: ";
pub const PARENT_JOB: &str = "; Место работы, должность: ";

pub const SIGNATURE_LINE: &str = " _________________ ";

pub const PREOP_HEADER: &str = "Показания к оперативному вмешательству:";
pub const GENERAL_CONDITION: &str = "Общее состояние: ";
pub const OP_AD_PREFIX: &str = "АД: ";
pub const OP_AD_SUFFIX: &str = " мм.рт.ст";
pub const PULSE_PREFIX: &str = "Пульс: ";
pub const PULSE_SUFFIX: &str = " в минуту";
pub const OP_TEMP_PREFIX: &str = "Т. тела: ";
pub const OP_TEMP_SUFFIX: &str = " С°";
pub const ST_LOCALIS: &str = "St. localis:";
pub const INTERVENTION_LABEL: &str = "С лечебно-диагностической целью показано:";
pub const INTERVENTION_CONSENT: &str =
    "Суть вмешательства разъяснена. Получено письменное согласие пациента.";
pub const OP_NUMBER_PREFIX: &str = "Оперативное вмешательство № ";
pub const OPERATOR_PREFIX: &str = "Оператор: ";
pub const NURSE_PREFIX: &str = "Опер. м/с.: ";

pub const CONDITION_SATISFACTORY: &str = "Удовлетворительное";
pub const CONDITION_MODERATE: &str = "Средней степени тяжести";
pub const CONDITION_SEVERE: &str = "Тяжелое";

/// Removes both zero-width markers from a parsed value.
pub fn strip_markers(value: &str) -> String {
    value
        .chars()
        .filter(|&c| c != LINE_MARKER && c != OTHER_MARKER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_anchor_prefixes_sentence() {
        assert!(CONSENT_TEXT.starts_with(CONSENT_ANCHOR));
    }

    #[test]
    fn markers_are_stripped() {
        assert_eq!(strip_markers("\u{200C}норма\u{200B}"), "норма");
    }

    #[test]
    fn objective_labels_keep_trailing_space() {
        for label in [AD_EAR, AS_EAR, AD_AS_EARS, NASI, PHARYNX, NASI_PHARYNX, LARYNX] {
            assert!(label.ends_with(" - "), "{label}");
        }
    }
}
