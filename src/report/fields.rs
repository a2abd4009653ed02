use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::report::{Mode, labels};

/// Line capability of a free-text field, fixed when the field is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFieldKind {
    SingleLine,
    MultiLine,
}

impl TextFieldKind {
    pub fn normalize(self, value: &str) -> String {
        match self {
            Self::SingleLine => value
                .split(['\n', '\r'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::MultiLine => value.replace("\r\n", "\n"),
        }
    }

    fn apply(self, value: &mut String) {
        if self == Self::SingleLine && value.contains(['\n', '\r']) {
            *value = self.normalize(value.as_str());
        } else if self == Self::MultiLine && value.contains('\r') {
            *value = self.normalize(value.as_str());
        }
    }
}

/// Every free-text field the report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Date,
    Time,
    Specialty,
    Ad,
    Temp,
    Weight,
    Complaints,
    Anamnesis,
    ObjectiveSite,
    Hearing,
    Tympanometry,
    HearingAverage,
    RepeatDate,
    RepeatTime,
    SickLeave,
    SignatureSpecialty,
    DoctorName,
    OpComplaints,
    OpVital,
    OpObjective,
    Intervention,
    OpNumber,
    OpName,
    OpDescription,
    Staff,
}

impl TextField {
    pub const fn kind(self) -> TextFieldKind {
        match self {
            Self::Complaints
            | Self::Anamnesis
            | Self::ObjectiveSite
            | Self::OpComplaints
            | Self::OpObjective
            | Self::Intervention
            | Self::OpDescription => TextFieldKind::MultiLine,
            _ => TextFieldKind::SingleLine,
        }
    }

    pub fn normalize(self, value: &str) -> String {
        self.kind().normalize(value)
    }

    fn apply(self, value: &mut String) {
        self.kind().apply(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateField {
    pub date: String,
    pub time: String,
    pub time_enabled: bool,
}

impl Default for DateField {
    fn default() -> Self {
        Self {
            date: Local::now().format("%d.%m.%Y").to_string(),
            time: String::new(),
            time_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialtyField {
    pub name: String,
    pub cito: bool,
}

impl Default for SpecialtyField {
    fn default() -> Self {
        Self {
            name: labels::DEFAULT_SPECIALTY.to_string(),
            cito: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsField {
    pub ad: String,
    pub temp: String,
    pub weight: String,
    pub paid_service: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplaintsField {
    pub complaints: String,
    pub anamnesis: String,
    pub no_complaints: bool,
    pub show_anamnesis_label: bool,
    pub no_card: bool,
}

impl Default for ComplaintsField {
    fn default() -> Self {
        Self {
            complaints: String::new(),
            anamnesis: String::new(),
            no_complaints: false,
            show_anamnesis_label: true,
            no_card: false,
        }
    }
}

/// Objective examination sites, in render priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    EarsCombined,
    RightEar,
    LeftEar,
    NoseThroatCombined,
    Nose,
    Throat,
    Larynx,
    Other,
}

impl Site {
    pub const ALL: [Site; 8] = [
        Site::EarsCombined,
        Site::RightEar,
        Site::LeftEar,
        Site::NoseThroatCombined,
        Site::Nose,
        Site::Throat,
        Site::Larynx,
        Site::Other,
    ];

    /// Bold label written before the value; "other" is anchored by a marker instead.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Site::EarsCombined => Some(labels::AD_AS_EARS),
            Site::RightEar => Some(labels::AD_EAR),
            Site::LeftEar => Some(labels::AS_EAR),
            Site::NoseThroatCombined => Some(labels::NASI_PHARYNX),
            Site::Nose => Some(labels::NASI),
            Site::Throat => Some(labels::PHARYNX),
            Site::Larynx => Some(labels::LARYNX),
            Site::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveField {
    pub ad_ear: String,
    pub ad_vis: bool,
    pub as_ear: String,
    pub as_vis: bool,
    pub ad_as_comb: String,
    pub ad_as_vis: bool,
    pub merge_ears: bool,
    pub nasi: String,
    pub nasi_vis: bool,
    pub pharynx: String,
    pub pharynx_vis: bool,
    pub nasi_pharynx_comb: String,
    pub nasi_pharynx_vis: bool,
    pub merge_nose_throat: bool,
    pub larynx: String,
    pub larynx_vis: bool,
    pub other: String,
    pub other_vis: bool,
}

impl Default for ObjectiveField {
    fn default() -> Self {
        Self {
            ad_ear: String::new(),
            ad_vis: true,
            as_ear: String::new(),
            as_vis: true,
            ad_as_comb: String::new(),
            ad_as_vis: true,
            merge_ears: false,
            nasi: String::new(),
            nasi_vis: true,
            pharynx: String::new(),
            pharynx_vis: true,
            nasi_pharynx_comb: String::new(),
            nasi_pharynx_vis: true,
            merge_nose_throat: false,
            larynx: String::new(),
            larynx_vis: false,
            other: String::new(),
            other_vis: false,
        }
    }
}

impl ObjectiveField {
    pub fn value(&self, site: Site) -> &str {
        match site {
            Site::EarsCombined => &self.ad_as_comb,
            Site::RightEar => &self.ad_ear,
            Site::LeftEar => &self.as_ear,
            Site::NoseThroatCombined => &self.nasi_pharynx_comb,
            Site::Nose => &self.nasi,
            Site::Throat => &self.pharynx,
            Site::Larynx => &self.larynx,
            Site::Other => &self.other,
        }
    }

    pub fn visible(&self, site: Site) -> bool {
        match site {
            Site::EarsCombined => self.ad_as_vis,
            Site::RightEar => self.ad_vis,
            Site::LeftEar => self.as_vis,
            Site::NoseThroatCombined => self.nasi_pharynx_vis,
            Site::Nose => self.nasi_vis,
            Site::Throat => self.pharynx_vis,
            Site::Larynx => self.larynx_vis,
            Site::Other => self.other_vis,
        }
    }

    pub fn set(&mut self, site: Site, value: String, visible: bool) {
        let (slot, vis) = match site {
            Site::EarsCombined => (&mut self.ad_as_comb, &mut self.ad_as_vis),
            Site::RightEar => (&mut self.ad_ear, &mut self.ad_vis),
            Site::LeftEar => (&mut self.as_ear, &mut self.as_vis),
            Site::NoseThroatCombined => (&mut self.nasi_pharynx_comb, &mut self.nasi_pharynx_vis),
            Site::Nose => (&mut self.nasi, &mut self.nasi_vis),
            Site::Throat => (&mut self.pharynx, &mut self.pharynx_vis),
            Site::Larynx => (&mut self.larynx, &mut self.larynx_vis),
            Site::Other => (&mut self.other, &mut self.other_vis),
        };
        *slot = value;
        *vis = visible;
    }

    /// Whether the merge flags make this site part of the layout at all.
    pub fn applies(&self, site: Site) -> bool {
        match site {
            Site::EarsCombined => self.merge_ears,
            Site::RightEar | Site::LeftEar => !self.merge_ears,
            Site::NoseThroatCombined => self.merge_nose_throat,
            Site::Nose | Site::Throat => !self.merge_nose_throat,
            Site::Larynx | Site::Other => true,
        }
    }

    /// Sites that produce a line in the rendered cell, in order.
    pub fn shown_sites(&self) -> impl Iterator<Item = Site> + '_ {
        Site::ALL
            .into_iter()
            .filter(|&site| self.applies(site) && self.visible(site))
    }

    fn normalize(&mut self) {
        for value in [
            &mut self.ad_ear,
            &mut self.as_ear,
            &mut self.ad_as_comb,
            &mut self.nasi,
            &mut self.pharynx,
            &mut self.nasi_pharynx_comb,
            &mut self.larynx,
            &mut self.other,
        ] {
            TextField::ObjectiveSite.apply(value);
        }
    }
}

/// Weber lateralisation; at most one of the three is meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningFork {
    pub left: bool,
    pub center: bool,
    pub right: bool,
}

impl TuningFork {
    pub fn arrow(&self) -> Option<&'static str> {
        if self.left {
            Some(labels::ARROW_LEFT)
        } else if self.center {
            Some(labels::ARROW_CENTER)
        } else if self.right {
            Some(labels::ARROW_RIGHT)
        } else {
            None
        }
    }

    pub fn from_arrow(arrow: &str) -> Self {
        Self {
            left: arrow == labels::ARROW_LEFT,
            center: arrow == labels::ARROW_CENTER,
            right: arrow == labels::ARROW_RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignPair {
    pub plus_left: bool,
    pub plus_right: bool,
    pub minus_left: bool,
    pub minus_right: bool,
}

impl SignPair {
    /// `[+|-]{name}[+|-]`, or `None` when no sign is set on either side.
    pub fn render(&self, name: &str) -> Option<String> {
        let left = if self.plus_left {
            "+"
        } else if self.minus_left {
            "-"
        } else {
            ""
        };
        let right = if self.plus_right {
            "+"
        } else if self.minus_right {
            "-"
        } else {
            ""
        };
        if left.is_empty() && right.is_empty() {
            None
        } else {
            Some(format!("{left}{name}{right}"))
        }
    }

    pub fn from_signs(left: &str, right: &str) -> Self {
        Self {
            plus_left: left == "+",
            minus_left: left == "-",
            plus_right: right == "+",
            minus_right: right == "-",
        }
    }

    /// Keeps only the first set sign on each side, matching what renders.
    pub fn canonical(&self) -> Self {
        Self {
            plus_left: self.plus_left,
            minus_left: self.minus_left && !self.plus_left,
            plus_right: self.plus_right,
            minus_right: self.minus_right && !self.plus_right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tympanometry {
    pub enabled: bool,
    pub ad: String,
    #[serde(rename = "as")]
    pub as_: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HearingAverage {
    pub enabled: bool,
    pub ad_inputs: Vec<String>,
    pub as_inputs: Vec<String>,
    pub ad: String,
    #[serde(rename = "as")]
    pub as_: String,
}

impl Default for HearingAverage {
    fn default() -> Self {
        Self {
            enabled: false,
            ad_inputs: vec![String::new(); 4],
            as_inputs: vec![String::new(); 4],
            ad: String::new(),
            as_: String::new(),
        }
    }
}

/// Mean of four integer thresholds with one decimal; empty unless all four parse.
pub fn speech_average(inputs: &[String]) -> String {
    if inputs.len() != 4 {
        return String::new();
    }
    let values: Option<Vec<i64>> = inputs.iter().map(|v| v.trim().parse::<i64>().ok()).collect();
    match values {
        Some(values) => format!("{:.1}", values.iter().sum::<i64>() as f64 / 4.0),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurdologyField {
    pub enabled: bool,
    pub table_enabled: bool,
    pub sr: String,
    pub rr: String,
    pub wc128: TuningFork,
    pub wc512: TuningFork,
    pub rn: SignPair,
    pub fd: SignPair,
    pub timp: Tympanometry,
    pub avg: HearingAverage,
}

impl SurdologyField {
    pub fn recompute_averages(&mut self) {
        self.avg.ad = speech_average(&self.avg.ad_inputs);
        self.avg.as_ = speech_average(&self.avg.as_inputs);
    }

    fn normalize(&mut self) {
        TextField::Hearing.apply(&mut self.sr);
        TextField::Hearing.apply(&mut self.rr);
        TextField::Tympanometry.apply(&mut self.timp.ad);
        TextField::Tympanometry.apply(&mut self.timp.as_);
        TextField::HearingAverage.apply(&mut self.avg.ad);
        TextField::HearingAverage.apply(&mut self.avg.as_);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisField {
    /// Rich text as an HTML fragment.
    pub text: String,
    pub show_label: bool,
    pub no_acute_pathology: bool,
}

impl Default for DiagnosisField {
    fn default() -> Self {
        Self {
            text: String::new(),
            show_label: true,
            no_acute_pathology: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsField {
    pub text: String,
    pub show_label: bool,
}

impl Default for RecommendationsField {
    fn default() -> Self {
        Self {
            text: String::new(),
            show_label: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatField {
    pub enabled: bool,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SickLeaveField {
    pub issued: bool,
    pub continued: bool,
    pub parent: bool,
    pub number: String,
    pub date_from: String,
    pub date_to: String,
    pub prev_number: String,
    pub parent_fio: String,
    pub parent_dob: String,
    pub address: String,
    pub job: String,
}

impl SickLeaveField {
    fn normalize(&mut self) {
        for value in [
            &mut self.number,
            &mut self.date_from,
            &mut self.date_to,
            &mut self.prev_number,
            &mut self.parent_fio,
            &mut self.parent_dob,
            &mut self.address,
            &mut self.job,
        ] {
            TextField::SickLeave.apply(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureField {
    pub specialty: String,
    pub doctor_name: String,
    pub visible: bool,
}

impl Default for SignatureField {
    fn default() -> Self {
        Self {
            specialty: labels::DEFAULT_SPECIALTY.to_string(),
            doctor_name: String::new(),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeneralCondition {
    Unspecified,
    #[default]
    Satisfactory,
    Moderate,
    Severe,
}

impl GeneralCondition {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Satisfactory => labels::CONDITION_SATISFACTORY,
            Self::Moderate => labels::CONDITION_MODERATE,
            Self::Severe => labels::CONDITION_SEVERE,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            labels::CONDITION_SATISFACTORY => Self::Satisfactory,
            labels::CONDITION_MODERATE => Self::Moderate,
            labels::CONDITION_SEVERE => Self::Severe,
            _ => Self::Unspecified,
        }
    }
}

impl Serialize for GeneralCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for GeneralCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(label.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationField {
    pub complaints_anamnesis: String,
    pub informed_consent: bool,
    pub general_condition: GeneralCondition,
    pub ad: String,
    pub pulse: String,
    pub temp: String,
    pub objective_examination: String,
    pub intervention: String,
    pub intervention_consent: bool,
    pub op_number: String,
    pub op_name: String,
    pub op_description: String,
}

impl Default for OperationField {
    fn default() -> Self {
        Self {
            complaints_anamnesis: String::new(),
            informed_consent: true,
            general_condition: GeneralCondition::Satisfactory,
            ad: String::new(),
            pulse: String::new(),
            temp: String::new(),
            objective_examination: String::new(),
            intervention: String::new(),
            intervention_consent: true,
            op_number: String::new(),
            op_name: String::new(),
            op_description: String::new(),
        }
    }
}

impl OperationField {
    fn normalize(&mut self) {
        TextField::OpComplaints.apply(&mut self.complaints_anamnesis);
        TextField::OpVital.apply(&mut self.ad);
        TextField::OpVital.apply(&mut self.pulse);
        TextField::OpVital.apply(&mut self.temp);
        TextField::OpObjective.apply(&mut self.objective_examination);
        TextField::Intervention.apply(&mut self.intervention);
        TextField::OpNumber.apply(&mut self.op_number);
        TextField::OpName.apply(&mut self.op_name);
        TextField::OpDescription.apply(&mut self.op_description);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpStaffField {
    pub operator: String,
    pub nurse: String,
}

/// A value kept separately for each report mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeCache<T> {
    pub examination: T,
    pub operation: T,
}

impl<T> ModeCache<T> {
    pub fn get(&self, mode: Mode) -> &T {
        match mode {
            Mode::Examination => &self.examination,
            Mode::Operation => &self.operation,
        }
    }

    pub fn get_mut(&mut self, mode: Mode) -> &mut T {
        match mode {
            Mode::Examination => &mut self.examination,
            Mode::Operation => &mut self.operation,
        }
    }
}

/// Last-known value of every reportable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStore {
    pub date: DateField,
    pub specialty: SpecialtyField,
    pub indicators: IndicatorsField,
    pub complaints: ComplaintsField,
    pub consent: bool,
    pub objective: ObjectiveField,
    pub surdology: SurdologyField,
    pub diagnosis: ModeCache<DiagnosisField>,
    pub recommendations: ModeCache<RecommendationsField>,
    pub repeat: RepeatField,
    pub sick_leave: SickLeaveField,
    pub signature: SignatureField,
    pub operation: OperationField,
    pub op_staff: OpStaffField,
}

impl Default for FieldStore {
    fn default() -> Self {
        Self {
            date: DateField::default(),
            specialty: SpecialtyField::default(),
            indicators: IndicatorsField::default(),
            complaints: ComplaintsField::default(),
            consent: true,
            objective: ObjectiveField::default(),
            surdology: SurdologyField::default(),
            diagnosis: ModeCache::default(),
            recommendations: ModeCache::default(),
            repeat: RepeatField::default(),
            sick_leave: SickLeaveField::default(),
            signature: SignatureField::default(),
            operation: OperationField::default(),
            op_staff: OpStaffField::default(),
        }
    }
}

/// Collapses or keeps newlines according to each field's registered kind.
pub trait Normalize {
    fn normalized(self) -> Self;
}

impl Normalize for DateField {
    fn normalized(mut self) -> Self {
        TextField::Date.apply(&mut self.date);
        TextField::Time.apply(&mut self.time);
        self
    }
}

impl Normalize for SpecialtyField {
    fn normalized(mut self) -> Self {
        TextField::Specialty.apply(&mut self.name);
        self
    }
}

impl Normalize for IndicatorsField {
    fn normalized(mut self) -> Self {
        TextField::Ad.apply(&mut self.ad);
        TextField::Temp.apply(&mut self.temp);
        TextField::Weight.apply(&mut self.weight);
        self
    }
}

impl Normalize for ComplaintsField {
    fn normalized(mut self) -> Self {
        TextField::Complaints.apply(&mut self.complaints);
        TextField::Anamnesis.apply(&mut self.anamnesis);
        self
    }
}

impl Normalize for ObjectiveField {
    fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl Normalize for SurdologyField {
    fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl Normalize for RepeatField {
    fn normalized(mut self) -> Self {
        TextField::RepeatDate.apply(&mut self.date);
        TextField::RepeatTime.apply(&mut self.time);
        self
    }
}

impl Normalize for SickLeaveField {
    fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl Normalize for SignatureField {
    fn normalized(mut self) -> Self {
        TextField::SignatureSpecialty.apply(&mut self.specialty);
        TextField::DoctorName.apply(&mut self.doctor_name);
        self
    }
}

impl Normalize for OperationField {
    fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl Normalize for OpStaffField {
    fn normalized(mut self) -> Self {
        TextField::Staff.apply(&mut self.operator);
        TextField::Staff.apply(&mut self.nurse);
        self
    }
}

impl Normalize for DiagnosisField {
    fn normalized(self) -> Self {
        self
    }
}

impl Normalize for RecommendationsField {
    fn normalized(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_fields_collapse_newlines() {
        let indicators = IndicatorsField {
            ad: "120/\n80".to_string(),
            ..IndicatorsField::default()
        }
        .normalized();
        assert_eq!(indicators.ad, "120/ 80");

        let complaints = ComplaintsField {
            complaints: "боль\nзаложенность".to_string(),
            ..ComplaintsField::default()
        }
        .normalized();
        assert_eq!(complaints.complaints, "боль\nзаложенность");
    }

    #[test]
    fn defaults_follow_the_form() {
        let store = FieldStore::default();
        assert!(store.consent);
        assert!(store.complaints.show_anamnesis_label);
        assert!(store.objective.ad_vis && store.objective.nasi_vis);
        assert!(!store.objective.larynx_vis && !store.objective.other_vis);
        assert_eq!(store.operation.general_condition, GeneralCondition::Satisfactory);
        assert!(store.signature.visible);
        assert_eq!(store.specialty.name, labels::DEFAULT_SPECIALTY);
    }

    #[test]
    fn speech_average_requires_four_integers() {
        let inputs = |v: [&str; 4]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(speech_average(&inputs(["10", "20", "32", "40"])), "25.5");
        assert_eq!(speech_average(&inputs(["10", "", "30", "40"])), "");
        assert_eq!(speech_average(&inputs(["10", "2.5", "30", "40"])), "");
    }

    #[test]
    fn general_condition_uses_labels_on_the_wire() {
        let json = serde_json::to_string(&GeneralCondition::Moderate).unwrap();
        assert_eq!(json, "\"Средней степени тяжести\"");
        let parsed: GeneralCondition = serde_json::from_str("\"что-то\"").unwrap();
        assert_eq!(parsed, GeneralCondition::Unspecified);
    }

    #[test]
    fn objective_reads_template_keys() {
        let json = r#"{"merge_ears": true, "ad_as_comb": "норма", "larynx_vis": true}"#;
        let objective: ObjectiveField = serde_json::from_str(json).unwrap();
        assert!(objective.merge_ears);
        assert_eq!(objective.value(Site::EarsCombined), "норма");
        let shown: Vec<_> = objective.shown_sites().collect();
        assert_eq!(
            shown,
            vec![Site::EarsCombined, Site::Nose, Site::Throat, Site::Larynx]
        );
    }

    #[test]
    fn sign_pair_renders_only_when_set() {
        assert_eq!(SignPair::default().render("Rn"), None);
        let pair = SignPair {
            plus_left: true,
            minus_right: true,
            ..SignPair::default()
        };
        assert_eq!(pair.render("Rn").as_deref(), Some("+Rn-"));
    }

    #[test]
    fn mode_cache_keeps_values_apart() {
        let mut cache = ModeCache::<DiagnosisField>::default();
        cache.get_mut(Mode::Operation).text = "<p>op</p>".to_string();
        assert!(cache.get(Mode::Examination).text.is_empty());
    }
}
