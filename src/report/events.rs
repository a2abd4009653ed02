use crate::report::fields::{
    ComplaintsField, DateField, DiagnosisField, IndicatorsField, ObjectiveField, OpStaffField,
    OperationField, RecommendationsField, RepeatField, SickLeaveField, SignatureField,
    SpecialtyField, SurdologyField,
};

/// Notifications from the document back to the form. Field events are only
/// raised by the parse pass, never by setters.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    DateChanged(DateField),
    SpecialtyChanged(SpecialtyField),
    IndicatorsChanged(IndicatorsField),
    ComplaintsAnamnesisChanged(ComplaintsField),
    ConsentChanged(bool),
    ObjectiveChanged(ObjectiveField),
    SurdologyChanged(SurdologyField),
    DiagnosisChanged(DiagnosisField),
    RecommendationsChanged(RecommendationsField),
    RepeatChanged(RepeatField),
    SickLeaveChanged(SickLeaveField),
    SignatureChanged(SignatureField),
    OperationDataChanged(OperationField),
    OperationStaffChanged(OpStaffField),
    HeightChanged { pages: usize, height: f32 },
}

impl EditorEvent {
    /// True for the events that carry field values parsed out of the document.
    pub fn is_field_change(&self) -> bool {
        !matches!(self, EditorEvent::HeightChanged { .. })
    }
}
