//! The report facade: form setters in, document edits and events out.
//!
//! Everything is single-threaded. The host calls [`ReportEditor::tick`] from
//! its event loop so the debounced pagination pass can run.

use std::{
    mem,
    path::Path,
    time::{Duration, Instant},
};

use crate::document::{
    export::{ExportOptions, save_with_format},
    layout::{ApproxMetrics, TextLayout, TextMeasurer},
    model::{Block, CellRef, Document},
};
use crate::editor::{
    EditEngine,
    commands::{self, EditCommand, ParagraphFormatOp, RunStylePatch},
};
use crate::error::Result;
use crate::report::{
    Mode,
    arbiter::{FieldGroup, UpdateArbiter},
    debounce::Debouncer,
    events::EditorEvent,
    fields::{
        ComplaintsField, DiagnosisField, FieldStore, IndicatorsField, Normalize, ObjectiveField,
        OpStaffField, OperationField, RecommendationsField, RepeatField, SickLeaveField,
        SignatureField, SurdologyField, TextField,
    },
    layout::{self, BuildOptions, RowMap, Visibility},
    paginate::paginate,
    parse, render,
};
use crate::settings::schema::Settings;
use crate::templates::{
    AdditionalData, DiagnosisEntry, OtherData, RecommendationsEntry, TemplateComplaints,
    TemplateData, TemplateIndicators,
};

/// Stores `value` when it differs; returns whether it did.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

pub struct ReportEditor {
    store: FieldStore,
    visibility: Visibility,
    options: BuildOptions,
    document: Document,
    map: RowMap,
    arbiter: UpdateArbiter,
    pagination: Debouncer,
    history: EditEngine,
    measurer: Box<dyn TextMeasurer>,
    events: Vec<EditorEvent>,
    pages: usize,
    height: f32,
    export_options: ExportOptions,
}

impl Default for ReportEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEditor {
    pub fn new() -> Self {
        Self::build(
            FieldStore::default(),
            Visibility::default(),
            BuildOptions::default(),
            Debouncer::default(),
            ExportOptions::default(),
        )
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let mut store = FieldStore::default();
        if !settings.doctor.specialty.is_empty() {
            store.specialty.name = settings.doctor.specialty.clone();
            store.signature.specialty = settings.doctor.specialty.clone();
        }
        if !settings.doctor.name.is_empty() {
            store.signature.doctor_name = settings.doctor.name.clone();
        }
        let store = FieldStore {
            specialty: store.specialty.normalized(),
            signature: store.signature.normalized(),
            ..store
        };

        let visibility = Visibility {
            split_layout: settings.editor.split_layout,
            ..Visibility::default()
        };
        let options = BuildOptions {
            borders: settings.editor.borders_visible,
            margins: settings.page.margins(),
            font_family: settings.editor.font_family.clone(),
            font_size: settings.editor.font_size_pt,
        };
        let export_options = ExportOptions {
            split_line: settings.printing.split_line,
            pdf_font_regular: settings.export.pdf_font_regular.clone(),
            pdf_font_bold: settings.export.pdf_font_bold.clone(),
        };
        let pagination =
            Debouncer::new(Duration::from_millis(settings.editor.pagination_debounce_ms));
        Self::build(store, visibility, options, pagination, export_options)
    }

    fn build(
        store: FieldStore,
        visibility: Visibility,
        options: BuildOptions,
        pagination: Debouncer,
        export_options: ExportOptions,
    ) -> Self {
        let mut editor = Self {
            store,
            visibility,
            options,
            document: Document::default(),
            map: RowMap::default(),
            arbiter: UpdateArbiter::new(),
            pagination,
            history: EditEngine::default(),
            measurer: Box::new(ApproxMetrics),
            events: Vec::new(),
            pages: 1,
            height: 0.0,
            export_options,
        };
        editor.rebuild();
        editor
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn mode(&self) -> Mode {
        self.visibility.mode()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn row_map(&self) -> &RowMap {
        &self.map
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Surface height in px: a whole number of pages.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn history(&self) -> &EditEngine {
        &self.history
    }

    pub fn export_options(&self) -> &ExportOptions {
        &self.export_options
    }

    pub fn set_export_options(&mut self, options: ExportOptions) {
        self.export_options = options;
    }

    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        self.paginate_now();
    }

    pub fn set_pagination_delay(&mut self, delay: Duration) {
        self.pagination.set_delay(delay);
    }

    pub fn is_pagination_pending(&self) -> bool {
        self.pagination.is_pending()
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        mem::take(&mut self.events)
    }

    // Forward direction.

    /// Writes the store through `write` and repaints the group's cells when
    /// anything changed.
    fn forward(&mut self, group: FieldGroup, write: impl FnOnce(&mut FieldStore) -> bool) -> bool {
        if !self.arbiter.begin_update(group) {
            return false;
        }
        let changed = write(&mut self.store);
        if changed {
            render::render_group(
                &mut self.document,
                &self.map,
                group,
                &self.store,
                &self.visibility,
            );
        }
        self.arbiter.end_update(group);
        if changed {
            self.pagination.schedule(Instant::now());
        }
        changed
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        if replace(&mut self.visibility, visibility) {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        if !self.arbiter.begin_rebuild() {
            return;
        }
        let (document, map) = layout::build(&self.visibility, &self.options);
        self.document = document;
        self.map = map;
        render::render_all(&mut self.document, &self.map, &self.store, &self.visibility);
        self.arbiter.end_rebuild();

        self.history.clear();
        self.pagination.cancel();
        self.paginate_now();
    }

    pub fn set_date(&mut self, date: &str) {
        let date = TextField::Date.normalize(date);
        self.forward(FieldGroup::Date, |s| replace(&mut s.date.date, date));
    }

    pub fn set_time(&mut self, time: &str) {
        let time = TextField::Time.normalize(time);
        self.forward(FieldGroup::Date, |s| replace(&mut s.date.time, time));
    }

    pub fn set_time_enabled(&mut self, enabled: bool) {
        self.forward(FieldGroup::Date, |s| replace(&mut s.date.time_enabled, enabled));
    }

    pub fn set_specialty(&mut self, name: &str) {
        let name = TextField::Specialty.normalize(name);
        self.forward(FieldGroup::Specialty, |s| replace(&mut s.specialty.name, name));
    }

    pub fn set_cito(&mut self, cito: bool) {
        self.forward(FieldGroup::Specialty, |s| replace(&mut s.specialty.cito, cito));
    }

    pub fn set_ad(&mut self, ad: &str) {
        let ad = TextField::Ad.normalize(ad);
        self.forward(FieldGroup::Indicators, |s| replace(&mut s.indicators.ad, ad));
    }

    pub fn set_temp(&mut self, temp: &str) {
        let temp = TextField::Temp.normalize(temp);
        self.forward(FieldGroup::Indicators, |s| replace(&mut s.indicators.temp, temp));
    }

    pub fn set_weight(&mut self, weight: &str) {
        let weight = TextField::Weight.normalize(weight);
        self.forward(FieldGroup::Indicators, |s| replace(&mut s.indicators.weight, weight));
    }

    pub fn set_paid_service(&mut self, paid: bool) {
        self.forward(FieldGroup::Indicators, |s| replace(&mut s.indicators.paid_service, paid));
    }

    pub fn set_indicators(&mut self, indicators: IndicatorsField) {
        let indicators = indicators.normalized();
        self.forward(FieldGroup::Indicators, |s| replace(&mut s.indicators, indicators));
    }

    pub fn set_complaints(&mut self, text: &str) {
        let text = TextField::Complaints.normalize(text);
        self.forward(FieldGroup::Complaints, |s| replace(&mut s.complaints.complaints, text));
    }

    pub fn set_anamnesis(&mut self, text: &str) {
        let text = TextField::Anamnesis.normalize(text);
        self.forward(FieldGroup::Complaints, |s| replace(&mut s.complaints.anamnesis, text));
    }

    pub fn set_no_complaints(&mut self, on: bool) {
        self.forward(FieldGroup::Complaints, |s| replace(&mut s.complaints.no_complaints, on));
    }

    pub fn set_show_anamnesis_label(&mut self, on: bool) {
        self.forward(FieldGroup::Complaints, |s| {
            replace(&mut s.complaints.show_anamnesis_label, on)
        });
    }

    pub fn set_no_card(&mut self, on: bool) {
        self.forward(FieldGroup::Complaints, |s| replace(&mut s.complaints.no_card, on));
    }

    pub fn set_consent(&mut self, consent: bool) {
        self.forward(FieldGroup::Consent, |s| replace(&mut s.consent, consent));
    }

    pub fn set_objective(&mut self, objective: ObjectiveField) {
        let objective = objective.normalized();
        self.forward(FieldGroup::Objective, |s| replace(&mut s.objective, objective));
    }

    /// Turning `enabled` on or off adds or removes the surdology row.
    pub fn set_surdology(&mut self, surdology: SurdologyField) {
        let surdology = surdology.normalized();
        let enabled = surdology.enabled;
        self.forward(FieldGroup::Surdology, |s| replace(&mut s.surdology, surdology));
        self.set_visibility(Visibility {
            surdology: enabled,
            ..self.visibility
        });
    }

    /// Sets the diagnosis of the current mode.
    pub fn set_diagnosis(&mut self, diagnosis: DiagnosisField) {
        let diagnosis = diagnosis.normalized();
        let mode = self.mode();
        self.forward(FieldGroup::Diagnosis, |s| {
            replace(s.diagnosis.get_mut(mode), diagnosis)
        });
    }

    /// Sets the recommendations of the current mode.
    pub fn set_recommendations(&mut self, recommendations: RecommendationsField) {
        let recommendations = recommendations.normalized();
        let mode = self.mode();
        self.forward(FieldGroup::Recommendations, |s| {
            replace(s.recommendations.get_mut(mode), recommendations)
        });
    }

    pub fn set_repeat(&mut self, enabled: bool, date: &str, time: &str) {
        let repeat = RepeatField {
            enabled,
            date: date.to_string(),
            time: time.to_string(),
        }
        .normalized();
        self.forward(FieldGroup::Repeat, |s| replace(&mut s.repeat, repeat));
        self.set_visibility(Visibility {
            repeat: enabled,
            ..self.visibility
        });
    }

    pub fn set_sick_leave(&mut self, sick_leave: SickLeaveField) {
        let sick_leave = sick_leave.normalized();
        let issued = sick_leave.issued;
        self.forward(FieldGroup::SickLeave, |s| replace(&mut s.sick_leave, sick_leave));
        self.set_visibility(Visibility {
            sick_leave: issued,
            ..self.visibility
        });
    }

    pub fn set_signature(&mut self, specialty: &str, doctor_name: &str) {
        let specialty = TextField::SignatureSpecialty.normalize(specialty);
        let doctor_name = TextField::DoctorName.normalize(doctor_name);
        self.forward(FieldGroup::Signature, |s| {
            let a = replace(&mut s.signature.specialty, specialty);
            let b = replace(&mut s.signature.doctor_name, doctor_name);
            a || b
        });
    }

    pub fn set_signature_visible(&mut self, visible: bool) {
        self.forward(FieldGroup::Signature, |s| replace(&mut s.signature.visible, visible));
        self.set_visibility(Visibility {
            signature: visible,
            ..self.visibility
        });
    }

    /// Switches between the examination and operation reports. Leaving
    /// operation mode shows the signature again.
    pub fn set_operation_mode(&mut self, on: bool) {
        if on == self.visibility.operation_mode {
            return;
        }
        let mut visibility = Visibility {
            operation_mode: on,
            ..self.visibility
        };
        if !on {
            self.store.signature.visible = true;
            visibility.signature = true;
        }
        log::debug!("switching to {:?} mode", visibility.mode());
        self.set_visibility(visibility);
    }

    pub fn set_operation_data(&mut self, data: OperationField) {
        let data = data.normalized();
        self.forward(FieldGroup::Operation, |s| replace(&mut s.operation, data));
    }

    pub fn set_operation_staff(&mut self, operator: &str, nurse: &str) {
        let staff = OpStaffField {
            operator: operator.to_string(),
            nurse: nurse.to_string(),
        }
        .normalized();
        self.forward(FieldGroup::OpStaff, |s| replace(&mut s.op_staff, staff));
    }

    pub fn set_split_layout(&mut self, split: bool) {
        self.set_visibility(Visibility {
            split_layout: split,
            ..self.visibility
        });
    }

    /// Shows or hides table borders in place, without a rebuild.
    pub fn set_borders_visible(&mut self, visible: bool) {
        if !replace(&mut self.options.borders, visible) {
            return;
        }
        for block in &mut self.document.content {
            if let Block::Table(table) = block {
                table.borders = visible;
            }
        }
    }

    // Reverse direction.

    /// Notification that cell text changed. Programmatic changes only reflow.
    pub fn text_changed(&mut self) {
        self.pagination.schedule(Instant::now());
        if self.arbiter.is_programmatic() {
            return;
        }
        self.parse_pass();
    }

    fn parse_pass(&mut self) {
        if !self.arbiter.begin_parse() {
            return;
        }
        for group in FieldGroup::ALL {
            if self.arbiter.is_updating(group) {
                continue;
            }
            if let Some(event) = parse::parse_group(
                &self.document,
                &self.map,
                group,
                &mut self.store,
                &self.visibility,
            ) {
                self.events.push(event);
            }
        }
        self.arbiter.end_parse();
    }

    /// Applies a user edit. Returns false when the command changed nothing.
    pub fn apply_edit(&mut self, command: EditCommand) -> bool {
        if self
            .history
            .apply_command(&mut self.document, command)
            .is_none()
        {
            return false;
        }
        self.text_changed();
        true
    }

    pub fn insert_text(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        offset: usize,
        text: &str,
    ) -> bool {
        self.apply_edit(commands::insert_text(cell, paragraph, offset, text))
    }

    /// Deletes the characters `start..end` of one paragraph.
    pub fn delete_text(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
    ) -> bool {
        self.apply_edit(EditCommand::DeleteText {
            cell,
            paragraph,
            start,
            end,
        })
    }

    pub fn replace_cell(&mut self, cell: CellRef, blocks: Vec<Block>) -> bool {
        self.apply_edit(EditCommand::ReplaceCell { cell, blocks })
    }

    /// Restyles the characters `start..end` of one paragraph.
    pub fn format_run(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
        patch: RunStylePatch,
    ) -> bool {
        self.apply_edit(commands::format_selection(cell, paragraph, start, end, patch))
    }

    /// Bold on, or off when the whole range is bold already.
    pub fn toggle_bold(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
    ) -> bool {
        let Some(Block::Paragraph(p)) = self
            .document
            .cell(cell)
            .and_then(|c| c.blocks.get(paragraph))
        else {
            return false;
        };
        let command = commands::toggle_bold(cell, paragraph, start, end, &p.runs);
        self.apply_edit(command)
    }

    pub fn clear_formatting(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
    ) -> bool {
        self.apply_edit(EditCommand::ClearFormatting {
            cell,
            paragraph,
            start,
            end,
        })
    }

    pub fn format_paragraph(
        &mut self,
        cell: CellRef,
        paragraph: usize,
        op: ParagraphFormatOp,
    ) -> bool {
        self.apply_edit(EditCommand::FormatParagraph {
            cell,
            paragraph,
            op,
        })
    }

    pub fn undo(&mut self) -> bool {
        if self.history.undo(&mut self.document).is_none() {
            return false;
        }
        self.text_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history.redo(&mut self.document).is_none() {
            return false;
        }
        self.text_changed();
        true
    }

    // Pagination.

    /// Runs the pagination pass once its debounce deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.pagination.poll(now) {
            self.paginate_now();
            return true;
        }
        false
    }

    /// Runs a pending pagination pass immediately.
    pub fn flush_pagination(&mut self) -> bool {
        if !self.pagination.is_pending() {
            return false;
        }
        self.pagination.cancel();
        self.paginate_now();
        true
    }

    fn paginate_now(&mut self) {
        if !self.arbiter.begin_paginate() {
            return;
        }
        let text_layout = TextLayout::new(self.measurer.as_ref(), self.options.font_size);
        let outcome = paginate(&mut self.document, &text_layout, self.height);
        self.arbiter.end_paginate();

        self.pages = outcome.pages;
        self.height = outcome.height;
        log::debug!(
            "paginated: {} page(s), height {} (changed: {})",
            outcome.pages,
            outcome.height,
            outcome.changed
        );
        if outcome.changed {
            self.events.push(EditorEvent::HeightChanged {
                pages: outcome.pages,
                height: outcome.height,
            });
        }
    }

    // Templates.

    /// Applies template values for the current mode. Absent keys reset their
    /// fields to the defaults.
    pub fn apply_template(&mut self, data: &TemplateData) {
        match self.mode() {
            Mode::Examination => self.apply_examination_template(data),
            Mode::Operation => self.apply_operation_template(data),
        }
    }

    fn apply_examination_template(&mut self, data: &TemplateData) {
        let indicators = data.indicators.clone().unwrap_or_default();
        let additional = data.additional.clone().unwrap_or_default();
        self.set_indicators(IndicatorsField {
            ad: indicators.ad,
            temp: indicators.temp,
            weight: indicators.weight,
            paid_service: additional.paid,
        });
        self.set_consent(additional.consent);

        let complaints = data.complaints_anamnesis.clone().unwrap_or_default();
        let no_card = self.store.complaints.no_card;
        let complaints = ComplaintsField {
            complaints: complaints.complaints,
            anamnesis: complaints.anamnesis,
            no_complaints: complaints.no_complaints,
            show_anamnesis_label: complaints.show_anamnesis_label,
            no_card,
        }
        .normalized();
        self.forward(FieldGroup::Complaints, |s| replace(&mut s.complaints, complaints));

        self.set_objective(data.objective.clone().unwrap_or_default());
        let mut surdology = data.surdology.clone().unwrap_or_default();
        surdology.enabled = additional.surdology_visible;
        self.set_surdology(surdology);
        self.set_sick_leave(data.sick_leave.clone().unwrap_or_default());

        let diagnosis = match &data.diagnosis {
            Some(entry) => entry.resolve(Mode::Examination, &self.store.diagnosis.examination),
            None => DiagnosisField::default(),
        };
        self.set_diagnosis(diagnosis);

        let other = data.other_data.clone().unwrap_or_default();
        self.set_repeat(other.repeat, &other.repeat_date, &other.repeat_time);

        let recommendations = match &data.recommendations {
            Some(entry) => {
                entry.resolve(Mode::Examination, &self.store.recommendations.examination)
            }
            None => RecommendationsField::default(),
        };
        self.set_recommendations(recommendations);
        self.set_signature_visible(data.signature_visible.unwrap_or(false));
    }

    fn apply_operation_template(&mut self, data: &TemplateData) {
        self.set_operation_data(data.operation_data.clone().unwrap_or_default());

        let diagnosis = match &data.diagnosis {
            Some(entry) => entry.resolve(Mode::Operation, &self.store.diagnosis.operation),
            None => DiagnosisField::default(),
        };
        self.set_diagnosis(diagnosis);

        let recommendations = match &data.recommendations {
            Some(entry) => entry.resolve(Mode::Operation, &self.store.recommendations.operation),
            None => RecommendationsField::default(),
        };
        self.set_recommendations(recommendations);

        let staff = data.op_staff.clone().unwrap_or_default();
        self.set_operation_staff(&staff.operator, &staff.nurse);
        self.set_signature_visible(data.signature_visible.unwrap_or(false));
    }

    /// Captures the current mode's values in template form.
    pub fn collect_template(&self) -> TemplateData {
        let s = &self.store;
        match self.mode() {
            Mode::Examination => TemplateData {
                indicators: Some(TemplateIndicators {
                    ad: s.indicators.ad.clone(),
                    temp: s.indicators.temp.clone(),
                    weight: s.indicators.weight.clone(),
                }),
                additional: Some(AdditionalData {
                    paid: s.indicators.paid_service,
                    consent: s.consent,
                    surdology_visible: s.surdology.enabled,
                }),
                complaints_anamnesis: Some(TemplateComplaints {
                    complaints: s.complaints.complaints.clone(),
                    no_complaints: s.complaints.no_complaints,
                    anamnesis: s.complaints.anamnesis.clone(),
                    show_anamnesis_label: s.complaints.show_anamnesis_label,
                }),
                objective: Some(s.objective.clone()),
                surdology: Some(s.surdology.clone()),
                sick_leave: Some(s.sick_leave.clone()),
                diagnosis: Some(DiagnosisEntry::Full(s.diagnosis.examination.clone())),
                other_data: Some(OtherData {
                    repeat: s.repeat.enabled,
                    repeat_date: s.repeat.date.clone(),
                    repeat_time: s.repeat.time.clone(),
                }),
                recommendations: Some(RecommendationsEntry::Full(
                    s.recommendations.examination.clone(),
                )),
                signature_visible: Some(s.signature.visible),
                ..TemplateData::default()
            },
            Mode::Operation => TemplateData {
                operation_data: Some(s.operation.clone()),
                diagnosis: Some(DiagnosisEntry::Full(s.diagnosis.operation.clone())),
                recommendations: Some(RecommendationsEntry::Full(
                    s.recommendations.operation.clone(),
                )),
                op_staff: Some(s.op_staff.clone()),
                signature_visible: Some(s.signature.visible),
                ..TemplateData::default()
            },
        }
    }

    // Export.

    /// Writes the document in the format named by the path's extension.
    pub fn export(&mut self, path: &Path) -> Result<()> {
        self.flush_pagination();
        save_with_format(path, &self.document, &self.export_options)
    }

    /// Signature field as currently stored.
    pub fn signature(&self) -> &SignatureField {
        &self.store.signature
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{self, File},
        time::{SystemTime, UNIX_EPOCH},
    };

    use proptest::prelude::*;
    use zip::ZipArchive;

    use super::*;
    use crate::document::model::{ListType, ParagraphAlignment};
    use crate::report::layout::Section;

    fn field_events(editor: &mut ReportEditor) -> Vec<EditorEvent> {
        editor
            .drain_events()
            .into_iter()
            .filter(EditorEvent::is_field_change)
            .collect()
    }

    fn temp_file(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("lorpaper_editor_{nanos}_{name}"))
    }

    fn cell_text(editor: &ReportEditor, section: Section, col: usize) -> String {
        let at = editor.row_map().cell(section, 0, col).unwrap();
        editor.document().cell(at).unwrap().plain_text()
    }

    #[test]
    fn setters_do_not_feed_back_into_events() {
        let mut editor = ReportEditor::new();
        editor.set_ad("130/80");
        editor.set_temp("36.6");
        editor.set_complaints("боль в правом ухе");
        editor.set_anamnesis("болеет 3 дня");
        editor.set_signature("Врач-оториноларинголог", "Иванов И.И.");
        editor.set_diagnosis(DiagnosisField {
            text: "<p>Острый отит</p>".to_string(),
            ..DiagnosisField::default()
        });
        assert!(field_events(&mut editor).is_empty());

        // A parse over freshly rendered cells finds nothing new.
        editor.text_changed();
        assert!(field_events(&mut editor).is_empty());
    }

    #[test]
    fn equal_values_do_not_rerender() {
        let mut editor = ReportEditor::new();
        editor.flush_pagination();
        editor.set_consent(true);
        assert!(!editor.is_pagination_pending());
        editor.set_consent(false);
        assert!(editor.is_pagination_pending());
    }

    #[test]
    fn visibility_change_rebuilds_the_row_map() {
        let mut editor = ReportEditor::new();
        assert_eq!(editor.row_map().row_index(Section::Surdology), -1);

        editor.set_surdology(SurdologyField {
            enabled: true,
            sr: "6".to_string(),
            ..SurdologyField::default()
        });
        assert!(editor.row_map().row_index(Section::Surdology) >= 0);

        editor.set_surdology(SurdologyField::default());
        assert_eq!(editor.row_map().row_index(Section::Surdology), -1);
        assert!(!editor.visibility().surdology);
    }

    #[test]
    fn mode_switch_preserves_examination_diagnosis() {
        let mut editor = ReportEditor::new();
        editor.set_diagnosis(DiagnosisField {
            text: "<p>Серная пробка</p>".to_string(),
            ..DiagnosisField::default()
        });
        editor.set_signature_visible(false);

        editor.set_operation_mode(true);
        assert_eq!(editor.mode(), Mode::Operation);
        assert!(!cell_text(&editor, Section::Diagnosis, 0).contains("Серная пробка"));

        editor.set_operation_mode(false);
        assert_eq!(editor.store().diagnosis.examination.text, "<p>Серная пробка</p>");
        assert!(cell_text(&editor, Section::Diagnosis, 0).contains("Серная пробка"));
        assert!(editor.signature().visible);
        assert!(editor.visibility().signature);
    }

    #[test]
    fn undo_and_redo_reparse_the_cell() {
        let mut editor = ReportEditor::new();
        editor.set_ad("120/80");
        editor.drain_events();

        let cell = editor.row_map().cell(Section::Indicators, 0, 0).unwrap();
        let ad_events = |editor: &mut ReportEditor| -> Vec<String> {
            editor
                .drain_events()
                .into_iter()
                .filter_map(|event| match event {
                    EditorEvent::IndicatorsChanged(field) => Some(field.ad),
                    _ => None,
                })
                .collect()
        };

        assert!(editor.insert_text(cell, 0, 4, "1"));
        assert_eq!(ad_events(&mut editor), vec!["1120/80".to_string()]);
        assert_eq!(editor.store().indicators.ad, "1120/80");

        assert!(editor.undo());
        assert_eq!(ad_events(&mut editor), vec!["120/80".to_string()]);
        assert!(cell_text(&editor, Section::Indicators, 0).starts_with("АД: 120/80"));

        assert!(editor.redo());
        assert_eq!(ad_events(&mut editor), vec!["1120/80".to_string()]);
        assert!(!editor.redo());
    }

    fn paragraph_index(editor: &ReportEditor, cell: CellRef, text: &str) -> usize {
        editor
            .document()
            .cell(cell)
            .unwrap()
            .blocks
            .iter()
            .position(|b| matches!(b, Block::Paragraph(p) if p.text() == text))
            .unwrap()
    }

    #[test]
    fn bolding_diagnosis_text_reparses_the_field() {
        let mut editor = ReportEditor::new();
        editor.set_diagnosis(DiagnosisField {
            text: "<p>Острый отит</p>".to_string(),
            show_label: false,
            no_acute_pathology: false,
        });
        editor.drain_events();

        let cell = editor.row_map().cell(Section::Diagnosis, 0, 0).unwrap();
        let paragraph = paragraph_index(&editor, cell, "Острый отит");
        let diagnosis_events = |editor: &mut ReportEditor| -> Vec<String> {
            editor
                .drain_events()
                .into_iter()
                .filter_map(|event| match event {
                    EditorEvent::DiagnosisChanged(field) => Some(field.text),
                    _ => None,
                })
                .collect()
        };

        assert!(editor.toggle_bold(cell, paragraph, 7, 11));
        let texts = diagnosis_events(&mut editor);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("<span style=\"font-weight:bold\">отит</span>"));
        assert_eq!(editor.store().diagnosis.examination.text, texts[0]);

        // Re-parsing the bolded cell is quiet.
        editor.text_changed();
        assert!(field_events(&mut editor).is_empty());

        assert!(editor.undo());
        let texts = diagnosis_events(&mut editor);
        assert_eq!(texts.len(), 1);
        assert!(!texts[0].contains("font-weight:bold"));
        assert!(texts[0].contains("Острый отит"));
    }

    #[test]
    fn list_toggle_in_recommendations_reaches_the_field() {
        let mut editor = ReportEditor::new();
        editor.set_recommendations(RecommendationsField {
            text: "<p>капли в нос</p>".to_string(),
            show_label: true,
        });
        editor.drain_events();

        let cell = editor.row_map().cell(Section::Recommendations, 0, 1).unwrap();
        let paragraph = paragraph_index(&editor, cell, "капли в нос");
        let op = ParagraphFormatOp::ListType(Some(ListType::Numbered));
        assert!(editor.format_paragraph(cell, paragraph, op));
        let texts: Vec<String> = field_events(&mut editor)
            .into_iter()
            .filter_map(|event| match event {
                EditorEvent::RecommendationsChanged(field) => Some(field.text),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("<ol><li>"));
        assert!(texts[0].contains("капли в нос"));
        assert!(editor.undo());
        assert!(!editor.store().recommendations.examination.text.contains("<ol>"));
    }

    #[test]
    fn paragraph_formatting_leaves_text_fields_alone() {
        let mut editor = ReportEditor::new();
        editor.set_ad("120/80");
        editor.drain_events();

        let cell = editor.row_map().cell(Section::Indicators, 0, 0).unwrap();
        let before = editor.document().cell(cell).unwrap().blocks.clone();
        let center = ParagraphFormatOp::Alignment(ParagraphAlignment::Center);
        assert!(editor.format_paragraph(cell, 0, center.clone()));
        assert!(field_events(&mut editor).is_empty());
        assert!(!editor.format_paragraph(cell, 0, center));

        let italic = RunStylePatch {
            italic: Some(true),
            ..RunStylePatch::default()
        };
        assert!(editor.format_run(cell, 0, 0, 3, italic));
        assert!(field_events(&mut editor).is_empty());
        assert!(editor.clear_formatting(cell, 0, 0, 3));
        assert!(field_events(&mut editor).is_empty());
        assert_eq!(editor.store().indicators.ad, "120/80");

        assert!(editor.undo());
        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.document().cell(cell).unwrap().blocks, before);
    }

    #[test]
    fn rebuild_clears_history() {
        let mut editor = ReportEditor::new();
        let cell = editor.row_map().cell(Section::Indicators, 0, 0).unwrap();
        assert!(editor.insert_text(cell, 0, 4, "9"));
        editor.set_split_layout(true);
        assert!(!editor.undo());
    }

    #[test]
    fn borders_toggle_in_place() {
        let mut editor = ReportEditor::new();
        let before = editor.row_map().clone();
        editor.set_borders_visible(false);
        assert_eq!(editor.row_map(), &before);
        assert!(editor.document().content.iter().all(|block| match block {
            Block::Table(table) => !table.borders,
            _ => true,
        }));
    }

    #[test]
    fn template_applies_and_collects() {
        let data: TemplateData = serde_json::from_str(
            r#"{
                "indicators": {"ad": "120/80", "temp": "36.6"},
                "diagnosis": "<p>Острый наружный отит</p>",
                "other_data": {"repeat": true, "repeat_date": "05.02.2025", "repeat_time": "10:00"},
                "signature_visible": true
            }"#,
        )
        .unwrap();
        let mut editor = ReportEditor::new();
        editor.apply_template(&data);

        assert_eq!(editor.store().indicators.ad, "120/80");
        assert!(editor.visibility().repeat);
        assert!(editor.row_map().is_visible(Section::Repeat));
        assert!(editor.store().diagnosis.examination.show_label);
        assert!(cell_text(&editor, Section::Diagnosis, 0).contains("Острый наружный отит"));

        let collected = editor.collect_template();
        assert_eq!(collected.indicators.unwrap().ad, "120/80");
        assert_eq!(collected.other_data.unwrap().repeat_time, "10:00");
        assert_eq!(collected.signature_visible, Some(true));
        assert!(collected.operation_data.is_none());
    }

    #[test]
    fn operation_template_keeps_string_diagnosis_flags() {
        let mut editor = ReportEditor::new();
        editor.set_operation_mode(true);
        editor.set_diagnosis(DiagnosisField {
            text: String::new(),
            show_label: false,
            no_acute_pathology: false,
        });
        let data: TemplateData = serde_json::from_str(
            r#"{"diagnosis": "<p>Искривление перегородки</p>", "op_staff": {"operator": "Петров"}}"#,
        )
        .unwrap();
        editor.apply_template(&data);
        let diagnosis = &editor.store().diagnosis.operation;
        assert!(!diagnosis.show_label);
        assert_eq!(diagnosis.text, "<p>Искривление перегородки</p>");
        assert_eq!(editor.store().op_staff.operator, "Петров");
    }

    #[test]
    fn export_writes_packages() {
        let mut editor = ReportEditor::new();
        editor.set_complaints("заложенность носа");

        let docx = temp_file("report.docx");
        editor.export(&docx).unwrap();
        let mut archive = ZipArchive::new(File::open(&docx).unwrap()).unwrap();
        assert!(archive.by_name("word/document.xml").is_ok());

        let odt = temp_file("report.odt");
        editor.export(&odt).unwrap();
        let mut archive = ZipArchive::new(File::open(&odt).unwrap()).unwrap();
        assert!(archive.by_name("content.xml").is_ok());

        let txt = temp_file("report.txt");
        editor.export(&txt).unwrap();
        let text = fs::read_to_string(&txt).unwrap();
        assert!(text.contains("заложенность носа"));

        for path in [docx, odt, txt] {
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn settings_fill_signature_and_options() {
        let mut settings = Settings::default();
        settings.doctor.name = "Сидоров П.П.".to_string();
        settings.editor.borders_visible = false;
        settings.printing.split_line = true;

        let editor = ReportEditor::with_settings(&settings);
        assert_eq!(editor.signature().doctor_name, "Сидоров П.П.");
        assert_eq!(
            editor.store().specialty,
            crate::report::fields::SpecialtyField::default()
        );
        assert!(editor.export_options().split_line);
        assert!(editor.document().content.iter().all(|block| match block {
            Block::Table(table) => !table.borders,
            _ => true,
        }));
    }

    #[test]
    fn construction_reports_initial_height() {
        let mut editor = ReportEditor::new();
        let events = editor.drain_events();
        assert!(matches!(
            events.as_slice(),
            [EditorEvent::HeightChanged { pages: 1, .. }]
        ));
        assert_eq!(editor.height(), 1122.0);
    }

    fn issued_sick_leave() -> SickLeaveField {
        SickLeaveField {
            issued: true,
            number: "5".to_string(),
            date_from: "01.01.2025".to_string(),
            date_to: "03.01.2025".to_string(),
            ..SickLeaveField::default()
        }
    }

    #[test]
    fn empty_repeat_date_in_operation_extra_cell_is_not_misread() {
        let mut editor = ReportEditor::new();
        editor.set_operation_mode(true);
        editor.set_repeat(true, "", "");
        editor.set_sick_leave(issued_sick_leave());
        editor.text_changed();
        assert!(field_events(&mut editor).is_empty());
        assert!(editor.store().repeat.date.is_empty());
    }

    #[test]
    fn repeat_time_without_date_stays_a_time() {
        let mut editor = ReportEditor::new();
        editor.set_repeat(true, "", "10:00");
        editor.text_changed();
        assert!(field_events(&mut editor).is_empty());
        assert_eq!(editor.store().repeat.time, "10:00");
        assert!(editor.store().repeat.date.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn setting_values_then_reparsing_raises_no_field_events(
            operation in any::<bool>(),
            repeat in any::<bool>(),
            repeat_date in "([0-2][0-9]\\.0[1-9]\\.2025)?",
            repeat_time in "([0-9]|[01][0-9]):[0-5][0-9]|",
            sick in any::<bool>(),
            ad in "([0-9]{3}/[0-9]{2})?",
            complaints in prop::sample::select(vec!["", "боль в ухе", "заложенность носа"]),
        ) {
            let mut editor = ReportEditor::new();
            editor.set_operation_mode(operation);
            editor.set_ad(&ad);
            editor.set_complaints(complaints);
            editor.set_repeat(repeat, &repeat_date, &repeat_time);
            if sick {
                editor.set_sick_leave(issued_sick_leave());
            }
            editor.drain_events();

            editor.text_changed();
            prop_assert_eq!(field_events(&mut editor), Vec::<EditorEvent>::new());
            prop_assert_eq!(&editor.store().repeat.date, &repeat_date);
            prop_assert_eq!(&editor.store().repeat.time, &repeat_time);
        }
    }
}
