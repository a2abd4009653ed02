//! Named field presets stored as JSON, one file per template, one entry per
//! anatomical side.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::report::{
    Mode,
    fields::{
        DiagnosisField, ObjectiveField, OpStaffField, OperationField, RecommendationsField,
        SickLeaveField, SurdologyField,
    },
};

const SPECIALTY_DIR: &str = "Otorhinolaryngologist";
const TEMPLATES_DIR: &str = "Templates";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Right,
    Left,
    Bilateral,
    Convalescence,
    Other,
}

impl Side {
    pub const ALL: [Side; 5] = [
        Side::Right,
        Side::Left,
        Side::Bilateral,
        Side::Convalescence,
        Side::Other,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Side::Right => "right",
            Side::Left => "left",
            Side::Bilateral => "bilateral",
            Side::Convalescence => "convalescence",
            Side::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|side| side.key().eq_ignore_ascii_case(key.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateIndicators {
    pub ad: String,
    pub temp: String,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalData {
    pub paid: bool,
    pub consent: bool,
    pub surdology_visible: bool,
}

impl Default for AdditionalData {
    fn default() -> Self {
        Self {
            paid: false,
            consent: true,
            surdology_visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateComplaints {
    pub complaints: String,
    pub no_complaints: bool,
    pub anamnesis: String,
    pub show_anamnesis_label: bool,
}

impl Default for TemplateComplaints {
    fn default() -> Self {
        Self {
            complaints: String::new(),
            no_complaints: false,
            anamnesis: String::new(),
            show_anamnesis_label: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherData {
    pub repeat: bool,
    pub repeat_date: String,
    pub repeat_time: String,
}

/// Older templates store the diagnosis as a bare HTML string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosisEntry {
    Html(String),
    Full(DiagnosisField),
}

impl DiagnosisEntry {
    /// The field value to apply. A bare string resets the flags in examination
    /// mode and keeps `current` flags in operation mode.
    pub fn resolve(&self, mode: Mode, current: &DiagnosisField) -> DiagnosisField {
        match self {
            DiagnosisEntry::Full(field) => field.clone(),
            DiagnosisEntry::Html(text) => match mode {
                Mode::Examination => DiagnosisField {
                    text: text.clone(),
                    ..DiagnosisField::default()
                },
                Mode::Operation => DiagnosisField {
                    text: text.clone(),
                    ..current.clone()
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecommendationsEntry {
    Html(String),
    Full(RecommendationsField),
}

impl RecommendationsEntry {
    pub fn resolve(&self, mode: Mode, current: &RecommendationsField) -> RecommendationsField {
        match self {
            RecommendationsEntry::Full(field) => field.clone(),
            RecommendationsEntry::Html(text) => match mode {
                Mode::Examination => RecommendationsField {
                    text: text.clone(),
                    show_label: true,
                },
                Mode::Operation => RecommendationsField {
                    text: text.clone(),
                    show_label: current.show_label,
                },
            },
        }
    }
}

/// Values saved for one side. Every key is optional; applying a template
/// resets the fields of an absent key to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<TemplateIndicators>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<AdditionalData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaints_anamnesis: Option<TemplateComplaints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectiveField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surdology: Option<SurdologyField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sick_leave: Option<SickLeaveField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_data: Option<OtherData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationsEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_data: Option<OperationField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_staff: Option<OpStaffField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateFile {
    pub template_name: String,
    /// Keyed by side; unknown keys are preserved on save.
    pub data: BTreeMap<String, TemplateData>,
}

impl TemplateFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            template_name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn side(&self, side: Side) -> Option<&TemplateData> {
        self.data.get(side.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `Templates` under the user data directory, or `root` when one is configured.
    pub fn from_settings(root: Option<&Path>) -> Self {
        match root {
            Some(root) => Self::new(root),
            None => Self::new(default_root()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, mode: Mode) -> PathBuf {
        self.root.join(SPECIALTY_DIR).join(mode.dir_name())
    }

    /// Template names, sorted. Unreadable files are skipped.
    pub fn list(&self, mode: Mode) -> Vec<String> {
        let mut names: Vec<String> = json_files(&self.dir(mode))
            .into_iter()
            .filter_map(|path| {
                let file = read_template(&path)?;
                if file.template_name.trim().is_empty() {
                    Some(file_stem(&path))
                } else {
                    Some(file.template_name)
                }
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Finds the file for `name`: `<name>.json` first, then any file whose
    /// `template_name` matches.
    pub fn find(&self, mode: Mode, name: &str) -> Option<PathBuf> {
        let dir = self.dir(mode);
        let direct = dir.join(file_name(name));
        if direct.is_file() {
            return Some(direct);
        }
        json_files(&dir).into_iter().find(|path| {
            read_template(path).is_some_and(|file| file.template_name == name)
        })
    }

    pub fn load(&self, mode: Mode, name: &str) -> Option<TemplateFile> {
        let path = self.find(mode, name)?;
        read_template(&path)
    }

    pub fn load_side(&self, mode: Mode, name: &str, side: Side) -> Option<TemplateData> {
        self.load(mode, name)?.data.remove(side.key())
    }

    /// Stores `data` under `side`, keeping the other sides already in the file.
    pub fn save(&self, mode: Mode, name: &str, side: Side, data: TemplateData) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Template("template name is empty".to_string()));
        }
        let dir = self.dir(mode);
        fs::create_dir_all(&dir)?;

        let path = self
            .find(mode, name)
            .unwrap_or_else(|| dir.join(file_name(name)));
        let mut file = read_template(&path).unwrap_or_else(|| TemplateFile::new(name));
        if file.template_name.trim().is_empty() {
            file.template_name = name.to_string();
        }
        file.data.insert(side.key().to_string(), data);

        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        log::debug!("saved template {name:?} ({}) to {}", side.key(), path.display());
        Ok(path)
    }

    /// Removes the template file. Returns false when no such template exists.
    pub fn delete(&self, mode: Mode, name: &str) -> Result<bool> {
        let Some(path) = self.find(mode, name) else {
            return Ok(false);
        };
        fs::remove_file(&path)?;
        log::debug!("deleted template {name:?} at {}", path.display());
        Ok(true)
    }
}

pub fn default_root() -> PathBuf {
    crate::settings::data_root().join(TEMPLATES_DIR)
}

fn file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{safe}.json")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::debug!("template dir {} unavailable: {err}", dir.display());
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();
    files
}

fn read_template(path: &Path) -> Option<TemplateFile> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<TemplateFile>(&text) {
        Ok(file) => Some(file),
        Err(err) => {
            log::warn!("skipping malformed template {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_store(name: &str) -> TemplateStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        TemplateStore::new(std::env::temp_dir().join(format!("lorpaper_templates_{name}_{nanos}")))
    }

    #[test]
    fn diagnosis_accepts_string_and_object() {
        let json = r#"{
            "diagnosis": "<p>Острый отит</p>",
            "recommendations": {"text": "<p>Капли</p>", "show_label": false},
            "signature_visible": true
        }"#;
        let data: TemplateData = serde_json::from_str(json).unwrap();

        let current = DiagnosisField {
            text: String::new(),
            show_label: false,
            no_acute_pathology: true,
        };
        let diagnosis = data.diagnosis.as_ref().unwrap();
        let exam = diagnosis.resolve(Mode::Examination, &current);
        assert!(exam.show_label);
        assert!(!exam.no_acute_pathology);
        assert_eq!(exam.text, "<p>Острый отит</p>");

        let op = diagnosis.resolve(Mode::Operation, &current);
        assert!(!op.show_label);
        assert!(op.no_acute_pathology);

        let rec = data
            .recommendations
            .as_ref()
            .unwrap()
            .resolve(Mode::Examination, &RecommendationsField::default());
        assert!(!rec.show_label);
        assert_eq!(data.signature_visible, Some(true));
        assert!(data.objective.is_none());
    }

    #[test]
    fn missing_nested_keys_use_field_defaults() {
        let data: TemplateData =
            serde_json::from_str(r#"{"additional": {"paid": true}, "complaints_anamnesis": {}}"#)
                .unwrap();
        let additional = data.additional.unwrap();
        assert!(additional.paid);
        assert!(additional.consent);
        assert!(!additional.surdology_visible);
        assert!(data.complaints_anamnesis.unwrap().show_anamnesis_label);
    }

    #[test]
    fn save_merges_sides_and_list_reads_names() {
        let store = temp_store("merge");
        let right = TemplateData {
            signature_visible: Some(true),
            ..TemplateData::default()
        };
        let left = TemplateData {
            diagnosis: Some(DiagnosisEntry::Html("<p>Серная пробка</p>".to_string())),
            ..TemplateData::default()
        };
        store.save(Mode::Examination, "Отит", Side::Right, right.clone()).unwrap();
        store.save(Mode::Examination, "Отит", Side::Left, left.clone()).unwrap();

        let file = store.load(Mode::Examination, "Отит").unwrap();
        assert_eq!(file.template_name, "Отит");
        assert_eq!(file.side(Side::Right), Some(&right));
        assert_eq!(file.side(Side::Left), Some(&left));
        assert_eq!(store.list(Mode::Examination), vec!["Отит".to_string()]);
        assert!(store.list(Mode::Operation).is_empty());

        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn load_falls_back_to_template_name_scan() {
        let store = temp_store("scan");
        let dir = store.dir(Mode::Operation);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("renamed.json"),
            r#"{"template_name": "Тонзиллэктомия", "data": {"other": {"op_staff": {"operator": "Иванов"}}}}"#,
        )
        .unwrap();
        fs::write(dir.join("broken.json"), "{").unwrap();

        let data = store
            .load_side(Mode::Operation, "Тонзиллэктомия", Side::Other)
            .unwrap();
        assert_eq!(data.op_staff.unwrap().operator, "Иванов");
        assert_eq!(store.list(Mode::Operation), vec!["Тонзиллэктомия".to_string()]);

        assert!(store.delete(Mode::Operation, "Тонзиллэктомия").unwrap());
        assert!(!store.delete(Mode::Operation, "Тонзиллэктомия").unwrap());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn empty_name_is_rejected() {
        let store = temp_store("empty");
        let err = store
            .save(Mode::Examination, "  ", Side::Right, TemplateData::default())
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn side_keys_round_trip() {
        for side in Side::ALL {
            assert_eq!(Side::from_key(side.key()), Some(side));
        }
        assert_eq!(Side::from_key("RIGHT"), Some(Side::Right));
        assert_eq!(Side::from_key("middle"), None);
    }
}
