use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;
use crate::document::model::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE_PT, Margins};
use crate::report::debounce::DEFAULT_PAGINATION_DEBOUNCE_MS;
use crate::report::labels;

pub const SETTINGS_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    pub page: PageSettings,
    pub editor: EditorSettings,
    pub doctor: DoctorSettings,
    pub printing: PrintingSettings,
    pub export: ExportSettings,
    pub templates: TemplateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            page: PageSettings::default(),
            editor: EditorSettings::default(),
            doctor: DoctorSettings::default(),
            printing: PrintingSettings::default(),
            export: ExportSettings::default(),
            templates: TemplateSettings::default(),
        }
    }
}

impl Settings {
    pub fn migrate(mut self) -> Self {
        if self.schema_version > SETTINGS_SCHEMA_VERSION {
            return self;
        }

        // Version 1 stored the font size as 0 when the user never picked one.
        if self.schema_version < 2 && self.editor.font_size_pt <= 0.0 {
            self.editor.font_size_pt = DEFAULT_FONT_SIZE_PT;
        }
        self.page = self.page.clamped();
        self.schema_version = SETTINGS_SCHEMA_VERSION;
        self
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSettings {
    pub margin_left_mm: f32,
    pub margin_top_mm: f32,
    pub margin_right_mm: f32,
    pub margin_bottom_mm: f32,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            margin_left_mm: 25.0,
            margin_top_mm: 12.7,
            margin_right_mm: 12.7,
            margin_bottom_mm: 12.7,
        }
    }
}

impl PageSettings {
    pub fn margins(&self) -> Margins {
        Margins::from_mm(
            self.margin_left_mm,
            self.margin_top_mm,
            self.margin_right_mm,
            self.margin_bottom_mm,
        )
    }

    fn clamped(self) -> Self {
        let clamp = |mm: f32| if mm.is_finite() { mm.clamp(0.0, 60.0) } else { 12.7 };
        Self {
            margin_left_mm: clamp(self.margin_left_mm),
            margin_top_mm: clamp(self.margin_top_mm),
            margin_right_mm: clamp(self.margin_right_mm),
            margin_bottom_mm: clamp(self.margin_bottom_mm),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub font_family: String,
    pub font_size_pt: f32,
    pub pagination_debounce_ms: u64,
    pub split_layout: bool,
    pub borders_visible: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            pagination_debounce_ms: DEFAULT_PAGINATION_DEBOUNCE_MS,
            split_layout: false,
            borders_visible: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DoctorSettings {
    pub name: String,
    pub specialty: String,
}

impl Default for DoctorSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            specialty: labels::DEFAULT_SPECIALTY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrintingSettings {
    /// Dashed cut line across the middle of each printed page.
    pub split_line: bool,
    pub last_printer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    pub pdf_font_regular: Option<PathBuf>,
    pub pdf_font_bold: Option<PathBuf>,
    pub default_format: DocumentFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            pdf_font_regular: None,
            pdf_font_bold: None,
            default_format: DocumentFormat::Pdf,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateSettings {
    /// Overrides the templates directory under the user data folder.
    pub root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_margins_match_the_page_geometry() {
        assert_eq!(PageSettings::default().margins(), Margins::default());
    }

    #[test]
    fn missing_sections_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"doctor": {"name": "Иванов И.И."}}"#).unwrap();
        assert_eq!(settings.doctor.name, "Иванов И.И.");
        assert_eq!(settings.doctor.specialty, labels::DEFAULT_SPECIALTY);
        assert!(settings.editor.borders_visible);
        assert_eq!(settings.export.default_format, DocumentFormat::Pdf);
    }

    #[test]
    fn migrate_repairs_version_one_values() {
        let mut settings = Settings {
            schema_version: 1,
            ..Settings::default()
        };
        settings.editor.font_size_pt = 0.0;
        settings.page.margin_left_mm = 400.0;
        let migrated = settings.migrate();
        assert_eq!(migrated.schema_version, SETTINGS_SCHEMA_VERSION);
        assert_eq!(migrated.editor.font_size_pt, DEFAULT_FONT_SIZE_PT);
        assert_eq!(migrated.page.margin_left_mm, 60.0);
    }
}
