pub mod arbiter;
pub mod debounce;
pub mod editor;
pub mod events;
pub mod fields;
pub mod labels;
pub mod layout;
pub mod paginate;
pub mod parse;
pub mod render;

use serde::{Deserialize, Serialize};

pub use editor::ReportEditor;
pub use events::EditorEvent;
pub use fields::FieldStore;
pub use layout::{RowMap, Section, Visibility};

/// Which report the document currently lays out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Examination,
    Operation,
}

impl Mode {
    /// Directory name used by the template store.
    pub fn dir_name(self) -> &'static str {
        match self {
            Mode::Examination => "Examination",
            Mode::Operation => "Operation",
        }
    }
}
