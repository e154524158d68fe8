use serde::{Deserialize, Serialize};

pub mod forest;

pub use forest::{FileNode, FolderNode, Forest, Node};

/// Opaque identifier issued by the remote workspace for files and folders.
pub type Token = String;

/// Sentinel id of the virtual "my files" root.
pub const PERSONAL_ROOT_ID: &str = "personal-root";
/// Sentinel id of the virtual "shared files" root.
pub const SHARED_ROOT_ID: &str = "shared-root";

/// Node type code the listing endpoints use for folders.
pub const FOLDER_TYPE_CODE: i64 = 0;

/// The two independent listing trees of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Personal,
    Shared,
}

impl Namespace {
    pub fn root_id(self) -> &'static str {
        match self {
            Namespace::Personal => PERSONAL_ROOT_ID,
            Namespace::Shared => SHARED_ROOT_ID,
        }
    }

    /// Shared is the owning location, Personal only holds shortcuts.
    pub fn outranks(self, other: Namespace) -> bool {
        self == Namespace::Shared && other == Namespace::Personal
    }
}

/// Labels of the two virtual roots. Paths are rooted under one of them,
/// which is how a node's namespace is recovered from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLabels {
    pub personal: String,
    pub shared: String,
}

impl RootLabels {
    pub fn new(personal: impl Into<String>, shared: impl Into<String>) -> Self {
        Self {
            personal: personal.into(),
            shared: shared.into(),
        }
    }

    pub fn label(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Personal => &self.personal,
            Namespace::Shared => &self.shared,
        }
    }

    /// Shared when `path` is the shared label itself or lies below it.
    pub fn namespace_of_path(&self, path: &str) -> Namespace {
        match path.strip_prefix(self.shared.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => Namespace::Shared,
            _ => Namespace::Personal,
        }
    }
}

impl Default for RootLabels {
    fn default() -> Self {
        Self::new("My Folders", "Shared Folders")
    }
}

/// Native document kinds, keyed by the remote `type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum DocumentKind {
    Sheet,
    Slides,
    Document,
    DocumentV2,
    MultiDimensionTable,
    MindNote,
    Unknown(i64),
}

impl DocumentKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            8 => DocumentKind::MultiDimensionTable,
            3 => DocumentKind::Sheet,
            30 => DocumentKind::Slides,
            2 => DocumentKind::Document,
            22 => DocumentKind::DocumentV2,
            11 => DocumentKind::MindNote,
            other => DocumentKind::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            DocumentKind::MultiDimensionTable => 8,
            DocumentKind::Sheet => 3,
            DocumentKind::Slides => 30,
            DocumentKind::Document => 2,
            DocumentKind::DocumentV2 => 22,
            DocumentKind::MindNote => 11,
            DocumentKind::Unknown(code) => code,
        }
    }

    /// Type string the export endpoints expect. Empty for unknown kinds.
    pub fn export_type(self) -> &'static str {
        match self {
            DocumentKind::MultiDimensionTable => "bitable",
            DocumentKind::Sheet => "sheet",
            DocumentKind::Slides => "slides",
            DocumentKind::Document => "doc",
            DocumentKind::DocumentV2 => "docx",
            DocumentKind::MindNote => "mindnote",
            DocumentKind::Unknown(_) => "",
        }
    }

    /// Default extension of the exported file.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::MultiDimensionTable | DocumentKind::Sheet => "xlsx",
            DocumentKind::Slides => "pptx",
            DocumentKind::Document | DocumentKind::DocumentV2 => "docx",
            DocumentKind::MindNote => "mm",
            DocumentKind::Unknown(_) => "pdf",
        }
    }
}

impl From<i64> for DocumentKind {
    fn from(code: i64) -> Self {
        DocumentKind::from_code(code)
    }
}

impl From<DocumentKind> for i64 {
    fn from(kind: DocumentKind) -> Self {
        kind.code()
    }
}

pub fn kind_to_extension(code: i64) -> &'static str {
    DocumentKind::from_code(code).extension()
}

pub fn kind_to_export_type(code: i64) -> &'static str {
    DocumentKind::from_code(code).export_type()
}
