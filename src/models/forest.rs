use super::{DocumentKind, Namespace, RootLabels, Token};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Folder(FolderNode),
    File(FileNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.id,
            Node::File(file) => &file.id,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: Token,
    pub name: String,
    pub path: String,
    pub parent_id: Token,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: Token,
    pub kind: DocumentKind,
    pub name: String,
    pub remote_url: String,
    pub path: String,
    pub parent_id: Token,
    pub origin: Namespace,
}

impl FolderNode {
    pub fn new(
        id: impl Into<Token>,
        name: impl Into<String>,
        path: impl Into<String>,
        parent_id: impl Into<Token>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            parent_id: parent_id.into(),
            children: Vec::new(),
        }
    }

    pub fn virtual_root(namespace: Namespace, labels: &RootLabels) -> Self {
        let label = labels.label(namespace);
        Self::new(namespace.root_id(), label, label, "")
    }

    /// Depth-first, pre-order walk over every file below this folder.
    pub fn walk_files<'a>(&'a self, out: &mut Vec<&'a FileNode>) {
        for child in &self.children {
            match child {
                Node::File(file) => out.push(file),
                Node::Folder(folder) => folder.walk_files(out),
            }
        }
    }

    pub fn folder_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Folder(folder) => 1 + folder.folder_count(),
                Node::File(_) => 0,
            })
            .sum()
    }

    fn find_path(&self, token: &str, trail: &mut Vec<String>) -> Option<FileNode> {
        for child in &self.children {
            match child {
                Node::File(file) if file.id == token => return Some(file.clone()),
                Node::File(_) => {}
                Node::Folder(folder) => {
                    trail.push(folder.name.clone());
                    if let Some(found) = folder.find_path(token, trail) {
                        return Some(found);
                    }
                    trail.pop();
                }
            }
        }
        None
    }
}

/// The two-rooted tree produced by enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub personal: FolderNode,
    pub shared: FolderNode,
}

impl Forest {
    pub fn empty(labels: &RootLabels) -> Self {
        Self {
            personal: FolderNode::virtual_root(Namespace::Personal, labels),
            shared: FolderNode::virtual_root(Namespace::Shared, labels),
        }
    }

    pub fn roots(&self) -> [&FolderNode; 2] {
        [&self.personal, &self.shared]
    }

    pub fn files(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        self.personal.walk_files(&mut out);
        self.shared.walk_files(&mut out);
        out
    }

    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    pub fn folder_count(&self) -> usize {
        self.personal.folder_count() + self.shared.folder_count()
    }

    pub fn find_file(&self, token: &str) -> Option<&FileNode> {
        self.files().into_iter().find(|file| file.id == token)
    }

    /// Resolves a selection against the forest, keeping selection order.
    /// Tokens absent from the forest come back as `Err(token)`.
    pub fn select<'a>(&'a self, tokens: &[Token]) -> Vec<Result<&'a FileNode, Token>> {
        let files = self.files();
        tokens
            .iter()
            .map(|token| {
                files
                    .iter()
                    .find(|file| &file.id == token)
                    .copied()
                    .ok_or_else(|| token.clone())
            })
            .collect()
    }

    /// Folder names from the virtual root down to the file's parent,
    /// root label included.
    pub fn folder_trail(&self, token: &str) -> Option<Vec<String>> {
        for root in self.roots() {
            let mut trail = vec![root.name.clone()];
            if root.find_path(token, &mut trail).is_some() {
                return Some(trail);
            }
        }
        None
    }
}
