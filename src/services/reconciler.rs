use crate::models::{
    FileNode, FolderNode, Forest, Namespace, Node, PERSONAL_ROOT_ID, RootLabels, SHARED_ROOT_ID,
    Token,
};
use std::collections::{HashMap, HashSet};

/// Where a node ends up: under a virtual root or under a folder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Root(Namespace),
    Folder(usize),
}

struct FolderSlot {
    node: FolderNode,
    namespace: Namespace,
    parent: Owner,
    files: Vec<FileNode>,
}

fn root_of(id: &str) -> Option<Namespace> {
    match id {
        PERSONAL_ROOT_ID => Some(Namespace::Personal),
        SHARED_ROOT_ID => Some(Namespace::Shared),
        _ => None,
    }
}

/// Merges the flat enumeration output of both namespaces into a forest.
///
/// Folders are attached to their declared parent, or to the virtual root of
/// their namespace when that parent is unknown or part of a cycle. A token
/// seen in both namespaces is kept once, Shared taking priority over
/// Personal whatever the arrival order. Input vectors are consumed, the
/// returned forest is not shared with anything.
pub fn reconcile(files: Vec<FileNode>, folders: Vec<FolderNode>, labels: &RootLabels) -> Forest {
    let mut slots: Vec<FolderSlot> = Vec::with_capacity(folders.len());
    let mut index: HashMap<Token, usize> = HashMap::new();

    for mut folder in folders {
        if root_of(&folder.id).is_some() {
            continue;
        }
        folder.children.clear();
        let namespace =
            root_of(&folder.parent_id).unwrap_or_else(|| labels.namespace_of_path(&folder.path));

        match index.get(&folder.id) {
            Some(&existing) => {
                if namespace.outranks(slots[existing].namespace) {
                    tracing::debug!("Folder {} re-homed under {:?}", folder.id, namespace);
                    slots[existing].node = folder;
                    slots[existing].namespace = namespace;
                }
            }
            None => {
                index.insert(folder.id.clone(), slots.len());
                slots.push(FolderSlot {
                    node: folder,
                    namespace,
                    parent: Owner::Root(namespace),
                    files: Vec::new(),
                });
            }
        }
    }

    for i in 0..slots.len() {
        let parent_id = slots[i].node.parent_id.as_str();
        let parent = match root_of(parent_id) {
            Some(ns) => Owner::Root(ns),
            None => match index.get(parent_id) {
                Some(&p) if p != i => Owner::Folder(p),
                _ => {
                    tracing::debug!(
                        "Folder {} has no known parent {}, attaching to {:?} root",
                        slots[i].node.id,
                        parent_id,
                        slots[i].namespace
                    );
                    Owner::Root(slots[i].namespace)
                }
            },
        };
        slots[i].parent = parent;
    }

    break_cycles(&mut slots);

    let mut personal_files: Vec<FileNode> = Vec::new();
    let mut shared_files: Vec<FileNode> = Vec::new();
    let mut accepted: HashMap<Token, (Owner, Namespace)> = HashMap::new();

    for file in files {
        let owner = match root_of(&file.parent_id) {
            Some(ns) => Owner::Root(ns),
            None => match index.get(&file.parent_id) {
                Some(&p) => Owner::Folder(p),
                None => Owner::Root(file.origin),
            },
        };

        if let Some(&(prev_owner, prev_origin)) = accepted.get(&file.id) {
            if !file.origin.outranks(prev_origin) {
                tracing::debug!("Dropping duplicate {} ({:?})", file.id, file.origin);
                continue;
            }
            tracing::debug!("Shared copy of {} replaces personal shortcut", file.id);
            let bucket = match prev_owner {
                Owner::Root(Namespace::Personal) => &mut personal_files,
                Owner::Root(Namespace::Shared) => &mut shared_files,
                Owner::Folder(p) => &mut slots[p].files,
            };
            bucket.retain(|f| f.id != file.id);
        }

        accepted.insert(file.id.clone(), (owner, file.origin));
        match owner {
            Owner::Root(Namespace::Personal) => personal_files.push(file),
            Owner::Root(Namespace::Shared) => shared_files.push(file),
            Owner::Folder(p) => slots[p].files.push(file),
        }
    }

    assemble(slots, personal_files, shared_files, labels)
}

/// Reattaches every folder whose parent chain loops back on itself.
fn break_cycles(slots: &mut [FolderSlot]) {
    let mut grounded = vec![false; slots.len()];
    for start in 0..slots.len() {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = start;
        loop {
            if grounded[current] {
                break;
            }
            if !seen.insert(current) {
                tracing::warn!(
                    "Folder {} is part of a parent cycle, attaching to {:?} root",
                    slots[current].node.id,
                    slots[current].namespace
                );
                slots[current].parent = Owner::Root(slots[current].namespace);
                break;
            }
            chain.push(current);
            match slots[current].parent {
                Owner::Root(_) => break,
                Owner::Folder(p) => current = p,
            }
        }
        for idx in chain {
            grounded[idx] = true;
        }
    }
}

fn assemble(
    slots: Vec<FolderSlot>,
    personal_files: Vec<FileNode>,
    shared_files: Vec<FileNode>,
    labels: &RootLabels,
) -> Forest {
    let mut child_folders: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut personal_folders = Vec::new();
    let mut shared_folders = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        match slot.parent {
            Owner::Root(Namespace::Personal) => personal_folders.push(i),
            Owner::Root(Namespace::Shared) => shared_folders.push(i),
            Owner::Folder(p) => child_folders[p].push(i),
        }
    }

    let mut slots: Vec<Option<FolderSlot>> = slots.into_iter().map(Some).collect();

    let mut forest = Forest::empty(labels);
    forest.personal.children = build_children(
        &personal_folders,
        personal_files,
        PERSONAL_ROOT_ID,
        &mut slots,
        &child_folders,
    );
    forest.shared.children = build_children(
        &shared_folders,
        shared_files,
        SHARED_ROOT_ID,
        &mut slots,
        &child_folders,
    );

    collapse_duplicates(&mut forest.personal);
    collapse_duplicates(&mut forest.shared);
    forest
}

fn build_children(
    folders: &[usize],
    files: Vec<FileNode>,
    parent_id: &str,
    slots: &mut [Option<FolderSlot>],
    child_folders: &[Vec<usize>],
) -> Vec<Node> {
    let mut children = Vec::with_capacity(folders.len() + files.len());
    for &i in folders {
        let Some(slot) = slots[i].take() else {
            continue;
        };
        let mut folder = slot.node;
        folder.parent_id = parent_id.to_string();
        let own_id = folder.id.clone();
        folder.children =
            build_children(&child_folders[i], slot.files, &own_id, slots, child_folders);
        children.push(Node::Folder(folder));
    }
    for mut file in files {
        file.parent_id = parent_id.to_string();
        children.push(Node::File(file));
    }
    children
}

/// Top-down pass keeping one file per token inside each folder's children:
/// the first Shared occurrence, else the first occurrence.
pub fn collapse_duplicates(folder: &mut FolderNode) {
    let mut winners: HashMap<Token, (usize, Namespace)> = HashMap::new();
    for (pos, child) in folder.children.iter().enumerate() {
        if let Node::File(file) = child {
            match winners.get(&file.id) {
                Some(&(_, origin)) if !file.origin.outranks(origin) => {}
                _ => {
                    winners.insert(file.id.clone(), (pos, file.origin));
                }
            }
        }
    }

    let mut pos = 0;
    folder.children.retain(|child| {
        let keep = match child {
            Node::File(file) => winners.get(&file.id).is_some_and(|&(p, _)| p == pos),
            Node::Folder(_) => true,
        };
        pos += 1;
        keep
    });

    for child in &mut folder.children {
        if let Node::Folder(sub) = child {
            collapse_duplicates(sub);
        }
    }
}
