use super::error::ApiError;
use crate::models::{DocumentKind, FOLDER_TYPE_CODE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nodes without a `type` are treated as documents of unknown kind.
const UNTYPED_NODE_CODE: i64 = -1;

/// Common `{code, msg, data}` response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if let Some(code) = self.code
            && code != 0
        {
            return Err(ApiError::protocol(format!(
                "remote returned code {}: {}",
                code,
                self.msg.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| ApiError::protocol("response is missing `data`"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub node_list: Vec<String>,
    #[serde(default)]
    pub entities: ListingEntities,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingEntities {
    #[serde(default)]
    pub nodes: HashMap<String, RawNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub obj_token: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<i64>,
    pub url: Option<String>,
}

/// One usable child of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub token: String,
    pub name: String,
    pub type_code: i64,
    pub url: String,
}

impl RemoteEntry {
    pub fn folder(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            type_code: FOLDER_TYPE_CODE,
            url: String::new(),
        }
    }

    pub fn document(token: impl Into<String>, name: impl Into<String>, type_code: i64) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            type_code,
            url: String::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.type_code == FOLDER_TYPE_CODE
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_code(self.type_code)
    }
}

/// One page of a listing, entries in `node_list` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeListing {
    pub entries: Vec<RemoteEntry>,
    pub has_more: bool,
    pub last_label: Option<String>,
}

impl NodeListing {
    /// Cursor for the next page, if the listing says there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.last_label.as_deref().filter(|label| !label.is_empty())
        } else {
            None
        }
    }
}

impl From<ListingData> for NodeListing {
    fn from(data: ListingData) -> Self {
        let ListingData {
            node_list,
            mut entities,
            has_more,
            last_label,
        } = data;

        let entries = node_list
            .iter()
            .filter_map(|id| {
                let node = entities.nodes.remove(id)?;
                let token = node.obj_token.filter(|t| !t.is_empty())?;
                let name = node.name.filter(|n| !n.is_empty())?;
                Some(RemoteEntry {
                    token,
                    name,
                    type_code: node.node_type.unwrap_or(UNTYPED_NODE_CODE),
                    url: node.url.unwrap_or_default(),
                })
            })
            .collect();

        Self {
            entries,
            has_more,
            last_label,
        }
    }
}

/// Body of the export-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub token: String,
    #[serde(rename = "type")]
    pub export_type: String,
    pub file_extension: String,
    pub event_source: u8,
    pub need_comment: bool,
}

impl ExportRequest {
    pub fn new(token: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            token: token.into(),
            export_type: kind.export_type().to_string(),
            file_extension: kind.extension().to_string(),
            event_source: 1,
            need_comment: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportTicketData {
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportResultData {
    pub result: Option<ExportResultBody>,
}

#[derive(Debug, Deserialize)]
pub struct ExportResultBody {
    pub file_token: Option<String>,
    pub file_extension: Option<String>,
}

/// A finished export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub file_token: String,
    pub file_extension: Option<String>,
}

impl ExportResultData {
    /// `None` while the job is still running.
    pub fn into_result(self) -> Option<ExportResult> {
        let body = self.result?;
        let file_token = body.file_token.filter(|t| !t.is_empty())?;
        Some(ExportResult {
            file_token,
            file_extension: body.file_extension.filter(|e| !e.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_keeps_order_and_skips_incomplete_nodes() {
        let raw = json!({
            "code": 0,
            "data": {
                "node_list": ["n2", "n1", "ghost", "n3", "n4"],
                "entities": {
                    "nodes": {
                        "n1": {"obj_token": "tok1", "name": "Folder", "type": 0},
                        "n2": {"obj_token": "tok2", "name": "Doc", "type": 22, "url": "https://x/doc"},
                        "n3": {"obj_token": "", "name": "No token", "type": 2},
                        "n4": {"obj_token": "tok4", "type": 2}
                    }
                },
                "has_more": true,
                "last_label": "cursor-1"
            }
        });
        let envelope: Envelope<ListingData> = serde_json::from_value(raw).unwrap();
        let listing = NodeListing::from(envelope.into_data().unwrap());

        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].token, "tok2");
        assert_eq!(listing.entries[0].kind(), DocumentKind::DocumentV2);
        assert_eq!(listing.entries[0].url, "https://x/doc");
        assert!(listing.entries[1].is_folder());
        assert_eq!(listing.next_cursor(), Some("cursor-1"));
    }

    #[test]
    fn test_envelope_rejects_error_code() {
        let raw = json!({"code": 4, "msg": "forbidden", "data": null});
        let envelope: Envelope<ListingData> = serde_json::from_value(raw).unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(matches!(err, ApiError::Protocol { .. }));
    }

    #[test]
    fn test_envelope_requires_data() {
        let envelope: Envelope<ListingData> = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.into_data().is_err());
    }

    #[test]
    fn test_export_request_body() {
        let body = serde_json::to_value(ExportRequest::new("doc1", DocumentKind::Slides)).unwrap();
        assert_eq!(
            body,
            json!({
                "token": "doc1",
                "type": "slides",
                "file_extension": "pptx",
                "event_source": 1,
                "need_comment": false
            })
        );
    }

    #[test]
    fn test_export_result_pending_and_ready() {
        let pending: ExportResultData =
            serde_json::from_value(json!({"result": {"file_token": ""}})).unwrap();
        assert!(pending.into_result().is_none());

        let ready: ExportResultData = serde_json::from_value(
            json!({"result": {"file_token": "box1", "file_extension": "docx"}}),
        )
        .unwrap();
        let result = ready.into_result().unwrap();
        assert_eq!(result.file_token, "box1");
        assert_eq!(result.file_extension.as_deref(), Some("docx"));
    }
}
