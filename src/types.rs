use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reference to an artifact stored in the engine's output directory.
///
/// The wire field `type` (folder class, usually `"output"`) is mapped to
/// [`kind`](Self::kind). Missing `subfolder` and `type` fields default to
/// `""` and `"output"`, which is what the engine means by their absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "output".to_string()
}

/// Output produced by a single graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<ArtifactRef>,
}

/// Execution history for one job, as returned by `GET /history/{job_id}`.
///
/// An empty record means the job is unknown or has not completed yet; the
/// two cases are indistinguishable at this endpoint and callers must treat
/// them identically.
///
/// `outputs` is keyed by node id. The map is ordered, so iterating a given
/// record always visits entries in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutput>,
}

impl HistoryRecord {
    /// True when the record carries no outputs at all.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// All artifact references in deterministic order: node-id order, then
    /// the order the node listed them.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.outputs.values().flat_map(|out| out.images.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_history_entry() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{
                "outputs": {
                    "9": {
                        "images": [
                            {"filename": "out_00001_.png", "subfolder": "", "type": "output"}
                        ]
                    }
                },
                "status": {"status_str": "success", "completed": true}
            }"#,
        )
        .unwrap();

        assert!(!record.is_empty());
        let artifacts: Vec<_> = record.artifacts().collect();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "out_00001_.png");
        assert_eq!(artifacts[0].kind, "output");
    }

    #[test]
    fn missing_outputs_is_empty() {
        let record: HistoryRecord = serde_json::from_str(r#"{}"#).unwrap();
        assert!(record.is_empty());
        assert_eq!(record.artifacts().count(), 0);
    }

    #[test]
    fn artifact_defaults_for_absent_fields() {
        let artifact: ArtifactRef =
            serde_json::from_str(r#"{"filename": "a.png"}"#).unwrap();
        assert_eq!(artifact.subfolder, "");
        assert_eq!(artifact.kind, "output");
    }

    #[test]
    fn artifacts_iterate_in_node_id_order() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{
                "outputs": {
                    "9": {"images": [{"filename": "second.png"}]},
                    "12": {"images": [{"filename": "first.png"}]}
                }
            }"#,
        )
        .unwrap();

        // BTreeMap order is lexicographic on the node id.
        let names: Vec<_> = record.artifacts().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["first.png", "second.png"]);
    }

    #[test]
    fn artifact_ref_serializes_wire_field_name() {
        let artifact = ArtifactRef {
            filename: "a.png".to_string(),
            subfolder: "batch".to_string(),
            kind: "output".to_string(),
        };
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"type\":\"output\""));
        assert!(!json.contains("kind"));
    }
}
