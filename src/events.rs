//! Push-channel event parsing.
//!
//! The engine pushes JSON text frames shaped `{"type": "<kind>", "data": {...}}`
//! over its WebSocket. Only `executing` and `execution_error` matter for
//! completion tracking; the other kinds are parsed so they can be trace-logged
//! and skipped. Frames with unknown kinds fail to parse and are skipped too.

use serde::Deserialize;

/// A single frame from the engine's push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    /// Periodic queue-state broadcast. Ignored by the tracker.
    #[serde(rename = "status")]
    Status(serde_json::Value),

    /// A job left the queue and started running. Ignored by the tracker.
    #[serde(rename = "execution_start")]
    ExecutionStart(serde_json::Value),

    /// Nodes served from the engine's cache. Ignored by the tracker.
    #[serde(rename = "execution_cached")]
    ExecutionCached(serde_json::Value),

    /// A node started executing. `node: null` marks the job's terminal state:
    /// nothing is left to run.
    #[serde(rename = "executing")]
    Executing(ExecutingPayload),

    /// Step progress inside a long-running node. Ignored by the tracker.
    #[serde(rename = "progress")]
    Progress(ProgressPayload),

    /// A node finished and produced output. Ignored by the tracker; outputs
    /// are collected from history once the job is terminal.
    #[serde(rename = "executed")]
    Executed(serde_json::Value),

    /// The job failed. Kept as raw JSON so the engine's diagnostic reaches
    /// the caller unmodified.
    #[serde(rename = "execution_error")]
    ExecutionError(serde_json::Value),
}

/// Payload of an `executing` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingPayload {
    /// Node currently running; `None` once the job has no more nodes to run.
    pub node: Option<String>,
    /// Job the frame belongs to. Older engine builds omit it.
    #[serde(default)]
    pub prompt_id: Option<String>,
}

/// Payload of a `progress` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressPayload {
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub max: u64,
}

/// Parse one push-channel text frame.
///
/// Returns `Err` for malformed JSON and for frame kinds this crate does not
/// know. Callers log and skip those.
pub fn parse_event(text: &str) -> Result<PushEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Job id carried by an `execution_error` payload, when present.
pub fn error_job_id(payload: &serde_json::Value) -> Option<&str> {
    payload.get("prompt_id").and_then(serde_json::Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executing_with_running_node() {
        let event = parse_event(r#"{"type":"executing","data":{"node":"5","prompt_id":"job-1"}}"#)
            .unwrap();
        match event {
            PushEvent::Executing(data) => {
                assert_eq!(data.node.as_deref(), Some("5"));
                assert_eq!(data.prompt_id.as_deref(), Some("job-1"));
            }
            other => panic!("expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn executing_terminal_has_null_node() {
        let event =
            parse_event(r#"{"type":"executing","data":{"node":null,"prompt_id":"job-1"}}"#)
                .unwrap();
        match event {
            PushEvent::Executing(data) => {
                assert!(data.node.is_none());
                assert_eq!(data.prompt_id.as_deref(), Some("job-1"));
            }
            other => panic!("expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn executing_without_prompt_id() {
        let event = parse_event(r#"{"type":"executing","data":{"node":null}}"#).unwrap();
        match event {
            PushEvent::Executing(data) => assert!(data.prompt_id.is_none()),
            other => panic!("expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn execution_error_payload_is_verbatim() {
        let event = parse_event(
            r#"{"type":"execution_error","data":{"prompt_id":"job-1","node_id":"5","exception_message":"out of memory","exception_type":"RuntimeError","extra":{"traceback":["..."]}}}"#,
        )
        .unwrap();
        match event {
            PushEvent::ExecutionError(payload) => {
                assert_eq!(error_job_id(&payload), Some("job-1"));
                assert_eq!(payload["exception_message"], "out of memory");
                // Fields this crate has no use for survive untouched.
                assert!(payload["extra"]["traceback"].is_array());
            }
            other => panic!("expected ExecutionError, got {other:?}"),
        }
    }

    #[test]
    fn progress_frame() {
        let event = parse_event(r#"{"type":"progress","data":{"value":5,"max":20}}"#).unwrap();
        match event {
            PushEvent::Progress(data) => {
                assert_eq!(data.value, 5);
                assert_eq!(data.max, 20);
            }
            other => panic!("expected Progress, got {other:?}"),
        }
    }

    #[test]
    fn status_frame_parses_opaquely() {
        let event = parse_event(
            r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":2}}}}"#,
        )
        .unwrap();
        assert!(matches!(event, PushEvent::Status(_)));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert!(parse_event(r#"{"type":"crystools.monitor","data":{}}"#).is_err());
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(parse_event("not json").is_err());
    }
}
