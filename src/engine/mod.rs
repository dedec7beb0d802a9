// src/engine/mod.rs
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};

pub mod whitelist;

/// What the backend is asked to do with an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformType {
    Init,
    Run,
    SaveImg,
    EditImg,
    RewriteImgs,
    Abort,
}

impl PerformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformType::Init => "init",
            PerformType::Run => "run",
            PerformType::SaveImg => "saveImg",
            PerformType::EditImg => "editImg",
            PerformType::RewriteImgs => "rewriteImgs",
            PerformType::Abort => "abort",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Analysis,
    RCode,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Analysis => "analysis",
            EngineState::RCode => "rCode",
        }
    }
}

/// A script a form control wants evaluated against the data set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub analysis_id: usize,
    pub control: String,
    pub script: String,
}

impl ScriptRequest {
    pub fn as_json(&self) -> Value {
        json!({
            "typeRequest": EngineState::RCode.as_str(),
            "analysisId": self.analysis_id,
            "controlName": self.control,
            "rCode": self.script,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// Final or interim results of an analysis run.
    Results {
        analysis_id: usize,
        status: String,
        results: Value,
        progress: Value,
    },
    ImageSaved { analysis_id: usize, results: Value },
    ImageEdited { analysis_id: usize, results: Value },
    ScriptDone {
        analysis_id: usize,
        control: String,
        result: String,
    },
}

impl EngineReply {
    pub fn analysis_id(&self) -> usize {
        match self {
            EngineReply::Results { analysis_id, .. }
            | EngineReply::ImageSaved { analysis_id, .. }
            | EngineReply::ImageEdited { analysis_id, .. }
            | EngineReply::ScriptDone { analysis_id, .. } => *analysis_id,
        }
    }

    pub fn from_json(json: &Value) -> Option<EngineReply> {
        let type_request = json.get("typeRequest")?.as_str()?;

        if type_request == EngineState::RCode.as_str() {
            return Some(EngineReply::ScriptDone {
                analysis_id: json.get("analysisId")?.as_u64()? as usize,
                control: json.get("controlName")?.as_str()?.to_string(),
                result: json
                    .get("result")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let analysis_id = json.get("id")?.as_u64()? as usize;
        let results = json.get("results").cloned().unwrap_or(Value::Null);

        match json.get("status")?.as_str()? {
            "imageSaved" => Some(EngineReply::ImageSaved { analysis_id, results }),
            "imageEdited" => Some(EngineReply::ImageEdited { analysis_id, results }),
            status => Some(EngineReply::Results {
                analysis_id,
                status: status.to_string(),
                results,
                progress: json.get("progress").cloned().unwrap_or(Value::Null),
            }),
        }
    }
}

/// Outgoing request queue plus the channel the backend answers on. The UI
/// loop drains both every frame.
pub struct EngineLink {
    outgoing: VecDeque<Value>,
    reply_tx: Sender<Value>,
    reply_rx: Receiver<Value>,
}

impl Default for EngineLink {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLink {
    pub fn new() -> Self {
        let (reply_tx, reply_rx) = mpsc::channel();
        Self {
            outgoing: VecDeque::new(),
            reply_tx,
            reply_rx,
        }
    }

    pub fn send(&mut self, request: Value) {
        tracing::debug!("queueing backend request {}", request);
        self.outgoing.push_back(request);
    }

    pub fn pending_requests(&self) -> usize {
        self.outgoing.len()
    }

    pub fn take_outgoing(&mut self) -> Vec<Value> {
        self.outgoing.drain(..).collect()
    }

    /// Handle for whoever runs the backend.
    pub fn reply_sender(&self) -> Sender<Value> {
        self.reply_tx.clone()
    }

    /// Every reply received since the last poll. Malformed replies are
    /// logged and dropped.
    pub fn poll_replies(&self) -> Vec<EngineReply> {
        self.reply_rx
            .try_iter()
            .filter_map(|json| {
                let reply = EngineReply::from_json(&json);
                if reply.is_none() {
                    tracing::warn!("dropping malformed backend reply: {}", json);
                }
                reply
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_travel_through_the_channel() {
        let link = EngineLink::new();
        let tx = link.reply_sender();

        tx.send(json!({"typeRequest": "analysis", "id": 3, "status": "complete", "results": {"a": 1}}))
            .unwrap();
        tx.send(json!({"nonsense": true})).unwrap();
        tx.send(json!({"typeRequest": "rCode", "analysisId": 3, "controlName": "dataEntry", "result": "TRUE"}))
            .unwrap();

        let replies = link.poll_replies();
        assert_eq!(replies.len(), 2);
        assert!(matches!(&replies[0], EngineReply::Results { status, .. } if status == "complete"));
        assert_eq!(
            replies[1],
            EngineReply::ScriptDone {
                analysis_id: 3,
                control: "dataEntry".into(),
                result: "TRUE".into(),
            }
        );
        assert!(link.poll_replies().is_empty());
    }

    #[test]
    fn image_replies_are_told_apart() {
        let reply = EngineReply::from_json(&json!({
            "typeRequest": "analysis", "id": 1, "status": "imageSaved", "results": {"name": "plot.png"}
        }));
        assert!(matches!(reply, Some(EngineReply::ImageSaved { analysis_id: 1, .. })));
    }

    #[test]
    fn outgoing_queue_drains_in_order() {
        let mut link = EngineLink::new();
        link.send(json!({"id": 1}));
        link.send(json!({"id": 2}));
        assert_eq!(link.pending_requests(), 2);
        assert_eq!(link.take_outgoing(), vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(link.pending_requests(), 0);
    }
}
