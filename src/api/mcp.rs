//! MCP Tool Endpoint
//!
//! JSON-RPC 2.0 over HTTP exposing remediation, escalation and log
//! analysis as tools for external agents.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::ApiState;
use crate::action::{Action, RemediationResult};
use crate::agent::NotifierEffector;
use crate::event::{Event, EventDetails, JobId, JobStatus};
use crate::llm::suggestion_text;
use crate::remediation::find_remediation_action;

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

impl McpResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

// ===== Tool params =====

#[derive(Debug, Deserialize)]
struct RemediateParams {
    job_id: JobId,
    status: String,
    #[serde(default)]
    details: Option<EventDetails>,
}

#[derive(Debug, Deserialize)]
struct EscalateParams {
    job_id: JobId,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    log_text: String,
    job_id: JobId,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

// ===== Handlers =====

/// POST /mcp
pub async fn mcp_handler(
    State(state): State<ApiState>,
    payload: Result<Json<McpRequest>, JsonRejection>,
) -> Json<McpResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => {
            return Json(McpResponse::error(
                None,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e.body_text()),
            ))
        }
    };
    debug!("MCP call: {}", request.method);

    let id = request.id.clone();
    let result = match request.method.as_str() {
        "remediate_issue" => match parse_params(request.params) {
            Ok(params) => Ok(remediate_issue(&state, params).await),
            Err(e) => Err(e),
        },
        "escalate_issue" => parse_params(request.params).map(escalate_issue),
        "analyze_log" => match parse_params(request.params) {
            Ok(params) => Ok(analyze_log(&state, params).await),
            Err(e) => Err(e),
        },
        _ => {
            return Json(McpResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                "Method not found",
            ))
        }
    };

    Json(match result {
        Ok(value) => McpResponse::success(id, value),
        Err(message) => McpResponse::error(id, error_codes::INVALID_PARAMS, message),
    })
}

async fn remediate_issue(state: &ApiState, params: RemediateParams) -> Value {
    let mut event = Event::new(params.job_id, params.status);
    event.details = params.details.unwrap_or_default();

    let mut results = Vec::new();
    if let Some(action) = find_remediation_action(&event, &state.rules) {
        let result = state.resolver.execute(action, &event).await;
        results.push((action.to_string(), result));
    }

    let success = results.iter().any(|(_, r)| *r != RemediationResult::Escalate);
    json!({
        "result": results
            .iter()
            .map(|(action, result)| json!({"action": action, "result": result.as_str()}))
            .collect::<Vec<_>>(),
        "success": success,
    })
}

fn escalate_issue(params: EscalateParams) -> Value {
    let mut event = Event::new(params.job_id.clone(), JobStatus::Escalate).with_escalate(true);
    event
        .details
        .extra
        .insert("reason".to_string(), Value::String(params.reason.clone()));
    NotifierEffector::notify(&Action::notify(&event, true));

    json!({
        "escalated": true,
        "message": format!("Job {} escalated: {}", params.job_id, params.reason),
    })
}

async fn analyze_log(state: &ApiState, params: AnalyzeParams) -> Value {
    let job_id = params.job_id.to_string();
    let suggestion = suggestion_text(state.llm.analyze_log(&params.log_text, Some(&job_id)).await);
    json!({"suggestion": suggestion})
}

/// GET /mcp/tools
pub async fn list_tools() -> Json<Value> {
    Json(json!({
        "tools": [
            {
                "name": "remediate_issue",
                "description": "Apply the configured remediation for a job status",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "job_id": {"type": ["string", "integer"]},
                        "status": {"type": "string"},
                        "details": {"type": "object"}
                    },
                    "required": ["job_id", "status"]
                }
            },
            {
                "name": "escalate_issue",
                "description": "Escalate a job to manual intervention",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "job_id": {"type": ["string", "integer"]},
                        "reason": {"type": "string"}
                    },
                    "required": ["job_id", "reason"]
                }
            },
            {
                "name": "analyze_log",
                "description": "Ask the language model for resolution steps",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "log_text": {"type": "string"},
                        "job_id": {"type": ["string", "integer"]}
                    },
                    "required": ["log_text", "job_id"]
                }
            }
        ]
    }))
}
