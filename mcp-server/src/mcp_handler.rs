use anyhow::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{AnalyticsUseCase, IngestionUseCase};

#[derive(Debug, serde::Deserialize)]
#[allow(dead_code)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message, data }),
            id,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub struct MCPHandler {
    analytics_use_case: Arc<AnalyticsUseCase>,
    ingestion_use_case: Arc<IngestionUseCase>,
}

impl MCPHandler {
    pub fn new(
        analytics_use_case: Arc<AnalyticsUseCase>,
        ingestion_use_case: Arc<IngestionUseCase>,
    ) -> Self {
        Self {
            analytics_use_case,
            ingestion_use_case,
        }
    }

    /// Reads one JSON-RPC message per line and answers every request on `writer`.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let response = JsonRpcResponse::failure(
                        None,
                        PARSE_ERROR,
                        "Parse error".to_string(),
                        Some(json!(e.to_string())),
                    );
                    write_response(&mut writer, &response)?;
                    continue;
                }
            };

            // Notifications never get a response.
            if request.id.is_none() || request.method.starts_with("notifications/") {
                if request.method == "notifications/initialized" {
                    info!("Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            write_response(&mut writer, &response)?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.get_tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            other => JsonRpcResponse::failure(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
                None,
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Initializing lotto stats MCP server");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto-mcp-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params".to_string(), None);
        };
        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing tool name".to_string(), None);
        };

        let arguments: HashMap<String, Value> = match params.get("arguments").cloned() {
            None | Some(Value::Null) => HashMap::new(),
            Some(raw) => match serde_json::from_value(raw) {
                Ok(arguments) => arguments,
                Err(e) => {
                    return JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        "Tool arguments must be an object".to_string(),
                        Some(json!(e.to_string())),
                    );
                }
            },
        };

        match self.execute_tool(tool_name, &arguments).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => {
                warn!("Tool {} failed: {}", tool_name, e);
                JsonRpcResponse::failure(
                    id,
                    INTERNAL_ERROR,
                    format!("Tool execution error: {}", e),
                    None,
                )
            }
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "get_history" => self.analytics_use_case.get_history(arguments).await,
            "get_draw" => self.analytics_use_case.get_draw(arguments).await,
            "get_analysis" => self.analytics_use_case.get_analysis(arguments).await,
            "get_recommendation" => self.analytics_use_case.get_recommendation(arguments).await,
            "submit_selection" => self.analytics_use_case.submit_selection(arguments).await,
            "get_weekly_stats" => self.analytics_use_case.get_weekly_stats(arguments).await,
            "get_weekly_history" => self.analytics_use_case.get_weekly_history(arguments).await,
            "trigger_ingestion" => self.ingestion_use_case.trigger_ingestion(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "get_history".to_string(),
                description: "List every stored draw, oldest first".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "get_draw".to_string(),
                description: "Get a single draw by its draw number".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "draw_no": {
                            "type": "integer",
                            "description": "Draw number"
                        }
                    },
                    "required": ["draw_no"]
                }),
            },
            Tool {
                name: "get_analysis".to_string(),
                description: "Count how often each number 1-45 appeared as a main number, with hot/cold labels".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "get_recommendation".to_string(),
                description: "Recommend six numbers from the 20 most or least frequent numbers".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "strategy": {
                            "type": "string",
                            "enum": ["top20", "bottom20"],
                            "description": "Recommendation strategy"
                        }
                    },
                    "required": ["strategy"]
                }),
            },
            Tool {
                name: "submit_selection".to_string(),
                description: "Record a participant's accepted six-number selection".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "participant_id": {
                            "type": "string",
                            "description": "Opaque participant or session key"
                        },
                        "numbers": {
                            "type": "array",
                            "items": {"type": "integer", "minimum": 1, "maximum": 45},
                            "minItems": 6,
                            "maxItems": 6
                        },
                        "strategy": {
                            "type": "string",
                            "enum": ["top20", "bottom20"]
                        }
                    },
                    "required": ["participant_id", "numbers", "strategy"]
                }),
            },
            Tool {
                name: "get_weekly_stats".to_string(),
                description: "Participation and prize-tier summary for one week".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "week": {
                            "type": "string",
                            "description": "ISO week such as 2024-W07 (default: current week)"
                        }
                    }
                }),
            },
            Tool {
                name: "get_weekly_history".to_string(),
                description: "Summaries for every week with at least one selection, oldest first".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "trigger_ingestion".to_string(),
                description: "Fetch newly published draws from the official results API and store them".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    }
}

fn write_response<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string(response)?)?;
    writer.flush()?;
    Ok(())
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use lotto_stats::{LottoService, SqliteStore};
    use std::io::Cursor;
    use std::time::Duration;

    fn handler() -> MCPHandler {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = LottoService::new(Arc::clone(&store), FixedOffset::east_opt(0).unwrap());
        MCPHandler::new(
            Arc::new(AnalyticsUseCase::new(service)),
            Arc::new(
                IngestionUseCase::new(
                    store,
                    "http://127.0.0.1:9/?drwNo=".to_string(),
                    Duration::ZERO,
                    Duration::from_secs(1),
                )
                .unwrap(),
            ),
        )
    }

    async fn exchange(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        handler()
            .serve(Cursor::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn call(id: u32, tool: &str, arguments: Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments}
        })
        .to_string()
    }

    fn tool_text(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "lotto-mcp-server");

        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"submit_selection"));
        assert!(names.contains(&"get_weekly_history"));
    }

    #[tokio::test]
    async fn test_submit_and_weekly_stats() {
        let input = [
            call(1, "submit_selection", json!({
                "participant_id": "session-1",
                "numbers": [3, 11, 22, 30, 41, 9],
                "strategy": "top20"
            })),
            call(2, "submit_selection", json!({
                "participant_id": "session-1",
                "numbers": [1, 2, 3, 4, 5, 6],
                "strategy": "bottom20"
            })),
            call(3, "get_weekly_stats", json!({})),
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(tool_text(&responses[0])["participant_total"], 1);
        assert_eq!(tool_text(&responses[1])["participant_total"], 2);

        let stats = tool_text(&responses[2]);
        assert_eq!(stats["stats"]["total_selections"], 2);
        assert_eq!(stats["stats"]["unique_participants"], 1);
        assert_eq!(stats["stats"]["has_results"], false);
    }

    #[tokio::test]
    async fn test_tool_errors() {
        let input = [
            call(1, "submit_selection", json!({
                "participant_id": "session-1",
                "numbers": [1, 1, 2, 3, 4, 5],
                "strategy": "top20"
            })),
            call(2, "get_recommendation", json!({"strategy": "top20"})),
            call(3, "get_weekly_stats", json!({"week": "2024-W99"})),
            call(4, "no_such_tool", json!({})),
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 4);
        for response in &responses {
            assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        }
        let message = responses[0]["error"]["message"].as_str().unwrap();
        assert!(message.contains("Invalid selection"));
        let message = responses[1]["error"]["message"].as_str().unwrap();
        assert!(message.contains("Not found"));
    }

    #[tokio::test]
    async fn test_non_string_week_rejected() {
        let input = [
            call(1, "get_weekly_stats", json!({"week": 202407})),
            call(2, "get_weekly_stats", json!({"week": "2024-W07"})),
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
        let message = responses[0]["error"]["message"].as_str().unwrap();
        assert!(message.contains("week must be a string"));
        assert_eq!(tool_text(&responses[1])["stats"]["week"], "2024-W07");
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let input = [
            call(1, "get_weekly_stats", json!([2024, 7])),
            call(2, "get_weekly_stats", json!("2024-W07")),
            call(3, "get_weekly_history", Value::Null),
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses[0]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[1]["error"]["code"], INVALID_PARAMS);
        assert!(responses[2]["error"].is_null());
        assert_eq!(tool_text(&responses[2])["weeks"], json!([]));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = [
            "{not json",
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#,
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call"}"#,
        ]
        .join("\n");

        let responses = exchange(&input).await;
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[1]["id"], 7);
        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_analysis_on_empty_history() {
        let responses = exchange(&call(1, "get_analysis", json!({}))).await;
        let body = tool_text(&responses[0]);
        assert_eq!(body["draws_analyzed"], 0);
        assert_eq!(body["frequencies"].as_object().unwrap().len(), 45);
        assert_eq!(body["ranking"].as_array().unwrap().len(), 45);
    }
}
