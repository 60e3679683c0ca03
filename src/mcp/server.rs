/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Routes tool calls to the orchestrator and dispatcher
/// 3. Sends JSON-RPC responses to stdout

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools;
use crate::{EngineError, InsightServer};

/// MCP server that handles communication with the client
pub struct McpServer {
    server: InsightServer,
    /// Whether the client has completed initialization
    initialized: bool,
}

impl McpServer {
    pub fn new(server: InsightServer) -> Self {
        Self {
            server,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout until stdin closes
    pub async fn run(&mut self) -> Result<(), EngineError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.handle_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns None for blank lines and notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        match request.id.clone() {
            Some(id) => Some(self.handle_request(id, request).await),
            None => {
                self.handle_notification(&request);
                None
            }
        }
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    async fn handle_request(&mut self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "initialized" => {
                self.initialized = true;
                JsonRpcResponse::success(id, Value::Null)
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let client = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
            .and_then(|p| p.client_info);
        match client {
            Some(client) => info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                "MCP client connected"
            ),
            None => info!("MCP client connected"),
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Insight Engine MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = vec![
            tool::<tools::RecordEventParams>(
                "event_record",
                "Record a user activity event (interaction, task_completion, goal_progress or ai_usage)",
            ),
            tool::<tools::QueryEventsParams>(
                "event_query",
                "List recorded events of one category, most recent first",
            ),
            tool::<tools::InsightsParams>(
                "insights_generate",
                "Generate productivity metrics, patterns, recommendations and predictions for a user",
            ),
            tool::<tools::HistoryParams>(
                "insights_history",
                "Show previously generated insight reports for a user",
            ),
            tool::<tools::AiDispatchParams>(
                "ai_dispatch",
                "Send a prompt to an AI feature, falling back to built-in responses when unavailable",
            ),
            tool::<tools::FeaturesParams>(
                "ai_features",
                "List available AI features and the remaining request budget",
            ),
        ];

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params {
            Some(params) => match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid parameters: {}", e),
                        None,
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        let name = tool_params.name.clone();
        match self.call_tool(&tool_params.name, tool_params.arguments).await {
            Ok(result) => to_response(id, &result),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                JsonRpcResponse::error(
                    id,
                    engine_error_to_json_rpc_code(&e),
                    e.to_string(),
                    engine_error_data(&e),
                )
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallResult, EngineError> {
        let orchestrator = self.server.orchestrator();
        let dispatcher = self.server.dispatcher();

        let text = match name {
            "event_record" => tools::record_event(orchestrator, parse_arguments(arguments)?)?.message,
            "event_query" => {
                let response = tools::query_events(orchestrator, parse_arguments(arguments)?)?;
                serde_json::to_string_pretty(&response)?
            }
            "insights_generate" => {
                let response = tools::generate_insights(orchestrator, parse_arguments(arguments)?)?;
                format!(
                    "{}\n\n{}",
                    response.message,
                    serde_json::to_string_pretty(&response.report)?
                )
            }
            "insights_history" => tools::insights_history(orchestrator, parse_arguments(arguments)?).message,
            "ai_dispatch" => {
                let response = tools::ai_dispatch(dispatcher, parse_arguments(arguments)?).await?;
                serde_json::to_string_pretty(&response)?
            }
            "ai_features" => serde_json::to_string_pretty(&tools::list_features(dispatcher))?,
            _ => return Ok(ToolCallResult::error(format!("Unknown tool: {}", name))),
        };

        Ok(ToolCallResult::success(text))
    }
}

fn tool<P: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema_for!(P)).unwrap_or_else(|_| json!({ "type": "object" })),
    }
}

fn parse_arguments<P: DeserializeOwned>(arguments: Map<String, Value>) -> Result<P, EngineError> {
    Ok(serde_json::from_value(Value::Object(arguments))?)
}

fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("Failed to serialize result: {}", e),
            None,
        ),
    }
}
