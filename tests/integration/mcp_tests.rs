/// MCP JSON-RPC integration tests driven line by line
use std::sync::Arc;

use insight_engine_mcp::mcp::protocol::error_codes;
use insight_engine_mcp::mcp::McpServer;
use insight_engine_mcp::*;
use serde_json::{json, Value};

#[cfg(test)]
mod mcp_integration_tests {
    use super::*;

    fn server() -> McpServer {
        let server = InsightServer::with_persistence(EngineConfig::default(), Arc::new(MemorySnapshotStore::new()))
            .expect("Failed to create server");
        McpServer::new(server)
    }

    async fn call(mcp: &mut McpServer, id: u64, method: &str, params: Value) -> Value {
        let line = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string();
        let response = mcp.handle_line(&line).await.expect("requests get a response");
        serde_json::to_value(response).unwrap()
    }

    async fn call_tool(mcp: &mut McpServer, id: u64, name: &str, arguments: Value) -> Value {
        call(mcp, id, "tools/call", json!({ "name": name, "arguments": arguments })).await
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let mut mcp = server();

        let init = call(
            &mut mcp,
            1,
            "initialize",
            json!({ "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "1.0" } }),
        )
        .await;
        assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(init["result"]["serverInfo"]["name"], "Insight Engine MCP");

        let notification = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string();
        assert!(mcp.handle_line(&notification).await.is_none());
        assert!(mcp.is_initialized());

        let list = call(&mut mcp, 2, "tools/list", Value::Null).await;
        let tools = list["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["event_record", "event_query", "insights_generate", "insights_history", "ai_dispatch", "ai_features"]
        );
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_record_then_generate_insights() {
        let mut mcp = server();

        let recorded = call_tool(
            &mut mcp,
            1,
            "event_record",
            json!({ "category": "task_completion", "completed_at": "2026-03-02T10:00:00Z", "user_id": "alice" }),
        )
        .await;
        assert_eq!(recorded["result"]["isError"], false);
        assert!(recorded["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Recorded task_completion event"));

        let insights = call_tool(&mut mcp, 2, "insights_generate", json!({ "user_id": "alice", "time_range": "week" })).await;
        let text = insights["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Task completion: 100%"));

        let history = call_tool(&mut mcp, 3, "insights_history", json!({ "user_id": "alice" })).await;
        assert!(history["result"]["content"][0]["text"].as_str().unwrap().contains("score"));
    }

    #[tokio::test]
    async fn test_errors_use_engine_codes() {
        let mut mcp = server();

        let invalid = call_tool(&mut mcp, 1, "event_record", json!({ "category": "goal_progress", "goal_id": "g", "progress": 140 })).await;
        assert_eq!(invalid["error"]["code"], error_codes::VALIDATION_ERROR);

        let unknown = call_tool(&mut mcp, 2, "ai_dispatch", json!({ "feature": "horoscope", "prompt": "today?" })).await;
        assert_eq!(unknown["error"]["code"], error_codes::UNKNOWN_FEATURE);

        let malformed = call_tool(&mut mcp, 3, "insights_generate", json!({ "time_range": "week" })).await;
        assert_eq!(malformed["error"]["code"], error_codes::INVALID_PARAMS);

        let missing_method = call(&mut mcp, 4, "resources/list", Value::Null).await;
        assert_eq!(missing_method["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let garbage = mcp.handle_line("{not json").await.unwrap();
        assert_eq!(serde_json::to_value(garbage).unwrap()["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_dispatch_tool_falls_back_and_reports_budget() {
        let mut mcp = server();

        let dispatched = call_tool(
            &mut mcp,
            1,
            "ai_dispatch",
            json!({ "feature": "natural_language_task", "prompt": "Call mom tomorrow at 6pm #family" }),
        )
        .await;
        let text = dispatched["result"]["content"][0]["text"].as_str().unwrap();
        let response: Value = serde_json::from_str(text).unwrap();
        assert_eq!(response["source"], "fallback");
        assert_eq!(response["confidence"], 0.7);
        assert_eq!(response["result"]["due_time"], "18:00");
        assert_eq!(response["result"]["category"], "personal");

        let features = call_tool(&mut mcp, 2, "ai_features", json!({})).await;
        let text = features["result"]["content"][0]["text"].as_str().unwrap();
        let listed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(listed["remaining_requests"], 9);
        assert_eq!(listed["features"].as_array().unwrap().len(), 7);
    }
}
