/// Integration tests covering persistence, orchestration and the MCP surface
mod mcp_tests;
mod orchestrator_tests;
mod persistence_tests;
