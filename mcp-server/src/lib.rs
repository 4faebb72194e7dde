// JSON-RPC tool surface over the draw analytics service
pub mod mcp_handler;
pub mod use_cases;

pub use mcp_handler::{MCPHandler, stdio};
pub use use_cases::{AnalyticsUseCase, IngestionUseCase};
