use std::sync::{Arc, Mutex};

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    embedding::Embedder,
    error,
    point_db::PointDb,
    search::{self, SearchResult},
};

const DEFAULT_SEARCH_LIMIT: usize = 5;

struct MathSearchState {
    store: PointDb,
    collection: String,
    embedder: Mutex<Box<dyn Embedder + Send>>,
}

#[derive(Clone)]
pub struct MathSearchMcpServer {
    state: Arc<MathSearchState>,
    tool_router: ToolRouter<Self>,
}

impl MathSearchMcpServer {
    fn new(state: MathSearchState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl MathSearchMcpServer {
    /// Find stored math problems similar to a free-text query.
    #[tool(
        name = "math_search",
        description = "Find math problems (with worked solutions) semantically similar to a query. Returns problems ranked by cosine similarity."
    )]
    pub async fn math_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

        let mut embedder = self.state.embedder.lock().map_err(|_| {
            rmcp::ErrorData::internal_error("embedder lock poisoned", None)
        })?;

        let results = search::search(
            &self.state.store,
            &mut **embedder,
            &search::SearchParams {
                collection: &self.state.collection,
                query: &params.query,
                top_k: limit,
            },
        )
        .map_err(|e| mcp_error("search failed", e))?;

        let summary = format_search_summary(&results, &params.query);
        let structured = serde_json::to_value(search::SearchResponse {
            query: &params.query,
            result_count: results.len(),
            results: &results,
        })
        .map_err(|e| mcp_error("failed to serialize search results", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for MathSearchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("mathsearch", env!("CARGO_PKG_VERSION"))
                    .with_title("mathsearch MCP"),
            )
            .with_instructions(
                "Use math_search to find worked examples of problems similar to the one at hand.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Free-text description of the problem.
    pub query: String,
    /// Maximum number of results (default: 5, minimum: 1).
    pub limit: Option<usize>,
}

fn format_search_summary(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut lines = Vec::with_capacity(results.len() + 1);
    let suffix = if results.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} result{} for \"{query}\":",
        results.len(),
        suffix
    ));

    for r in results {
        lines.push(format!(
            "{}. [{:.4}] {}/{}: {}",
            r.rank, r.score, r.payload.subject, r.payload.filename, r.payload.problem
        ));
    }

    lines.join("\n")
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(
    store: PointDb,
    collection: String,
    embedder: Box<dyn Embedder + Send>,
) -> error::Result<()> {
    let server = MathSearchMcpServer::new(MathSearchState {
        store,
        collection,
        embedder: Mutex::new(embedder),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}
