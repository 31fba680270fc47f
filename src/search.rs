use serde::Serialize;

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    record::ProblemRecord,
    vector_store::{CollectionLookup, VectorStore},
};

/// Parameters for a similarity query.
#[derive(Debug, Clone)]
pub struct SearchParams<'a> {
    pub collection: &'a str,
    pub query: &'a str,
    pub top_k: usize,
}

/// A ranked match for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// 1-based position in the result list.
    pub rank: usize,
    pub score: f32,
    pub id: u64,
    pub payload: ProblemRecord,
}

/// Find the `top_k` stored problems most similar to `query`.
///
/// The query is embedded with `embedder`, which must be the same model the
/// collection was built with; a model with a different dimension is rejected
/// by the store, a different model of the same dimension just returns poor
/// matches. A collection with no points yields no results and never touches
/// the embedder.
pub fn search<S, E>(
    store: &S,
    embedder: &mut E,
    params: &SearchParams<'_>,
) -> Result<Vec<SearchResult>>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    if params.top_k == 0 {
        return Err(Error::InvalidArgument(
            "top_k must be at least 1".to_string(),
        ));
    }

    let info = match store.collection_info(params.collection)? {
        CollectionLookup::Exists(info) => info,
        CollectionLookup::NotFound => {
            return Err(Error::NotFound {
                kind: "collection",
                name: params.collection.to_string(),
            });
        }
    };

    if info.point_count == 0 {
        return Ok(Vec::new());
    }

    tracing::debug!(model = embedder.model_id(), top_k = params.top_k, "embedding query");
    let query_vector = embedder.embed(params.query)?;
    let hits = store.search(params.collection, &query_vector, params.top_k)?;

    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| SearchResult {
            rank: i + 1,
            score: hit.score,
            id: hit.id,
            payload: hit.payload,
        })
        .collect())
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[SearchResult], query: &str) {
    println!("Search results for: '{query}'");

    if results.is_empty() {
        println!("\nNo results found.");
        return;
    }

    for r in results {
        let p = &r.payload;
        println!("\n{}. Score: {:.4}", r.rank, r.score);
        println!("Subject: {}", or_na(&p.subject));
        println!("Problem: {}", p.problem);
        println!("Solution: {}", p.solution);
        println!("Level: {}", or_na(&p.level));
        println!("Type: {}", or_na(&p.kind));
        println!("{}", "-".repeat(80));
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<'a> {
    pub query: &'a str,
    pub result_count: usize,
    pub results: &'a [SearchResult],
}

/// Render results as the JSON document shared by the CLI and MCP server.
pub fn to_json(results: &[SearchResult], query: &str) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SearchResponse {
        query,
        result_count: results.len(),
        results,
    })?)
}

/// Format results as JSON output.
pub fn format_json(results: &[SearchResult], query: &str) -> Result<()> {
    println!("{}", to_json(results, query)?);
    Ok(())
}
