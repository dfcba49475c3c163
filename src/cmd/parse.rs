use anyhow::Result;
use futures::stream::{self, StreamExt};

use vidpeek::{Config, Pipeline};

use super::output::{print_json, ParseResponse};

/// Parse every URL, at most `parallel` at a time, printing results in input
/// order. Returns `true` if all succeeded.
pub async fn cmd_parse(urls: &[String], config: &Config, parallel: usize, compact: bool) -> Result<bool> {
    let pipeline = Pipeline::from_config(config)?;
    let pipeline = &pipeline;

    let responses: Vec<ParseResponse> = stream::iter(urls)
        .map(|url| async move { ParseResponse::from_outcome(url, pipeline.parse(url).await) })
        .buffered(parallel.max(1))
        .collect()
        .await;

    let all_ok = responses.iter().all(|r| r.success);
    for response in &responses {
        print_json(response, compact)?;
    }
    Ok(all_ok)
}
