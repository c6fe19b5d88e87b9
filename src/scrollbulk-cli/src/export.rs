use anyhow::{Context, Result};
use scrollbulk_core::Client;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MATCH_ALL_QUERY: &str = r#"{"query":{"match_all":{}}}"#;

#[derive(Deserialize)]
struct SearchPage {
    hits: PageHits,
}

#[derive(Deserialize)]
struct PageHits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Option<serde_json::Value>,
}

/// Scroll `index` and write each hit's `_source` as one line.
pub async fn run(client: &Client, index: &str, query: &[u8], output: Option<&Path>) -> Result<usize> {
    let sink: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = BufWriter::new(sink);
    let mut written = 0;

    client
        .scroll_all_documents(index, query, |page| {
            written += write_page(page, &mut writer)?;
            Ok(())
        })
        .await?;

    writer.flush()?;
    Ok(written)
}

fn write_page(page: &[u8], writer: &mut impl Write) -> Result<usize> {
    let page: SearchPage = serde_json::from_slice(page).context("Unexpected search page shape")?;
    let mut written = 0;
    // Re-serialised compactly so a pretty-printed source stays on one line
    for source in page.hits.hits.iter().filter_map(|hit| hit.source.as_ref()) {
        serde_json::to_writer(&mut *writer, source)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}
