// src/fetch/cells.rs
use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use tracing::trace;

/// Text of every `<td>` in the document, in document order. Nested cells are
/// visited after their parent, the same order a depth-first walk produces.
pub fn table_cells(html: &str) -> Result<Vec<String>> {
    let selector =
        Selector::parse("td").map_err(|e| anyhow!("invalid table cell selector: {:?}", e))?;
    let doc = Html::parse_document(html);
    let cells: Vec<String> = doc
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect();
    trace!(count = cells.len(), "collected table cells");
    Ok(cells)
}
