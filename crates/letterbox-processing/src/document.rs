//! Local PDF inspection.

use lopdf::Document;

/// Count the pages of a PDF held in memory.
///
/// Parses the document with lopdf. If that fails or finds no pages, falls back
/// to the largest `/Count` entry of the page tree. Returns `None` when
/// neither gives a positive count.
pub fn count_pages(data: &[u8]) -> Option<u32> {
    match Document::load_mem(data) {
        Ok(document) => {
            let pages = document.get_pages().len();
            tracing::debug!(pages, "PDF page count from page tree");
            u32::try_from(pages)
                .ok()
                .filter(|&n| n > 0)
                .or_else(|| scan_page_tree_count(data))
        }
        Err(err) => {
            tracing::debug!(error = %err, "lopdf could not parse PDF, scanning for /Count");
            scan_page_tree_count(data)
        }
    }
}

/// The root `/Pages` node carries the total, and every intermediate node a
/// subtotal, so the maximum is the document's page count.
fn scan_page_tree_count(data: &[u8]) -> Option<u32> {
    let text = String::from_utf8_lossy(data);
    text.split("/Count")
        .skip(1)
        .filter_map(|s| {
            let digits: String = s
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u32>().ok()
        })
        .max()
        .filter(|&n| n > 0)
}
