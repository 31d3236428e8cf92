use lopdf::Document;
use tracing::debug;

/// Extraction seam. Implementations must degrade instead of failing:
/// unparseable bytes yield an empty vector, a page without a readable text
/// layer yields an empty string in its slot.
pub trait PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Vec<String> {
        match load_pages(bytes) {
            Ok(pages) => pages,
            Err(error) => {
                debug!(%error, "pdf could not be parsed, treating as empty");
                Vec::new()
            }
        }
    }
}

fn load_pages(bytes: &[u8]) -> Result<Vec<String>, lopdf::Error> {
    let document = Document::load_mem(bytes)?;

    let mut pages = Vec::new();
    for (page_number, _object_id) in document.get_pages() {
        // An image-only page keeps its slot so page numbering stays intact.
        let text = document.extract_text(&[page_number]).unwrap_or_default();
        pages.push(text);
    }

    Ok(pages)
}

pub fn extract_page_texts(bytes: &[u8]) -> Vec<String> {
    LopdfExtractor.extract_pages(bytes)
}
