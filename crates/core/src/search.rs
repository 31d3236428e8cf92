use crate::models::{Document, DocumentKey, SearchResult};

/// Characters of context kept on each side of a matched span in a snippet.
pub const SNIPPET_CONTEXT_CHARS: usize = 80;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive literal substring search over filenames and extracted
/// page text. Results are ranked by total occurrence count descending, ties
/// broken by byte-wise filename ascending. Documents without a single
/// occurrence are omitted entirely.
pub fn search_documents(documents: &[Document], query: &str) -> Vec<SearchResult> {
    let needle = normalize_whitespace(query).to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = documents
        .iter()
        .filter_map(|document| search_document(document, &needle))
        .collect();

    results.sort_by(|left, right| {
        right
            .match_count
            .cmp(&left.match_count)
            .then_with(|| left.document.filename.cmp(&right.document.filename))
    });
    results
}

fn search_document(document: &Document, needle: &str) -> Option<SearchResult> {
    let mut matches = Vec::new();
    let mut match_count = 0usize;

    // A filename hit contributes exactly one entry no matter how often the
    // term occurs in the name.
    if document.filename.to_lowercase().contains(needle) {
        matches.push(format!("Filename: {}", document.filename));
        match_count += 1;
    }

    for (page_index, page) in document.pages.iter().enumerate() {
        let folded = FoldedText::new(page);
        for span in folded.find(needle) {
            matches.push(format!(
                "Page {}: {}",
                page_index + 1,
                folded.snippet(span, SNIPPET_CONTEXT_CHARS)
            ));
            match_count += 1;
        }
    }

    if match_count == 0 {
        return None;
    }

    Some(SearchResult {
        document: DocumentKey {
            folder: document.folder.clone(),
            filename: document.filename.clone(),
        },
        size_bytes: document.size_bytes,
        modified_at: document.modified_at,
        matches,
        match_count,
    })
}

/// Case-folded view of one page. Matching runs over the lowercased form
/// while snippets are cut from the original, with a byte map between the
/// two so multi-byte case conversions cannot split a character. The page
/// text is whitespace-normalized first so phrases spanning PDF line breaks
/// still match.
struct FoldedText {
    original: String,
    lowered: String,
    /// Original byte offset for every byte of `lowered`.
    offsets: Vec<usize>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let original = normalize_whitespace(text);
        let mut lowered = String::with_capacity(original.len());
        let mut offsets = Vec::with_capacity(original.len());

        for (offset, ch) in original.char_indices() {
            for lower in ch.to_lowercase() {
                let before = lowered.len();
                lowered.push(lower);
                for _ in before..lowered.len() {
                    offsets.push(offset);
                }
            }
        }

        Self {
            original,
            lowered,
            offsets,
        }
    }

    /// Non-overlapping occurrences of `needle`, as byte ranges into the
    /// original text. Overlapping repeats of the same substring are counted
    /// once per non-overlapping position.
    fn find(&self, needle: &str) -> Vec<(usize, usize)> {
        self.lowered
            .match_indices(needle)
            .map(|(start, matched)| {
                let original_start = self.offsets[start];
                let original_end = match self.offsets.get(start + matched.len()) {
                    Some(&offset) => offset,
                    None => self.original.len(),
                };
                (original_start, original_end)
            })
            .collect()
    }

    fn snippet(&self, (start, end): (usize, usize), context_chars: usize) -> String {
        let mut window_start = start;
        for _ in 0..context_chars {
            match self.original[..window_start].chars().next_back() {
                Some(ch) => window_start -= ch.len_utf8(),
                None => break,
            }
        }

        let mut window_end = end;
        for ch in self.original[end..].chars().take(context_chars) {
            window_end += ch.len_utf8();
        }

        let mut snippet = String::new();
        if window_start > 0 {
            snippet.push_str("...");
        }
        snippet.push_str(&self.original[window_start..window_end]);
        if window_end < self.original.len() {
            snippet.push_str("...");
        }
        snippet
    }
}
