use crate::models::RecentCitation;

pub const RECENT_CAPACITY: usize = 5;
pub const ADMIT_PER_OFFER: usize = 2;
const SNIPPET_CHARS: usize = 100;

/// Bounded most-recent-first store of citations surfaced by answers.
#[derive(Debug, Clone, Default)]
pub struct RecentCitations {
    entries: Vec<RecentCitation>,
}

impl RecentCitations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits at most the first two entries of a batch at the front, keeping
    /// their order, then truncates to capacity. No deduplication.
    pub fn offer<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = RecentCitation>,
    {
        let mut incoming: Vec<RecentCitation> =
            batch.into_iter().take(ADMIT_PER_OFFER).collect();
        if incoming.is_empty() {
            return;
        }

        incoming.append(&mut self.entries);
        self.entries = incoming;
        self.entries.truncate(RECENT_CAPACITY);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Front entry is the most recently admitted.
    pub fn snapshot(&self) -> &[RecentCitation] {
        &self.entries
    }
}

/// First 100 characters of the chunk text with a truncation marker, split on
/// char boundaries regardless of words.
pub fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(SNIPPET_CHARS).collect();
    out.push_str("...");
    out
}
