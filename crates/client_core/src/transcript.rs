//! Transcript state and the event fold that keeps it display-ready.

use shared::{
    domain::{Origin, SequenceId},
    protocol::{AssistantEvent, SearchResults},
};

/// One displayable unit of the conversation.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub origin: Origin,
    /// Primary message text; absent while reasoning is still in progress.
    pub text: Option<String>,
    /// True while this entry is an in-progress "thinking" placeholder.
    pub is_reasoning: bool,
    /// Short status string shown alongside the reasoning indicator.
    pub reasoning_note: Option<String>,
    pub search_results: Option<SearchResults>,
    pub sequence_id: SequenceId,
}

impl TranscriptEntry {
    fn user(text: &str, sequence_id: SequenceId) -> Self {
        Self {
            origin: Origin::User,
            text: Some(text.to_string()),
            is_reasoning: false,
            reasoning_note: None,
            search_results: None,
            sequence_id,
        }
    }

    fn assistant(event: AssistantEvent, sequence_id: SequenceId) -> Self {
        let AssistantEvent {
            chain_of_thought,
            chain_of_thought_message,
            message,
            search_results,
            ..
        } = event;

        // The wire sends "" and {} for absent payloads; normalize both.
        Self {
            origin: Origin::Assistant,
            text: message.filter(|text| !text.is_empty()),
            is_reasoning: chain_of_thought,
            reasoning_note: chain_of_thought_message.filter(|note| !note.is_empty()),
            search_results: search_results.filter(|results| !results.is_empty()),
            sequence_id,
        }
    }
}

// Entry identity is the sequence id; everything else is display payload.
impl PartialEq for TranscriptEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sequence_id == other.sequence_id
    }
}

impl Eq for TranscriptEntry {}

impl PartialOrd for TranscriptEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TranscriptEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence_id.cmp(&other.sequence_id)
    }
}

/// Ordered conversation transcript plus its sequence allocator.
#[derive(Debug)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_sequence: SequenceId,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: SequenceId(0),
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Appends the user's submission; user turns are never coalesced.
    pub fn push_user(&mut self, text: &str) {
        let entry = TranscriptEntry::user(text, self.allocate_sequence());
        self.entries.push(entry);
    }

    /// Folds one inbound assistant event into the transcript.
    pub fn apply(&mut self, event: AssistantEvent) {
        let entry = TranscriptEntry::assistant(event, self.allocate_sequence());
        self.entries = fold_entry(std::mem::take(&mut self.entries), entry);
    }

    fn allocate_sequence(&mut self) -> SequenceId {
        let allocated = self.next_sequence;
        self.next_sequence = allocated.next();
        allocated
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge policy for assistant entries, as a pure function over the whole
/// transcript.
///
/// A reasoning entry replaces the existing reasoning placeholder: user turns
/// and completed answers survive, the stale placeholder is dropped, and the
/// new entry lands at the end. A final entry overwrites a trailing final
/// (coalescing a stream of partials into the latest one) and appends in every
/// other case, so a final with no placeholder to stand in for never clobbers
/// an unrelated earlier entry.
pub fn fold_entry(
    mut entries: Vec<TranscriptEntry>,
    entry: TranscriptEntry,
) -> Vec<TranscriptEntry> {
    if entry.is_reasoning {
        entries.retain(|existing| !existing.is_reasoning);
        entries.push(entry);
        return entries;
    }

    match entries.last_mut() {
        Some(last) if last.origin == Origin::Assistant && !last.is_reasoning => *last = entry,
        _ => entries.push(entry),
    }
    entries
}

#[cfg(test)]
#[path = "tests/transcript_tests.rs"]
mod tests;
