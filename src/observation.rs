use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gap, in seconds, beyond which a new observation starts a fresh
/// conversation window rather than extending the current one.
pub const CONVERSATION_GAP_SECONDS: i64 = 30;

/// Conversation windows shorter than this (in seconds) are dropped rather
/// than recorded in history when they close.
pub const MINIMUM_CONVERSATION_LENGTH_SECONDS: i64 = 1;

/// A single contiguous window during which a sub-cluster was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ConversationWindow {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            start_time: at,
            end_time: at,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    pub fn clears_minimum_length(&self) -> bool {
        self.duration_seconds() >= MINIMUM_CONVERSATION_LENGTH_SECONDS
    }
}

/// Opaque, passthrough observation metadata carried by every sub-cluster.
/// The clustering core never inspects these fields beyond merging them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationMetadata {
    pub last_seen: Option<DateTime<Utc>>,
    pub current_conversation: Option<ConversationWindow>,
    pub conversations: Vec<ConversationWindow>,
    pub total_time_on_camera: f64,
}

impl Default for ObservationMetadata {
    fn default() -> Self {
        Self {
            last_seen: None,
            current_conversation: None,
            conversations: Vec::new(),
            total_time_on_camera: 0.0,
        }
    }
}

impl ObservationMetadata {
    /// Records a new observation at `at`, extending the current conversation
    /// window if `at` falls within [`CONVERSATION_GAP_SECONDS`] of the last
    /// observation, or closing it and starting a fresh one otherwise.
    pub fn observe(&mut self, at: DateTime<Utc>) {
        match (&mut self.current_conversation, self.last_seen) {
            (Some(window), Some(last_seen)) if (at - last_seen).num_seconds() <= CONVERSATION_GAP_SECONDS => {
                window.end_time = at;
            }
            _ => {
                self.close_current_conversation();
                self.current_conversation = Some(ConversationWindow::new(at));
            }
        }
        self.last_seen = Some(at);
    }

    fn close_current_conversation(&mut self) {
        if let Some(window) = self.current_conversation.take() {
            if window.clears_minimum_length() {
                self.total_time_on_camera += window.duration_seconds() as f64;
                self.conversations.push(window);
            }
        }
    }

    /// Folds `other` into `self` per the merge-on-absorb policy: concatenate
    /// completed conversation histories, re-sort by start time, sum the
    /// cumulative on-camera time, and keep self's in-progress window (after
    /// first folding the donor's in-progress window into history if it
    /// clears the minimum length).
    pub fn merge(&mut self, mut other: ObservationMetadata) {
        other.close_current_conversation();

        self.conversations.append(&mut other.conversations);
        self.conversations.sort_by_key(|w| w.start_time);
        self.total_time_on_camera += other.total_time_on_camera;

        if let Some(last_seen) = other.last_seen {
            self.last_seen = Some(self.last_seen.map_or(last_seen, |ls| ls.max(last_seen)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn observe_extends_window_within_gap() {
        let mut meta = ObservationMetadata::default();
        meta.observe(at(0));
        meta.observe(at(10));
        assert_eq!(meta.current_conversation.as_ref().unwrap().duration_seconds(), 10);
        assert!(meta.conversations.is_empty());
    }

    #[test]
    fn observe_closes_window_after_gap() {
        let mut meta = ObservationMetadata::default();
        meta.observe(at(0));
        meta.observe(at(5));
        meta.observe(at(100));
        assert_eq!(meta.conversations.len(), 1);
        assert_eq!(meta.conversations[0].duration_seconds(), 5);
    }

    #[test]
    fn short_window_is_dropped_not_recorded() {
        let mut meta = ObservationMetadata::default();
        meta.observe(at(0));
        meta.observe(at(400));
        assert!(meta.conversations.is_empty());
        assert_eq!(meta.total_time_on_camera, 0.0);
    }

    #[test]
    fn merge_concatenates_and_sorts_by_start_time() {
        let mut a = ObservationMetadata::default();
        a.observe(at(0));
        a.observe(at(10));
        a.observe(at(200));
        a.observe(at(210));

        let mut b = ObservationMetadata::default();
        b.observe(at(100));
        b.observe(at(110));

        a.merge(b);

        assert_eq!(a.conversations.len(), 2);
        assert!(a.conversations[0].start_time < a.conversations[1].start_time);
    }
}
