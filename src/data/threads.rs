//! Session index: contiguous same-technique runs of samples ("threads").
//!
//! Two notions of "active" live here and must stay apart:
//! - the ingest target, always the most recently created thread;
//! - the selected thread, whatever the user clicked last.
//!
//! Reordering moves threads in the display list only. It never touches sample
//! data and never changes which thread receives the next sample.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::sample::{Sample, Technique};

pub type ThreadId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub technique: Technique,
    pub started_at: DateTime<Utc>,
    pub samples: Vec<Sample>,
}

impl Thread {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub thread: ThreadId,
    pub created: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadIndex {
    /// Display order; user-mutable.
    threads: Vec<Thread>,
    ingest_target: Option<ThreadId>,
    selected: Option<ThreadId>,
}

impl ThreadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    fn position(&self, id: ThreadId) -> Option<usize> {
        self.threads.iter().rposition(|t| t.id == id)
    }

    /// Thread that receives the next matching sample.
    pub fn ingest_target(&self) -> Option<&Thread> {
        self.ingest_target.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<ThreadId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Thread> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn total_samples(&self) -> usize {
        self.threads.iter().map(Thread::len).sum()
    }

    pub fn samples_for(&self, technique: &str) -> usize {
        self.threads
            .iter()
            .filter(|t| &*t.technique == technique)
            .map(Thread::len)
            .sum()
    }

    pub fn ingest(&mut self, sample: &Sample) -> IngestOutcome {
        if let Some(pos) = self.ingest_target.and_then(|id| self.position(id)) {
            let target = &mut self.threads[pos];
            if target.technique == sample.technique {
                target.samples.push(sample.clone());
                return IngestOutcome {
                    thread: target.id,
                    created: false,
                };
            }
        }

        let id = self.threads.len() as ThreadId + 1;
        let thread = Thread {
            id,
            title: format!("{}-{}", sample.technique, id),
            technique: sample.technique.clone(),
            started_at: sample.received_at,
            samples: vec![sample.clone()],
        };
        debug!(id, title = %thread.title, "new thread");
        self.threads.push(thread);
        self.ingest_target = Some(id);
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        IngestOutcome {
            thread: id,
            created: true,
        }
    }

    /// Move the thread at `from` so it ends up at `to`. Out-of-range indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.threads.len() || to >= self.threads.len() {
            return false;
        }
        if from != to {
            let thread = self.threads.remove(from);
            self.threads.insert(to, thread);
        }
        true
    }

    /// Select a thread for display. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: ThreadId) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.threads.clear();
        self.ingest_target = None;
        self.selected = None;
    }
}
