//! Draft event builder.
//!
//! A [`Draft`] records mutation intents against a sequence of known length
//! and reduces them to the smallest equivalent [`Event`]. Every intent is
//! normalized to a splice and merged with the previous entry when that is
//! exact:
//!
//! - contiguous insertions fold into one insertion run;
//! - deletions at the same (or the adjoining lower) index fold into one;
//! - a deletion that falls entirely inside a pending insertion run cancels
//!   those inserted values, dropping the entry once the run is empty;
//! - an assignment inside a pending insertion run rewrites the pending value.
//!
//! Anything else is kept as a separate entry, so the draft never reorders
//! intents.

use crate::error::Result;
use crate::types::{Coalesce, Element};

use super::event::{check_index, clamp_range, Event};

#[derive(Clone, Debug)]
struct Entry<T> {
    index: usize,
    delete: usize,
    insert: Vec<T>,
}

impl<T> Entry<T> {
    fn is_insert_only(&self) -> bool {
        self.delete == 0 && !self.insert.is_empty()
    }

    fn is_delete_only(&self) -> bool {
        self.delete > 0 && self.insert.is_empty()
    }

    fn is_assign(&self) -> bool {
        self.delete == 1 && self.insert.len() == 1
    }

    fn insert_end(&self) -> usize {
        self.index + self.insert.len()
    }
}

enum Merge<T> {
    Absorbed,
    Emptied,
    Separate(Entry<T>),
}

/// Provisional, not-yet-committed sequence of events.
#[derive(Clone, Debug)]
pub struct Draft<T> {
    start: usize,
    len: usize,
    entries: Vec<Entry<T>>,
}

impl<T: Element> Draft<T> {
    /// Start a draft against a sequence of `len` elements.
    pub fn new(len: usize) -> Self {
        Self {
            start: len,
            len,
            entries: Vec::new(),
        }
    }

    /// Projected length after every recorded operation.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, values: Vec<T>) -> Result<()> {
        let at = self.len;
        self.range_replace(at, 0, values)
    }

    /// No-op on an empty sequence.
    pub fn remove_last(&mut self) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        let at = self.len - 1;
        self.range_replace(at, 1, Vec::new())
    }

    pub fn prepend(&mut self, values: Vec<T>) -> Result<()> {
        self.range_replace(0, 0, values)
    }

    /// No-op on an empty sequence.
    pub fn remove_first(&mut self) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        self.range_replace(0, 1, Vec::new())
    }

    /// Delete up to `delete` elements at `index` and insert `insert` there.
    ///
    /// `index` past the projected end is an error; a deletion running past
    /// the end is clamped to what is available.
    pub fn range_replace(&mut self, index: usize, delete: usize, insert: Vec<T>) -> Result<()> {
        let delete = clamp_range(index, delete, self.len)?;
        if delete == 0 && insert.is_empty() {
            return Ok(());
        }
        self.len = self.len - delete + insert.len();
        self.push(Entry {
            index,
            delete,
            insert,
        });
        Ok(())
    }

    pub fn assign(&mut self, index: usize, value: T) -> Result<()> {
        check_index(index, self.len)?;
        self.push(Entry {
            index,
            delete: 1,
            insert: vec![value],
        });
        Ok(())
    }

    /// Replay an existing event into the draft.
    pub fn apply_event(&mut self, event: Event<T>) -> Result<()> {
        match event {
            Event::Append { values } => self.append(values),
            Event::RemoveLast => self.remove_last(),
            Event::Prepend { values } => self.prepend(values),
            Event::RemoveFirst => self.remove_first(),
            Event::Splice {
                index,
                delete,
                insert,
            } => self.range_replace(index, delete, insert),
            Event::Assign { index, value } => self.assign(index, value),
            Event::Composite { events } => {
                for event in events {
                    self.apply_event(event)?;
                }
                Ok(())
            }
        }
    }

    /// The minimal event, or `None` when nothing remains.
    pub fn commit(self) -> Option<Event<T>> {
        let mut entries = self.entries;
        match entries.len() {
            0 => None,
            1 => entries.pop().map(|entry| specialize(entry, self.start)),
            _ => {
                let mut len = self.start;
                let events = entries
                    .into_iter()
                    .map(|entry| {
                        let before = len;
                        len = len - entry.delete + entry.insert.len();
                        specialize(entry, before)
                    })
                    .collect();
                Some(Event::Composite { events })
            }
        }
    }

    fn push(&mut self, entry: Entry<T>) {
        let merged = match self.entries.last_mut() {
            Some(last) => merge(last, entry),
            None => Merge::Separate(entry),
        };
        match merged {
            Merge::Absorbed => {}
            Merge::Emptied => {
                self.entries.pop();
            }
            Merge::Separate(entry) => self.entries.push(entry),
        }
    }
}

impl<T: Element> Coalesce<Event<T>> for Draft<T> {
    fn record(&mut self, event: Event<T>) -> Result<()> {
        self.apply_event(event)
    }

    fn commit(self) -> Option<Event<T>> {
        Draft::commit(self)
    }
}

fn merge<T>(last: &mut Entry<T>, next: Entry<T>) -> Merge<T> {
    if last.is_insert_only() {
        let run = last.index..last.insert_end();

        if next.is_insert_only() && next.index >= run.start && next.index <= run.end {
            let at = next.index - last.index;
            last.insert.splice(at..at, next.insert);
            return Merge::Absorbed;
        }

        if next.is_delete_only() && next.index >= run.start && next.index + next.delete <= run.end
        {
            let at = next.index - last.index;
            last.insert.drain(at..at + next.delete);
            return if last.insert.is_empty() {
                Merge::Emptied
            } else {
                Merge::Absorbed
            };
        }

        if next.is_assign() && run.contains(&next.index) {
            let at = next.index - last.index;
            if let Some(value) = next.insert.into_iter().next() {
                last.insert[at] = value;
            }
            return Merge::Absorbed;
        }
    }

    if last.is_delete_only() && next.is_delete_only() {
        if next.index == last.index {
            last.delete += next.delete;
            return Merge::Absorbed;
        }
        if next.index + next.delete == last.index {
            last.index = next.index;
            last.delete += next.delete;
            return Merge::Absorbed;
        }
    }

    if last.is_assign() && next.is_assign() && last.index == next.index {
        last.insert = next.insert;
        return Merge::Absorbed;
    }

    Merge::Separate(next)
}

fn specialize<T>(entry: Entry<T>, len: usize) -> Event<T> {
    let Entry {
        index,
        delete,
        mut insert,
    } = entry;

    if delete == 0 {
        if index == len {
            return Event::Append { values: insert };
        }
        if index == 0 {
            return Event::Prepend { values: insert };
        }
    }
    if insert.is_empty() && delete == 1 {
        if index + 1 == len {
            return Event::RemoveLast;
        }
        if index == 0 {
            return Event::RemoveFirst;
        }
    }
    if delete == 1 && insert.len() == 1 {
        if let Some(value) = insert.pop() {
            return Event::Assign { index, value };
        }
    }
    Event::Splice {
        index,
        delete,
        insert,
    }
}
