//! Advisory index of visited entries
//!
//! A best-effort reconstruction of the native stack order, used only to
//! work out how far to move when a vetoed POP has to be undone. Unknown
//! identities count as position 0.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    First,
    Last,
}

#[derive(Debug, Clone)]
pub(crate) struct KeyIndex<T> {
    entries: Vec<T>,
    lookup: Lookup,
}

impl<T: PartialEq> KeyIndex<T> {
    pub(crate) fn new(initial: T, lookup: Lookup) -> Self {
        Self {
            entries: vec![initial],
            lookup,
        }
    }

    fn find(&self, item: &T) -> Option<usize> {
        match self.lookup {
            Lookup::First => self.entries.iter().position(|e| e == item),
            Lookup::Last => self.entries.iter().rposition(|e| e == item),
        }
    }

    /// Drop everything after `current` and append `next`.
    pub(crate) fn record_push(&mut self, current: &T, next: T) {
        let keep = self.find(current).map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(next);
    }

    /// Overwrite the first occurrence of `current`, if any.
    pub(crate) fn record_replace(&mut self, current: &T, next: T) {
        if let Some(i) = self.entries.iter().position(|e| e == current) {
            self.entries[i] = next;
        }
    }

    /// Steps from `from` back to `to`.
    pub(crate) fn delta(&self, to: &T, from: &T) -> isize {
        let to = self.find(to).unwrap_or(0) as isize;
        let from = self.find(from).unwrap_or(0) as isize;
        to - from
    }
}
