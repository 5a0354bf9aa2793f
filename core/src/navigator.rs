use protocol::{ItemId, ResultItem, ResultSet};

/// Keyboard highlight over the current results.
///
/// `None` means nothing is highlighted. Moving never wraps around: down stops
/// at the last item, up stops at the first one, and up from nothing does
/// nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectionNavigator {
    index: Option<usize>,
}

impl SelectionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.index
    }

    /// The index with `-1` standing for "nothing highlighted".
    pub fn as_signed(&self) -> isize {
        match self.index {
            Some(i) => i as isize,
            None => -1,
        }
    }

    pub fn move_down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.index = Some(match self.index {
            None => 0,
            Some(i) => (i + 1).min(len - 1),
        });
    }

    pub fn move_up(&mut self) {
        if let Some(i) = self.index {
            self.index = Some(i.saturating_sub(1));
        }
    }

    /// The highlighted item, if any. Picking it is up to the caller.
    pub fn confirm<'a>(&self, results: &'a ResultSet) -> Option<&'a ResultItem> {
        self.index.and_then(|i| results.get(i))
    }

    /// Highlights the item with the given id. Returns false, leaving the
    /// highlight alone, when no such item is listed.
    pub fn select_id(&mut self, results: &ResultSet, id: &ItemId) -> bool {
        match results.position(id) {
            Some(i) => {
                self.index = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.index = None;
    }

    /// Drops a highlight that no longer points into a list of `len` items.
    pub fn clamp(&mut self, len: usize) {
        if matches!(self.index, Some(i) if i >= len) {
            self.index = len.checked_sub(1);
        }
    }
}
