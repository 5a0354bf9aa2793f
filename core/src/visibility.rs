use protocol::ResultSet;

/// Whether the result list is shown.
///
/// Losing focus does not hide the list by itself. The owner arms a grace
/// timer and calls [`Visibility::hide`] when it expires, so that a click on a
/// result, which steals focus from the input, still reaches the list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    focused: bool,
    shown: bool,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus_gained(&mut self) {
        self.focused = true;
        self.shown = true;
    }

    pub fn focus_lost(&mut self) {
        self.focused = false;
    }

    /// The grace period after a focus loss is over.
    pub fn hide(&mut self) {
        if !self.focused {
            self.shown = false;
        }
    }

    /// An item was picked, the list goes away right away.
    pub fn selection_made(&mut self) {
        self.shown = false;
    }

    pub fn text_edited(&mut self) {
        if self.focused {
            self.shown = true;
        }
    }

    pub fn is_visible(&self, results: &ResultSet) -> bool {
        self.shown && !results.is_empty()
    }
}
