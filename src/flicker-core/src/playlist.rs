use crate::models::PlaylistItem;
use serde::{Deserialize, Serialize};

/// The playlist of the current media session.
///
/// Openers fill it, item suggesters pick from it and scrapers decorate its
/// items. Only the transient state is cleared by [`Playlist::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    input: Option<String>,
    items: Vec<PlaylistItem>,
    selected: Option<usize>,
    prev: Option<usize>,
    next: Option<usize>,
    completed: bool,
    expecting_items: usize,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// The locator the current open attempt is working on.
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = Some(input.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [PlaylistItem] {
        &mut self.items
    }

    pub fn item(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    /// Appends an item, renumbering it to its position. Returns that position.
    pub fn add_item(&mut self, mut item: PlaylistItem) -> usize {
        let index = self.items.len();
        item.index = index;
        self.items.push(item);
        index
    }

    pub fn selected(&self) -> Option<&PlaylistItem> {
        self.selected.and_then(|idx| self.items.get(idx))
    }

    pub fn selected_mut(&mut self) -> Option<&mut PlaylistItem> {
        self.selected.and_then(|idx| self.items.get_mut(idx))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn select_index(&mut self, index: usize) -> Option<&PlaylistItem> {
        if index < self.items.len() {
            self.selected = Some(index);
            self.update_prev_next_item();
            self.selected()
        } else {
            None
        }
    }

    pub fn prev_item(&self) -> Option<&PlaylistItem> {
        self.prev.and_then(|idx| self.items.get(idx))
    }

    pub fn next_item(&self) -> Option<&PlaylistItem> {
        self.next.and_then(|idx| self.items.get(idx))
    }

    /// Recomputes the neighbours of the selected item.
    pub fn update_prev_next_item(&mut self) {
        match self.selected {
            Some(idx) if idx < self.items.len() => {
                self.prev = idx.checked_sub(1);
                self.next = (idx + 1 < self.items.len()).then_some(idx + 1);
            }
            _ => {
                self.prev = None;
                self.next = None;
            }
        }
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    /// How many items the opener announced it will deliver (0 when unknown).
    pub fn expecting_items(&self) -> usize {
        self.expecting_items
    }

    pub fn set_expecting_items(&mut self, expecting: usize) {
        self.expecting_items = expecting;
    }

    pub fn reset(&mut self) {
        self.input = None;
        self.items.clear();
        self.selected = None;
        self.prev = None;
        self.next = None;
        self.completed = false;
        self.expecting_items = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> PlaylistItem {
        PlaylistItem::new(url, url)
    }

    #[test]
    fn add_item_renumbers() {
        let mut playlist = Playlist::new();
        let mut stray = item("a.mkv");
        stray.index = 42;
        assert_eq!(playlist.add_item(stray), 0);
        assert_eq!(playlist.add_item(item("b.mkv")), 1);
        assert_eq!(playlist.items()[0].index, 0);
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn select_updates_neighbours() {
        let mut playlist = Playlist::new();
        playlist.add_item(item("one"));
        playlist.add_item(item("two"));
        playlist.add_item(item("three"));

        playlist.select_index(0);
        assert!(playlist.prev_item().is_none());
        assert_eq!(playlist.next_item().unwrap().url, "two");

        playlist.select_index(2);
        assert_eq!(playlist.prev_item().unwrap().url, "two");
        assert!(playlist.next_item().is_none());

        assert!(playlist.select_index(3).is_none());
        assert_eq!(playlist.selected_index(), Some(2));
    }

    #[test]
    fn neighbours_follow_late_items() {
        let mut playlist = Playlist::new();
        playlist.add_item(item("one"));
        playlist.select_index(0);
        assert!(playlist.next_item().is_none());

        playlist.add_item(item("two"));
        playlist.update_prev_next_item();
        assert_eq!(playlist.next_item().unwrap().url, "two");
    }

    #[test]
    fn reset_clears_transient_state() {
        let mut playlist = Playlist::new();
        playlist.set_input("/media");
        playlist.add_item(item("one"));
        playlist.select_index(0);
        playlist.set_completed(true);
        playlist.set_expecting_items(4);

        playlist.reset();
        assert_eq!(playlist, Playlist::new());
    }
}
