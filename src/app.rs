//! App state and front-end logic
//!
//! Turns key presses into search text and selections, feeds the text through
//! the debouncer, and forwards settled terms and selections to the
//! [`Catalog`]. Rendering reads from here and never mutates.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::watch;

use crate::catalog::{Catalog, Settled};
use crate::debounce::Debouncer;
use crate::models::PlayRequest;

// =============================================================================
// Input Mode and Focus
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (search box focused)
    Editing,
}

/// Which list receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Shows,
    Episodes,
}

// =============================================================================
// List Selection
// =============================================================================

/// Selection state for list views
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self {
            selected: 0,
            len,
        }
    }

    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    /// New contents: back to the top
    pub fn replace(&mut self, len: usize) {
        *self = Self::new(len);
    }
}

// =============================================================================
// Search Box
// =============================================================================

/// Raw search text with a cursor counted in characters
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub cursor: usize,
}

impl SearchState {
    fn byte_index(&self, cursor: usize) -> usize {
        self.query
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.query.len())
    }

    fn char_len(&self) -> usize {
        self.query.chars().count()
    }

    /// Insert character at cursor
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.query.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.query.remove(at);
        true
    }

    /// Delete character at cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.query.remove(at);
        true
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) -> bool {
        let had_text = !self.query.is_empty();
        self.query.clear();
        self.cursor = 0;
        had_text
    }

    /// Text before and after the cursor
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.query.split_at(self.byte_index(self.cursor))
    }
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
pub struct App {
    /// Whether the app is running
    pub running: bool,
    pub input_mode: InputMode,
    pub focus: Pane,

    pub search: SearchState,
    pub shows_list: ListState,
    pub episodes_list: ListState,

    catalog: Catalog,
    debouncer: Debouncer,
    debounced: watch::Receiver<String>,

    autoplay: bool,
    play_request: Option<PlayRequest>,
}

impl App {
    pub fn new(catalog: Catalog, debouncer: Debouncer, autoplay: bool) -> Self {
        let debounced = debouncer.subscribe();
        Self {
            running: true,
            input_mode: InputMode::Editing,
            focus: Pane::Shows,
            search: SearchState::default(),
            shows_list: ListState::default(),
            episodes_list: ListState::default(),
            catalog,
            debouncer,
            debounced,
            autoplay,
            play_request: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn quit(&mut self) {
        self.running = false;
        self.debouncer.cancel();
    }

    /// Player request queued by autoplay or the replay key
    pub fn take_play_request(&mut self) -> Option<PlayRequest> {
        self.play_request.take()
    }

    /// Apply settled search terms and finished queries
    pub fn tick(&mut self) -> Vec<Settled> {
        if matches!(self.debounced.has_changed(), Ok(true)) {
            let term = self.debounced.borrow_and_update().clone();
            if self.catalog.on_debounced(&term) {
                self.shows_list.replace(0);
                self.episodes_list.replace(0);
                self.focus = Pane::Shows;
            }
        }

        let settled = self.catalog.poll_completions();
        for event in &settled {
            match event {
                Settled::Shows(n) => self.shows_list.replace(*n),
                Settled::Episodes(n) => {
                    self.episodes_list.replace(*n);
                    if *n > 0 {
                        self.focus = Pane::Episodes;
                    }
                }
                Settled::Server if self.autoplay => self.queue_play(),
                _ => {}
            }
        }
        settled
    }

    fn queue_play(&mut self) {
        self.play_request = self
            .catalog
            .server_info()
            .and_then(|info| PlayRequest::from_server_info(info, true));
    }

    fn search_changed(&mut self) {
        self.debouncer.input(self.search.query.clone());
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        match self.input_mode {
            InputMode::Editing => self.handle_editing_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        let edited = match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Down => {
                self.input_mode = InputMode::Normal;
                return true;
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.clear()
            }
            KeyCode::Char(c) => {
                self.search.insert(c);
                true
            }
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Delete => self.search.delete(),
            KeyCode::Left => {
                self.search.cursor_left();
                return true;
            }
            KeyCode::Right => {
                self.search.cursor_right();
                return true;
            }
            KeyCode::Home => {
                self.search.cursor_home();
                return true;
            }
            KeyCode::End => {
                self.search.cursor_end();
                return true;
            }
            _ => return false,
        };

        if edited {
            self.search_changed();
        }
        true
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                true
            }
            KeyCode::Char('/') | KeyCode::Char('s') => {
                self.input_mode = InputMode::Editing;
                self.search.cursor_end();
                true
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Pane::Shows => Pane::Episodes,
                    Pane::Episodes => Pane::Shows,
                };
                true
            }
            KeyCode::Esc if self.focus == Pane::Episodes => {
                self.focus = Pane::Shows;
                true
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.focused_list().up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.focused_list().down();
                true
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.focused_list().first();
                true
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.focused_list().last();
                true
            }
            KeyCode::Enter => {
                match self.focus {
                    Pane::Shows => {
                        self.catalog.select_show(self.shows_list.selected);
                    }
                    Pane::Episodes => {
                        self.catalog.select_episode(self.episodes_list.selected);
                    }
                }
                true
            }
            KeyCode::Char('p') => {
                self.play_request = self
                    .catalog
                    .server_info()
                    .and_then(|info| PlayRequest::from_server_info(info, true));
                true
            }
            _ => false,
        }
    }

    fn focused_list(&mut self) -> &mut ListState {
        match self.focus {
            Pane::Shows => &mut self.shows_list,
            Pane::Episodes => &mut self.episodes_list,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
