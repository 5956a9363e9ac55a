//! # Editor facade
//!
//! [`Editor`] owns the current [`EditorState`] and turns raw input events
//! from the rendering layer into transactions. Each event produces at most
//! one transaction; every handled event returns an [`EditorUpdate`] with
//! what the renderer needs to redraw.

use std::sync::Arc;

use log::debug;
use regex::Regex;

use crate::autocomplete::{AttributeCatalog, AttributeKey, AutocompleteMeta, input_rule};
use crate::commands::{self, CommandOutcome};
use crate::decoration::DecorationSet;
use crate::error::{EditorError, Result};
use crate::model::{Node, char_len};
use crate::schema::Schema;
use crate::selection::{AttributeCursor, Dir, NodeSelection, Selection, create_selection_between};
use crate::state::{EditorState, Transaction};

/// Settings the embedding application passes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    /// Character that opens the attribute menu.
    pub trigger: char,
    pub max_candidates: usize,
    pub catalog: AttributeCatalog,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            trigger: '%',
            max_candidates: 20,
            catalog: AttributeCatalog::default(),
        }
    }
}

/// Keys the editor reacts to. Everything else is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
    Space,
}

/// What the renderer gets back after a transaction.
#[derive(Debug, Clone)]
pub struct EditorUpdate {
    pub doc: Node,
    pub selection: Selection,
    pub decorations: DecorationSet,
    pub version: u64,
    pub doc_changed: bool,
}

/// Result of offering an input event to the editor.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Consumed; the caller must not run its default behaviour.
    Handled(EditorUpdate),
    /// Not for us; the caller runs its default behaviour.
    Unhandled,
    /// State changed, but the caller still runs its default behaviour.
    Observed(EditorUpdate),
}

impl EventOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, EventOutcome::Handled(_))
    }

    pub fn update(&self) -> Option<&EditorUpdate> {
        match self {
            EventOutcome::Handled(u) | EventOutcome::Observed(u) => Some(u),
            EventOutcome::Unhandled => None,
        }
    }
}

pub struct Editor {
    state: EditorState,
    trigger_rule: Regex,
}

impl Editor {
    pub fn new(schema: Arc<Schema>, doc: Node, options: EditorOptions) -> Result<Self> {
        let trigger_rule = input_rule(options.trigger).map_err(|e| {
            EditorError::Configuration(format!("invalid trigger {:?}: {e}", options.trigger))
        })?;
        let state = EditorState::new(schema, doc, Arc::new(options))?;
        Ok(Self {
            state,
            trigger_rule,
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn decorations(&self) -> DecorationSet {
        self.state.decorations()
    }

    /// Applies `tr` and makes the result the current state.
    pub fn dispatch(&mut self, tr: Transaction) -> Result<EditorUpdate> {
        let doc_changed = tr.doc_changed();
        let next = self.state.apply(tr)?;
        self.state = next;
        debug!("dispatched version {}", self.state.version());
        Ok(EditorUpdate {
            doc: self.state.doc().clone(),
            selection: self.state.selection().clone(),
            decorations: self.state.decorations(),
            version: self.state.version(),
            doc_changed,
        })
    }

    /// Replaces the selection, e.g. after a pointer drag.
    pub fn set_selection(&mut self, selection: Selection) -> Result<EditorUpdate> {
        let mut tr = self.state.tr();
        tr.set_selection(selection)?;
        self.dispatch(tr)
    }

    /// A pointer selection from `anchor` to `head`.
    pub fn select_between(&mut self, anchor: usize, head: usize) -> Result<EditorUpdate> {
        let doc = self.state.doc();
        let selection = create_selection_between(&doc.resolve(anchor)?, &doc.resolve(head)?);
        self.set_selection(selection)
    }

    /// Typed text. On an attribute cursor it opens the attribute menu;
    /// elsewhere it replaces the text selection and runs the trigger rule.
    pub fn handle_text_input(&mut self, text: &str) -> Result<EventOutcome> {
        match self.state.selection().clone() {
            Selection::AttributeCursor(cursor) => self.open_from_cursor(cursor, text),
            Selection::Text(_) => {
                let selection = self.state.selection().clone();
                let mut tr = self.state.tr();
                tr.insert_text(text, selection.from(), selection.to(), None)?;
                let end = selection.from() + char_len(text);
                tr.set_selection(Selection::caret(end))?;
                if self.trigger_fires(tr.doc(), end)? {
                    tr.set_autocomplete(AutocompleteMeta::Open { from: end - 1, to: end });
                }
                Ok(EventOutcome::Handled(self.dispatch(tr)?))
            }
            Selection::Node(_) => Ok(EventOutcome::Unhandled),
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Result<EventOutcome> {
        if self.state.autocomplete().is_pending() {
            return self.handle_menu_key(key);
        }
        match key {
            Key::ArrowLeft => self.arrow(Dir::Backward),
            Key::ArrowRight => self.arrow(Dir::Forward),
            Key::Enter => match self.state.selection().clone() {
                Selection::AttributeCursor(cursor) => self.open_from_cursor(cursor, ""),
                _ => Ok(EventOutcome::Unhandled),
            },
            Key::ArrowUp | Key::ArrowDown | Key::Escape | Key::Space => Ok(EventOutcome::Unhandled),
        }
    }

    /// A click resolved to `pos`. `inside` is the start of the node the
    /// click landed in, when it landed in one.
    pub fn handle_click(&mut self, pos: usize, inside: Option<usize>) -> Result<EventOutcome> {
        let doc = self.state.doc();
        let rpos = doc.resolve(pos)?;
        let Some(cursor) = AttributeCursor::at(&rpos) else {
            return Ok(EventOutcome::Unhandled);
        };
        if let Some(inside) = inside
            && doc.node_at(inside).is_some_and(NodeSelection::is_selectable)
        {
            return Ok(EventOutcome::Unhandled);
        }
        let update = self.set_selection(Selection::AttributeCursor(cursor))?;
        Ok(EventOutcome::Handled(update))
    }

    /// Removes the pending trigger and query, then adds `key` to the block
    /// around it, all in one transaction.
    pub fn commit_autocomplete(&mut self, key: &str) -> Result<EventOutcome> {
        let Some(pending) = self.state.autocomplete().pending().copied() else {
            return Ok(EventOutcome::Unhandled);
        };
        let mut tr = self.state.tr();
        tr.delete(pending.from, pending.to)?;
        tr.set_selection(Selection::caret(pending.from))?;
        tr.set_autocomplete(AutocompleteMeta::Close);
        if !commands::add_attribute_in(&mut tr, key)? {
            debug!("committed {key} but no block can hold it");
        }
        Ok(EventOutcome::Handled(self.dispatch(tr)?))
    }

    /// Closes the menu and keeps whatever was typed.
    pub fn cancel_autocomplete(&mut self) -> Result<EventOutcome> {
        if !self.state.autocomplete().is_pending() {
            return Ok(EventOutcome::Unhandled);
        }
        let mut tr = self.state.tr();
        tr.set_autocomplete(AutocompleteMeta::Close);
        Ok(EventOutcome::Handled(self.dispatch(tr)?))
    }

    pub fn add_attribute(&mut self, key: &str) -> Result<EventOutcome> {
        match commands::add_attribute(&self.state, key)? {
            CommandOutcome::Applied(tr) => Ok(EventOutcome::Handled(self.dispatch(tr)?)),
            CommandOutcome::Inapplicable => Ok(EventOutcome::Unhandled),
        }
    }

    /// Current menu candidates, best first.
    pub fn candidates(&self) -> Vec<AttributeKey> {
        self.state.candidates()
    }

    fn handle_menu_key(&mut self, key: Key) -> Result<EventOutcome> {
        let candidates = self.state.candidates();
        let highlighted = self
            .state
            .autocomplete()
            .pending()
            .map_or(0, |p| p.highlighted.min(candidates.len().saturating_sub(1)));
        match key {
            Key::ArrowUp | Key::ArrowDown if !candidates.is_empty() => {
                let last = candidates.len() - 1;
                let next = match key {
                    Key::ArrowUp if highlighted == 0 => last,
                    Key::ArrowUp => highlighted - 1,
                    _ if highlighted == last => 0,
                    _ => highlighted + 1,
                };
                let mut tr = self.state.tr();
                tr.set_autocomplete(AutocompleteMeta::Highlight(next));
                Ok(EventOutcome::Handled(self.dispatch(tr)?))
            }
            Key::Enter => match candidates.get(highlighted) {
                Some(candidate) => self.commit_autocomplete(&candidate.key),
                None => Ok(EventOutcome::Unhandled),
            },
            Key::Escape => self.cancel_autocomplete(),
            Key::Space => match candidates.as_slice() {
                [only] => self.commit_autocomplete(&only.key),
                [] => {
                    let mut tr = self.state.tr();
                    tr.set_autocomplete(AutocompleteMeta::Close);
                    Ok(EventOutcome::Observed(self.dispatch(tr)?))
                }
                _ => Ok(EventOutcome::Unhandled),
            },
            _ => Ok(EventOutcome::Unhandled),
        }
    }

    /// Inserts the trigger plus `text` at the first text position after
    /// the cursor and opens the menu over it.
    fn open_from_cursor(&mut self, cursor: AttributeCursor, text: &str) -> Result<EventOutcome> {
        let doc = self.state.doc();
        let rpos = doc.resolve(cursor.pos())?;
        let Some(target) = Selection::find_from(&rpos, Dir::Forward, true) else {
            return Ok(EventOutcome::Unhandled);
        };
        let from = target.from();
        let inserted = format!("{}{text}", self.state.options().trigger);
        let end = from + char_len(&inserted);
        let mut tr = self.state.tr();
        tr.insert_text(&inserted, from, from, None)?;
        tr.set_selection(Selection::caret(end))?;
        tr.set_autocomplete(AutocompleteMeta::Open { from, to: end });
        Ok(EventOutcome::Handled(self.dispatch(tr)?))
    }

    /// Whether the text before `pos` in its textblock ends in a trigger.
    fn trigger_fires(&self, doc: &Node, pos: usize) -> Result<bool> {
        let rpos = doc.resolve(pos)?;
        let parent = rpos.parent();
        if !parent.inline_content() || parent.node_type().is_code() {
            return Ok(false);
        }
        let before = doc.text_between(rpos.start(rpos.depth()), pos, "");
        Ok(self.trigger_rule.is_match(&before))
    }

    /// Arrow movement onto attribute cursors. A text selection only moves
    /// when it sits at the edge of its textblock.
    fn arrow(&mut self, dir: Dir) -> Result<EventOutcome> {
        let selection = self.state.selection().clone();
        let doc = self.state.doc();
        let edge = match dir {
            Dir::Forward => selection.to(),
            Dir::Backward => selection.from(),
        };
        let redge = doc.resolve(edge)?;
        let (start, must_move) = match selection {
            Selection::Text(_) => {
                let depth = redge.depth();
                let parent = redge.parent();
                let at_edge = match dir {
                    Dir::Forward => redge.parent_offset() == parent.content_size(),
                    Dir::Backward => redge.parent_offset() == 0,
                };
                if depth == 0 || !parent.is_textblock() || !at_edge {
                    return Ok(EventOutcome::Unhandled);
                }
                let outside = match dir {
                    Dir::Forward => redge.after(depth),
                    Dir::Backward => redge.before(depth),
                };
                let Some(outside) = outside else {
                    return Ok(EventOutcome::Unhandled);
                };
                (doc.resolve(outside)?, false)
            }
            Selection::Node(_) | Selection::AttributeCursor(_) => (redge, selection.is_empty()),
        };
        let Some(found) = AttributeCursor::find_from(&start, dir, must_move) else {
            return Ok(EventOutcome::Unhandled);
        };
        let Some(cursor) = AttributeCursor::at(&doc.resolve(found)?) else {
            return Ok(EventOutcome::Unhandled);
        };
        let update = self.set_selection(Selection::AttributeCursor(cursor))?;
        Ok(EventOutcome::Handled(update))
    }
}
