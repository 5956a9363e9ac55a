//! # Attribute autocomplete
//!
//! A two-state machine. `Idle` until a trigger character is typed (or text
//! is typed on an attribute cursor), then `Pending` over the range holding
//! the trigger and the query typed after it. Every transaction advances the
//! machine: explicit metadata opens, closes or moves the highlight, and
//! otherwise the pending range is mapped and re-validated.

mod catalog;
mod matcher;

pub use catalog::{AttributeCatalog, AttributeKey};
pub use matcher::rank;

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::model::Node;
use crate::selection::Selection;
use crate::state::Transaction;
use crate::transform::Assoc;

/// What a query must look like for the menu to stay open.
pub const QUERY_PATTERN: &str = r"^(?:[a-zA-Z][-_a-zA-Z0-9]*)?$";

fn query_regex() -> &'static Regex {
    static QUERY_REGEX: OnceLock<Regex> = OnceLock::new();
    QUERY_REGEX.get_or_init(|| Regex::new(QUERY_PATTERN).expect("Invalid query regex"))
}

/// The pattern, over the text before the caret, that opens the menu.
pub fn input_rule(trigger: char) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?:^|\s){}$",
        regex::escape(&trigger.to_string())
    ))
}

/// Transaction metadata driving the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocompleteMeta {
    /// Start a pending query over `from..to`, replacing any current one.
    Open { from: usize, to: usize },
    Close,
    /// Move the menu highlight to a candidate index.
    Highlight(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub from: usize,
    pub to: usize,
    pub highlighted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutocompleteState {
    #[default]
    Idle,
    Pending(PendingQuery),
}

impl AutocompleteState {
    pub fn pending(&self) -> Option<&PendingQuery> {
        match self {
            AutocompleteState::Idle => None,
            AutocompleteState::Pending(p) => Some(p),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// The query typed after the trigger.
    pub fn query(&self, doc: &Node) -> Option<String> {
        let pending = self.pending()?;
        let text = doc.text_between(pending.from, pending.to, "");
        Some(text.chars().skip(1).collect())
    }

    /// The state after `tr`, whose resulting selection is `selection`.
    pub(crate) fn apply(&self, tr: &Transaction, selection: &Selection, trigger: char) -> Self {
        let next = match (tr.autocomplete_meta(), self) {
            (Some(AutocompleteMeta::Close), _) => AutocompleteState::Idle,
            (Some(AutocompleteMeta::Open { from, to }), _) => {
                AutocompleteState::Pending(PendingQuery {
                    from: *from,
                    to: *to,
                    highlighted: 0,
                })
            }
            (Some(AutocompleteMeta::Highlight(index)), AutocompleteState::Pending(p)) => {
                AutocompleteState::Pending(PendingQuery {
                    highlighted: *index,
                    ..*p
                })
            }
            (_, AutocompleteState::Idle) => AutocompleteState::Idle,
            (_, AutocompleteState::Pending(p)) if tr.doc_changed() => {
                AutocompleteState::Pending(PendingQuery {
                    from: tr.mapping().map(p.from, Assoc::Right),
                    to: tr.mapping().map(p.to, Assoc::Right),
                    highlighted: 0,
                })
            }
            (_, pending) => *pending,
        };
        let next = match next {
            AutocompleteState::Pending(p) if !p.holds_query(tr.doc(), selection, trigger) => {
                AutocompleteState::Idle
            }
            other => other,
        };
        if next.is_pending() != self.is_pending() {
            debug!("autocomplete {:?} -> {:?}", self, next);
        }
        next
    }
}

impl PendingQuery {
    /// The range still starts with the trigger, the rest still matches the
    /// query pattern and the selection is still inside it.
    fn holds_query(&self, doc: &Node, selection: &Selection, trigger: char) -> bool {
        if self.from >= self.to || self.to > doc.content_size() {
            return false;
        }
        let Ok(rfrom) = doc.resolve(self.from) else {
            return false;
        };
        if !rfrom.parent().inline_content() || rfrom.end(rfrom.depth()) < self.to {
            return false;
        }
        if !matches!(selection, Selection::Text(_))
            || selection.from() < self.from
            || selection.to() > self.to
        {
            return false;
        }
        let text = doc.text_between(self.from, self.to, "");
        let mut chars = text.chars();
        chars.next() == Some(trigger) && query_regex().is_match(chars.as_str())
    }
}
