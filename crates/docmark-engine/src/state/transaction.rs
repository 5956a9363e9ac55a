use std::ops::{Deref, DerefMut};

use crate::autocomplete::AutocompleteMeta;
use crate::error::{EditorError, Result};
use crate::selection::Selection;
use crate::transform::Transform;

/// A [`Transform`] plus the editor state it will produce: the selection
/// and autocomplete metadata. Built in full, then applied all at once by
/// [`EditorState::apply`](super::EditorState::apply).
#[derive(Debug, Clone)]
pub struct Transaction {
    transform: Transform,
    base_version: u64,
    base_selection: Selection,
    /// An explicitly set selection and the step count when it was set.
    selection: Option<(Selection, usize)>,
    autocomplete: Option<AutocompleteMeta>,
}

impl Transaction {
    pub(crate) fn new(transform: Transform, base_version: u64, base_selection: Selection) -> Self {
        Self {
            transform,
            base_version,
            base_selection,
            selection: None,
            autocomplete: None,
        }
    }

    /// Version of the state this transaction was started from.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// The selection after this transaction: the explicitly set one mapped
    /// through the steps added after it, or the starting selection mapped
    /// through all of them.
    pub fn selection(&self) -> Selection {
        match &self.selection {
            Some((sel, at)) if *at == self.transform.steps().len() => sel.clone(),
            Some((sel, at)) => sel.map(self.transform.doc(), &self.transform.mapping().slice(*at)),
            None => self
                .base_selection
                .map(self.transform.doc(), self.transform.mapping()),
        }
    }

    /// Sets the selection, which must address the current document.
    pub fn set_selection(&mut self, selection: Selection) -> Result<&mut Self> {
        let size = self.transform.doc().content_size();
        if selection.to() > size {
            return Err(EditorError::OutOfRange {
                pos: selection.to(),
                size,
            });
        }
        self.selection = Some((selection, self.transform.steps().len()));
        Ok(self)
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    pub fn set_autocomplete(&mut self, meta: AutocompleteMeta) -> &mut Self {
        self.autocomplete = Some(meta);
        self
    }

    pub fn autocomplete_meta(&self) -> Option<&AutocompleteMeta> {
        self.autocomplete.as_ref()
    }

    pub fn into_transform(self) -> Transform {
        self.transform
    }
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}
