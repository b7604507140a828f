use std::collections::HashMap;

use log::debug;

use crate::aperture::RE_MACRO_NAME;
use crate::error::{DocumentError, Result};

/// An aperture macro, kept as the primitive definition lines it was given. Nothing here evaluates them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroDefinition {
    pub name: String,
    pub lines: Vec<String>,
}

impl MacroDefinition {
    pub fn new(name: &str, lines: Vec<String>) -> Result<Self> {
        if !RE_MACRO_NAME.is_match(name) {
            return Err(DocumentError::validation(format!("malformed macro name: '{}'", name)));
        }

        Ok(Self {
            name: name.to_string(),
            lines,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, MacroDefinition>,
}

impl MacroTable {
    /// Replaces any previous definition with the same name.
    pub fn define(&mut self, definition: MacroDefinition) {
        debug!("defining macro: {}, lines: {}", definition.name, definition.lines.len());
        self.macros
            .insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.macros.values()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}
