//! Toggle-style template selection, as driven by a template picker.

use std::collections::BTreeSet;

use crate::catalog::{Template, TemplateCatalog};
use crate::{ALL_TEMPLATES, Result};

/// The set of templates a user has picked.
///
/// Selecting "All Templates" parks the individual picks and deselecting it
/// restores them, so toggling the pseudo-template twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSelection {
    picked: BTreeSet<String>,
    all: bool,
    parked: BTreeSet<String>,
}

impl TemplateSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a template by name. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        if name == ALL_TEMPLATES {
            if self.all {
                self.all = false;
                self.picked = std::mem::take(&mut self.parked);
            } else {
                self.all = true;
                self.parked = std::mem::take(&mut self.picked);
            }
            return self.all;
        }

        // Picking a single template leaves "all" mode.
        if self.all {
            self.all = false;
            self.picked = std::mem::take(&mut self.parked);
        }
        if self.picked.remove(name) {
            false
        } else {
            self.picked.insert(name.to_string());
            true
        }
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn is_selected(&self, name: &str) -> bool {
        if name == ALL_TEMPLATES {
            return self.all;
        }
        self.all || self.picked.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.picked.is_empty()
    }

    /// Resolve the selection against a catalog, in catalog display order.
    ///
    /// In "all" mode the pseudo-template itself is returned; expansion is left
    /// to the batch so it happens exactly once.
    pub fn resolve(&self, catalog: &TemplateCatalog) -> Result<Vec<Template>> {
        if self.all {
            return Ok(vec![catalog.all_templates().clone()]);
        }
        for name in &self.picked {
            catalog.require(name)?;
        }
        Ok(catalog
            .templates()
            .iter()
            .filter(|t| self.picked.contains(&t.name))
            .cloned()
            .collect())
    }
}
