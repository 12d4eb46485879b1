//! Template values and the read-only catalog that groups them.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults::TEMPLATE_DEFS;
use crate::{ALL_TEMPLATES, CUSTOM_TEMPLATE, CatalogError, Result};

/// Catalog tier a template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}

/// A named output size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_tier")]
    pub tier: Tier,
}

fn default_tier() -> Tier {
    Tier::Free
}

impl Template {
    /// Create a template with non-zero dimensions.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CatalogError::InvalidDimensions { width, height });
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            platform: None,
            category: None,
            tier: Tier::Free,
        })
    }

    /// Synthetic single template for a custom size override.
    pub fn custom(width: u32, height: u32) -> Result<Self> {
        Ok(Self::new(CUSTOM_TEMPLATE, width, height)?.with_category("custom"))
    }

    /// The "All Templates" pseudo-template. It has no size and is never rendered.
    pub fn all_templates() -> Self {
        Self {
            name: ALL_TEMPLATES.to_string(),
            width: 0,
            height: 0,
            platform: None,
            category: None,
            tier: Tier::Free,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Whether this entry is a selection shortcut rather than a real size.
    pub fn is_pseudo(&self) -> bool {
        self.name == ALL_TEMPLATES
    }

    /// Archive-safe form of the name, see [`normalize_template_name`].
    pub fn slug(&self) -> String {
        normalize_template_name(&self.name)
    }

    /// `1080x1080` style size label.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Lower-case the name and collapse whitespace runs and `.`, `/`, `\`
/// separators into a single `-`. Falls back to `template` when nothing is left.
pub fn normalize_template_name(name: &str) -> String {
    let slug = name
        .split(|c: char| c.is_whitespace() || matches!(c, '.' | '/' | '\\'))
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "template".to_string()
    } else {
        slug
    }
}

/// Read-only registry of templates, constructed once and shared by reference.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
    all: Template,
}

impl TemplateCatalog {
    /// Build a catalog from explicit templates.
    ///
    /// Names must be unique after normalization (so output names never
    /// collide), dimensions non-zero, and the pseudo-template name is reserved.
    pub fn new(templates: Vec<Template>) -> Result<Self> {
        let mut index = HashMap::with_capacity(templates.len());
        let mut slugs = HashSet::with_capacity(templates.len());
        for (i, t) in templates.iter().enumerate() {
            if t.is_pseudo() {
                return Err(CatalogError::ReservedName(t.name.clone()));
            }
            if t.width == 0 || t.height == 0 {
                return Err(CatalogError::InvalidDimensions {
                    width: t.width,
                    height: t.height,
                });
            }
            if index.insert(t.name.clone(), i).is_some() || !slugs.insert(t.slug()) {
                return Err(CatalogError::DuplicateName(t.name.clone()));
            }
        }
        debug!(count = templates.len(), "Template catalog built");
        Ok(Self {
            templates,
            index,
            all: Template::all_templates(),
        })
    }

    /// The catalog shipped with the application.
    pub fn builtin() -> Result<Self> {
        let templates = TEMPLATE_DEFS
            .iter()
            .map(|d| {
                Template::new(d.name, d.width, d.height).map(|t| {
                    t.with_platform(d.platform)
                        .with_category(d.category)
                        .with_tier(d.tier)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(templates)
    }

    /// A sub-catalog holding only the templates available at `tier`.
    pub fn restricted_to(&self, tier: Tier) -> Self {
        let templates: Vec<Template> = self
            .templates
            .iter()
            .filter(|t| t.tier <= tier)
            .cloned()
            .collect();
        let index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            templates,
            index,
            all: self.all.clone(),
        }
    }

    /// Look up a template by name. The pseudo-template is found too.
    pub fn get(&self, name: &str) -> Option<&Template> {
        if name == ALL_TEMPLATES {
            return Some(&self.all);
        }
        self.index.get(name).map(|&i| &self.templates[i])
    }

    /// Like [`get`](Self::get) but failing with `UnknownTemplate`.
    pub fn require(&self, name: &str) -> Result<&Template> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownTemplate(name.to_string()))
    }

    /// Every real template, in display order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn all_templates(&self) -> &Template {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates grouped by platform; entries without a platform go under "Other".
    pub fn by_platform(&self) -> BTreeMap<&str, Vec<&Template>> {
        let mut groups: BTreeMap<&str, Vec<&Template>> = BTreeMap::new();
        for t in &self.templates {
            let key = t.platform.as_deref().unwrap_or("Other");
            groups.entry(key).or_default().push(t);
        }
        groups
    }

    /// Expand a requested template list into concrete render targets.
    ///
    /// The pseudo-template becomes every catalog template (once, whatever
    /// the request order). Templates outside the catalog, such as a custom
    /// size, are kept. Templates with the same normalized name and size
    /// would render to the same output, so only the first is kept.
    pub fn expand(&self, requested: &[Template]) -> Vec<Template> {
        let wants_all = requested.iter().any(Template::is_pseudo);

        let mut seen: HashSet<(String, u32, u32)> = HashSet::new();
        let mut expanded = Vec::new();
        let mut push = |t: &Template, out: &mut Vec<Template>| {
            if t.is_pseudo() {
                return;
            }
            if seen.insert((t.slug(), t.width, t.height)) {
                out.push(t.clone());
            }
        };

        if wants_all {
            for t in &self.templates {
                push(t, &mut expanded);
            }
        }
        for t in requested {
            push(t, &mut expanded);
        }

        debug!(
            requested = requested.len(),
            expanded = expanded.len(),
            wants_all,
            "Expanded template request"
        );
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_catalog() -> TemplateCatalog {
        TemplateCatalog::new(vec![
            Template::new("Square", 100, 100).unwrap(),
            Template::new("Wide", 200, 100)
                .unwrap()
                .with_platform("Web")
                .with_tier(Tier::Pro),
        ])
        .unwrap()
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = TemplateCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), TEMPLATE_DEFS.len());
        assert!(catalog.templates().iter().all(|t| !t.is_pseudo()));
        assert_eq!(catalog.get("Instagram Post").unwrap().size_label(), "1080x1080");
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            Template::new("Broken", 0, 10),
            Err(CatalogError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(Template::custom(10, 0).is_err());
    }

    #[test]
    fn duplicate_and_reserved_names_are_rejected() {
        let dup = TemplateCatalog::new(vec![
            Template::new("A", 1, 1).unwrap(),
            Template::new("A", 2, 2).unwrap(),
        ]);
        assert!(matches!(dup, Err(CatalogError::DuplicateName(_))));

        let reserved = TemplateCatalog::new(vec![Template::all_templates()]);
        assert!(matches!(reserved, Err(CatalogError::ReservedName(_))));
    }

    #[test]
    fn names_colliding_after_normalization_are_rejected() {
        let case = TemplateCatalog::new(vec![
            Template::new("Story", 20, 40).unwrap(),
            Template::new("story", 20, 40).unwrap(),
        ]);
        assert!(matches!(case, Err(CatalogError::DuplicateName(n)) if n == "story"));

        let spacing = TemplateCatalog::new(vec![
            Template::new("Tall Story", 20, 40).unwrap(),
            Template::new("tall   story", 30, 40).unwrap(),
        ]);
        assert!(matches!(spacing, Err(CatalogError::DuplicateName(_))));

        let dotted = TemplateCatalog::new(vec![
            Template::new("b.c", 20, 40).unwrap(),
            Template::new("B C", 20, 40).unwrap(),
        ]);
        assert!(dotted.is_err());
    }

    #[test]
    fn normalized_names_have_no_separators() {
        assert_eq!(normalize_template_name("Instagram Post"), "instagram-post");
        assert_eq!(normalize_template_name("b.c"), "b-c");
        assert_eq!(normalize_template_name("a/b\\c . d"), "a-b-c-d");
        assert_eq!(normalize_template_name(" .. "), "template");
    }

    #[test]
    fn expand_drops_same_output_duplicates() {
        let catalog = small_catalog();
        let expanded = catalog.expand(&[
            Template::new("Story", 20, 40).unwrap(),
            Template::new("story", 20, 40).unwrap(),
            Template::new("story", 40, 20).unwrap(),
        ]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].name, "Story");
    }

    #[test]
    fn get_finds_pseudo_template() {
        let catalog = small_catalog();
        assert!(catalog.get(ALL_TEMPLATES).unwrap().is_pseudo());
        assert!(catalog.require("Missing").is_err());
    }

    #[test]
    fn expand_all_templates_excludes_itself() {
        let catalog = small_catalog();
        let expanded = catalog.expand(&[Template::all_templates()]);
        let names: Vec<_> = expanded.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Square", "Wide"]);
    }

    #[test]
    fn expand_dedups_and_keeps_custom() {
        let catalog = small_catalog();
        let square = catalog.get("Square").unwrap().clone();
        let custom = Template::custom(300, 50).unwrap();
        let expanded = catalog.expand(&[
            square.clone(),
            Template::all_templates(),
            square,
            custom.clone(),
            Template::all_templates(),
        ]);
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded.last(), Some(&custom));
    }

    #[test]
    fn expand_without_pseudo_is_passthrough() {
        let catalog = small_catalog();
        let wide = catalog.get("Wide").unwrap().clone();
        assert_eq!(catalog.expand(&[wide.clone()]), vec![wide]);
    }

    #[test]
    fn restricted_catalog_hides_higher_tiers() {
        let catalog = small_catalog();
        let free = catalog.restricted_to(Tier::Free);
        assert_eq!(free.len(), 1);
        assert!(free.get("Wide").is_none());
        assert_eq!(catalog.restricted_to(Tier::Pro).len(), 2);
    }

    #[test]
    fn groups_by_platform() {
        let catalog = small_catalog();
        let groups = catalog.by_platform();
        assert_eq!(groups["Other"].len(), 1);
        assert_eq!(groups["Web"][0].name, "Wide");
    }

    #[test]
    fn template_serializes_without_empty_tags() {
        let json = serde_json::to_string(&Template::new("Square", 10, 10).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Square","width":10,"height":10,"tier":"free"}"#
        );
    }
}
