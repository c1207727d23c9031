use crate::combination::Modifier;
use crate::direction::split_top_level;
use indexmap::IndexMap;
use std::fmt;

/// What a template renders for one modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleContent {
    /// Declarations wrapped in the variant's synthesized class selector.
    Declarations(String),
    /// Complete CSS emitted as written.
    Css(String),
}

/// Body of a declaration, rendered lazily per granted variant.
pub trait Template: fmt::Debug {
    fn render(&self, modifier: &Modifier) -> Option<RuleContent>;

    /// Modifiers materialized by explicit binding, in declaration order.
    fn modifiers(&self) -> Vec<Modifier> {
        vec![Modifier::None]
    }
}

/// A class with one declaration list per modifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTemplate {
    variants: IndexMap<Modifier, String>,
}

impl ObjectTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant(mut self, modifier: Modifier, declarations: impl Into<String>) -> Self {
        self.variants.insert(modifier, declarations.into());
        self
    }
}

impl Template for ObjectTemplate {
    fn render(&self, modifier: &Modifier) -> Option<RuleContent> {
        self.variants
            .get(modifier)
            .map(|declarations| RuleContent::Declarations(declarations.clone()))
    }

    fn modifiers(&self) -> Vec<Modifier> {
        self.variants.keys().cloned().collect()
    }
}

/// Declarations parameterized by the modifier: `$modifier` is replaced with
/// the modifier name, or with `default` for the unmodified variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilTemplate {
    body: String,
    default: Option<String>,
}

pub const MODIFIER_PLACEHOLDER: &str = "$modifier";

impl UtilTemplate {
    pub fn new(body: impl Into<String>, default: Option<String>) -> Self {
        Self {
            body: body.into(),
            default,
        }
    }
}

impl Template for UtilTemplate {
    fn render(&self, modifier: &Modifier) -> Option<RuleContent> {
        let value = modifier.name().or(self.default.as_deref());
        let declarations = match value {
            Some(value) => self.body.replace(MODIFIER_PLACEHOLDER, value),
            None => split_top_level(&self.body, ';')
                .into_iter()
                .filter(|declaration| !declaration.contains(MODIFIER_PLACEHOLDER))
                .collect::<Vec<_>>()
                .join(";"),
        };
        if declarations.trim().trim_matches(';').trim().is_empty() {
            return None;
        }
        Some(RuleContent::Declarations(declarations))
    }
}

/// Verbatim CSS with a single, unmodified variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssTemplate {
    css: String,
}

impl CssTemplate {
    pub fn new(css: impl Into<String>) -> Self {
        Self { css: css.into() }
    }
}

impl Template for CssTemplate {
    fn render(&self, modifier: &Modifier) -> Option<RuleContent> {
        match modifier {
            Modifier::None => Some(RuleContent::Css(self.css.clone())),
            Modifier::Named(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CssTemplate, ObjectTemplate, RuleContent, Template, UtilTemplate};
    use crate::combination::Modifier;

    fn named(name: &str) -> Modifier {
        Modifier::Named(name.to_string())
    }

    #[test]
    fn object_renders_declared_variants_only() {
        let template = ObjectTemplate::new()
            .variant(Modifier::None, "k: v")
            .variant(named("bar"), "k: w");
        assert_eq!(template.modifiers(), vec![Modifier::None, named("bar")]);
        assert_eq!(
            template.render(&named("bar")),
            Some(RuleContent::Declarations("k: w".to_string()))
        );
        assert_eq!(template.render(&named("baz")), None);
    }

    #[test]
    fn util_substitutes_modifier_or_default() {
        let template = UtilTemplate::new("margin-top: calc($modifier * 6px)", Some("1".to_string()));
        assert_eq!(
            template.render(&named("6")),
            Some(RuleContent::Declarations("margin-top: calc(6 * 6px)".to_string()))
        );
        assert_eq!(
            template.render(&Modifier::None),
            Some(RuleContent::Declarations("margin-top: calc(1 * 6px)".to_string()))
        );
    }

    #[test]
    fn util_without_default_drops_parameterized_declarations() {
        let template = UtilTemplate::new("display: block; width: $modifier", None);
        assert_eq!(
            template.render(&Modifier::None),
            Some(RuleContent::Declarations("display: block".to_string()))
        );

        let only_parameterized = UtilTemplate::new("width: $modifier;", None);
        assert_eq!(only_parameterized.render(&Modifier::None), None);
    }

    #[test]
    fn css_template_has_a_single_variant() {
        let template = CssTemplate::new("bar { k: v }");
        assert_eq!(template.modifiers(), vec![Modifier::None]);
        assert_eq!(
            template.render(&Modifier::None),
            Some(RuleContent::Css("bar { k: v }".to_string()))
        );
        assert_eq!(template.render(&named("x")), None);
    }
}
