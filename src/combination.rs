use crate::breakpoints::{BreakpointModel, FeatureBreakpoint, WidthBreakpoint};
use crate::error::{EngineError, LookupTable};
use std::fmt;

/// Name reserved for the unmodified variant of an entity.
pub const NO_MODIFIER: &str = "no-modifier";

/// Slug of the unconditioned combination.
pub const NO_BREAKPOINT: &str = "no-breakpoint";

/// A point in the breakpoint matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CombinationKey {
    pub from: Option<WidthBreakpoint>,
    pub until: Option<WidthBreakpoint>,
    pub misc: Option<FeatureBreakpoint>,
}

impl CombinationKey {
    pub fn unconditioned() -> Self {
        Self::default()
    }

    pub fn is_unconditioned(&self) -> bool {
        self.from.is_none() && self.until.is_none() && self.misc.is_none()
    }

    /// Builds a key from already resolved breakpoints, checking that `from`
    /// sits strictly before `until`.
    pub fn resolve(
        model: &BreakpointModel,
        from: Option<&WidthBreakpoint>,
        until: Option<&WidthBreakpoint>,
        misc: Option<&FeatureBreakpoint>,
        entity: &str,
    ) -> Result<Self, EngineError> {
        if let (Some(from), Some(until)) = (from, until) {
            let ordered = match (model.range_index(&from.name), model.range_index(&until.name)) {
                (Some(from_idx), Some(until_idx)) => from_idx < until_idx,
                _ => false,
            };
            if !ordered {
                return Err(EngineError::InvalidCombination {
                    from: from.name.clone(),
                    until: until.name.clone(),
                    entity: entity.to_string(),
                });
            }
        }
        Ok(Self {
            from: from.cloned(),
            until: until.cloned(),
            misc: misc.cloned(),
        })
    }

    /// Textual identifier, e.g. `from-s-until-l-when-landscape`.
    pub fn slug(&self) -> String {
        if self.is_unconditioned() {
            return NO_BREAKPOINT.to_string();
        }
        let mut parts = Vec::with_capacity(3);
        if let Some(from) = &self.from {
            parts.push(format!("from-{}", from.name));
        }
        if let Some(until) = &self.until {
            parts.push(format!("until-{}", until.name));
        }
        if let Some(misc) = &self.misc {
            parts.push(format!("when-{}", misc.name));
        }
        parts.join("-")
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// The canonical combination table for a model.
///
/// Order: the empty key, `from` keys, `until` keys, `(from, until)` pairs,
/// `misc` keys, `(from, misc)`, `(until, misc)`, then every pair crossed with
/// every `misc`. Emission order of multi-combination output follows this.
pub fn enumerate(model: &BreakpointModel) -> Vec<CombinationKey> {
    let widths: Vec<&WidthBreakpoint> = model.ranged_lengths().collect();
    let features = model.features();
    let key = |from: Option<&WidthBreakpoint>,
               until: Option<&WidthBreakpoint>,
               misc: Option<&FeatureBreakpoint>| CombinationKey {
        from: from.cloned(),
        until: until.cloned(),
        misc: misc.cloned(),
    };

    let mut pairs = Vec::new();
    for (from_idx, from) in widths.iter().enumerate() {
        for until in widths.iter().skip(from_idx + 1) {
            pairs.push((*from, *until));
        }
    }

    let mut keys = vec![CombinationKey::unconditioned()];
    keys.extend(widths.iter().map(|from| key(Some(*from), None, None)));
    keys.extend(widths.iter().map(|until| key(None, Some(*until), None)));
    keys.extend(
        pairs
            .iter()
            .map(|(from, until)| key(Some(*from), Some(*until), None)),
    );
    keys.extend(features.iter().map(|misc| key(None, None, Some(misc))));
    for from in &widths {
        keys.extend(features.iter().map(|misc| key(Some(*from), None, Some(misc))));
    }
    for until in &widths {
        keys.extend(features.iter().map(|misc| key(None, Some(*until), Some(misc))));
    }
    for (from, until) in &pairs {
        keys.extend(
            features
                .iter()
                .map(|misc| key(Some(*from), Some(*until), Some(misc))),
        );
    }
    keys
}

/// Finds an enumerated key by its slug.
pub fn find_by_slug<'a>(
    keys: &'a [CombinationKey],
    slug: &str,
    entity: &str,
) -> Result<&'a CombinationKey, EngineError> {
    keys.iter()
        .find(|key| key.slug() == slug)
        .ok_or_else(|| EngineError::Configuration {
            name: slug.to_string(),
            table: LookupTable::Combinations,
            entity: entity.to_string(),
        })
}

/// Variant axis orthogonal to breakpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
    None,
    Named(String),
}

impl Modifier {
    /// Validates a user supplied modifier name. Empty means unmodified.
    pub fn parse(raw: Option<&str>, entity: &str) -> Result<Self, EngineError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::None),
            Some(NO_MODIFIER) => Err(EngineError::InvalidModifier {
                entity: entity.to_string(),
            }),
            Some(name) => Ok(Self::Named(name.to_string())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or(NO_MODIFIER))
    }
}

#[cfg(test)]
mod tests {
    use super::{CombinationKey, Modifier, enumerate, find_by_slug};
    use crate::breakpoints::{BreakpointModel, FeatureBreakpoint, Length, WidthBreakpoint};
    use crate::error::EngineError;

    fn slugs(model: &BreakpointModel) -> Vec<String> {
        enumerate(model).iter().map(CombinationKey::slug).collect()
    }

    #[test]
    fn enumerates_default_model_in_canonical_order() {
        let expected = [
            "no-breakpoint",
            "from-s",
            "from-m",
            "from-l",
            "until-s",
            "until-m",
            "until-l",
            "from-s-until-m",
            "from-s-until-l",
            "from-m-until-l",
            "when-landscape",
            "when-portrait",
            "from-s-when-landscape",
            "from-s-when-portrait",
            "from-m-when-landscape",
            "from-m-when-portrait",
            "from-l-when-landscape",
            "from-l-when-portrait",
            "until-s-when-landscape",
            "until-s-when-portrait",
            "until-m-when-landscape",
            "until-m-when-portrait",
            "until-l-when-landscape",
            "until-l-when-portrait",
            "from-s-until-m-when-landscape",
            "from-s-until-m-when-portrait",
            "from-s-until-l-when-landscape",
            "from-s-until-l-when-portrait",
            "from-m-until-l-when-landscape",
            "from-m-until-l-when-portrait",
        ];
        let model = BreakpointModel::default();
        assert_eq!(slugs(&model), expected);
        assert_eq!(enumerate(&model), enumerate(&model));
    }

    #[test]
    fn enumerates_small_models() {
        let model = BreakpointModel::new(
            vec![WidthBreakpoint {
                name: "small".to_string(),
                width: Length::new(320.0, "px"),
            }],
            vec![FeatureBreakpoint {
                name: "landscape".to_string(),
                condition: "(orientation: landscape)".to_string(),
            }],
        )
        .expect("model should build");
        assert_eq!(
            slugs(&model),
            [
                "no-breakpoint",
                "from-small",
                "until-small",
                "when-landscape",
                "from-small-when-landscape",
                "until-small-when-landscape",
            ]
        );

        let bare = BreakpointModel::new(vec![], vec![]).expect("model should build");
        assert_eq!(slugs(&bare), ["no-breakpoint"]);
    }

    #[test]
    fn resolve_rejects_reversed_ranges() {
        let model = BreakpointModel::default();
        let s = model.width("s", "foo").expect("s").expect("ranged");
        let l = model.width("l", "foo").expect("l").expect("ranged");

        let key = CombinationKey::resolve(&model, Some(s), Some(l), None, "foo")
            .expect("ordered range should resolve");
        assert_eq!(key.slug(), "from-s-until-l");

        for (from, until) in [(l, s), (s, s)] {
            let err = CombinationKey::resolve(&model, Some(from), Some(until), None, "foo")
                .expect_err("range should be rejected");
            assert!(matches!(err, EngineError::InvalidCombination { .. }));
        }
    }

    #[test]
    fn finds_keys_by_slug() {
        let keys = enumerate(&BreakpointModel::default());
        let key = find_by_slug(&keys, "until-m-when-portrait", "foo").expect("slug exists");
        assert_eq!(key.until.as_ref().map(|bp| bp.name.as_str()), Some("m"));
        assert!(find_by_slug(&keys, "from-xl", "foo").is_err());
    }

    #[test]
    fn rejects_reserved_modifier_name() {
        assert_eq!(Modifier::parse(None, "foo"), Ok(Modifier::None));
        assert_eq!(Modifier::parse(Some(""), "foo"), Ok(Modifier::None));
        assert_eq!(
            Modifier::parse(Some("bar"), "foo"),
            Ok(Modifier::Named("bar".to_string()))
        );
        let err = Modifier::parse(Some("no-modifier"), "foo").expect_err("sentinel is reserved");
        assert_eq!(
            err.to_string(),
            "a class modifier cannot be called `no-modifier` (from foo)"
        );
    }
}
