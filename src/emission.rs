//! Deferred emission: templates render at their declaration site, for the
//! variants requested anywhere in the document.
//!
//! A [`Compilation`] is one pass. Phase one records raw text, declaration
//! sites and requests in document order; [`Compilation::finish`] replays the
//! recorded slots and renders every declaration's granted variants in
//! canonical combination order, modifiers grouped per combination.

use crate::breakpoints::BreakpointModel;
use crate::classname::class_name;
use crate::combination::{CombinationKey, Modifier, enumerate};
use crate::direction::Direction;
use crate::error::EngineError;
use crate::generator::{Chunk, RuleItem};
use crate::media::media_query;
use crate::registry::{CallState, Registry};
use crate::styles::StyleMap;
use crate::template::{CssTemplate, RuleContent, Template};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Inputs a pass reads from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub model: BreakpointModel,
    pub namespace: String,
    pub direction: Direction,
    pub silent: bool,
}

/// Breakpoint names and modifier of one request; `None` leaves a bound out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestArgs<'a> {
    pub from: Option<&'a str>,
    pub until: Option<&'a str>,
    pub misc: Option<&'a str>,
    pub modifier: Option<&'a str>,
}

/// Which enumerated combinations an explicit request materializes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinationPermissions {
    default: bool,
    overrides: HashMap<CombinationKey, bool>,
}

impl CombinationPermissions {
    pub fn all() -> Self {
        Self {
            default: true,
            overrides: HashMap::new(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn allow(mut self, key: CombinationKey) -> Self {
        self.overrides.insert(key, true);
        self
    }

    pub fn deny(mut self, key: CombinationKey) -> Self {
        self.overrides.insert(key, false);
        self
    }

    pub fn permits(&self, key: &CombinationKey) -> bool {
        self.overrides.get(key).copied().unwrap_or(self.default)
    }
}

#[derive(Debug)]
enum Slot {
    Raw(String),
    Declaration(String),
    Rendered(Vec<Chunk>),
}

type VariantId = (String, CombinationKey, Modifier);

#[derive(Debug)]
pub struct Compilation {
    model: BreakpointModel,
    namespace: String,
    direction: Direction,
    combinations: Vec<CombinationKey>,
    registry: Registry,
    templates: IndexMap<String, Box<dyn Template>>,
    slots: Vec<Slot>,
    materialized: HashSet<VariantId>,
}

impl Compilation {
    pub fn new(settings: Settings) -> Self {
        let combinations = enumerate(&settings.model);
        Self {
            registry: Registry::new(combinations.clone(), settings.silent),
            model: settings.model,
            namespace: settings.namespace,
            direction: settings.direction,
            combinations,
            templates: IndexMap::new(),
            slots: Vec::new(),
            materialized: HashSet::new(),
        }
    }

    pub fn combinations(&self) -> &[CombinationKey] {
        &self.combinations
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mute(&mut self) {
        self.registry.mute();
    }

    pub fn unmute(&mut self) {
        self.registry.unmute();
    }

    /// Records pass-through text at the current position.
    pub fn raw(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.slots.push(Slot::Raw(text.to_string()));
        }
    }

    /// Binds `template` to `name`; its output will appear here.
    pub fn declare(
        &mut self,
        name: &str,
        template: impl Template + 'static,
    ) -> Result<(), EngineError> {
        if self.templates.contains_key(name) {
            return Err(EngineError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        self.templates.insert(name.to_string(), Box::new(template));
        self.slots.push(Slot::Declaration(name.to_string()));
        Ok(())
    }

    /// Marks one variant of `name` as used. Declaring the template before or
    /// after the request makes no difference; never declaring it means no
    /// output.
    pub fn request(&mut self, name: &str, args: &RequestArgs<'_>) -> Result<CallState, EngineError> {
        let (key, modifier) = self.resolve(name, args)?;
        Ok(self.registry.request_transition(name, &key, &modifier))
    }

    /// Materializes the permitted combinations of a declared template for
    /// all of its modifiers, right here. Unknown names are ignored.
    pub fn request_explicit(
        &mut self,
        name: &str,
        permissions: &CombinationPermissions,
    ) -> Result<(), EngineError> {
        let Self {
            namespace,
            direction,
            combinations,
            registry,
            templates,
            slots,
            materialized,
            ..
        } = self;
        let Some(template) = templates.get(name) else {
            tracing::debug!(entity = name, "explicit request for an undeclared name ignored");
            return Ok(());
        };

        let modifiers = template.modifiers();
        let mut chunks = Vec::new();
        for key in combinations.iter().filter(|key| permissions.permits(key)) {
            let mut items = Vec::new();
            for modifier in &modifiers {
                let fresh = registry.query_state(name, key, modifier) == CallState::NotCalled;
                let state = registry.request_transition(name, key, modifier);
                if !fresh || state != CallState::Called {
                    continue;
                }
                let rendered =
                    render_item(template.as_ref(), name, key, modifier, namespace, *direction)?;
                if !rendered.is_empty() {
                    items.extend(rendered);
                    materialized.insert((name.to_string(), key.clone(), modifier.clone()));
                }
            }
            if !items.is_empty() {
                chunks.push(Chunk::Rules {
                    condition: media_query(key),
                    items,
                });
            }
        }
        slots.push(Slot::Rendered(chunks));
        Ok(())
    }

    /// Requests the single variant of a block.
    pub fn block(&mut self, name: &str) -> Result<CallState, EngineError> {
        self.request(name, &RequestArgs::default())
    }

    /// Emits `css` here the first time `name` is seen; later occurrences
    /// only repeat the request.
    pub fn component(&mut self, name: &str, css: &str) -> Result<CallState, EngineError> {
        if !self.templates.contains_key(name) {
            self.declare(name, CssTemplate::new(css))?;
        }
        self.block(name)
    }

    /// Replays the recorded slots and renders every declaration.
    pub fn finish(self) -> Result<Vec<Chunk>, EngineError> {
        let Self {
            namespace,
            direction,
            registry,
            templates,
            slots,
            materialized,
            ..
        } = self;

        for entity in registry.entities() {
            if !templates.contains_key(entity) {
                tracing::debug!(entity, "requested but never declared");
            }
        }

        let mut chunks = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Raw(text) => chunks.push(Chunk::Raw(text)),
                Slot::Rendered(rendered) => chunks.extend(rendered),
                Slot::Declaration(name) => {
                    let (Some(template), Some(table)) =
                        (templates.get(&name), registry.snapshot(&name))
                    else {
                        tracing::debug!(entity = %name, "declared but never requested");
                        continue;
                    };
                    for (key, modifiers) in table {
                        let mut items = Vec::new();
                        for (modifier, state) in modifiers {
                            if *state != CallState::Called
                                || materialized.contains(&(name.clone(), key.clone(), modifier.clone()))
                            {
                                continue;
                            }
                            let rendered = render_item(
                                template.as_ref(),
                                &name,
                                key,
                                modifier,
                                &namespace,
                                direction,
                            )?;
                            items.extend(rendered);
                        }
                        if !items.is_empty() {
                            chunks.push(Chunk::Rules {
                                condition: media_query(key),
                                items,
                            });
                        }
                    }
                }
            }
        }
        Ok(chunks)
    }

    fn resolve(
        &self,
        name: &str,
        args: &RequestArgs<'_>,
    ) -> Result<(CombinationKey, Modifier), EngineError> {
        let modifier = Modifier::parse(args.modifier, name)?;
        let from = match args.from {
            Some(from) => self.model.width(from, name)?,
            None => None,
        };
        let until = match args.until {
            Some(until) => self.model.width(until, name)?,
            None => None,
        };
        let misc = match args.misc {
            Some(misc) => Some(self.model.feature(misc, name)?),
            None => None,
        };
        let key = CombinationKey::resolve(&self.model, from, until, misc, name)?;
        Ok((key, modifier))
    }
}

fn render_item(
    template: &dyn Template,
    name: &str,
    key: &CombinationKey,
    modifier: &Modifier,
    namespace: &str,
    direction: Direction,
) -> Result<Vec<RuleItem>, EngineError> {
    let items = match template.render(modifier) {
        None => Vec::new(),
        Some(RuleContent::Declarations(declarations)) => {
            let selector = format!(".{}", class_name(name, modifier, key, namespace)?);
            StyleMap::parse(&declarations)
                .rules(&selector, direction)
                .into_iter()
                .map(|(selector, declarations)| RuleItem::Class {
                    selector,
                    declarations,
                })
                .collect()
        }
        Some(RuleContent::Css(css)) => vec![RuleItem::Css(css)],
    };
    Ok(items)
}
