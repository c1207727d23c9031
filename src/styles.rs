//! Declaration bodies as ordered style maps.
//!
//! A body is a `prop: value` list that may contain nested blocks, e.g.
//! `float: left; > .nested { border-left: 1rem solid #ccc }`. Nested
//! selectors are appended to the parent selector, or substituted for `&`.

use crate::direction::{Direction, mirror_declaration, split_declaration, split_top_level};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleEntry {
    Declaration { property: String, value: String },
    Nested { selector: String, styles: StyleMap },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: Vec<StyleEntry>,
}

impl StyleMap {
    pub fn parse(body: &str) -> Self {
        let mut entries = Vec::new();
        let mut start = 0usize;
        let mut idx = 0usize;
        let mut quote: Option<char> = None;
        let mut paren_depth = 0usize;

        while idx < body.len() {
            let Some(ch) = body[idx..].chars().next() else {
                break;
            };
            if let Some(open) = quote {
                if ch == '\\' {
                    idx += ch.len_utf8();
                    if let Some(next) = body[idx..].chars().next() {
                        idx += next.len_utf8();
                    }
                    continue;
                }
                if ch == open {
                    quote = None;
                }
                idx += ch.len_utf8();
                continue;
            }
            match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => paren_depth += 1,
                ')' => paren_depth = paren_depth.saturating_sub(1),
                ';' if paren_depth == 0 => {
                    push_declaration(&mut entries, &body[start..idx]);
                    start = idx + 1;
                }
                '{' if paren_depth == 0 => {
                    let selector = body[start..idx].trim().to_string();
                    let close = find_block_end(body, idx).unwrap_or(body.len());
                    let inner = &body[idx + 1..close.min(body.len())];
                    if selector.is_empty() {
                        tracing::debug!("nested block without a selector dropped");
                    } else {
                        entries.push(StyleEntry::Nested {
                            selector,
                            styles: Self::parse(inner),
                        });
                    }
                    idx = (close + 1).min(body.len());
                    start = idx;
                    continue;
                }
                _ => {}
            }
            idx += ch.len_utf8();
        }
        push_declaration(&mut entries, &body[start.min(body.len())..]);

        Self { entries }
    }

    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    /// Flattens the map into `(selector, declarations)` rules under
    /// `selector`, mirrored for `direction`. The parent rule comes first and
    /// is left out when it has no declarations of its own.
    pub fn rules(&self, selector: &str, direction: Direction) -> Vec<(String, String)> {
        let mut rules = Vec::new();
        self.collect_rules(selector, direction, &mut rules);
        rules
    }

    fn collect_rules(&self, selector: &str, direction: Direction, rules: &mut Vec<(String, String)>) {
        let declarations = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                StyleEntry::Declaration { property, value } => {
                    let (property, value) = mirror_declaration(property, value, direction);
                    Some(format!("{}: {}", property, value))
                }
                StyleEntry::Nested { .. } => None,
            })
            .collect::<Vec<_>>();
        if !declarations.is_empty() {
            rules.push((selector.to_string(), declarations.join("; ")));
        }

        for entry in &self.entries {
            if let StyleEntry::Nested {
                selector: nested,
                styles,
            } = entry
            {
                styles.collect_rules(&nest_selector(selector, nested), direction, rules);
            }
        }
    }
}

fn push_declaration(entries: &mut Vec<StyleEntry>, raw: &str) {
    if raw.trim().is_empty() {
        return;
    }
    match split_declaration(raw) {
        Some((property, value)) if !value.trim().is_empty() => entries.push(StyleEntry::Declaration {
            property: property.to_string(),
            value: value.trim().to_string(),
        }),
        _ => tracing::debug!(declaration = raw.trim(), "malformed declaration dropped"),
    }
}

fn nest_selector(parent: &str, nested: &str) -> String {
    let parents = split_top_level(parent, ',');
    split_top_level(nested, ',')
        .into_iter()
        .flat_map(|part| {
            let part = part.trim();
            parents.iter().map(move |parent| {
                let parent = parent.trim();
                if part.contains('&') {
                    part.replace('&', parent)
                } else {
                    format!("{} {}", parent, part)
                }
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn find_block_end(body: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (rel_idx, ch) in body[open_idx..].char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open_idx + rel_idx);
                }
            }
            _ => {}
        }
    }
    None
}
