use crate::breakpoints::Length;
use crate::combination::CombinationKey;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    MinWidth(Length),
    MaxWidth(Length),
    Feature(String),
}

impl Clause {
    fn render(&self, minify: bool) -> String {
        let sep = if minify { ":" } else { ": " };
        match self {
            Self::MinWidth(width) => format!("(min-width{}{})", sep, width),
            Self::MaxWidth(width) => format!("(max-width{}{})", sep, width),
            Self::Feature(condition) => condition.trim().to_string(),
        }
    }
}

/// Condition a generated rule is nested in, clauses joined with `and`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub clauses: Vec<Clause>,
}

impl MediaQuery {
    pub fn render(&self, minify: bool) -> String {
        self.clauses
            .iter()
            .map(|clause| clause.render(minify))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Wrapping condition for a combination; `None` for the unconditioned key.
///
/// `until` bounds stop 0.01 below the breakpoint's own width, so that
/// `until-s` and `from-s` never overlap.
pub fn media_query(key: &CombinationKey) -> Option<MediaQuery> {
    let mut clauses = Vec::with_capacity(3);
    if let Some(from) = &key.from {
        clauses.push(Clause::MinWidth(from.width.clone()));
    }
    if let Some(until) = &key.until {
        clauses.push(Clause::MaxWidth(until.width.just_below()));
    }
    if let Some(misc) = &key.misc {
        clauses.push(Clause::Feature(misc.condition.clone()));
    }
    if clauses.is_empty() {
        return None;
    }
    Some(MediaQuery { clauses })
}
