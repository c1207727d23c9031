use std::fmt;
use thiserror::Error;

/// Breakpoint table a failed lookup searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    Lengths,
    Features,
    Combinations,
}

impl fmt::Display for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lengths => "lengths breakpoints map",
            Self::Features => "misc features breakpoints map",
            Self::Combinations => "combinations table",
        })
    }
}

/// Errors raised at a request or declaration site. All of them abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{name} is not defined in the {table} (from {entity})")]
    Configuration {
        name: String,
        table: LookupTable,
        entity: String,
    },
    #[error("a class modifier cannot be called `no-modifier` (from {entity})")]
    InvalidModifier { entity: String },
    #[error("`from: {from}` must come before `until: {until}` (from {entity})")]
    InvalidCombination {
        from: String,
        until: String,
        entity: String,
    },
    #[error("{name} is already declared")]
    DuplicateDeclaration { name: String },
}

/// Errors raised while building a breakpoint model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("breakpoint names cannot be empty")]
    EmptyName,
    #[error("breakpoint {name} is declared more than once")]
    DuplicateName { name: String },
    #[error("breakpoint {name} has an invalid width: {raw}")]
    InvalidLength { name: String, raw: String },
    #[error("breakpoint {name} must be wider than {previous}")]
    NotAscending { name: String, previous: String },
    #[error("feature breakpoint {name} has an empty condition")]
    EmptyCondition { name: String },
}

/// Errors raised while reading or compiling a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {source}")]
    Engine {
        line: usize,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Render(#[from] EngineError),
}
