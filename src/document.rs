//! `.cssm` documents: plain CSS interleaved with declaration and request
//! directives.
//!
//! Everything that is not a known directive is kept verbatim and becomes a
//! raw slot. Directives inside comments and strings are ignored.

use crate::combination::{Modifier, find_by_slug};
use crate::direction::split_top_level;
use crate::emission::{CombinationPermissions, Compilation, RequestArgs, Settings};
use crate::error::DocumentError;
use crate::generator::{GenerationResult, GeneratorConfig, generate};
use crate::template::{CssTemplate, ObjectTemplate, UtilTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based line the statement starts on.
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Raw(String),
    DefineObject {
        name: String,
        variants: Vec<(Modifier, String)>,
    },
    Object {
        name: String,
        args: CallArgs,
    },
    ObjectAll {
        name: String,
    },
    ObjectOnly {
        name: String,
        slugs: Vec<String>,
    },
    DefineUtil {
        name: String,
        default: Option<String>,
        body: String,
    },
    Util {
        name: String,
        args: CallArgs,
    },
    DefineBlock {
        name: String,
        body: String,
    },
    Block {
        name: String,
    },
    Component {
        name: String,
        body: String,
    },
    Mute,
    Unmute,
}

/// Named arguments of `@object` and `@util`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub from: Option<String>,
    pub until: Option<String>,
    pub when: Option<String>,
    pub modifier: Option<String>,
}

impl CallArgs {
    pub fn as_request(&self) -> RequestArgs<'_> {
        RequestArgs {
            from: self.from.as_deref(),
            until: self.until.as_deref(),
            misc: self.when.as_deref(),
            modifier: self.modifier.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    DefineObject,
    Object,
    ObjectAll,
    ObjectOnly,
    DefineUtil,
    Util,
    DefineBlock,
    Block,
    Component,
    Mute,
    Unmute,
}

impl Keyword {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "define-object" => Self::DefineObject,
            "object" => Self::Object,
            "object-all" => Self::ObjectAll,
            "object-only" => Self::ObjectOnly,
            "define-util" => Self::DefineUtil,
            "util" => Self::Util,
            "define-block" => Self::DefineBlock,
            "block" => Self::Block,
            "component" => Self::Component,
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::DefineObject => "@define-object",
            Self::Object => "@object",
            Self::ObjectAll => "@object-all",
            Self::ObjectOnly => "@object-only",
            Self::DefineUtil => "@define-util",
            Self::Util => "@util",
            Self::DefineBlock => "@define-block",
            Self::Block => "@block",
            Self::Component => "@component",
            Self::Mute => "@mute",
            Self::Unmute => "@unmute",
        }
    }

    fn takes_body(self) -> bool {
        matches!(
            self,
            Self::DefineObject | Self::DefineUtil | Self::DefineBlock | Self::Component
        )
    }
}

pub fn parse(source: &str) -> Result<Vec<Statement>, DocumentError> {
    let mut statements = Vec::new();
    let mut raw_start = 0usize;
    let mut cursor = 0usize;

    while let Some(at) = find_next_at_rule(source, cursor) {
        let (word, after) = read_identifier(source, at + 1);
        let Some(keyword) = Keyword::parse(word) else {
            cursor = after;
            continue;
        };

        push_raw(&mut statements, source, raw_start, at);
        let line = line_at(source, at);
        let (kind, end) = parse_directive(source, keyword, after, line)?;
        statements.push(Statement { line, kind });
        cursor = end;
        raw_start = end;
    }
    push_raw(&mut statements, source, raw_start, source.len());

    Ok(statements)
}

/// Feeds parsed statements into `compilation`, in order.
pub fn compile(statements: &[Statement], compilation: &mut Compilation) -> Result<(), DocumentError> {
    for statement in statements {
        let line = statement.line;
        let engine = |source| DocumentError::Engine { line, source };
        match &statement.kind {
            StatementKind::Raw(text) => compilation.raw(text),
            StatementKind::DefineObject { name, variants } => {
                let template = variants
                    .iter()
                    .fold(ObjectTemplate::new(), |template, (modifier, declarations)| {
                        template.variant(modifier.clone(), declarations.as_str())
                    });
                compilation.declare(name, template).map_err(engine)?;
            }
            StatementKind::DefineUtil {
                name,
                default,
                body,
            } => {
                let template = UtilTemplate::new(body.as_str(), default.clone());
                compilation.declare(name, template).map_err(engine)?;
            }
            StatementKind::DefineBlock { name, body } => {
                compilation
                    .declare(name, CssTemplate::new(body.as_str()))
                    .map_err(engine)?;
            }
            StatementKind::Object { name, args } | StatementKind::Util { name, args } => {
                compilation
                    .request(name, &args.as_request())
                    .map_err(engine)?;
            }
            StatementKind::ObjectAll { name } => {
                compilation
                    .request_explicit(name, &CombinationPermissions::all())
                    .map_err(engine)?;
            }
            StatementKind::ObjectOnly { name, slugs } => {
                let mut permissions = CombinationPermissions::none();
                for slug in slugs {
                    let key = find_by_slug(compilation.combinations(), slug, name)
                        .map_err(engine)?
                        .clone();
                    permissions = permissions.allow(key);
                }
                compilation
                    .request_explicit(name, &permissions)
                    .map_err(engine)?;
            }
            StatementKind::Block { name } => {
                compilation.block(name).map_err(engine)?;
            }
            StatementKind::Component { name, body } => {
                compilation.component(name, body).map_err(engine)?;
            }
            StatementKind::Mute => compilation.mute(),
            StatementKind::Unmute => compilation.unmute(),
        }
    }
    Ok(())
}

pub fn compile_source(source: &str, compilation: &mut Compilation) -> Result<(), DocumentError> {
    let statements = parse(source)?;
    compile(&statements, compilation)
}

/// Compiles a single document in its own pass.
pub fn render(
    source: &str,
    settings: Settings,
    config: &GeneratorConfig,
) -> Result<GenerationResult, DocumentError> {
    let mut compilation = Compilation::new(settings);
    compile_source(source, &mut compilation)?;
    let chunks = compilation.finish()?;
    Ok(generate(&chunks, config))
}

fn parse_directive(
    source: &str,
    keyword: Keyword,
    after: usize,
    line: usize,
) -> Result<(StatementKind, usize), DocumentError> {
    let mut pos = skip_whitespace(source, after);

    if matches!(keyword, Keyword::Mute | Keyword::Unmute) {
        let end = expect_semicolon(source, pos, keyword, line)?;
        let kind = if keyword == Keyword::Mute {
            StatementKind::Mute
        } else {
            StatementKind::Unmute
        };
        return Ok((kind, end));
    }

    let (name, next) = read_identifier(source, pos);
    if name.is_empty() {
        return Err(syntax(line, format!("expected a name after {}", keyword.as_str())));
    }
    let name = name.to_string();
    pos = skip_whitespace(source, next);

    let mut args = None;
    if source[pos..].starts_with('(') {
        let close = find_matching_paren(source, pos)
            .ok_or_else(|| syntax(line, format!("unclosed `(` in {} {}", keyword.as_str(), name)))?;
        args = Some(&source[pos + 1..close]);
        pos = skip_whitespace(source, close + 1);
    }

    let (body, end) = if keyword.takes_body() {
        if !source[pos..].starts_with('{') {
            return Err(syntax(
                line,
                format!("expected `{{` after {} {}", keyword.as_str(), name),
            ));
        }
        let close = find_matching_brace(source, pos)
            .ok_or_else(|| syntax(line, format!("unclosed `{{` in {} {}", keyword.as_str(), name)))?;
        (Some(&source[pos + 1..close]), close + 1)
    } else {
        (None, expect_semicolon(source, pos, keyword, line)?)
    };
    let body = body.unwrap_or_default();

    let kind = match keyword {
        Keyword::DefineObject => {
            reject_args(args, keyword, &name, line)?;
            StatementKind::DefineObject {
                variants: parse_object_body(body, &name, line)?,
                name,
            }
        }
        Keyword::Object => StatementKind::Object {
            args: parse_call_args(args.unwrap_or_default(), line)?,
            name,
        },
        Keyword::Util => StatementKind::Util {
            args: parse_call_args(args.unwrap_or_default(), line)?,
            name,
        },
        Keyword::ObjectAll => {
            reject_args(args, keyword, &name, line)?;
            StatementKind::ObjectAll { name }
        }
        Keyword::ObjectOnly => {
            let slugs: Vec<String> = split_top_level(args.unwrap_or_default(), ',')
                .into_iter()
                .map(|slug| unquote(slug.trim()).to_string())
                .filter(|slug| !slug.is_empty())
                .collect();
            if slugs.is_empty() {
                return Err(syntax(
                    line,
                    format!("@object-only {} needs at least one combination", name),
                ));
            }
            StatementKind::ObjectOnly { name, slugs }
        }
        Keyword::DefineUtil => StatementKind::DefineUtil {
            default: parse_util_default(args.unwrap_or_default(), line)?,
            body: body.trim().to_string(),
            name,
        },
        Keyword::DefineBlock => {
            reject_args(args, keyword, &name, line)?;
            StatementKind::DefineBlock {
                body: body.trim().to_string(),
                name,
            }
        }
        Keyword::Block => {
            reject_args(args, keyword, &name, line)?;
            StatementKind::Block { name }
        }
        Keyword::Component => {
            reject_args(args, keyword, &name, line)?;
            StatementKind::Component {
                body: body.trim().to_string(),
                name,
            }
        }
        Keyword::Mute => StatementKind::Mute,
        Keyword::Unmute => StatementKind::Unmute,
    };

    Ok((kind, end))
}

/// Reads `@classname { ... }` and `@classname(mod) { ... }` blocks.
fn parse_object_body(
    body: &str,
    name: &str,
    line: usize,
) -> Result<Vec<(Modifier, String)>, DocumentError> {
    let mut variants: Vec<(Modifier, String)> = Vec::new();
    let mut pos = skip_whitespace(body, 0);

    while pos < body.len() {
        let Some(rest) = body[pos..].strip_prefix("@classname") else {
            return Err(syntax(
                line,
                format!("only @classname blocks are allowed in @define-object {}", name),
            ));
        };
        pos = skip_whitespace(body, body.len() - rest.len());

        let mut modifier = Modifier::None;
        if body[pos..].starts_with('(') {
            let close = find_matching_paren(body, pos)
                .ok_or_else(|| syntax(line, format!("unclosed `(` in @define-object {}", name)))?;
            modifier = Modifier::parse(Some(unquote(body[pos + 1..close].trim())), name)
                .map_err(|source| DocumentError::Engine { line, source })?;
            pos = skip_whitespace(body, close + 1);
        }

        if !body[pos..].starts_with('{') {
            return Err(syntax(
                line,
                format!("expected `{{` after @classname in @define-object {}", name),
            ));
        }
        let close = find_matching_brace(body, pos)
            .ok_or_else(|| syntax(line, format!("unclosed `{{` in @define-object {}", name)))?;
        if variants.iter().any(|(existing, _)| *existing == modifier) {
            return Err(syntax(
                line,
                format!("@classname({}) is declared twice in {}", modifier, name),
            ));
        }
        variants.push((modifier, body[pos + 1..close].trim().to_string()));
        pos = skip_whitespace(body, close + 1);
    }

    Ok(variants)
}

fn parse_call_args(raw: &str, line: usize) -> Result<CallArgs, DocumentError> {
    let mut args = CallArgs::default();
    for (key, value) in key_values(raw, line)? {
        let slot = match key {
            "from" => &mut args.from,
            "until" => &mut args.until,
            "when" => &mut args.when,
            "modifier" => &mut args.modifier,
            other => return Err(syntax(line, format!("unknown argument `{}`", other))),
        };
        if slot.is_some() {
            return Err(syntax(line, format!("argument `{}` is given twice", key)));
        }
        *slot = Some(value.to_string());
    }
    Ok(args)
}

fn parse_util_default(raw: &str, line: usize) -> Result<Option<String>, DocumentError> {
    let mut default = None;
    for (key, value) in key_values(raw, line)? {
        if key != "default" {
            return Err(syntax(line, format!("unknown argument `{}`", key)));
        }
        default = Some(value.to_string());
    }
    Ok(default)
}

fn key_values(raw: &str, line: usize) -> Result<Vec<(&str, &str)>, DocumentError> {
    let mut pairs = Vec::new();
    for part in split_top_level(raw, ',') {
        if part.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once(':') else {
            return Err(syntax(
                line,
                format!("expected `key: value`, found `{}`", part.trim()),
            ));
        };
        pairs.push((key.trim(), unquote(value.trim())));
    }
    Ok(pairs)
}

fn reject_args(
    args: Option<&str>,
    keyword: Keyword,
    name: &str,
    line: usize,
) -> Result<(), DocumentError> {
    match args {
        Some(args) if !args.trim().is_empty() => Err(syntax(
            line,
            format!("{} {} takes no arguments", keyword.as_str(), name),
        )),
        _ => Ok(()),
    }
}

fn expect_semicolon(
    source: &str,
    pos: usize,
    keyword: Keyword,
    line: usize,
) -> Result<usize, DocumentError> {
    if source[pos..].starts_with(';') {
        return Ok(pos + 1);
    }
    Err(syntax(line, format!("expected `;` after {}", keyword.as_str())))
}

fn syntax(line: usize, message: String) -> DocumentError {
    DocumentError::Syntax { line, message }
}

fn push_raw(statements: &mut Vec<Statement>, source: &str, start: usize, end: usize) {
    let text = &source[start..end];
    if text.trim().is_empty() {
        return;
    }
    let offset = text.len() - text.trim_start().len();
    statements.push(Statement {
        line: line_at(source, start + offset),
        kind: StatementKind::Raw(text.trim().to_string()),
    });
}

fn line_at(source: &str, idx: usize) -> usize {
    source[..idx].matches('\n').count() + 1
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn skip_whitespace(source: &str, pos: usize) -> usize {
    let rest = &source[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

fn read_identifier(source: &str, pos: usize) -> (&str, usize) {
    let rest = &source[pos..];
    let len = rest
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '-' || ch == '_'))
        .unwrap_or(rest.len());
    (&rest[..len], pos + len)
}

/// Position of the next `@` outside comments and strings.
fn find_next_at_rule(source: &str, from: usize) -> Option<usize> {
    let mut in_comment = false;
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let mut chars = source[from..].char_indices().peekable();

    while let Some((rel_idx, ch)) = chars.next() {
        if in_comment {
            if ch == '*' && matches!(chars.peek(), Some((_, '/'))) {
                let _ = chars.next();
                in_comment = false;
            }
            continue;
        }
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                let _ = chars.next();
                in_comment = true;
            }
            '"' | '\'' => in_string = Some(ch),
            '@' => return Some(from + rel_idx),
            _ => {}
        }
    }

    None
}

fn find_matching_paren(source: &str, open_idx: usize) -> Option<usize> {
    find_matching(source, open_idx, '(', ')')
}

fn find_matching_brace(source: &str, open_idx: usize) -> Option<usize> {
    find_matching(source, open_idx, '{', '}')
}

fn find_matching(source: &str, open_idx: usize, open: char, close: char) -> Option<usize> {
    if !source[open_idx..].starts_with(open) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_comment = false;
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let mut chars = source[open_idx..].char_indices().peekable();

    while let Some((rel_idx, ch)) = chars.next() {
        if in_comment {
            if ch == '*' && matches!(chars.peek(), Some((_, '/'))) {
                let _ = chars.next();
                in_comment = false;
            }
            continue;
        }
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }

        if ch == '/' && matches!(chars.peek(), Some((_, '*'))) {
            let _ = chars.next();
            in_comment = true;
            continue;
        }
        if ch == '"' || ch == '\'' {
            in_string = Some(ch);
            continue;
        }
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(open_idx + rel_idx);
            }
        }
    }

    None
}
