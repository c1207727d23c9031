use crate::direction::{split_declaration, split_top_level};
use crate::media::MediaQuery;
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub minify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub css: CssOutput,
    pub rule_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssOutput(String);

impl CssOutput {
    pub fn new(css: String) -> Self {
        Self(css)
    }
}

impl Deref for CssOutput {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for CssOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<String> for CssOutput {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<CssOutput> for String {
    fn from(value: CssOutput) -> Self {
        value.0
    }
}

/// One unit of output, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Pass-through text from the document.
    Raw(String),
    /// Rendered variants sharing one wrapping condition.
    Rules {
        condition: Option<MediaQuery>,
        items: Vec<RuleItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleItem {
    Class {
        selector: String,
        declarations: String,
    },
    Css(String),
}

pub fn generate(chunks: &[Chunk], config: &GeneratorConfig) -> GenerationResult {
    let mut rule_count = 0;
    let mut parts = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        match chunk {
            Chunk::Raw(text) => {
                let text = if config.minify {
                    minify_css(text)
                } else {
                    text.trim().to_string()
                };
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Chunk::Rules { condition, items } => {
                if items.is_empty() {
                    continue;
                }
                rule_count += items
                    .iter()
                    .filter(|item| matches!(item, RuleItem::Class { .. }))
                    .count();
                parts.push(emit_rules(condition.as_ref(), items, config.minify));
            }
        }
    }

    let css = if config.minify {
        parts.join("")
    } else if parts.is_empty() {
        String::new()
    } else {
        format!("{}\n", parts.join("\n"))
    };

    GenerationResult {
        css: CssOutput::new(css),
        rule_count,
    }
}

pub fn emit_css(result: &GenerationResult) -> String {
    result.css.to_string()
}

fn emit_rules(condition: Option<&MediaQuery>, items: &[RuleItem], minify: bool) -> String {
    let indent = if condition.is_some() { "  " } else { "" };
    let body = items
        .iter()
        .map(|item| emit_item(item, indent, minify))
        .collect::<Vec<_>>()
        .join(if minify { "" } else { "\n" });

    match condition {
        None => body,
        Some(query) if minify => format!("@media {}{{{}}}", query.render(true), body),
        Some(query) => format!("@media {} {{\n{}\n}}", query.render(false), body),
    }
}

fn emit_item(item: &RuleItem, indent: &str, minify: bool) -> String {
    match item {
        RuleItem::Class {
            selector,
            declarations,
        } if minify => format!("{}{{{}}}", selector, minify_declarations(declarations)),
        RuleItem::Class {
            selector,
            declarations,
        } => {
            let mut rule = format!("{}{} {{\n", indent, selector);
            for declaration in normalized_declarations(declarations) {
                rule.push_str(&format!("{}  {};\n", indent, declaration));
            }
            rule.push_str(&format!("{}}}", indent));
            rule
        }
        RuleItem::Css(css) if minify => minify_css(css),
        RuleItem::Css(css) => css
            .trim()
            .lines()
            .map(|line| format!("{}{}", indent, line))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn normalized_declarations(declarations: &str) -> Vec<String> {
    split_top_level(declarations, ';')
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| match split_declaration(part) {
            Some((property, value)) => format!("{}: {}", property, value.trim()),
            None => part.trim().to_string(),
        })
        .collect()
}

fn minify_declarations(declarations: &str) -> String {
    normalized_declarations(declarations)
        .into_iter()
        .map(|declaration| match declaration.split_once(": ") {
            Some((property, value)) => format!("{}:{}", property, value),
            None => declaration,
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Collapses whitespace runs and drops whitespace around `{`, `}` and `;`.
/// Quoted strings and `/* */` comments are copied as written.
fn minify_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut pending_space = false;
    let mut quote: Option<char> = None;
    let mut chars = css.trim().chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        let tight = matches!(ch, '{' | '}' | ';');
        if pending_space && !tight && !out.is_empty() && !out.ends_with(['{', '}', ';']) {
            out.push(' ');
        }
        pending_space = false;
        if ch == '/' && chars.next_if_eq(&'*').is_some() {
            out.push_str("/*");
            let mut previous = None;
            for next in chars.by_ref() {
                out.push(next);
                if previous == Some('*') && next == '/' {
                    break;
                }
                previous = Some(next);
            }
            continue;
        }
        if matches!(ch, '"' | '\'') {
            quote = Some(ch);
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Chunk, GeneratorConfig, RuleItem, emit_css, generate, minify_css};
    use crate::breakpoints::BreakpointModel;
    use crate::combination::{enumerate, find_by_slug};
    use crate::media::media_query;

    fn class(selector: &str, declarations: &str) -> RuleItem {
        RuleItem::Class {
            selector: selector.to_string(),
            declarations: declarations.to_string(),
        }
    }

    fn sample_chunks() -> Vec<Chunk> {
        let keys = enumerate(&BreakpointModel::default());
        let from_s = find_by_slug(&keys, "from-s", "foo").expect("slug exists");
        vec![
            Chunk::Rules {
                condition: None,
                items: vec![class(".foo", "k: v")],
            },
            Chunk::Raw(".after { kk: vv; }".to_string()),
            Chunk::Rules {
                condition: media_query(from_s),
                items: vec![class(".foo--from-s", "k: v"), class(".foo--bar--from-s", "a:b; c : d;")],
            },
        ]
    }

    #[test]
    fn minified_output_has_no_insignificant_whitespace() {
        let result = generate(&sample_chunks(), &GeneratorConfig { minify: true });
        assert_eq!(
            emit_css(&result),
            ".foo{k:v}.after{kk: vv;}@media (min-width:20em){.foo--from-s{k:v}.foo--bar--from-s{a:b;c:d}}"
        );
        assert_eq!(result.rule_count, 3);
    }

    #[test]
    fn pretty_output_indents_media_blocks() {
        let result = generate(&sample_chunks(), &GeneratorConfig { minify: false });
        assert_eq!(
            result.css.to_string(),
            ".foo {\n  k: v;\n}\n\
             .after { kk: vv; }\n\
             @media (min-width: 20em) {\n  .foo--from-s {\n    k: v;\n  }\n  .foo--bar--from-s {\n    a: b;\n    c: d;\n  }\n}\n"
        );
    }

    #[test]
    fn empty_rule_chunks_are_skipped() {
        let chunks = vec![Chunk::Rules {
            condition: None,
            items: Vec::new(),
        }];
        let result = generate(&chunks, &GeneratorConfig::default());
        assert!(result.css.is_empty());
        assert_eq!(result.rule_count, 0);
    }

    #[test]
    fn minify_keeps_strings_and_descendant_spaces() {
        assert_eq!(minify_css("bar  {\n  k : v;\n}"), "bar{k : v;}");
        assert_eq!(minify_css(".a  .b { content: \"  x  \"; }"), ".a .b{content: \"  x  \";}");
    }

    #[test]
    fn minify_copies_comments_verbatim() {
        assert_eq!(
            minify_css("a {  b: c; }  /*  keep   this\n  */  d {}"),
            "a{b: c;}/*  keep   this\n  */ d{}"
        );
        assert_eq!(minify_css("/*/ x */a{}"), "/*/ x */a{}");
        assert_eq!(minify_css("a{content: \"/*  \"}"), "a{content: \"/*  \"}");
    }
}
