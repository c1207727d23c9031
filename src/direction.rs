//! Left/right mirroring of declarations for right-to-left output.
//!
//! Stateless value rewriting: property names containing `left`/`right` are
//! swapped, `left`/`right` keywords are swapped, four-value box shorthands
//! swap their horizontal sides, and horizontal translations change sign.

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        })
    }
}

const BOX_SHORTHANDS: &[&str] = &[
    "margin",
    "padding",
    "border-width",
    "border-style",
    "border-color",
    "inset",
    "scroll-margin",
    "scroll-padding",
];

const KEYWORD_PROPERTIES: &[&str] = &["float", "clear", "text-align", "caption-side"];

pub fn mirror_property(property: &str) -> String {
    swap_words(property, '-')
}

/// Rewrites one declaration for `direction`. Left-to-right is the identity.
pub fn mirror_declaration(property: &str, value: &str, direction: Direction) -> (String, String) {
    if direction == Direction::Ltr {
        return (property.to_string(), value.to_string());
    }
    let property = property.trim();
    let lower = property.to_ascii_lowercase();
    let mirrored_property = mirror_property(property);

    let mirrored_value = if BOX_SHORTHANDS.contains(&lower.as_str()) {
        swap_box_sides(value)
    } else if lower == "border-radius" {
        swap_radius_corners(value)
    } else if KEYWORD_PROPERTIES.contains(&lower.as_str()) {
        swap_words(value, ' ')
    } else if lower == "transform" || lower == "translate" {
        negate_horizontal_translation(value, &lower)
    } else {
        value.to_string()
    };

    (mirrored_property, mirrored_value)
}

pub fn split_declaration(declaration: &str) -> Option<(&str, &str)> {
    let (property, value) = declaration.split_once(':')?;
    if property.trim().is_empty() {
        return None;
    }
    Some((property.trim(), value))
}

/// Splits on `separator` outside of parentheses and quotes.
pub fn split_top_level(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (idx, ch) in value.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if ch == separator && depth == 0 => {
                parts.push(&value[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn swap_words(input: &str, separator: char) -> String {
    input
        .split(separator)
        .map(|word| match word {
            "left" => "right",
            "right" => "left",
            "ltr" => "rtl",
            "rtl" => "ltr",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn value_tokens(value: &str) -> (Vec<&str>, &str) {
    let (body, important) = match value.trim().strip_suffix("!important") {
        Some(body) => (body.trim_end(), " !important"),
        None => (value.trim(), ""),
    };
    let tokens = split_top_level(body, ' ')
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect();
    (tokens, important)
}

fn swap_box_sides(value: &str) -> String {
    let (tokens, important) = value_tokens(value);
    if tokens.len() != 4 {
        return value.to_string();
    }
    format!(
        "{} {} {} {}{}",
        tokens[0], tokens[3], tokens[2], tokens[1], important
    )
}

fn swap_radius_corners(value: &str) -> String {
    if value.contains('/') {
        return value.to_string();
    }
    let (tokens, important) = value_tokens(value);
    match tokens.len() {
        2 => format!("{} {}{}", tokens[1], tokens[0], important),
        3 => format!("{} {} {} {}{}", tokens[1], tokens[0], tokens[1], tokens[2], important),
        4 => format!(
            "{} {} {} {}{}",
            tokens[1], tokens[0], tokens[3], tokens[2], important
        ),
        _ => value.to_string(),
    }
}

fn negate_horizontal_translation(value: &str, property: &str) -> String {
    if property == "translate" {
        let (tokens, important) = value_tokens(value);
        let Some(first) = tokens.first() else {
            return value.to_string();
        };
        let mut out = vec![negate_length(first)];
        out.extend(tokens.iter().skip(1).map(|token| token.to_string()));
        return format!("{}{}", out.join(" "), important);
    }

    let mut out = String::with_capacity(value.len() + 2);
    let mut rest = value;
    while let Some(idx) = find_translate_call(rest) {
        let (name_end, is_pair) = if rest[idx..].starts_with("translateX(") {
            (idx + "translateX(".len(), false)
        } else {
            (idx + "translate(".len(), true)
        };
        let Some(close) = find_matching_paren(rest, name_end - 1) else {
            break;
        };
        out.push_str(&rest[..name_end]);
        let args = &rest[name_end..close];
        if is_pair {
            let mut parts = split_top_level(args, ',');
            let first = negate_length(parts.remove(0));
            out.push_str(&first);
            for part in parts {
                out.push(',');
                out.push_str(part);
            }
        } else {
            out.push_str(&negate_length(args));
        }
        out.push(')');
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

fn find_translate_call(value: &str) -> Option<usize> {
    let x = value.find("translateX(");
    let pair = value.find("translate(");
    match (x, pair) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn find_matching_paren(value: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (rel_idx, ch) in value[open_idx..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
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

fn negate_length(raw: &str) -> String {
    let leading = &raw[..raw.len() - raw.trim_start().len()];
    let token = raw.trim();
    let negated = if let Some(positive) = token.strip_prefix('-') {
        positive.to_string()
    } else if token.strip_prefix('+').is_some() {
        format!("-{}", &token[1..])
    } else if token.chars().all(|ch| ch == '0' || ch == '.') {
        token.to_string()
    } else if token.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.') {
        format!("-{}", token)
    } else {
        format!("calc(-1 * {})", token)
    };
    format!("{}{}", leading, negated)
}
