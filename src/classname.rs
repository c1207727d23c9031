use crate::combination::{CombinationKey, Modifier, NO_MODIFIER};
use crate::error::EngineError;

const JOINER: &str = "--";

pub fn namespace_prefix(namespace: &str) -> String {
    let namespace = namespace.trim();
    if namespace.is_empty() {
        return String::new();
    }
    format!("{}-", namespace)
}

/// Builds the class name of one variant, e.g.
/// `jig-name--mod--from-s--until-l--when-landscape`.
pub fn class_name(
    base: &str,
    modifier: &Modifier,
    key: &CombinationKey,
    namespace: &str,
) -> Result<String, EngineError> {
    let mut name = escape_leading_digit(format!(
        "{}{}",
        namespace_prefix(namespace),
        escape_selector(base)
    ));

    if let Some(modifier) = modifier.name() {
        if modifier == NO_MODIFIER {
            return Err(EngineError::InvalidModifier {
                entity: base.to_string(),
            });
        }
        name.push_str(JOINER);
        name.push_str(&escape_selector(modifier));
    }
    if let Some(from) = &key.from {
        name.push_str(JOINER);
        name.push_str("from-");
        name.push_str(&escape_selector(&from.name));
    }
    if let Some(until) = &key.until {
        name.push_str(JOINER);
        name.push_str("until-");
        name.push_str(&escape_selector(&until.name));
    }
    if let Some(misc) = &key.misc {
        name.push_str(JOINER);
        name.push_str("when-");
        name.push_str(&escape_selector(&misc.name));
    }

    Ok(name)
}

/// Identifiers may not start with a digit, or a hyphen and a digit, so that
/// digit is written as a code point escape: `1col` becomes `\31 col`.
fn escape_leading_digit(name: String) -> String {
    let digit_at = if name.starts_with('-') { 1 } else { 0 };
    match name[digit_at..].chars().next() {
        Some(digit) if digit.is_ascii_digit() => format!(
            "{}\\{:x} {}",
            &name[..digit_at],
            digit as u32,
            &name[digit_at + 1..]
        ),
        _ => name,
    }
}

fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for ch in class.chars() {
        match ch {
            '\\' | ':' | '/' | '[' | ']' | '(' | ')' | '&' | '>' | '+' | '~' | ',' | '%' | '='
            | '!' | '*' | '@' | '#' | '\'' | '"' | '.' | '$' | '^' | '|' | '?' | '{' | '}'
            | ';' | '<' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' ' => escaped.push_str("\\ "),
            _ => escaped.push(ch),
        }
    }

    escaped
}
