use crate::error::{EngineError, LookupTable, ModelError};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A width value with its unit, e.g. `20em`. Zero may be unitless.
#[derive(Debug, Clone)]
pub struct Length {
    pub value: f64,
    pub unit: String,
}

impl Length {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        let split_idx = value
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit() && *ch != '.')
            .map(|(idx, _)| idx)
            .unwrap_or(value.len());
        let number = value[..split_idx].parse::<f64>().ok()?;
        let unit = value[split_idx..].trim();
        if unit.is_empty() && number != 0.0 {
            return None;
        }
        if !unit.chars().all(|ch| ch.is_ascii_alphabetic() || ch == '%') {
            return None;
        }
        Some(Self::new(number, unit))
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    /// This width minus 0.01, the upper bound that stops short of it.
    pub fn just_below(&self) -> Self {
        Self::new(self.value - 0.01, self.unit.clone())
    }
}

impl PartialEq for Length {
    fn eq(&self, other: &Self) -> bool {
        self.value.to_bits() == other.value.to_bits() && self.unit == other.unit
    }
}

impl Eq for Length {}

impl Hash for Length {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.to_bits().hash(state);
        self.unit.hash(state);
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value), self.unit)
    }
}

pub fn format_number(value: f64) -> String {
    let fixed = format!("{:.4}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        return "0".to_string();
    }
    trimmed.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidthBreakpoint {
    pub name: String,
    pub width: Length,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureBreakpoint {
    pub name: String,
    pub condition: String,
}

/// Ordered width and feature breakpoints for one compilation pass.
///
/// Widths are strictly ascending. A zero-width entry stands for "no lower
/// bound"; one named `default` is inserted when none is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointModel {
    lengths: Vec<WidthBreakpoint>,
    features: Vec<FeatureBreakpoint>,
}

impl BreakpointModel {
    pub fn new(
        lengths: Vec<WidthBreakpoint>,
        features: Vec<FeatureBreakpoint>,
    ) -> Result<Self, ModelError> {
        let mut seen = HashSet::new();
        let mut previous: Option<&WidthBreakpoint> = None;
        for breakpoint in &lengths {
            validate_name(&breakpoint.name, &mut seen)?;
            if let Some(prev) = previous {
                let ascending = prev.width.is_zero()
                    || (prev.width.unit == breakpoint.width.unit
                        && prev.width.value < breakpoint.width.value);
                if !ascending || breakpoint.width.is_zero() {
                    return Err(ModelError::NotAscending {
                        name: breakpoint.name.clone(),
                        previous: prev.name.clone(),
                    });
                }
            }
            previous = Some(breakpoint);
        }

        let mut seen = HashSet::new();
        for feature in &features {
            validate_name(&feature.name, &mut seen)?;
            if feature.condition.trim().is_empty() {
                return Err(ModelError::EmptyCondition {
                    name: feature.name.clone(),
                });
            }
        }

        let mut lengths = lengths;
        if !lengths.iter().any(|bp| bp.width.is_zero()) {
            if lengths.iter().any(|bp| bp.name == "default") {
                return Err(ModelError::DuplicateName {
                    name: "default".to_string(),
                });
            }
            lengths.insert(
                0,
                WidthBreakpoint {
                    name: "default".to_string(),
                    width: Length::new(0.0, ""),
                },
            );
        }

        Ok(Self { lengths, features })
    }

    /// All configured width breakpoints, the zero-width entry included.
    pub fn lengths(&self) -> &[WidthBreakpoint] {
        &self.lengths
    }

    pub fn features(&self) -> &[FeatureBreakpoint] {
        &self.features
    }

    /// Width breakpoints that take part in the combination matrix.
    pub fn ranged_lengths(&self) -> impl Iterator<Item = &WidthBreakpoint> {
        self.lengths.iter().filter(|bp| !bp.width.is_zero())
    }

    /// Position of a width breakpoint among the ranged ones.
    pub fn range_index(&self, name: &str) -> Option<usize> {
        self.ranged_lengths().position(|bp| bp.name == name)
    }

    /// Resolves a width breakpoint by name. `Ok(None)` means the zero-width
    /// entry, i.e. no bound at all.
    pub fn width(&self, name: &str, entity: &str) -> Result<Option<&WidthBreakpoint>, EngineError> {
        let breakpoint = self
            .lengths
            .iter()
            .find(|bp| bp.name == name)
            .ok_or_else(|| EngineError::Configuration {
                name: name.to_string(),
                table: LookupTable::Lengths,
                entity: entity.to_string(),
            })?;
        if breakpoint.width.is_zero() {
            return Ok(None);
        }
        Ok(Some(breakpoint))
    }

    pub fn feature(&self, name: &str, entity: &str) -> Result<&FeatureBreakpoint, EngineError> {
        self.features
            .iter()
            .find(|bp| bp.name == name)
            .ok_or_else(|| EngineError::Configuration {
                name: name.to_string(),
                table: LookupTable::Features,
                entity: entity.to_string(),
            })
    }
}

impl Default for BreakpointModel {
    fn default() -> Self {
        let width = |name: &str, value: f64, unit: &str| WidthBreakpoint {
            name: name.to_string(),
            width: Length::new(value, unit),
        };
        let feature = |name: &str, condition: &str| FeatureBreakpoint {
            name: name.to_string(),
            condition: condition.to_string(),
        };
        Self {
            lengths: vec![
                width("default", 0.0, ""),
                width("s", 20.0, "em"),
                width("m", 45.0, "em"),
                width("l", 64.0, "em"),
            ],
            features: vec![
                feature("landscape", "(orientation: landscape)"),
                feature("portrait", "(orientation: portrait)"),
            ],
        }
    }
}

fn validate_name<'a>(name: &'a str, seen: &mut HashSet<&'a str>) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::EmptyName);
    }
    if !seen.insert(name) {
        return Err(ModelError::DuplicateName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BreakpointModel, FeatureBreakpoint, Length, WidthBreakpoint, format_number};
    use crate::error::{EngineError, LookupTable, ModelError};

    fn width(name: &str, raw: &str) -> WidthBreakpoint {
        WidthBreakpoint {
            name: name.to_string(),
            width: Length::parse(raw).expect("length should parse"),
        }
    }

    #[test]
    fn parses_lengths() {
        assert_eq!(Length::parse("20em"), Some(Length::new(20.0, "em")));
        assert_eq!(Length::parse(" 320px "), Some(Length::new(320.0, "px")));
        assert_eq!(Length::parse("0"), Some(Length::new(0.0, "")));
        assert_eq!(Length::parse("12"), None);
        assert_eq!(Length::parse("em"), None);
        assert_eq!(Length::parse("1e3px"), None);
    }

    #[test]
    fn length_just_below_uses_hundredths() {
        assert_eq!(Length::new(20.0, "em").just_below().to_string(), "19.99em");
        assert_eq!(Length::new(45.0, "em").just_below().to_string(), "44.99em");
        assert_eq!(Length::new(1024.0, "px").just_below().to_string(), "1023.99px");
        assert_eq!(Length::new(44.5, "em").just_below().to_string(), "44.49em");
    }

    #[test]
    fn length_just_below_keeps_finer_precision() {
        assert_eq!(Length::new(20.005, "em").just_below().to_string(), "19.995em");
        assert_eq!(Length::new(44.999, "em").just_below().to_string(), "44.989em");
        assert_eq!(Length::new(0.5, "rem").just_below().to_string(), "0.49rem");
    }

    #[test]
    fn formats_numbers_without_trailing_zeros() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(19.99), "19.99");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn inserts_implicit_default_breakpoint() {
        let model = BreakpointModel::new(vec![width("s", "20em"), width("m", "45em")], vec![])
            .expect("model should build");
        assert_eq!(model.lengths()[0].name, "default");
        assert!(model.lengths()[0].width.is_zero());
        assert_eq!(model.ranged_lengths().count(), 2);
        assert_eq!(model.range_index("m"), Some(1));
    }

    #[test]
    fn rejects_duplicate_and_unordered_breakpoints() {
        let duplicate = BreakpointModel::new(vec![width("s", "20em"), width("s", "45em")], vec![]);
        assert_eq!(
            duplicate,
            Err(ModelError::DuplicateName {
                name: "s".to_string()
            })
        );

        let unordered = BreakpointModel::new(vec![width("m", "45em"), width("s", "20em")], vec![]);
        assert_eq!(
            unordered,
            Err(ModelError::NotAscending {
                name: "s".to_string(),
                previous: "m".to_string()
            })
        );

        let empty_condition = BreakpointModel::new(
            vec![],
            vec![FeatureBreakpoint {
                name: "print".to_string(),
                condition: " ".to_string(),
            }],
        );
        assert_eq!(
            empty_condition,
            Err(ModelError::EmptyCondition {
                name: "print".to_string()
            })
        );
    }

    #[test]
    fn zero_width_lookup_means_no_bound() {
        let model = BreakpointModel::default();
        assert_eq!(model.width("default", "foo"), Ok(None));
        assert_eq!(
            model.width("s", "foo").map(|bp| bp.map(|bp| bp.width.to_string())),
            Ok(Some("20em".to_string()))
        );
    }

    #[test]
    fn lookup_misses_name_the_table_and_entity() {
        let model = BreakpointModel::default();
        let err = model.width("bogous", "test-name").expect_err("lookup should fail");
        assert_eq!(
            err,
            EngineError::Configuration {
                name: "bogous".to_string(),
                table: LookupTable::Lengths,
                entity: "test-name".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "bogous is not defined in the lengths breakpoints map (from test-name)"
        );

        let err = model.feature("bogous", "test-name").expect_err("lookup should fail");
        assert_eq!(
            err.to_string(),
            "bogous is not defined in the misc features breakpoints map (from test-name)"
        );
    }
}
