use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::SelectorError;
use crate::Member;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A parsed label selector.
///
/// The syntax follows Kubernetes label selectors, a comma separated list of
/// requirements which must all hold:
///
/// - `key=value`, `key==value` and `key!=value`
/// - `key in (a, b)` and `key notin (a, b)`, an empty member stands for `""`
/// - `key>N` and `key<N` where `N` is an integer
/// - `key` and `!key` for label existence
///
/// An empty selector matches every member.
pub struct Selector {
    requirements: Vec<Requirement>,
}

/// Why a selector failed to parse.
type Reason = String;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    GreaterThan(String, i64),
    LessThan(String, i64),
    Exists(String),
    DoesNotExist(String),
}

impl Selector {
    /// Parses a selector expression.
    pub fn parse(expr: &str) -> Result<Self, SelectorError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::everything());
        }

        let requirements = split_requirements(expr)
            .and_then(|parts| {
                parts
                    .into_iter()
                    .map(parse_requirement)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|reason| SelectorError {
                selector: expr.to_string(),
                reason,
            })?;

        Ok(Self { requirements })
    }

    /// A selector which matches every member.
    pub fn everything() -> Self {
        Self::default()
    }

    #[inline]
    /// Returns if the selector has no requirements.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Returns if the member's labels satisfy every requirement.
    pub fn matches(&self, member: &Member) -> bool {
        self.matches_labels(&member.labels)
    }

    /// Returns if the given labels satisfy every requirement.
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|req| req.matches(labels))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, req) in self.requirements.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{req}")?;
        }
        Ok(())
    }
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
            Requirement::NotEquals(key, value) => labels.get(key) != Some(value),
            Requirement::In(key, values) => {
                labels.get(key).map(|v| values.contains(v)).unwrap_or(false)
            },
            Requirement::NotIn(key, values) => {
                labels.get(key).map(|v| !values.contains(v)).unwrap_or(true)
            },
            Requirement::GreaterThan(key, bound) => {
                integer_label(labels, key).map(|v| v > *bound).unwrap_or(false)
            },
            Requirement::LessThan(key, bound) => {
                integer_label(labels, key).map(|v| v < *bound).unwrap_or(false)
            },
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

/// A label only takes part in `>` and `<` when its value is an integer.
fn integer_label(labels: &BTreeMap<String, String>, key: &str) -> Option<i64> {
    labels.get(key).and_then(|v| v.parse().ok())
}

impl Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &BTreeSet<String>| {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        };

        match self {
            Requirement::Equals(key, value) => write!(f, "{key}={value}"),
            Requirement::NotEquals(key, value) => write!(f, "{key}!={value}"),
            Requirement::In(key, values) => write!(f, "{key} in ({})", join(values)),
            Requirement::NotIn(key, values) => {
                write!(f, "{key} notin ({})", join(values))
            },
            Requirement::GreaterThan(key, bound) => write!(f, "{key}>{bound}"),
            Requirement::LessThan(key, bound) => write!(f, "{key}<{bound}"),
            Requirement::Exists(key) => write!(f, "{key}"),
            Requirement::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

/// Splits the expression on the commas which are not inside a value set.
fn split_requirements(expr: &str) -> Result<Vec<&str>, Reason> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match c {
            '(' => {
                if depth > 0 {
                    return Err(Reason::from("nested parentheses"));
                }
                depth += 1;
            },
            ')' => {
                if depth == 0 {
                    return Err(Reason::from("unbalanced parentheses"));
                }
                depth -= 1;
            },
            ',' if depth == 0 => {
                parts.push(&expr[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }

    if depth != 0 {
        return Err(Reason::from("unbalanced parentheses"));
    }
    parts.push(&expr[start..]);

    Ok(parts)
}

fn parse_requirement(req: &str) -> Result<Requirement, Reason> {
    let req = req.trim();
    if req.is_empty() {
        return Err(Reason::from("empty requirement"));
    }

    if let Some(key) = req.strip_prefix('!') {
        if key.contains(|c: char| matches!(c, '=' | '(' | '>' | '<')) {
            return Err(Reason::from("unexpected operator after `!`"));
        }
        return Ok(Requirement::DoesNotExist(validate_key(key)?));
    }

    if let Some(open) = req.find('(') {
        return parse_set_requirement(req, open);
    }

    if let Some((key, value)) = req.split_once("!=") {
        return Ok(Requirement::NotEquals(
            validate_key(key)?,
            validate_value(value)?,
        ));
    }

    if let Some((key, value)) = req.split_once('>') {
        return Ok(Requirement::GreaterThan(
            validate_key(key)?,
            parse_integer(value)?,
        ));
    }

    if let Some((key, value)) = req.split_once('<') {
        return Ok(Requirement::LessThan(
            validate_key(key)?,
            parse_integer(value)?,
        ));
    }

    if let Some((key, value)) = req.split_once("==").or_else(|| req.split_once('=')) {
        return Ok(Requirement::Equals(
            validate_key(key)?,
            validate_value(value)?,
        ));
    }

    Ok(Requirement::Exists(validate_key(req)?))
}

fn parse_set_requirement(req: &str, open: usize) -> Result<Requirement, Reason> {
    let inner = req[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| Reason::from("expected `)` at the end of a value set"))?;

    let mut head = req[..open].split_whitespace();
    let (key, op) = match (head.next(), head.next(), head.next()) {
        (Some(key), Some(op), None) => (key, op),
        _ => {
            return Err(Reason::from(
                "expected `<key> in (...)` or `<key> notin (...)`",
            ))
        },
    };
    let key = validate_key(key)?;

    let values = inner
        .split(',')
        .map(validate_value)
        .collect::<Result<BTreeSet<_>, _>>()?;

    match op {
        "in" => Ok(Requirement::In(key, values)),
        "notin" => Ok(Requirement::NotIn(key, values)),
        other => Err(format!("unknown set operator `{other}`")),
    }
}

fn validate_key(key: &str) -> Result<String, Reason> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Reason::from("empty label key"));
    }

    let valid = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if !valid {
        return Err(format!("invalid label key `{key}`"));
    }

    Ok(key.to_string())
}

fn parse_integer(value: &str) -> Result<i64, Reason> {
    let value = value.trim();
    value
        .parse()
        .map_err(|_| format!("expected an integer value, got `{value}`"))
}

fn validate_value(value: &str) -> Result<String, Reason> {
    let value = value.trim();
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(format!("invalid label value `{value}`"));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = Selector::parse("").expect("Parse selector.");
        assert!(selector.is_empty());
        assert!(selector.matches_labels(&labels(&[])));
        assert!(selector.matches_labels(&labels(&[("role", "edge")])));

        let selector = Selector::parse("   ").expect("Parse selector.");
        assert!(selector.is_empty());
    }

    #[test]
    fn test_equality_requirements() {
        let selector = Selector::parse("role=edge").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("role", "edge")])));
        assert!(!selector.matches_labels(&labels(&[("role", "core")])));
        assert!(!selector.matches_labels(&labels(&[])));

        let selector = Selector::parse("role==edge").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("role", "edge")])));

        let selector = Selector::parse("role!=edge").expect("Parse selector.");
        assert!(!selector.matches_labels(&labels(&[("role", "edge")])));
        assert!(selector.matches_labels(&labels(&[("role", "core")])));
        assert!(
            selector.matches_labels(&labels(&[])),
            "A missing label satisfies `!=`."
        );
    }

    #[test]
    fn test_set_requirements() {
        let selector =
            Selector::parse("zone in (eu-1, eu-2),tier notin (db)").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("zone", "eu-1")])));
        assert!(selector.matches_labels(&labels(&[("zone", "eu-2"), ("tier", "web")])));
        assert!(!selector.matches_labels(&labels(&[("zone", "eu-2"), ("tier", "db")])));
        assert!(!selector.matches_labels(&labels(&[("zone", "us-1")])));
        assert!(!selector.matches_labels(&labels(&[])));
    }

    #[test]
    fn test_empty_set_members() {
        let selector = Selector::parse("zone in ()").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("zone", "")])));
        assert!(!selector.matches_labels(&labels(&[("zone", "eu-1")])));
        assert!(!selector.matches_labels(&labels(&[])));

        let selector = Selector::parse("zone in (eu-1,)").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("zone", "eu-1")])));
        assert!(selector.matches_labels(&labels(&[("zone", "")])));
        assert!(!selector.matches_labels(&labels(&[("zone", "eu-2")])));

        let selector = Selector::parse("zone notin (, eu-1)").expect("Parse selector.");
        assert!(!selector.matches_labels(&labels(&[("zone", "")])));
        assert!(selector.matches_labels(&labels(&[("zone", "eu-2")])));
    }

    #[test]
    fn test_integer_requirements() {
        let selector = Selector::parse("generation>3, weight < 10").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("generation", "4"), ("weight", "9")])));
        assert!(!selector.matches_labels(&labels(&[("generation", "3"), ("weight", "9")])));
        assert!(!selector.matches_labels(&labels(&[("generation", "4"), ("weight", "10")])));

        let selector = Selector::parse("generation>-1").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("generation", "0")])));
        assert!(
            !selector.matches_labels(&labels(&[])),
            "A missing label never satisfies `>`."
        );
        assert!(
            !selector.matches_labels(&labels(&[("generation", "v2")])),
            "A non-integer label never satisfies `>`."
        );

        let selector = Selector::parse("weight<10").expect("Parse selector.");
        assert!(!selector.matches_labels(&labels(&[])));
        assert!(!selector.matches_labels(&labels(&[("weight", "")])));
    }

    #[test]
    fn test_existence_requirements() {
        let selector = Selector::parse("public, !draining").expect("Parse selector.");
        assert!(selector.matches_labels(&labels(&[("public", "")])));
        assert!(!selector.matches_labels(&labels(&[("public", ""), ("draining", "1")])));
        assert!(!selector.matches_labels(&labels(&[])));
    }

    #[test]
    fn test_display_round_trip() {
        let selector =
            Selector::parse("a=b, c!=d, e in (g,f), !h, i, j > 2, k<-5, l in (m,)")
                .expect("Parse selector.");
        assert_eq!(
            selector.to_string(),
            "a=b,c!=d,e in (f,g),!h,i,j>2,k<-5,l in (,m)"
        );
        assert_eq!(Selector::parse(&selector.to_string()).unwrap(), selector);
    }

    #[test]
    fn test_malformed_selectors() {
        for expr in [
            "role=edge,",
            ",",
            "role in (a, b",
            "role in a, b)",
            "role within (a)",
            "in (a)",
            "=edge",
            "role=ed ge",
            "ro le",
            "!role=edge",
            "role in ((a))",
            "replicas>a",
            "replicas<",
            "replicas>1.5",
            ">3",
            "!replicas>3",
        ] {
            let err = Selector::parse(expr).expect_err(expr);
            assert_eq!(err.selector, expr.trim());
        }
    }
}
