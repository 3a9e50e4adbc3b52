//! A small JSONPath dialect for targeted scalar replacement.
//!
//! Supported syntax:
//!
//! | expression            | selects                                   |
//! |-----------------------|-------------------------------------------|
//! | `$`                   | the root                                  |
//! | `.name`, `['name']`   | a map member                              |
//! | `[2]`, `[-1]`         | an array item (negative counts from end)  |
//! | `.*`, `[*]`           | every member or item                      |
//! | `..name`, `..*`       | recursive descent                         |
//! | `[?(@.f == 'v')]`     | members or items matching a filter        |
//!
//! Filters compare a (dotted) field of the candidate with a literal using
//! `==` or `!=`, or test for its presence with `[?(@.f)]`. An expression
//! without a leading `$` is taken relative to the root.

use thiserror::Error;

use crate::issue::PathSegment;
use crate::value::ConfigValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path expression '{expression}' at offset {offset}: {message}")]
pub struct PathQueryError {
    pub expression: String,
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Child(String),
    Index(i64),
    Wildcard,
    Descendant(String),
    DescendantWildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: Vec<String>,
    comparison: Option<(Comparison, ConfigValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    NotEqual,
}

impl Filter {
    fn accepts(&self, candidate: &ConfigValue) -> bool {
        let keys: Vec<&str> = self.field.iter().map(String::as_str).collect();
        let found = candidate.get_path(&keys);
        match (&self.comparison, found) {
            (None, found) => found.is_some(),
            (Some((Comparison::Equal, expected)), Some(actual)) => values_equal(actual, expected),
            (Some((Comparison::Equal, _)), None) => false,
            (Some((Comparison::NotEqual, expected)), Some(actual)) => {
                !values_equal(actual, expected)
            }
            (Some((Comparison::NotEqual, _)), None) => true,
        }
    }
}

fn values_equal(a: &ConfigValue, b: &ConfigValue) -> bool {
    match (a, b) {
        (ConfigValue::Integer(i), ConfigValue::Float(f))
        | (ConfigValue::Float(f), ConfigValue::Integer(i)) => (*i as f64) == *f,
        _ => a == b,
    }
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    selectors: Vec<Selector>,
}

impl PathQuery {
    pub fn parse(expression: &str) -> Result<Self, PathQueryError> {
        QueryParser::new(expression).parse()
    }

    /// Locations of every value the expression selects in `root`, in
    /// document order.
    ///
    /// ```
    /// use elsa_config::{ConfigValue, PathQuery};
    /// use serde_json::json;
    ///
    /// let root = ConfigValue::from(json!({"dacs": [{"id": "a"}, {"id": "b"}]}));
    /// let query = PathQuery::parse("$.dacs[?(@.id == 'b')].id").unwrap();
    /// let found = query.select(&root);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(root.pointer(&found[0]), Some(&ConfigValue::from("b")));
    /// ```
    pub fn select(&self, root: &ConfigValue) -> Vec<Vec<PathSegment>> {
        let mut current: Vec<(Vec<PathSegment>, &ConfigValue)> = vec![(Vec::new(), root)];
        for selector in &self.selectors {
            let mut next = Vec::new();
            for (location, node) in &current {
                apply(selector, location, *node, &mut next);
            }
            current = next;
        }
        current.into_iter().map(|(location, _)| location).collect()
    }
}

fn children<'a>(
    location: &[PathSegment],
    node: &'a ConfigValue,
) -> Vec<(Vec<PathSegment>, &'a ConfigValue)> {
    let extend = |segment: PathSegment| {
        let mut path = location.to_vec();
        path.push(segment);
        path
    };
    match node {
        ConfigValue::Map(map) => map
            .iter()
            .map(|(k, v)| (extend(PathSegment::Key(k.clone())), v))
            .collect(),
        ConfigValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (extend(PathSegment::Index(i)), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// The node itself followed by all of its descendants, pre-order.
fn subtree<'a>(
    location: &[PathSegment],
    node: &'a ConfigValue,
    out: &mut Vec<(Vec<PathSegment>, &'a ConfigValue)>,
) {
    out.push((location.to_vec(), node));
    for (child_location, child) in children(location, node) {
        subtree(&child_location, child, out);
    }
}

fn apply<'a>(
    selector: &Selector,
    location: &[PathSegment],
    node: &'a ConfigValue,
    out: &mut Vec<(Vec<PathSegment>, &'a ConfigValue)>,
) {
    match selector {
        Selector::Child(name) => {
            if let Some(child) = node.get(name) {
                let mut path = location.to_vec();
                path.push(PathSegment::Key(name.clone()));
                out.push((path, child));
            }
        }
        Selector::Index(index) => {
            if let ConfigValue::Array(items) = node {
                let resolved = if *index < 0 {
                    items.len() as i64 + index
                } else {
                    *index
                };
                if let Ok(i) = usize::try_from(resolved)
                    && let Some(child) = items.get(i)
                {
                    let mut path = location.to_vec();
                    path.push(PathSegment::Index(i));
                    out.push((path, child));
                }
            }
        }
        Selector::Wildcard => out.extend(children(location, node)),
        Selector::Descendant(name) => {
            let mut all = Vec::new();
            subtree(location, node, &mut all);
            for (descendant_location, descendant) in all {
                apply(
                    &Selector::Child(name.clone()),
                    &descendant_location,
                    descendant,
                    out,
                );
            }
        }
        Selector::DescendantWildcard => {
            let mut all = Vec::new();
            subtree(location, node, &mut all);
            out.extend(all.into_iter().skip(1));
        }
        Selector::Filter(filter) => out.extend(
            children(location, node)
                .into_iter()
                .filter(|(_, child)| filter.accepts(child)),
        ),
    }
}

struct QueryParser<'a> {
    expression: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> QueryParser<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            chars: expression.char_indices().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> PathQueryError {
        let offset = self
            .chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.expression.len());
        PathQueryError {
            expression: self.expression.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), PathQueryError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<PathQuery, PathQueryError> {
        let mut selectors = Vec::new();
        if !self.eat('$') {
            // relative form: `a.b` reads as `$.a.b`
            if self.peek().is_some_and(is_name_char) {
                selectors.push(Selector::Child(self.name()?));
            }
        }
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    if self.eat('.') {
                        if self.eat('*') {
                            selectors.push(Selector::DescendantWildcard);
                        } else {
                            selectors.push(Selector::Descendant(self.name()?));
                        }
                    } else if self.eat('*') {
                        selectors.push(Selector::Wildcard);
                    } else {
                        selectors.push(Selector::Child(self.name()?));
                    }
                }
                '[' => {
                    self.pos += 1;
                    selectors.push(self.bracket()?);
                    self.expect(']')?;
                }
                _ => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(PathQuery { selectors })
    }

    fn name(&mut self) -> Result<String, PathQueryError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a member name"));
        }
        Ok(self.chars[start..self.pos].iter().map(|(_, c)| c).collect())
    }

    fn bracket(&mut self) -> Result<Selector, PathQueryError> {
        self.skip_spaces();
        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some('\'' | '"') => Selector::Child(self.quoted()?),
            Some('?') => {
                self.pos += 1;
                self.expect('(')?;
                let filter = self.filter()?;
                self.expect(')')?;
                Selector::Filter(filter)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Selector::Index(self.integer()?),
            _ => return Err(self.error("expected a name, index, '*' or filter")),
        };
        self.skip_spaces();
        Ok(selector)
    }

    fn quoted(&mut self) -> Result<String, PathQueryError> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected a quoted string"));
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn integer(&mut self) -> Result<i64, PathQueryError> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        text.parse::<i64>()
            .map_err(|_| self.error(format!("'{}' is not an index", text)))
    }

    fn filter(&mut self) -> Result<Filter, PathQueryError> {
        self.skip_spaces();
        self.expect('@')?;
        let mut field = Vec::new();
        while self.eat('.') {
            field.push(self.name()?);
        }
        if field.is_empty() {
            return Err(self.error("filter must name a field, as in @.id"));
        }
        self.skip_spaces();
        let comparison = if self.peek() == Some(')') {
            None
        } else {
            let op = match (self.peek(), self.chars.get(self.pos + 1).map(|(_, c)| *c)) {
                (Some('='), Some('=')) => Comparison::Equal,
                (Some('!'), Some('=')) => Comparison::NotEqual,
                _ => return Err(self.error("expected '==' or '!='")),
            };
            self.pos += 2;
            self.skip_spaces();
            let literal = self.literal()?;
            self.skip_spaces();
            Some((op, literal))
        };
        Ok(Filter { field, comparison })
    }

    fn literal(&mut self) -> Result<ConfigValue, PathQueryError> {
        match self.peek() {
            Some('\'' | '"') => Ok(ConfigValue::String(self.quoted()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
                {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
                if let Ok(i) = text.parse::<i64>() {
                    Ok(ConfigValue::Integer(i))
                } else {
                    text.parse::<f64>()
                        .map(ConfigValue::Float)
                        .map_err(|_| self.error(format!("'{}' is not a number", text)))
                }
            }
            Some(c) if c.is_ascii_alphabetic() => match self.name()?.as_str() {
                "true" => Ok(ConfigValue::Bool(true)),
                "false" => Ok(ConfigValue::Bool(false)),
                "null" => Ok(ConfigValue::Null),
                other => Err(self.error(format!("unknown literal '{}'", other))),
            },
            _ => Err(self.error("expected a literal")),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigValue {
        ConfigValue::from(json!({
            "httpHosting": {"port": 8000, "host": "127.0.0.1"},
            "datasets": [
                {"uri": "urn:fdc:umccr.org:2022:dataset/10g", "name": "10G", "size": 10},
                {"uri": "urn:fdc:umccr.org:2022:dataset/10f", "name": "10F", "size": 12}
            ],
            "dacs": [
                {"id": "manual", "type": "manual", "description": "Manual"},
                {"id": "rems", "type": "rems", "url": "https://rems.example"}
            ]
        }))
    }

    fn rendered(expression: &str) -> Vec<String> {
        let root = doc();
        PathQuery::parse(expression)
            .unwrap()
            .select(&root)
            .iter()
            .map(|loc| crate::issue::InstancePath::from(loc.clone()).to_string())
            .collect()
    }

    #[test]
    fn test_member_and_index_selection() {
        assert_eq!(rendered("$.httpHosting.port"), vec!["httpHosting.port"]);
        assert_eq!(rendered("httpHosting.port"), vec!["httpHosting.port"]);
        assert_eq!(rendered("$['httpHosting'][\"host\"]"), vec!["httpHosting.host"]);
        assert_eq!(rendered("$.datasets[1].name"), vec!["datasets[1].name"]);
        assert_eq!(rendered("$.datasets[-1].name"), vec!["datasets[1].name"]);
        assert!(rendered("$.datasets[5].name").is_empty());
        assert_eq!(rendered("$"), vec!["(root)"]);
    }

    #[test]
    fn test_wildcards_and_descent() {
        assert_eq!(
            rendered("$.datasets[*].name"),
            vec!["datasets[0].name", "datasets[1].name"]
        );
        assert_eq!(rendered("$.httpHosting.*"), vec!["httpHosting.port", "httpHosting.host"]);
        assert_eq!(rendered("$..url"), vec!["dacs[1].url"]);
        assert_eq!(rendered("$..id"), vec!["dacs[0].id", "dacs[1].id"]);
        assert_eq!(rendered("$.httpHosting..*").len(), 2);
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            rendered("$.dacs[?(@.id == 'rems')].url"),
            vec!["dacs[1].url"]
        );
        assert_eq!(
            rendered("$.datasets[?(@.size == 12)].uri"),
            vec!["datasets[1].uri"]
        );
        assert_eq!(
            rendered("$.dacs[?(@.type != 'manual')].id"),
            vec!["dacs[1].id"]
        );
        assert_eq!(rendered("$.dacs[?(@.url)].id"), vec!["dacs[1].id"]);
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        let err = PathQuery::parse("$.datasets[").unwrap_err();
        assert_eq!(err.offset, 11);
        assert!(PathQuery::parse("$.a[?(@.b = 1)]").is_err());
        assert!(PathQuery::parse("$.a['b").is_err());
        assert!(PathQuery::parse("$.").is_err());
        assert!(PathQuery::parse("$.a b").is_err());
    }
}
