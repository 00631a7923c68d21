use crate::types::Tags;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid filter {filter:?} at offset {offset}: {reason}")]
pub struct FilterParseError {
    filter: String,
    offset: usize,
    reason: &'static str,
}

#[derive(Debug, Clone)]
enum Condition {
    Has(String),
    NotHas(String),
    Equals(String, String),
    NotEquals(String, String),
    Matches(String, Regex),
    NotMatches(String, Regex),
}

impl Condition {
    fn matches(&self, tags: &Tags) -> bool {
        match self {
            Condition::Has(key) => tags.contains_key(key),
            Condition::NotHas(key) => !tags.contains_key(key),
            Condition::Equals(key, value) => tags.get(key) == Some(value),
            Condition::NotEquals(key, value) => tags.get(key) != Some(value),
            Condition::Matches(key, re) => tags.get(key).is_some_and(|v| re.is_match(v)),
            Condition::NotMatches(key, re) => !tags.get(key).is_some_and(|v| re.is_match(v)),
        }
    }
}

/// A tag filter written in Overpass QL condition syntax, for example
/// `["highway"~"primary|secondary"]["area"!="yes"]`.
///
/// All conditions must hold for a tag set to match. Regular expressions are
/// unanchored, as they are on the Overpass side.
#[derive(Debug, Clone)]
pub struct OsmFilter {
    source: String,
    conditions: Vec<Condition>,
}

impl OsmFilter {
    pub fn matches(&self, tags: &Tags) -> bool {
        self.conditions.iter().all(|condition| condition.matches(tags))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for OsmFilter {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Display for OsmFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for OsmFilter {
    type Err = FilterParseError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            filter,
            chars: filter.char_indices().peekable(),
        };

        let mut conditions = Vec::new();
        loop {
            parser.skip_whitespace();
            if parser.chars.peek().is_none() {
                break;
            }
            conditions.push(parser.condition()?);
        }

        if conditions.is_empty() {
            return Err(parser.error(0, "filter has no conditions"));
        }

        Ok(OsmFilter {
            source: filter.trim().to_string(),
            conditions,
        })
    }
}

struct Parser<'a> {
    filter: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn error(&self, offset: usize, reason: &'static str) -> FilterParseError {
        FilterParseError {
            filter: self.filter.to_string(),
            offset,
            reason,
        }
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.filter.len())
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char, reason: &'static str) -> Result<(), FilterParseError> {
        self.skip_whitespace();
        let offset = self.offset();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            _ => Err(self.error(offset, reason)),
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }

    // Parses a double-quoted string, or a bare word made of characters
    // allowed in OSM keys.
    fn string(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();
        let offset = self.offset();

        if self.eat('"') {
            let mut out = String::new();
            loop {
                match self.chars.next() {
                    Some((_, '"')) => return Ok(out),
                    Some((idx, '\\')) => match self.chars.next() {
                        Some((_, c)) => out.push(c),
                        None => return Err(self.error(idx, "unterminated escape")),
                    },
                    Some((_, c)) => out.push(c),
                    None => return Err(self.error(offset, "unterminated string")),
                }
            }
        }

        let mut out = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || matches!(*c, '_' | ':' | '-'))
        {
            out.push(c);
        }

        if out.is_empty() {
            return Err(self.error(offset, "expected a key or value"));
        }

        Ok(out)
    }

    fn regex(&mut self) -> Result<Regex, FilterParseError> {
        self.skip_whitespace();
        let offset = self.offset();
        let pattern = self.string()?;
        Regex::new(&pattern).map_err(|_| self.error(offset, "invalid regular expression"))
    }

    fn condition(&mut self) -> Result<Condition, FilterParseError> {
        self.expect('[', "expected '['")?;
        self.skip_whitespace();

        if self.eat('!') {
            let key = self.string()?;
            self.expect(']', "expected ']'")?;
            return Ok(Condition::NotHas(key));
        }

        let key = self.string()?;
        self.skip_whitespace();
        let offset = self.offset();

        let condition = if self.eat(']') {
            return Ok(Condition::Has(key));
        } else if self.eat('=') {
            Condition::Equals(key, self.string()?)
        } else if self.eat('~') {
            Condition::Matches(key, self.regex()?)
        } else if self.eat('!') {
            if self.eat('=') {
                Condition::NotEquals(key, self.string()?)
            } else if self.eat('~') {
                Condition::NotMatches(key, self.regex()?)
            } else {
                return Err(self.error(offset, "expected '!=' or '!~'"));
            }
        } else {
            return Err(self.error(offset, "expected ']', '=', '!=', '~' or '!~'"));
        };

        self.expect(']', "expected ']'")?;
        Ok(condition)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_regex_condition_is_unanchored() {
        let filter: OsmFilter = r#"["highway"~"primary|footway"]"#.parse().unwrap();

        assert!(filter.matches(&tags(&[("highway", "primary")])));
        assert!(filter.matches(&tags(&[("highway", "primary_link")])));
        assert!(filter.matches(&tags(&[("highway", "footway")])));
        assert!(!filter.matches(&tags(&[("highway", "cycleway")])));
        assert!(!filter.matches(&tags(&[("railway", "primary")])));
    }

    #[test]
    fn test_conditions_are_combined() {
        let filter: OsmFilter = r#"["highway"]["area"!="yes"][!"tunnel"]["access"!~"private"]"#
            .parse()
            .unwrap();

        assert!(filter.matches(&tags(&[("highway", "service")])));
        assert!(!filter.matches(&tags(&[("highway", "service"), ("area", "yes")])));
        assert!(!filter.matches(&tags(&[("highway", "service"), ("tunnel", "yes")])));
        assert!(!filter.matches(&tags(&[("highway", "service"), ("access", "private")])));
        assert!(filter.matches(&tags(&[("highway", "service"), ("access", "yes")])));
    }

    #[test]
    fn test_negation_precedes_the_key() {
        let filter: OsmFilter = r#"[!"tunnel"]"#.parse().unwrap();

        assert!(filter.matches(&tags(&[("highway", "service")])));
        assert!(!filter.matches(&tags(&[("tunnel", "yes")])));
        assert!(!filter.matches(&tags(&[("tunnel", "no")])));
    }

    #[test]
    fn test_equality_and_bare_words() {
        let filter: OsmFilter = r#"[landuse=forest] ["name"="Kadriorg \"Park\""]"#.parse().unwrap();

        assert!(filter.matches(&tags(&[
            ("landuse", "forest"),
            ("name", "Kadriorg \"Park\"")
        ])));
        assert!(!filter.matches(&tags(&[("landuse", "forest")])));
    }

    #[test]
    fn test_source_is_kept_for_queries() {
        let source = r#"["highway"~"motorway|trunk"]"#;
        let filter: OsmFilter = format!("  {source} ").parse().unwrap();

        assert_eq!(filter.to_string(), source);
    }

    #[test]
    fn test_invalid_filters() {
        assert!("".parse::<OsmFilter>().is_err());
        assert!(r#"["highway""#.parse::<OsmFilter>().is_err());
        assert!(r#"["highway"~"("]"#.parse::<OsmFilter>().is_err());
        assert!(r#"["highway"<"3"]"#.parse::<OsmFilter>().is_err());
        assert!(r#"highway"#.parse::<OsmFilter>().is_err());
    }
}
