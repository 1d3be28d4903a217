// Copyright 2025 Symdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The query grammar: free-text terms (default operator AND, `+` requires,
//! `-` excludes), wildcard terms, a fixed set of boolean prefixes, and
//! numeric ranges over five fields.

use crate::error::Error;
use crate::store::{TermField, ValueSlot};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    MustNot,
}

#[derive(Debug, Clone)]
pub enum QueryNode {
    /// Free-text match against the name postings (lowercased).
    Text { pattern: String, wildcard: bool },
    /// Exact or wildcard match against one boolean term field.
    Term {
        field: TermField,
        pattern: String,
        wildcard: bool,
    },
    /// Inclusive numeric range over a sortable value slot.
    Range { slot: ValueSlot, lo: u64, hi: u64 },
}

#[derive(Debug, Clone)]
pub struct QueryClause {
    pub occur: Occur,
    pub node: QueryNode,
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub clauses: Vec<QueryClause>,
}

impl ParsedQuery {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let tokens = split_query(input);
        if tokens.is_empty() {
            return Err(Error::InvalidQuery("empty query".into()));
        }
        let mut clauses = Vec::with_capacity(tokens.len());
        for token in tokens {
            clauses.push(parse_clause(&token)?);
        }
        Ok(Self { clauses })
    }
}

fn parse_clause(token: &str) -> Result<QueryClause, Error> {
    let (occur, rest) = match token.as_bytes().first() {
        Some(b'+') => (Occur::Must, &token[1..]),
        Some(b'-') => (Occur::MustNot, &token[1..]),
        _ => (Occur::Must, token),
    };
    if rest.is_empty() {
        return Err(Error::InvalidQuery(format!("dangling operator in `{}`", token)));
    }
    let node = if let Some((key, value)) = rest.split_once(':') {
        if let Some(slot) = range_slot(key) {
            let (lo, hi) = parse_range(value)
                .map_err(|m| Error::InvalidQuery(format!("range `{}`: {}", rest, m)))?;
            QueryNode::Range { slot, lo, hi }
        } else if let Some(field) = TermField::from_prefix(key) {
            if value.is_empty() {
                return Err(Error::InvalidQuery(format!("`{}:` needs a value", key)));
            }
            QueryNode::Term {
                field,
                pattern: value.to_string(),
                wildcard: is_wildcard(value),
            }
        } else {
            return Err(Error::InvalidQuery(format!("unknown prefix `{}:`", key)));
        }
    } else {
        QueryNode::Text {
            pattern: rest.to_lowercase(),
            wildcard: is_wildcard(rest),
        }
    };
    Ok(QueryClause { occur, node })
}

fn range_slot(key: &str) -> Option<ValueSlot> {
    Some(match key {
        "arity" => ValueSlot::Arity,
        "size" => ValueSlot::Sizeof,
        "align" => ValueSlot::Alignof,
        "line" => ValueSlot::Line,
        "column" => ValueSlot::Column,
        _ => return None,
    })
}

fn is_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Compile a `*`/`?` wildcard pattern into an anchored regex.
pub(crate) fn wildcard_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        re.push_str("(?i)");
    }
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| Error::InvalidQuery(format!("wildcard `{}`: {}", pattern, e)))
}

/// Range processor: `lo..hi` where each endpoint may carry non-numeric
/// decoration around the digits (`10..100`, `v10..v100s`). Endpoints
/// convert to the store's sortable u64 encoding.
fn parse_range(input: &str) -> Result<(u64, u64), String> {
    let (lo_raw, hi_raw) = input
        .split_once("..")
        .ok_or_else(|| "expected `lo..hi`".to_string())?;
    let lo = parse_endpoint(lo_raw)?;
    let hi = parse_endpoint(hi_raw)?;
    Ok((lo, hi))
}

fn parse_endpoint(raw: &str) -> Result<u64, String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(format!("endpoint `{}` has no digits", raw));
    }
    // Decoration is only allowed around one contiguous digit run.
    let trimmed = raw
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .trim_end_matches(|c: char| !c.is_ascii_digit());
    if trimmed.chars().any(|c| !c.is_ascii_digit()) {
        return Err(format!("endpoint `{}` is not a decorated number", raw));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| format!("endpoint `{}`: {}", raw, e))
}

/// Split on whitespace, honoring single and double quotes.
fn split_query(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_s = false;
    let mut in_d = false;
    for ch in input.chars() {
        match ch {
            '\'' if !in_d => in_s = !in_s,
            '"' if !in_s => in_d = !in_d,
            c if c.is_whitespace() && !in_s && !in_d => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            c => buf.push(c),
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_defaults_to_must() {
        let q = ParsedQuery::parse("foo bar").unwrap();
        assert_eq!(q.clauses.len(), 2);
        assert!(q.clauses.iter().all(|c| c.occur == Occur::Must));
        match &q.clauses[0].node {
            QueryNode::Text { pattern, wildcard } => {
                assert_eq!(pattern, "foo");
                assert!(!wildcard);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn plus_minus_operators() {
        let q = ParsedQuery::parse("+foo -bar").unwrap();
        assert_eq!(q.clauses[0].occur, Occur::Must);
        assert_eq!(q.clauses[1].occur, Occur::MustNot);
    }

    #[test]
    fn boolean_prefixes() {
        let q = ParsedQuery::parse("decl:Widget kind:class scope:ui inh:QObject").unwrap();
        let fields: Vec<TermField> = q
            .clauses
            .iter()
            .map(|c| match &c.node {
                QueryNode::Term { field, .. } => *field,
                other => panic!("unexpected node {:?}", other),
            })
            .collect();
        assert_eq!(
            fields,
            vec![TermField::Decl, TermField::Kind, TermField::Scope, TermField::Base]
        );
    }

    #[test]
    fn numeric_ranges() {
        let q = ParsedQuery::parse("size:8..16").unwrap();
        match q.clauses[0].node {
            QueryNode::Range { slot, lo, hi } => {
                assert_eq!(slot, ValueSlot::Sizeof);
                assert_eq!((lo, hi), (8, 16));
            }
            ref other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn decorated_range_endpoints() {
        let q = ParsedQuery::parse("size:v10..v100s").unwrap();
        match q.clauses[0].node {
            QueryNode::Range { lo, hi, .. } => assert_eq!((lo, hi), (10, 100)),
            ref other => panic!("unexpected node {:?}", other),
        }
        let q = ParsedQuery::parse("line:1..20 column:0..80 arity:2..2 align:4..8").unwrap();
        assert_eq!(q.clauses.len(), 4);
    }

    #[test]
    fn parse_failures_are_typed() {
        for bad in ["", "   ", "size:abc", "size:10", "size:..", "bogus:x", "+", "-"] {
            match ParsedQuery::parse(bad) {
                Err(Error::InvalidQuery(_)) => {}
                other => panic!("`{}` should be an invalid-query error, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn wildcard_detection_and_compilation() {
        let q = ParsedQuery::parse("Wid* decl:?oo").unwrap();
        match &q.clauses[0].node {
            QueryNode::Text { wildcard, .. } => assert!(*wildcard),
            other => panic!("unexpected node {:?}", other),
        }
        let re = wildcard_regex("Wid*", false).unwrap();
        assert!(re.is_match("Widget"));
        assert!(!re.is_match("xWidget"));
        let re = wildcard_regex("?oo", false).unwrap();
        assert!(re.is_match("foo"));
        assert!(!re.is_match("oo"));
    }

    #[test]
    fn quotes_keep_tokens_together() {
        let q = ParsedQuery::parse("\"operator ()\"").unwrap();
        assert_eq!(q.clauses.len(), 1);
    }
}
