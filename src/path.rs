//! Path addressing.
//!
//! Two kinds of path flow through a lifter:
//!
//! * **Queries** (`src`) may match any number of nodes. They are compiled once
//!   into a [`Selector`] backed by an RFC 9535 JSONPath engine.
//! * **Locations** (`dst`, and the normalized path of every match) address a
//!   single slot and are parsed into a [`DocPath`], which the output tree can
//!   read from and write through.
//!
//! A path that starts with the local sigil (`@` by default) addresses the
//! transient local store instead of the document; [`classify`] strips the
//! sigil and hands back a root-relative (`$`) path for reuse against it.

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while1},
    character::complete::{char, digit1, none_of},
    combinator::{all_consuming, map, map_res, value},
    error::{VerboseError, context, convert_error},
    multi::many0,
    sequence::{delimited, preceded},
};
use serde_json::Value;
use serde_json_path::{JsonPath, PathElement};
use strum::Display;

use crate::{LiftConfig, PathError};

type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Which store a path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Store {
    /// The input document on the read side, the output on the write side.
    Document,
    Local,
}

/// A path resolved to its store and rewritten to a `$`-rooted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub store: Store,
    pub path: String,
}

/// Decide which store `path` addresses and canonicalize it.
pub fn classify(path: &str, config: &LiftConfig) -> Address {
    match path.strip_prefix(config.local_sigil) {
        Some(rest) => Address {
            store: Store::Local,
            path: rooted(rest, true),
        },
        None => Address {
            store: Store::Document,
            path: rooted(path, config.implicit_root),
        },
    }
}

fn rooted(path: &str, implicit_root: bool) -> String {
    if path.starts_with('$') || !implicit_root {
        path.to_string()
    } else if path.is_empty() || path.starts_with('.') || path.starts_with('[') {
        format!("${}", path)
    } else {
        format!("$.{}", path)
    }
}

/// A single segment of a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Seg {
    Key(String),
    Index(usize),
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => {
                write!(f, "['")?;
                for c in k.chars() {
                    match c {
                        '\'' => write!(f, "\\'")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "']")
            }
            Seg::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A location addressing exactly one slot. Displays in normalized form,
/// e.g. `$['parts'][0]['id']`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<Seg>);

impl DocPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a singular path such as `$.meta.seq`, `$['a b'][2]` or `$`.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        match all_consuming(parse_doc_path)(path) {
            Ok((_, segments)) => Ok(Self(segments)),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                // Valid queries that can match several nodes are not locations.
                if JsonPath::parse(path).is_ok() {
                    Err(PathError::NotSingular(path.to_string()))
                } else {
                    Err(PathError::Malformed {
                        path: path.to_string(),
                        reason: convert_error(path, e),
                    })
                }
            }
            Err(nom::Err::Incomplete(_)) => Err(PathError::Malformed {
                path: path.to_string(),
                reason: "incomplete path".to_string(),
            }),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DocPath {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn parse_member_name(input: &str) -> ParserResult<Seg> {
    context(
        "member name",
        map(
            preceded(
                char('.'),
                take_while1(|c: char| {
                    !matches!(c, '.' | '[' | ']' | '*' | '\'' | '"') && !c.is_whitespace()
                }),
            ),
            |name: &str| Seg::Key(name.to_string()),
        ),
    )(input)
}

fn parse_quoted(quote: char) -> impl FnMut(&str) -> ParserResult<String> {
    move |input| {
        let stop = if quote == '\'' { "\\'" } else { "\\\"" };
        delimited(
            char(quote),
            escaped_transform(
                none_of(stop),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("'", tag("'")),
                    value("\"", tag("\"")),
                )),
            ),
            char(quote),
        )(input)
    }
}

fn parse_bracket(input: &str) -> ParserResult<Seg> {
    context(
        "bracket segment",
        delimited(
            char('['),
            alt((
                map(parse_quoted('\''), Seg::Key),
                map(parse_quoted('"'), Seg::Key),
                map_res(digit1, |s: &str| s.parse::<usize>().map(Seg::Index)),
            )),
            char(']'),
        ),
    )(input)
}

fn parse_doc_path(input: &str) -> ParserResult<Vec<Seg>> {
    context(
        "singular path",
        preceded(char('$'), many0(alt((parse_member_name, parse_bracket)))),
    )(input)
}

/// A compiled source query.
#[derive(Debug)]
pub struct Selector {
    source: String,
    query: JsonPath,
}

impl Selector {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let query = JsonPath::parse(path).map_err(|e| PathError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: path.to_string(),
            query,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every node the query matches, in the engine's enumeration order.
    /// With `leaf` set, container matches are skipped.
    pub fn select<'v>(&self, value: &'v Value, leaf: bool) -> Vec<(DocPath, &'v Value)> {
        self.query
            .query_located(value)
            .into_iter()
            .filter(|node| !leaf || !matches!(node.node(), Value::Array(_) | Value::Object(_)))
            .map(|node| {
                let location = node
                    .location()
                    .iter()
                    .map(|element| match element {
                        PathElement::Name(name) => Seg::Key(name.to_string()),
                        PathElement::Index(i) => Seg::Index(*i),
                    })
                    .collect();
                (DocPath(location), node.node())
            })
            .collect()
    }
}
