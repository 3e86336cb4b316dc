//! Structural shapes: a small selector language over the page tree.
//!
//! Supported syntax:
//! - `*` or an element name (`div`)
//! - `#id`, `.tag`, `:not(.tag)` qualifiers, any number, in any order
//! - child (`a > b`) and descendant (`a b`) combinators

use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{all_consuming, map, opt, value};
use nom::error::{Error, ErrorKind};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use tracing::instrument;

use crate::domain::arena::{Document, NodeData, NodeId};
use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Child,
    Descendant,
}

/// One compound selector, e.g. `div#main.box:not(.ad)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// None matches any element name
    pub name: Option<String>,
    pub id: Option<String>,
    pub tags: Vec<String>,
    pub excluded_tags: Vec<String>,
}

impl Compound {
    pub fn matches(&self, data: &NodeData) -> bool {
        if let Some(name) = &self.name {
            if !data.name.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if data.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.tags.iter().all(|tag| data.tags.contains(tag))
            && !self.excluded_tags.iter().any(|tag| data.tags.contains(tag))
    }
}

/// Parsed selector. Steps are stored left to right; the combinator of step
/// `i` links it to step `i - 1` and is ignored for the first step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    source: String,
    steps: Vec<(Combinator, Compound)>,
}

impl Shape {
    /// Shape matching every node.
    pub fn universal() -> Self {
        Self {
            source: "*".to_string(),
            steps: vec![(Combinator::Descendant, Compound::default())],
        }
    }

    pub fn parse(source: &str) -> DomainResult<Self> {
        match all_consuming(delimited(multispace0, selector, multispace0))(source) {
            Ok((_, steps)) => Ok(Self {
                source: source.trim().to_string(),
                steps,
            }),
            Err(e) => Err(DomainError::InvalidSelector {
                selector: source.to_string(),
                message: e.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Right-to-left match of `node` against all steps.
    #[instrument(level = "trace", skip(self, document))]
    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        match self.steps.len() {
            0 => false,
            n => self.matches_step(document, node, n - 1),
        }
    }

    fn matches_step(&self, document: &Document, node: NodeId, step: usize) -> bool {
        let Some(entry) = document.get_node(node) else {
            return false;
        };
        let (combinator, compound) = &self.steps[step];
        if !compound.matches(&entry.data) {
            return false;
        }
        if step == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => entry
                .parent
                .is_some_and(|parent| self.matches_step(document, parent, step - 1)),
            Combinator::Descendant => {
                let mut current = entry.parent;
                while let Some(ancestor) = current {
                    if self.matches_step(document, ancestor, step - 1) {
                        return true;
                    }
                    current = document.get_node(ancestor).and_then(|a| a.parent);
                }
                false
            }
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::universal()
    }
}

impl FromStr for Shape {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

enum Qualifier<'a> {
    Id(&'a str),
    Tag(&'a str),
    NotTag(&'a str),
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn element_name(input: &str) -> IResult<&str, Option<String>> {
    alt((
        value(None, char('*')),
        map(ident, |name: &str| Some(name.to_ascii_lowercase())),
    ))(input)
}

fn qualifier(input: &str) -> IResult<&str, Qualifier<'_>> {
    alt((
        map(preceded(char('#'), ident), Qualifier::Id),
        map(preceded(char('.'), ident), Qualifier::Tag),
        map(delimited(tag(":not(."), ident, char(')')), Qualifier::NotTag),
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let (rest, (name, qualifiers)) = pair(opt(element_name), many0(qualifier))(input)?;
    if name.is_none() && qualifiers.is_empty() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    }

    let mut compound = Compound {
        name: name.flatten(),
        ..Compound::default()
    };
    for q in qualifiers {
        match q {
            Qualifier::Id(id) => compound.id = Some(id.to_string()),
            Qualifier::Tag(tag) => compound.tags.push(tag.to_string()),
            Qualifier::NotTag(tag) => compound.excluded_tags.push(tag.to_string()),
        }
    }
    Ok((rest, compound))
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        value(
            Combinator::Child,
            delimited(multispace0, char('>'), multispace0),
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

fn selector(input: &str) -> IResult<&str, Vec<(Combinator, Compound)>> {
    let (rest, (first, tail)) = pair(compound, many0(pair(combinator, compound)))(input)?;
    let mut steps = vec![(Combinator::Descendant, first)];
    steps.extend(tail);
    Ok((rest, steps))
}
