//! Compound CSS selector matching for the in-memory surface.
//!
//! Supports selector lists of compound selectors: type, `#id`, `.class` and
//! attribute selectors with `=`, `*=`, `^=`, `$=` and the ` i` flag.
//! Combinators are rejected.

/// Attribute access needed by the matcher.
pub(crate) trait SelectorTarget {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    test: Option<(AttrOp, String)>,
    case_insensitive: bool,
}

impl AttrSelector {
    fn matches(&self, target: &impl SelectorTarget) -> bool {
        let Some(actual) = target.attr(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), expected.to_lowercase())
        } else {
            (actual.to_string(), expected.clone())
        };
        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, target: &impl SelectorTarget) -> bool {
        if let Some(tag) = &self.tag {
            if !target.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if target.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let have: Vec<&str> = target
                .attr("class")
                .unwrap_or_default()
                .split_whitespace()
                .collect();
            if !self.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|a| a.matches(target))
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Compound>);

impl SelectorList {
    pub(crate) fn matches(&self, target: &impl SelectorTarget) -> bool {
        self.0.iter().any(|c| c.matches(target))
    }

    /// Number of alternatives in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a selector list, returning a message on failure.
pub fn parse_selector(input: &str) -> Result<SelectorList, String> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let mut list = Vec::new();
    loop {
        parser.skip_ws();
        list.push(parser.compound()?);
        parser.skip_ws();
        match parser.peek() {
            None => break,
            Some(',') => parser.pos += 1,
            Some(c) => return Err(format!("unsupported combinator '{c}' at {}", parser.pos)),
        }
    }
    Ok(SelectorList(list))
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("expected identifier at {start}"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if c.is_alphabetic() => compound.tag = Some(self.ident()?.to_lowercase()),
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(format!("expected selector at {start}"));
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrSelector, String> {
        self.skip_ws();
        let name = self.ident()?.to_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrSelector {
                    name,
                    test: None,
                    case_insensitive: false,
                });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('*' | '^' | '$')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(format!("expected '=' after '{c}' at {}", self.pos));
                }
                self.pos += 1;
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    _ => AttrOp::Suffix,
                }
            }
            Some(c) => return Err(format!("unsupported attribute operator '{c}' at {}", self.pos)),
            None => return Err("unterminated attribute selector".to_string()),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err("unterminated string".to_string());
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => self.ident()?,
        };

        self.skip_ws();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I')) {
            case_insensitive = true;
            self.pos += 1;
            self.skip_ws();
        }

        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttrSelector {
                    name,
                    test: Some((op, value)),
                    case_insensitive,
                })
            }
            _ => Err("unterminated attribute selector".to_string()),
        }
    }
}
