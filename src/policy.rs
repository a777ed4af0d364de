use std::collections::HashMap;

use crate::cache::CacheRecord;
use crate::license::spdx::{tokenize, Token};
use crate::models::SourceType;

/// Licenses allowed when the configuration does not list any.
pub const DEFAULT_ALLOWED: [&str; 8] = [
    "mit",
    "apache-2.0",
    "bsd-2-clause",
    "bsd-3-clause",
    "isc",
    "0bsd",
    "unlicense",
    "zlib",
];

/// Decides whether a cached record needs a human to look at it.
pub trait ReviewPolicy {
    /// The record's license is on the allow list.
    fn allowed(&self, record: &CacheRecord) -> bool;
    /// The dependency has been reviewed and accepted by name.
    fn reviewed(&self, record: &CacheRecord) -> bool;

    fn allowed_or_reviewed(&self, record: &CacheRecord) -> bool {
        self.allowed(record) || self.reviewed(record)
    }
}

/// Allow, review and ignore lists of one application.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    allowed: Vec<String>,
    reviewed: HashMap<SourceType, Vec<String>>,
    ignored: HashMap<SourceType, Vec<String>>,
}

impl Policy {
    pub fn new(
        allowed: impl IntoIterator<Item = impl AsRef<str>>,
        reviewed: HashMap<SourceType, Vec<String>>,
        ignored: HashMap<SourceType, Vec<String>>,
    ) -> Self {
        Self {
            allowed: allowed
                .into_iter()
                .map(|id| id.as_ref().trim().to_lowercase())
                .collect(),
            reviewed,
            ignored,
        }
    }

    /// Ignored dependencies are neither checked nor cached.
    pub fn ignored(&self, source_type: SourceType, name: &str) -> bool {
        listed(&self.ignored, source_type, name)
    }

    /// Evaluate a license expression against the allow list.
    ///
    /// `AND` binds tighter than `OR`, parentheses override precedence and a
    /// `WITH` exception is judged by its base license.
    pub fn license_allowed(&self, license: &str) -> bool {
        let tokens = tokenize(license);
        if tokens.is_empty() {
            return false;
        }
        let mut parser = ExprParser {
            tokens,
            pos: 0,
            allowed: &self.allowed,
            malformed: false,
        };
        let result = parser.parse_or();
        // anything unparsed or missing means the expression was not understood
        result && !parser.malformed && parser.pos == parser.tokens.len()
    }
}

impl ReviewPolicy for Policy {
    fn allowed(&self, record: &CacheRecord) -> bool {
        self.license_allowed(&record.license)
    }

    fn reviewed(&self, record: &CacheRecord) -> bool {
        listed(&self.reviewed, record.source_type, &record.name)
    }
}

fn listed(lists: &HashMap<SourceType, Vec<String>>, source_type: SourceType, name: &str) -> bool {
    lists
        .get(&source_type)
        .is_some_and(|names| names.iter().any(|n| n == name))
}

/// Recursive descent evaluator over [`Token`]s.
///
/// ```text
/// or_expr  := and_expr ( "OR" and_expr )*
/// and_expr := atom ( "AND" atom )*
/// atom     := "(" or_expr ")" | id ( "WITH" id )?
/// ```
struct ExprParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    allowed: &'a [String],
    malformed: bool,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> bool {
        let mut result = self.parse_and();
        while matches!(self.peek(), Some(Token::Or)) {
            self.consume();
            let rhs = self.parse_and();
            result = result || rhs;
        }
        result
    }

    fn parse_and(&mut self) -> bool {
        let mut result = self.parse_atom();
        while matches!(self.peek(), Some(Token::And)) {
            self.consume();
            let rhs = self.parse_atom();
            result = result && rhs;
        }
        result
    }

    fn parse_atom(&mut self) -> bool {
        match self.consume() {
            Some(Token::LParen) => {
                let result = self.parse_or();
                matches!(self.consume(), Some(Token::RParen)) && result
            }
            Some(Token::Id(id)) => {
                if matches!(self.peek(), Some(Token::With)) {
                    self.consume();
                    if !matches!(self.consume(), Some(Token::Id(_))) {
                        self.malformed = true;
                        return false;
                    }
                }
                let id = id.to_lowercase();
                self.allowed.iter().any(|a| *a == id)
            }
            _ => {
                self.malformed = true;
                false
            }
        }
    }
}
