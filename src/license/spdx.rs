//! License identifier normalization.
//!
//! Cache records store licenses as lowercase SPDX ids joined by uppercase
//! operators, e.g. `mit OR apache-2.0`.

/// Tokens of an SPDX license expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Id(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

/// Tokenize an SPDX expression. Operators are matched case-insensitively and
/// `/` is read as `OR`, which several ecosystems use as shorthand.
pub fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Or);
                chars.next();
            }
            _ => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '/') {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                let token = match s.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "WITH" => Token::With,
                    _ => Token::Id(s),
                };
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Map common non-SPDX spellings to their SPDX id.
fn canonical(raw: &str) -> Option<&'static str> {
    let id = match raw.trim() {
        "Apache 2.0" | "Apache License 2.0" | "Apache License, Version 2.0" | "Apache2" => {
            "Apache-2.0"
        }
        "MIT License" | "The MIT License" | "Expat" => "MIT",
        "BSD" | "BSD License" => "BSD-3-Clause",
        "BSD 2-Clause" | "Simplified BSD" => "BSD-2-Clause",
        "BSD 3-Clause" | "New BSD" | "Modified BSD" => "BSD-3-Clause",
        "GNU GPL v2" | "GNU General Public License v2" | "GPL v2" | "GPLv2" => "GPL-2.0",
        "GNU GPL v3" | "GNU General Public License v3" | "GPL v3" | "GPLv3" => "GPL-3.0",
        "GNU LGPL v2.1" | "LGPL v2.1" | "LGPLv2.1" => "LGPL-2.1",
        "GNU LGPL v3" | "LGPL v3" | "LGPLv3" => "LGPL-3.0",
        "Mozilla Public License 2.0" | "MPL 2.0" | "MPLv2" => "MPL-2.0",
        "ISC License" => "ISC",
        "CC0" | "Public Domain" => "CC0-1.0",
        "AGPL v3" | "AGPLv3" | "GNU AGPL v3" => "AGPL-3.0",
        "UNLICENSED" | "Proprietary" => "other",
        _ => return None,
    };
    Some(id)
}

/// Normalize a declared license string. `None` when nothing usable was declared.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
        return None;
    }

    if let Some(id) = canonical(trimmed) {
        return Some(id.to_lowercase());
    }

    let mut out = String::new();
    for token in tokenize(trimmed) {
        let piece = match &token {
            Token::Id(id) => canonical(id).unwrap_or(id.as_str()).to_lowercase(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::With => "WITH".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        };
        if !(out.is_empty() || out.ends_with('(') || token == Token::RParen) {
            out.push(' ');
        }
        out.push_str(&piece);
    }
    Some(out)
}
