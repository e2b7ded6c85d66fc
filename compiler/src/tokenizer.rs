use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::BambamError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(?P<comment>//[^\n]*|/\*(?s:.*?)\*/)",
        r"|(?P<string>`[^`]*`|",
        r#""(?:[^"\\\n]|\\.)*")"#,
        r"|(?P<char>'(?:[^'\\\n]|\\.)*')",
        r"|(?P<number>[0-9][0-9A-Za-z_.]*)",
        r"|(?P<ident>[\p{L}_][\p{L}\p{N}_]*)",
        r"|(?P<operator>\.\.\.|<<=|>>=|&\^=|&&|\|\||<-|\+\+|--|==|!=|<=|>=|:=|<<|>>|&\^|[-+*/%&|^]=|[-+*/%&|^<>=!(){}\[\],;.:~])",
        r"|(?P<newline>\n)",
        r"|(?P<space>[ \t\r\x0C]+)",
    )).unwrap();
}

pub const KEYWORDS: [&str; 25] = [
    "break", "case", "chan", "const", "continue", "default", "defer", "else",
    "fallthrough", "for", "func", "go", "goto", "if", "import", "interface",
    "map", "package", "range", "return", "select", "struct", "switch", "type",
    "var",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Number,
    String,
    Char,
    Operator,
    Comment,
    Semicolon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text && self.kind != TokenKind::String && self.kind != TokenKind::Comment
    }

    /// Go inserts a semicolon after a line's final token when that token
    /// could end a statement.
    fn ends_statement(&self) -> bool {
        match self.kind {
            TokenKind::Ident | TokenKind::Number | TokenKind::String | TokenKind::Char => true,
            TokenKind::Keyword => matches!(
                self.text.as_str(),
                "break" | "continue" | "fallthrough" | "return"
            ),
            TokenKind::Operator => matches!(self.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            _ => false,
        }
    }
}

/// Splits Go source into tokens, keeping comments and inserting the implicit
/// semicolons Go places at line ends. The final token is always `Eof`.
pub fn tokenize_go(text: &str) -> Result<Vec<Token>, BambamError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;
    // Index of the last non-comment token on the current line.
    let mut pending: Option<usize> = None;

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(mat) = caps.get(0) else { continue };
        let start = mat.start();
        let part  = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        let kind = if caps.name("comment").is_some() {
            Some(TokenKind::Comment)
        } else if caps.name("string").is_some() {
            Some(TokenKind::String)
        } else if caps.name("char").is_some() {
            Some(TokenKind::Char)
        } else if caps.name("number").is_some() {
            Some(TokenKind::Number)
        } else if caps.name("ident").is_some() {
            if KEYWORDS.contains(&part) {
                Some(TokenKind::Keyword)
            } else {
                Some(TokenKind::Ident)
            }
        } else if caps.name("operator").is_some() {
            if part == ";" {
                Some(TokenKind::Semicolon)
            } else {
                Some(TokenKind::Operator)
            }
        } else {
            None
        };

        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                text: part.to_string(),
                line,
                column,
            });
            if kind != TokenKind::Comment {
                pending = if kind == TokenKind::Semicolon {
                    None
                } else {
                    Some(tokens.len() - 1)
                };
            }
        }

        // A newline inside a string literal does not end the line; one inside
        // a block comment does.
        let newline_count = part.matches('\n').count();
        let ends_line = caps.name("newline").is_some()
            || (newline_count > 0 && kind == Some(TokenKind::Comment));
        if ends_line {
            insert_semicolon(&mut tokens, &mut pending);
        }
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = mat.end();
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    insert_semicolon(&mut tokens, &mut pending);

    tokens.push(Token {
        kind:   TokenKind::Eof,
        text:   "".to_string(),
        line,
        column,
    });
    Ok(tokens)
}

fn insert_semicolon(tokens: &mut Vec<Token>, pending: &mut Option<usize>) {
    if let Some(index) = pending.take() {
        let last = &tokens[index];
        if last.ends_statement() {
            let token = Token {
                kind:   TokenKind::Semicolon,
                text:   "\n".to_string(),
                line:   last.line,
                column: last.column + last.text.chars().count(),
            };
            tokens.push(token);
        }
    }
}
