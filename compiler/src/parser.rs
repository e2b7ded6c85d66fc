use crate::{
    ast::{FieldDecl, GoFile, Ident, TypeExpr, TypeSpec},
    tokenizer::{Token, TokenKind},
    utils::{error, quote},
    error::BambamError,
};

struct Comment {
    text:     String,
    line:     usize,
    end_line: usize,
    /// No code precedes the comment on its first line.
    own_line: bool,
}

struct Parser<'a> {
    tokens:   Vec<&'a Token>,
    comments: Vec<Comment>,
    index:    usize,
}

/// Parses the token stream of one Go file. Type declarations are kept;
/// `import`, `const`, `var` and `func` declarations are skipped.
pub fn parse_go(tokens: &[Token]) -> Result<GoFile, BambamError> {
    match tokens.last() {
        Some(last) if last.kind == TokenKind::Eof => {}
        _ => return Err(error("Token stream does not end with end of file", 0, 0)),
    }
    Parser::new(tokens).parse_file()
}

impl<'a> Parser<'a> {
    fn new(all: &'a [Token]) -> Self {
        let mut tokens   = Vec::with_capacity(all.len());
        let mut comments = Vec::new();
        let mut code_line = 0;

        for tok in all {
            if tok.kind == TokenKind::Comment {
                comments.push(Comment {
                    text:     tok.text.clone(),
                    line:     tok.line,
                    end_line: tok.line + tok.text.matches('\n').count(),
                    own_line: code_line != tok.line,
                });
            } else {
                if tok.kind != TokenKind::Semicolon {
                    code_line = tok.line;
                }
                tokens.push(tok);
            }
        }

        Parser { tokens, comments, index: 0 }
    }

    fn current(&self) -> &'a Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &'a Token {
        let last = self.tokens.len() - 1;
        self.tokens[(self.index + offset).min(last)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if tok.kind != TokenKind::Eof {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.current().is(text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn eat_semicolon(&mut self) -> bool {
        if self.current().kind == TokenKind::Semicolon {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<&'a Token, BambamError> {
        let tok = self.current();
        if !self.eat(text) {
            return Err(error(
                &format!("Expected {} but found {}", quote(text), describe(tok)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    fn expect_ident(&mut self) -> Result<&'a Token, BambamError> {
        let tok = self.current();
        if tok.kind != TokenKind::Ident {
            return Err(error(
                &format!("Expected identifier but found {}", describe(tok)),
                tok.line,
                tok.column,
            ));
        }
        self.index += 1;
        Ok(tok)
    }

    /// A declaration ends with `;`, or directly before a closing `)`/`}`.
    fn expect_terminator(&mut self) -> Result<(), BambamError> {
        let tok = self.current();
        if self.eat_semicolon() || tok.is(")") || tok.is("}") || tok.kind == TokenKind::Eof {
            return Ok(());
        }
        Err(error(
            &format!("Expected \";\" but found {}", describe(tok)),
            tok.line,
            tok.column,
        ))
    }

    fn unexpected_token(&self) -> BambamError {
        let tok = self.current();
        error(
            &format!("Unexpected token {}", describe(tok)),
            tok.line,
            tok.column,
        )
    }

    /// The comment group ending on the line directly above `line`.
    fn doc_for(&self, line: usize) -> Option<String> {
        let mut group: Vec<&str> = Vec::new();
        let mut next_line = line;
        for comment in self.comments.iter().rev() {
            if comment.end_line >= line {
                continue;
            }
            if comment.own_line && comment.end_line + 1 == next_line {
                group.push(&comment.text);
                next_line = comment.line;
            } else {
                break;
            }
        }
        if group.is_empty() {
            return None;
        }
        group.reverse();
        Some(group.join("\n"))
    }

    fn parse_file(mut self) -> Result<GoFile, BambamError> {
        while self.eat_semicolon() {}
        self.expect("package")?;
        let package = self.expect_ident()?.text.clone();
        self.expect_terminator()?;

        let mut types = Vec::new();
        loop {
            let tok = self.current();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Keyword if tok.text == "type" => {
                    self.parse_type_decl(&mut types)?;
                }
                TokenKind::Keyword
                    if matches!(tok.text.as_str(), "import" | "const" | "var" | "func") =>
                {
                    self.skip_decl()?;
                }
                _ => return Err(self.unexpected_token()),
            }
        }

        Ok(GoFile { package, types })
    }

    fn parse_type_decl(&mut self, types: &mut Vec<TypeSpec>) -> Result<(), BambamError> {
        let type_tok  = self.advance();
        let group_doc = self.doc_for(type_tok.line);

        if self.eat("(") {
            loop {
                while self.eat_semicolon() {}
                if self.eat(")") {
                    break;
                }
                let doc = self.doc_for(self.current().line);
                types.push(self.parse_type_spec(doc)?);
                self.expect_terminator()?;
                if self.current().kind == TokenKind::Eof {
                    return Err(self.unexpected_token());
                }
            }
        } else {
            types.push(self.parse_type_spec(group_doc)?);
        }
        self.expect_terminator()
    }

    fn parse_type_spec(&mut self, doc: Option<String>) -> Result<TypeSpec, BambamError> {
        let name_tok = self.expect_ident()?;

        let type_params = if self.current().is("[") && self.at_type_params() {
            Some(self.collect_balanced()?)
        } else {
            None
        };
        let is_alias = self.eat("=");
        let ty = self.parse_type()?;

        Ok(TypeSpec {
            name:   name_tok.text.clone(),
            line:   name_tok.line,
            column: name_tok.column,
            doc,
            is_alias,
            type_params,
            ty,
        })
    }

    /// Tells `type L[T any] ...` apart from `type A [N]int`.
    fn at_type_params(&self) -> bool {
        let second = self.peek(2);
        self.peek(1).kind == TokenKind::Ident
            && (matches!(second.kind, TokenKind::Ident | TokenKind::Keyword)
                || second.is(",")
                || second.is("~")
                || second.is("["))
    }

    /// Consumes a bracketed group starting at the current `(`, `[` or `{`
    /// and returns the text between the brackets.
    fn collect_balanced(&mut self) -> Result<String, BambamError> {
        let open = self.advance();
        let mut depth = 1;
        let mut inner: Vec<&Token> = Vec::new();
        loop {
            let tok = self.current();
            if tok.kind == TokenKind::Eof {
                return Err(error(
                    &format!("Unclosed {}", quote(&open.text)),
                    open.line,
                    open.column,
                ));
            }
            if tok.is("(") || tok.is("[") || tok.is("{") {
                depth += 1;
            } else if tok.is(")") || tok.is("]") || tok.is("}") {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    break;
                }
            }
            inner.push(self.advance());
        }
        Ok(join_tokens(&inner))
    }

    fn skip_decl(&mut self) -> Result<(), BambamError> {
        self.advance();
        loop {
            let tok = self.current();
            if tok.kind == TokenKind::Eof {
                return Ok(());
            }
            if tok.kind == TokenKind::Semicolon {
                self.advance();
                return Ok(());
            }
            if tok.is("(") || tok.is("[") || tok.is("{") {
                self.collect_balanced()?;
            } else if tok.is(")") || tok.is("]") || tok.is("}") {
                return Err(self.unexpected_token());
            } else {
                self.advance();
            }
        }
    }

    fn starts_type(&self) -> bool {
        let tok = self.current();
        match tok.kind {
            TokenKind::Ident => true,
            TokenKind::Keyword => matches!(
                tok.text.as_str(),
                "map" | "chan" | "func" | "interface" | "struct"
            ),
            TokenKind::Operator => tok.is("*") || tok.is("[") || tok.is("(") || tok.is("<-"),
            _ => false,
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, BambamError> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Ident => self.parse_named(),
            TokenKind::Operator if tok.is("*") => {
                self.advance();
                Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)))
            }
            TokenKind::Operator if tok.is("[") => {
                if self.peek(1).is("]") {
                    self.advance();
                    self.advance();
                    Ok(TypeExpr::Slice(Box::new(self.parse_type()?)))
                } else {
                    let len = self.collect_balanced()?;
                    let elem = Box::new(self.parse_type()?);
                    Ok(TypeExpr::Array { len, elem })
                }
            }
            TokenKind::Operator if tok.is("(") => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(")")?;
                Ok(TypeExpr::Paren(Box::new(inner)))
            }
            TokenKind::Operator if tok.is("<-") => {
                self.advance();
                self.expect("chan")?;
                Ok(TypeExpr::Chan(Box::new(self.parse_type()?)))
            }
            TokenKind::Keyword => match tok.text.as_str() {
                "map" => {
                    self.advance();
                    self.expect("[")?;
                    let key = Box::new(self.parse_type()?);
                    self.expect("]")?;
                    let value = Box::new(self.parse_type()?);
                    Ok(TypeExpr::Map { key, value })
                }
                "chan" => {
                    self.advance();
                    self.eat("<-");
                    Ok(TypeExpr::Chan(Box::new(self.parse_type()?)))
                }
                "func" => {
                    self.advance();
                    self.skip_signature()?;
                    Ok(TypeExpr::Func)
                }
                "interface" => {
                    self.advance();
                    if !self.current().is("{") {
                        return Err(self.unexpected_token());
                    }
                    self.collect_balanced()?;
                    Ok(TypeExpr::Interface)
                }
                "struct" => {
                    self.advance();
                    Ok(TypeExpr::Struct(self.parse_fields()?))
                }
                _ => Err(self.unexpected_token()),
            },
            _ => Err(self.unexpected_token()),
        }
    }

    fn parse_named(&mut self) -> Result<TypeExpr, BambamError> {
        let first = self.expect_ident()?;
        let named = if self.eat(".") {
            let selector = self.expect_ident()?;
            TypeExpr::Named {
                package: Some(first.text.clone()),
                name:    selector.text.clone(),
            }
        } else {
            TypeExpr::named(&first.text)
        };

        if !self.eat("[") {
            return Ok(named);
        }
        let mut args = vec![self.parse_type()?];
        while self.eat(",") {
            if self.current().is("]") {
                break;
            }
            args.push(self.parse_type()?);
        }
        self.expect("]")?;
        Ok(TypeExpr::Generic { base: Box::new(named), args })
    }

    fn skip_signature(&mut self) -> Result<(), BambamError> {
        if !self.current().is("(") {
            return Err(self.unexpected_token());
        }
        self.collect_balanced()?;
        if self.current().is("(") {
            self.collect_balanced()?;
        } else if self.starts_type() {
            self.parse_type()?;
        }
        Ok(())
    }

    fn parse_fields(&mut self) -> Result<Vec<FieldDecl>, BambamError> {
        self.expect("{")?;
        let mut fields = Vec::new();
        loop {
            while self.eat_semicolon() {}
            if self.eat("}") {
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.unexpected_token());
            }
            fields.push(self.parse_field_decl()?);
            if !self.current().is("}") && !self.eat_semicolon() {
                let tok = self.current();
                return Err(error(
                    &format!("Expected \";\" but found {}", describe(tok)),
                    tok.line,
                    tok.column,
                ));
            }
        }
        Ok(fields)
    }

    fn parse_field_decl(&mut self) -> Result<FieldDecl, BambamError> {
        let start = self.current();
        let doc = self.doc_for(start.line);
        let next = self.peek(1);

        let embedded = start.is("*")
            || (start.kind == TokenKind::Ident
                && (next.kind == TokenKind::Semicolon
                    || next.kind == TokenKind::String
                    || next.is("}")
                    || next.is(".")));

        let mut names = Vec::new();
        if !embedded {
            loop {
                let tok = self.expect_ident()?;
                names.push(Ident {
                    name:   tok.text.clone(),
                    line:   tok.line,
                    column: tok.column,
                });
                if !self.eat(",") {
                    break;
                }
            }
        }
        let ty = self.parse_type()?;

        // Struct tags carry no schema meaning.
        if self.current().kind == TokenKind::String {
            self.advance();
        }

        Ok(FieldDecl {
            names,
            ty,
            doc,
            line:   start.line,
            column: start.column,
        })
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of file".to_string(),
        TokenKind::Semicolon if tok.text == "\n" => "newline".to_string(),
        _ => quote(&tok.text),
    }
}

/// Re-joins tokens, separating only adjacent words.
fn join_tokens(tokens: &[&Token]) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for tok in tokens {
        let word = matches!(
            tok.kind,
            TokenKind::Ident | TokenKind::Keyword | TokenKind::Number
        );
        if word && prev_word {
            out.push(' ');
        } else if tok.is(",") {
            out.push_str(",");
            prev_word = false;
            out.push(' ');
            continue;
        }
        out.push_str(&tok.text);
        prev_word = word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_go;

    fn parse(text: &str) -> GoFile {
        let tokens = tokenize_go(text).expect("tokenize_go failed");
        parse_go(&tokens).expect("parse_go failed")
    }

    #[test]
    fn test_parse_struct_fields() {
        let file = parse(
            r#"
package main

import (
	"fmt"
	"time"
)

// Extra holds extras.
// Second line.
type Extra struct {
	A, B int
	// Name is shown to users.
	Name string `json:"name"`
	Inner *Other
	Nums []int64
	Grid [4]float32
	M    map[string]int
	Stamp time.Time
	Other
	*Base
}

func (e *Extra) String() string { return fmt.Sprintf("%d", e.A) }

var x = struct{ a int }{1}
"#,
        );

        assert_eq!(file.package, "main");
        assert_eq!(file.types.len(), 1);

        let extra = &file.types[0];
        assert_eq!(extra.name, "Extra");
        assert_eq!(extra.doc.as_deref(), Some("// Extra holds extras.\n// Second line."));
        let fields = extra.struct_fields().expect("Extra is a struct");
        assert_eq!(fields.len(), 9);

        assert_eq!(fields[0].names.len(), 2);
        assert_eq!(fields[0].names[1].name, "B");
        assert_eq!(fields[0].ty, TypeExpr::named("int"));

        assert_eq!(fields[0].doc, None);
        assert_eq!(fields[1].doc.as_deref(), Some("// Name is shown to users."));
        assert_eq!(fields[1].ty, TypeExpr::named("string"));
        assert_eq!(fields[2].ty, TypeExpr::Pointer(Box::new(TypeExpr::named("Other"))));
        assert_eq!(fields[3].ty, TypeExpr::Slice(Box::new(TypeExpr::named("int64"))));
        assert_eq!(
            fields[4].ty,
            TypeExpr::Array { len: "4".into(), elem: Box::new(TypeExpr::named("float32")) }
        );
        assert!(matches!(fields[5].ty, TypeExpr::Map { .. }));
        assert_eq!(fields[6].ty.to_string(), "time.Time");

        assert!(fields[7].is_embedded());
        assert_eq!(fields[7].ty, TypeExpr::named("Other"));
        assert!(fields[8].is_embedded());
        assert_eq!(fields[8].ty, TypeExpr::Pointer(Box::new(TypeExpr::named("Base"))));
    }

    #[test]
    fn test_parse_grouped_and_non_struct_types() {
        let file = parse(
            r#"package models
type (
	// Celsius is a temperature.
	Celsius float64

	Pair struct { Left, Right int }
	Alias = Pair
	List[T any] struct { Items []T }
	Fixed [8]byte
	Handler func(int) error
)
"#,
        );

        let names: Vec<&str> = file.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Celsius", "Pair", "Alias", "List", "Fixed", "Handler"]);
        assert_eq!(file.types[0].doc.as_deref(), Some("// Celsius is a temperature."));
        assert!(file.types[1].struct_fields().is_some());
        assert!(file.types[2].is_alias);
        assert_eq!(file.types[3].type_params.as_deref(), Some("T any"));
        assert!(file.types[3].struct_fields().is_none());
        assert!(matches!(file.types[4].ty, TypeExpr::Array { .. }));
        assert_eq!(file.types[5].ty, TypeExpr::Func);
    }

    #[test]
    fn test_trailing_comment_is_not_doc() {
        let file = parse("package p\nvar v = 1 // trailing\ntype T struct{}\n");
        assert_eq!(file.types[0].doc, None);
    }

    #[test]
    fn test_parse_single_line_struct() {
        let file = parse("package p; type Extra struct { A int; B int }");
        let fields = file.types[0].struct_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].names[0].name, "B");
    }

    #[test]
    fn test_parse_missing_package_fails() {
        let tokens = tokenize_go("type A struct{}").unwrap();
        let err = parse_go(&tokens).unwrap_err();
        assert!(matches!(err, BambamError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_parse_unclosed_struct_fails() {
        let tokens = tokenize_go("package p\ntype A struct {\n X int\n").unwrap();
        assert!(parse_go(&tokens).is_err());
    }
}
