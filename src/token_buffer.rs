//! Pre-tokenized cursor the parser consumes. Lexing happens once, up
//! front, via [`crate::lexer::tokenize`]; the parser then walks this
//! buffer with unlimited lookahead instead of pulling from the lexer on
//! demand.

use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

#[derive(Debug)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl TokenBuffer {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof = tokens
            .last()
            .copied()
            .filter(|t| t.kind == TokenKind::Eof)
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: Span::default(),
            });
        Self {
            tokens,
            pos: 0,
            eof,
        }
    }

    pub fn current(&self) -> Token {
        self.tokens.get(self.pos).copied().unwrap_or(self.eof)
    }

    pub fn peek(&self, k: usize) -> Token {
        self.tokens.get(self.pos + k).copied().unwrap_or(self.eof)
    }

    pub fn previous(&self) -> Token {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .copied()
            .unwrap_or(self.eof)
    }

    pub fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.current();
        if !self.is_at_end() {
            self.pos += 1;
        }
        tok
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.contains(&self.current().kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn consume(&mut self, kind: TokenKind, message: &'static str) -> Result<Token, &'static str> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(message)
        }
    }

    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Skip forward to the next token that plausibly starts a fresh
    /// statement, for error recovery after a malformed one.
    pub fn synchronize(&mut self) {
        while !self.is_at_end() {
            let kind = self.current().kind;
            if kind == TokenKind::SemiColon {
                self.advance();
                return;
            }
            if matches!(
                kind,
                TokenKind::CloseBrace
                    | TokenKind::CloseTag
                    | TokenKind::Function
                    | TokenKind::Class
                    | TokenKind::Interface
                    | TokenKind::Trait
                    | TokenKind::Enum
                    | TokenKind::Namespace
                    | TokenKind::Use
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Foreach
                    | TokenKind::Return
                    | TokenKind::Try
                    | TokenKind::Throw
            ) {
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind) -> Token {
        Token {
            kind,
            span: Span::default(),
        }
    }

    #[test]
    fn advances_and_reports_eof() {
        let mut buf = TokenBuffer::new(vec![
            tok(TokenKind::Echo),
            tok(TokenKind::SemiColon),
            tok(TokenKind::Eof),
        ]);
        assert_eq!(buf.current().kind, TokenKind::Echo);
        assert!(!buf.is_at_end());
        buf.advance();
        assert_eq!(buf.current().kind, TokenKind::SemiColon);
        buf.advance();
        assert!(buf.is_at_end());
    }

    #[test]
    fn peek_does_not_consume() {
        let buf = TokenBuffer::new(vec![tok(TokenKind::Echo), tok(TokenKind::Eof)]);
        assert_eq!(buf.peek(1).kind, TokenKind::Eof);
        assert_eq!(buf.current().kind, TokenKind::Echo);
    }

    #[test]
    fn save_restore_roundtrips() {
        let mut buf = TokenBuffer::new(vec![
            tok(TokenKind::Echo),
            tok(TokenKind::SemiColon),
            tok(TokenKind::Eof),
        ]);
        let mark = buf.save();
        buf.advance();
        buf.advance();
        buf.restore(mark);
        assert_eq!(buf.current().kind, TokenKind::Echo);
    }

    #[test]
    fn synchronize_stops_after_semicolon() {
        let mut buf = TokenBuffer::new(vec![
            tok(TokenKind::Identifier),
            tok(TokenKind::SemiColon),
            tok(TokenKind::Echo),
            tok(TokenKind::Eof),
        ]);
        buf.synchronize();
        assert_eq!(buf.current().kind, TokenKind::Echo);
    }
}
