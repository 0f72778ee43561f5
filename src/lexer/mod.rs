pub mod token;

use crate::cursor::{self, Cursor};
use crate::span::Span;
use token::{Token, TokenKind};

/// Tag-mode state. PHP's lexer toggles between HTML and script text with
/// `<?php`/`<?=`/`?>`; a heredoc/nowdoc body is scanned as a single blob
/// while `PendingHeredoc` is active, then control returns to `InTag`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LexerMode {
    OutOfTag,
    InTag,
    PendingHeredoc { label: Vec<u8>, is_nowdoc: bool },
}

/// Options controlling which trivia survive into the token vector
/// returned by [`tokenize`]. The scanner always produces these tokens
/// internally so byte coverage holds regardless of what's kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexOptions {
    pub preserve_comments: bool,
    pub preserve_whitespace: bool,
    pub preserve_inline_html: bool,
}

impl Default for LexOptions {
    fn default() -> Self {
        Self {
            preserve_comments: true,
            preserve_whitespace: true,
            preserve_inline_html: true,
        }
    }
}

/// Scan `source` into a flat token vector, filtering trivia per `options`.
pub fn tokenize(source: &[u8], options: LexOptions) -> Vec<Token> {
    let mut tokens: Vec<Token> = Lexer::new(source).collect();
    if !options.preserve_whitespace {
        tokens.retain(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Newline));
    }
    if !options.preserve_comments {
        tokens.retain(|t| !matches!(t.kind, TokenKind::Comment | TokenKind::DocComment));
    }
    if !options.preserve_inline_html {
        tokens.retain(|t| t.kind != TokenKind::InlineHtml);
    }
    tokens
}

fn keyword_lookup(text: &[u8]) -> TokenKind {
    match text {
        b"or" => TokenKind::LogicalOr,
        b"and" => TokenKind::LogicalAnd,
        b"xor" => TokenKind::LogicalXor,
        b"bool" => TokenKind::TypeBool,
        b"int" => TokenKind::TypeInt,
        b"float" => TokenKind::TypeFloat,
        b"string" => TokenKind::TypeString,
        b"mixed" => TokenKind::TypeMixed,
        b"never" => TokenKind::TypeNever,
        b"null" => TokenKind::TypeNull,
        b"false" => TokenKind::TypeFalse,
        b"true" => TokenKind::TypeTrue,
        b"exit" | b"die" | b"__halt_compiler" => TokenKind::Exit,
        b"function" => TokenKind::Function,
        b"fn" => TokenKind::Fn,
        b"const" => TokenKind::Const,
        b"return" => TokenKind::Return,
        b"yield" => TokenKind::Yield,
        b"try" => TokenKind::Try,
        b"catch" => TokenKind::Catch,
        b"finally" => TokenKind::Finally,
        b"throw" => TokenKind::Throw,
        b"if" => TokenKind::If,
        b"elseif" => TokenKind::ElseIf,
        b"endif" => TokenKind::EndIf,
        b"else" => TokenKind::Else,
        b"insteadof" => TokenKind::Insteadof,
        b"while" => TokenKind::While,
        b"endwhile" => TokenKind::EndWhile,
        b"do" => TokenKind::Do,
        b"for" => TokenKind::For,
        b"endfor" => TokenKind::EndFor,
        b"foreach" => TokenKind::Foreach,
        b"endforeach" => TokenKind::EndForeach,
        b"declare" => TokenKind::Declare,
        b"enddeclare" => TokenKind::EndDeclare,
        b"instanceof" => TokenKind::InstanceOf,
        b"as" => TokenKind::As,
        b"switch" => TokenKind::Switch,
        b"endswitch" => TokenKind::EndSwitch,
        b"case" => TokenKind::Case,
        b"default" => TokenKind::Default,
        b"break" => TokenKind::Break,
        b"continue" => TokenKind::Continue,
        b"goto" => TokenKind::Goto,
        b"echo" => TokenKind::Echo,
        b"print" => TokenKind::Print,
        b"enum" => TokenKind::Enum,
        b"class" => TokenKind::Class,
        b"interface" => TokenKind::Interface,
        b"trait" => TokenKind::Trait,
        b"extends" => TokenKind::Extends,
        b"implements" => TokenKind::Implements,
        b"new" => TokenKind::New,
        b"clone" => TokenKind::Clone,
        b"var" => TokenKind::Public,
        b"public" => TokenKind::Public,
        b"protected" => TokenKind::Protected,
        b"private" => TokenKind::Private,
        b"final" => TokenKind::Final,
        b"abstract" => TokenKind::Abstract,
        b"static" => TokenKind::Static,
        b"readonly" => TokenKind::Readonly,
        b"namespace" => TokenKind::Namespace,
        b"use" => TokenKind::Use,
        b"global" => TokenKind::Global,
        b"isset" => TokenKind::Isset,
        b"empty" => TokenKind::Empty,
        b"__class__" => TokenKind::ClassC,
        b"__trait__" => TokenKind::TraitC,
        b"__function__" => TokenKind::FuncC,
        b"__method__" => TokenKind::MethodC,
        b"__line__" => TokenKind::Line,
        b"__file__" => TokenKind::File,
        b"__dir__" => TokenKind::Dir,
        b"__namespace__" => TokenKind::NsC,
        b"array" => TokenKind::Array,
        b"callable" => TokenKind::TypeCallable,
        b"iterable" => TokenKind::TypeIterable,
        b"void" => TokenKind::TypeVoid,
        b"object" => TokenKind::TypeObject,
        b"match" => TokenKind::Match,
        b"list" => TokenKind::List,
        b"include" => TokenKind::Include,
        b"include_once" => TokenKind::IncludeOnce,
        b"require" => TokenKind::Require,
        b"require_once" => TokenKind::RequireOnce,
        b"eval" => TokenKind::Eval,
        b"unset" => TokenKind::Unset,
        _ => TokenKind::Identifier,
    }
}

#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    mode: LexerMode,
    emitted_eof: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src [u8]) -> Self {
        let mut cursor = Cursor::new(input);
        if cursor.matches(b"#!") {
            cursor.consume_until_byte(b'\n');
        }
        Self {
            cursor,
            mode: LexerMode::OutOfTag,
            emitted_eof: false,
        }
    }

    pub fn slice(&self, span: Span) -> &'src [u8] {
        &self.cursor.input()[span.start..span.end]
    }

    fn peek(&self) -> Option<u8> {
        self.cursor.peek(0)
    }

    fn peek_n(&self, n: usize) -> Option<u8> {
        self.cursor.peek(n)
    }

    fn advance(&mut self) {
        self.cursor.advance();
    }

    fn advance_n(&mut self, n: usize) {
        self.cursor.skip(n);
    }

    fn read_identifier(&mut self) {
        self.cursor.consume_while(cursor::is_identifier_part);
    }

    fn read_number(&mut self) -> TokenKind {
        let mut is_float = false;

        if self.peek() == Some(b'0') {
            self.advance();
            match self.peek() {
                Some(b'x') | Some(b'X') => {
                    self.advance();
                    self.cursor
                        .consume_while(|c| cursor::is_hex_digit(c) || c == b'_');
                    return TokenKind::LNumber;
                }
                Some(b'b') | Some(b'B') => {
                    self.advance();
                    self.cursor
                        .consume_while(|c| cursor::is_binary_digit(c) || c == b'_');
                    return TokenKind::LNumber;
                }
                Some(b'o') | Some(b'O') => {
                    self.advance();
                    self.cursor
                        .consume_while(|c| cursor::is_octal_digit(c) || c == b'_');
                    return TokenKind::LNumber;
                }
                _ => {}
            }
        }

        while let Some(c) = self.peek() {
            if cursor::is_digit(c) || c == b'_' {
                self.advance();
            } else if c == b'.' {
                if is_float {
                    break;
                }
                is_float = true;
                self.advance();
            } else if c == b'e' || c == b'E' {
                is_float = true;
                self.advance();
                if let Some(next) = self.peek()
                    && (next == b'+' || next == b'-')
                {
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            TokenKind::DNumber
        } else {
            TokenKind::LNumber
        }
    }

    fn consume_single_line_comment(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                None => break,
                Some(b'\n') | Some(b'\r') => break,
                Some(b'?') if self.peek_n(1) == Some(b'>') => break,
                _ => self.advance(),
            }
        }
        TokenKind::Comment
    }

    fn consume_multi_line_comment(&mut self) -> TokenKind {
        let is_doc = if self.peek() == Some(b'*') && self.peek_n(1) != Some(b'/') {
            self.advance();
            true
        } else {
            false
        };

        while !self.cursor.is_at_end() {
            self.cursor.consume_until_byte(b'*');
            if self.cursor.is_at_end() {
                break;
            }
            self.advance(); // consume '*'
            if self.peek() == Some(b'/') {
                self.advance();
                return if is_doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::Comment
                };
            }
        }

        TokenKind::Unknown
    }

    fn read_single_quoted(&mut self) -> TokenKind {
        while let Some(c) = self.peek() {
            self.advance();
            if c == b'\\' {
                if self.peek().is_some() {
                    self.advance();
                }
                continue;
            }
            if c == b'\'' {
                return TokenKind::StringLiteral;
            }
        }
        TokenKind::Unknown
    }

    /// Scan a `"..."` or `` `...` `` literal as one atomic token; no
    /// interpolation boundary is detected here.
    fn read_delimited(&mut self, quote: u8) -> TokenKind {
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                return if quote == b'`' {
                    TokenKind::Backtick
                } else {
                    TokenKind::StringLiteral
                };
            } else if c == b'\\' {
                self.advance();
                if self.peek().is_some() {
                    self.advance();
                }
            } else {
                self.advance();
            }
        }
        TokenKind::Unknown
    }

    fn read_heredoc_start(&mut self, start: usize) -> Token {
        self.cursor.consume_while(cursor::is_horizontal_whitespace);

        let quote = self.peek();
        let is_quoted = quote == Some(b'\'') || quote == Some(b'"');
        let is_nowdoc = quote == Some(b'\'');

        if is_quoted {
            self.advance();
        }

        let label_span = self.cursor.consume_while(cursor::is_identifier_part);
        let label = self.cursor.input()[label_span.start..label_span.end].to_vec();

        if is_quoted && self.peek() == quote {
            self.advance();
        }

        match self.peek() {
            Some(b'\n') => self.advance(),
            Some(b'\r') => {
                self.advance();
                if self.peek() == Some(b'\n') {
                    self.advance();
                }
            }
            _ => {}
        }

        self.mode = LexerMode::PendingHeredoc { label, is_nowdoc };

        Token {
            kind: TokenKind::StartHeredoc,
            span: self.cursor.span_from(start),
        }
    }

    /// Offset of the byte past a matching end-label at the current
    /// position (after skipping leading indentation), if one starts here.
    fn check_heredoc_end(&self, label: &[u8]) -> Option<usize> {
        let input = self.cursor.input();
        let mut current = self.cursor.pos();
        while let Some(&b) = input.get(current) {
            if cursor::is_horizontal_whitespace(b) {
                current += 1;
            } else {
                break;
            }
        }

        if current + label.len() > input.len() {
            return None;
        }
        if &input[current..current + label.len()] != label {
            return None;
        }
        let after = current + label.len();
        let ok = match input.get(after) {
            None => true,
            Some(&c) => !c.is_ascii_alphanumeric() && c != b'_' && c < 0x80,
        };
        ok.then_some(after - self.cursor.pos())
    }

    fn next_heredoc_body(&mut self, label: Vec<u8>) -> Token {
        let start = self.cursor.pos();

        if self.cursor.is_at_end() {
            self.mode = LexerMode::InTag;
            return Token {
                kind: TokenKind::Eof,
                span: self.cursor.span_from(start),
            };
        }

        if let Some(len) = self.check_heredoc_end(&label) {
            self.advance_n(len);
            self.mode = LexerMode::InTag;
            return Token {
                kind: TokenKind::EndHeredoc,
                span: self.cursor.span_from(start),
            };
        }

        while let Some(c) = self.peek() {
            self.advance();
            if c == b'\n' && self.check_heredoc_end(&label).is_some() {
                break;
            }
        }

        Token {
            kind: TokenKind::EncapsedAndWhitespace,
            span: self.cursor.span_from(start),
        }
    }

    fn is_followed_by_var_or_vararg(&self) -> bool {
        let input = self.cursor.input();
        let mut i = self.cursor.pos();
        loop {
            let Some(&c) = input.get(i) else {
                return false;
            };
            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            if c == b'#' {
                while input.get(i).is_some_and(|&b| b != b'\n') {
                    i += 1;
                }
                continue;
            }
            if c == b'/' && input.get(i + 1) == Some(&b'/') {
                while input.get(i).is_some_and(|&b| b != b'\n') {
                    i += 1;
                }
                continue;
            }
            if c == b'/' && input.get(i + 1) == Some(&b'*') {
                i += 2;
                while let Some(&b) = input.get(i) {
                    if b == b'*' && input.get(i + 1) == Some(&b'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                continue;
            }
            if c == b'$'
                && let Some(&next) = input.get(i + 1)
                && (next.is_ascii_alphabetic() || next == b'_' || next >= 0x80)
            {
                return true;
            }
            if c == b'.' && input.get(i + 1) == Some(&b'.') && input.get(i + 2) == Some(&b'.') {
                return true;
            }
            return false;
        }
    }

    fn next_out_of_tag(&mut self) -> Token {
        let start = self.cursor.pos();
        loop {
            self.cursor.consume_until_byte(b'<');
            if self.cursor.matches(b"<?php") {
                if self.cursor.pos() > start {
                    return Token {
                        kind: TokenKind::InlineHtml,
                        span: self.cursor.span_from(start),
                    };
                }
                let tag_start = self.cursor.pos();
                self.advance_n(5);
                if self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                    self.advance();
                }
                self.mode = LexerMode::InTag;
                return Token {
                    kind: TokenKind::OpenTag,
                    span: self.cursor.span_from(tag_start),
                };
            } else if self.cursor.matches(b"<?=") {
                if self.cursor.pos() > start {
                    return Token {
                        kind: TokenKind::InlineHtml,
                        span: self.cursor.span_from(start),
                    };
                }
                let tag_start = self.cursor.pos();
                self.advance_n(3);
                self.mode = LexerMode::InTag;
                return Token {
                    kind: TokenKind::OpenTagEcho,
                    span: self.cursor.span_from(tag_start),
                };
            } else if self.cursor.is_at_end() {
                break;
            } else {
                self.advance();
            }
        }

        if self.cursor.pos() > start {
            Token {
                kind: TokenKind::InlineHtml,
                span: self.cursor.span_from(start),
            }
        } else {
            Token {
                kind: TokenKind::Eof,
                span: self.cursor.span_from(start),
            }
        }
    }

    fn next_in_tag(&mut self) -> Token {
        let start = self.cursor.pos();

        match self.peek() {
            Some(b' ') | Some(b'\t') => {
                self.cursor.consume_while(cursor::is_horizontal_whitespace);
                return Token {
                    kind: TokenKind::Whitespace,
                    span: self.cursor.span_from(start),
                };
            }
            Some(b'\r') if self.peek_n(1) == Some(b'\n') => {
                self.advance_n(2);
                return Token {
                    kind: TokenKind::Newline,
                    span: self.cursor.span_from(start),
                };
            }
            Some(b'\n') | Some(b'\r') => {
                self.advance();
                return Token {
                    kind: TokenKind::Newline,
                    span: self.cursor.span_from(start),
                };
            }
            _ => {}
        }

        if self.cursor.is_at_end() {
            return Token {
                kind: TokenKind::Eof,
                span: self.cursor.span_from(start),
            };
        }

        let c = self.cursor.advance().unwrap();

        let kind = match c {
            b'$' => {
                if let Some(next) = self.peek()
                    && cursor::is_identifier_start(next)
                {
                    self.read_identifier();
                    TokenKind::Variable
                } else {
                    TokenKind::Dollar
                }
            }
            b'\\' => TokenKind::NsSeparator,
            b'\'' => self.read_single_quoted(),
            b'"' => self.read_delimited(b'"'),
            b'`' => self.read_delimited(b'`'),
            b'#' => {
                if self.peek() == Some(b'[') {
                    self.advance();
                    TokenKind::Attribute
                } else {
                    self.consume_single_line_comment()
                }
            }
            b';' => TokenKind::SemiColon,
            b':' => {
                if self.peek() == Some(b':') {
                    self.advance();
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            b',' => TokenKind::Comma,
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'(' => self.lex_open_paren_or_cast(start),
            b')' => TokenKind::CloseParen,
            b'[' => TokenKind::OpenBracket,
            b']' => TokenKind::CloseBracket,
            b'+' => {
                if self.peek() == Some(b'+') {
                    self.advance();
                    TokenKind::Inc
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::Arrow
                } else if self.peek() == Some(b'-') {
                    self.advance();
                    TokenKind::Dec
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::PowEq
                    } else {
                        TokenKind::Pow
                    }
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::MulEq
                } else {
                    TokenKind::Asterisk
                }
            }
            b'/' => {
                if self.peek() == Some(b'/') {
                    self.advance();
                    self.consume_single_line_comment()
                } else if self.peek() == Some(b'*') {
                    self.advance();
                    self.consume_multi_line_comment()
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::DivEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::ModEq
                } else {
                    TokenKind::Percent
                }
            }
            b'.' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::ConcatEq
                } else if self.peek() == Some(b'.') && self.peek_n(1) == Some(b'.') {
                    self.advance_n(2);
                    TokenKind::Ellipsis
                } else if let Some(c) = self.peek()
                    && cursor::is_digit(c)
                {
                    self.cursor.restore(self.cursor.pos() - 1);
                    self.read_number()
                } else {
                    TokenKind::Dot
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::DoubleArrow
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'<') && self.peek_n(1) == Some(b'<') {
                    self.advance_n(2);
                    return self.read_heredoc_start(start);
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'>') {
                        self.advance();
                        TokenKind::Spaceship
                    } else {
                        TokenKind::LtEq
                    }
                } else if self.peek() == Some(b'<') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::SlEq
                    } else {
                        TokenKind::Sl
                    }
                } else if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::BangEq
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::GtEq
                } else if self.peek() == Some(b'>') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::SrEq
                    } else {
                        TokenKind::Sr
                    }
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AmpersandAmpersand
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::AndEq
                } else if self.is_followed_by_var_or_vararg() {
                    TokenKind::AmpersandFollowedByVarOrVararg
                } else {
                    TokenKind::AmpersandNotFollowedByVarOrVararg
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::PipePipe
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::OrEq
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::XorEq
                } else {
                    TokenKind::Caret
                }
            }
            b'~' => TokenKind::BitNot,
            b'@' => TokenKind::At,
            b'?' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    self.mode = LexerMode::OutOfTag;
                    TokenKind::CloseTag
                } else if self.peek() == Some(b'?') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::CoalesceEq
                    } else {
                        TokenKind::Coalesce
                    }
                } else if self.peek() == Some(b'-') && self.peek_n(1) == Some(b'>') {
                    self.advance_n(2);
                    TokenKind::NullSafeArrow
                } else {
                    TokenKind::Question
                }
            }
            c if cursor::is_digit(c) => {
                self.cursor.restore(self.cursor.pos() - 1);
                self.read_number()
            }
            c if cursor::is_identifier_start(c) => self.lex_identifier_or_keyword(start, c),
            _ => TokenKind::Unknown,
        };

        Token {
            kind,
            span: self.cursor.span_from(start),
        }
    }

    fn lex_open_paren_or_cast(&mut self, _start: usize) -> TokenKind {
        let saved = self.cursor.save();
        self.cursor.consume_while(cursor::is_horizontal_whitespace);
        let ident_span = self.cursor.consume_while(cursor::is_identifier_part);

        if !ident_span.is_empty() {
            let ident = self.cursor.input()[ident_span.start..ident_span.end].to_ascii_lowercase();
            self.cursor.consume_while(cursor::is_horizontal_whitespace);
            if self.peek() == Some(b')') {
                let cast_kind = match ident.as_slice() {
                    b"int" | b"integer" => Some(TokenKind::IntCast),
                    b"bool" | b"boolean" => Some(TokenKind::BoolCast),
                    b"float" | b"double" | b"real" => Some(TokenKind::FloatCast),
                    b"string" | b"binary" => Some(TokenKind::StringCast),
                    b"array" => Some(TokenKind::ArrayCast),
                    b"object" => Some(TokenKind::ObjectCast),
                    b"unset" => Some(TokenKind::UnsetCast),
                    b"void" => Some(TokenKind::VoidCast),
                    _ => None,
                };
                if let Some(k) = cast_kind {
                    self.advance();
                    return k;
                }
            }
        }
        self.cursor.restore(saved);
        TokenKind::OpenParen
    }

    fn lex_identifier_or_keyword(&mut self, start: usize, first: u8) -> TokenKind {
        if (first == b'b' || first == b'B')
            && let Some(next) = self.peek()
        {
            if next == b'\'' {
                self.advance();
                return self.read_single_quoted();
            } else if next == b'"' {
                self.advance();
                return self.read_delimited(b'"');
            }
        }

        self.read_identifier();
        let text = &self.cursor.input()[start..self.cursor.pos()];
        let is_all_lowercase = text.iter().all(|c| !c.is_ascii_uppercase());
        let mut kind = if is_all_lowercase {
            keyword_lookup(text)
        } else {
            keyword_lookup(&text.to_ascii_lowercase())
        };

        if kind == TokenKind::Yield {
            let saved = self.cursor.save();
            self.cursor.consume_while(|b| b.is_ascii_whitespace());
            if self.cursor.matches_ignore_ascii_case(b"from")
                && !self
                    .cursor
                    .peek(4)
                    .is_some_and(cursor::is_identifier_part)
            {
                self.advance_n(4);
                kind = TokenKind::YieldFrom;
            } else {
                self.cursor.restore(saved);
            }
        }

        kind
    }

    pub fn input_slice(&self, span: Span) -> &'src [u8] {
        &self.cursor.input()[span.start..span.end]
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_eof {
            return None;
        }

        let token = match &self.mode {
            LexerMode::OutOfTag => self.next_out_of_tag(),
            LexerMode::PendingHeredoc { label, .. } => {
                let label = label.clone();
                self.next_heredoc_body(label)
            }
            LexerMode::InTag => self.next_in_tag(),
        };

        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &[u8]) -> Vec<TokenKind> {
        tokenize(src, LexOptions::default())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_echo() {
        let ks = kinds(b"<?php echo 1;");
        assert_eq!(
            ks,
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::Whitespace,
                TokenKind::LNumber,
                TokenKind::SemiColon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn inline_html_before_open_tag() {
        let ks = kinds(b"hi <?php 1; ?>bye");
        assert_eq!(ks[0], TokenKind::InlineHtml);
        assert_eq!(ks[1], TokenKind::OpenTag);
        assert!(ks.contains(&TokenKind::CloseTag));
        assert_eq!(*ks.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn die_and_halt_compiler_alias_to_exit() {
        assert_eq!(kinds(b"<?php die;")[1], TokenKind::Exit);
        assert_eq!(kinds(b"<?php __halt_compiler;")[1], TokenKind::Exit);
    }

    #[test]
    fn heredoc_is_one_blob() {
        let src = b"<?php $x = <<<EOT\nhello $name\nEOT;\n";
        let ks = kinds(src);
        assert!(ks.contains(&TokenKind::StartHeredoc));
        assert!(ks.contains(&TokenKind::EncapsedAndWhitespace));
        assert!(ks.contains(&TokenKind::EndHeredoc));
    }

    #[test]
    fn nowdoc_is_one_blob() {
        let src = b"<?php $x = <<<'EOT'\nraw $not interpolated\nEOT;\n";
        let ks = kinds(src);
        assert!(ks.contains(&TokenKind::EncapsedAndWhitespace));
    }

    #[test]
    fn trivia_can_be_filtered() {
        let opts = LexOptions {
            preserve_comments: false,
            preserve_whitespace: false,
            preserve_inline_html: false,
        };
        let ks: Vec<_> = tokenize(b"<?php  // hi\n echo 1;", opts)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert!(!ks.contains(&TokenKind::Whitespace));
        assert!(!ks.contains(&TokenKind::Comment));
    }

    #[test]
    fn cast_disambiguated_from_parenthesized_expr() {
        assert!(kinds(b"<?php (int)$x;").contains(&TokenKind::IntCast));
        assert!(kinds(b"<?php ($x);").contains(&TokenKind::OpenParen));
    }

    #[test]
    fn yield_from_is_one_keyword() {
        assert!(kinds(b"<?php yield from $x;").contains(&TokenKind::YieldFrom));
    }
}
