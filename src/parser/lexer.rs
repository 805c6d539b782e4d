use logos::Logos;

use crate::parser::span::Location;

/// Token types for Joos 1W source.
///
/// The full Java 1.3 keyword and operator set is tokenized so that the
/// parser can reject unsupported constructs with a precise message instead
/// of a generic lexical error.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    // Keywords
    #[token("abstract")]
    Abstract,
    #[token("boolean")]
    Boolean,
    #[token("break")]
    Break,
    #[token("byte")]
    Byte,
    #[token("case")]
    Case,
    #[token("catch")]
    Catch,
    #[token("char")]
    Char,
    #[token("class")]
    Class,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("do")]
    Do,
    #[token("double")]
    Double,
    #[token("else")]
    Else,
    #[token("extends")]
    Extends,
    #[token("final")]
    Final,
    #[token("finally")]
    Finally,
    #[token("float")]
    Float,
    #[token("for")]
    For,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("implements")]
    Implements,
    #[token("import")]
    Import,
    #[token("instanceof")]
    InstanceOf,
    #[token("int")]
    Int,
    #[token("interface")]
    Interface,
    #[token("long")]
    Long,
    #[token("native")]
    Native,
    #[token("new")]
    New,
    #[token("package")]
    Package,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("return")]
    Return,
    #[token("short")]
    Short,
    #[token("static")]
    Static,
    #[token("strictfp")]
    Strictfp,
    #[token("super")]
    Super,
    #[token("switch")]
    Switch,
    #[token("synchronized")]
    Synchronized,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("throws")]
    Throws,
    #[token("transient")]
    Transient,
    #[token("try")]
    Try,
    #[token("void")]
    Void,
    #[token("volatile")]
    Volatile,
    #[token("while")]
    While,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators
    #[token("=")]
    Assign,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("!")]
    Bang,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token(">>>")]
    URShift,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,
    #[regex(r"'([^'\\\n]|\\.)+'")]
    CharLiteral,
    #[regex(r"0|[1-9][0-9]*")]
    DecimalInteger,
    // Octal and leading-zero literals are not part of Joos; tokenized so
    // the weeder can reject them with a classified message.
    #[regex(r"0[0-9]+")]
    LeadingZeroInteger,

    // Identifiers
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    // Comments and whitespace
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 3)]
    BlockComment,
    #[regex(r"[ \t\n\r\x0c]+", priority = 3)]
    Whitespace,
}

impl Token {
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Token::Public
                | Token::Protected
                | Token::Private
                | Token::Abstract
                | Token::Static
                | Token::Final
                | Token::Native
                | Token::Synchronized
                | Token::Transient
                | Token::Volatile
                | Token::Strictfp
        )
    }

    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            Token::Boolean | Token::Byte | Token::Short | Token::Int | Token::Char
        )
    }
}

/// Lexical token with its source text and location.
#[derive(Debug, Clone)]
pub struct LexicalToken {
    pub token: Token,
    pub lexeme: String,
    pub location: Location,
}

impl LexicalToken {
    pub fn new(token: Token, lexeme: String, location: Location) -> Self {
        Self { token, lexeme, location }
    }

    pub fn is(&self, token: Token) -> bool {
        self.token == token
    }
}

/// Error raised while tokenizing, carrying the offending location.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {location}")]
pub struct LexError {
    pub message: String,
    pub location: Location,
}

/// Lexer for Joos source, wrapping the logos-generated token stream with
/// line/column tracking.
pub struct Lexer<'a> {
    lexer: logos::Lexer<'a, Token>,
    location: Location,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Token::lexer(source),
            location: Location::start(),
        }
    }

    fn next_token(&mut self) -> Option<Result<LexicalToken, LexError>> {
        let token = self.lexer.next()?;
        let lexeme = self.lexer.slice().to_string();
        let location = self.location;
        for ch in lexeme.chars() {
            self.location.advance(ch);
        }

        match token {
            Ok(token) => Some(Ok(LexicalToken::new(token, lexeme, location))),
            Err(()) => Some(Err(LexError {
                message: format!("unrecognized input '{lexeme}'"),
                location,
            })),
        }
    }

    /// Tokenize the whole input, skipping comments and whitespace.
    ///
    /// Joos source is restricted to ASCII; anything else is a lexical error.
    pub fn tokenize(mut self) -> Result<Vec<LexicalToken>, LexError> {
        if let Some(bad) = self.lexer.source().chars().find(|c| !c.is_ascii()) {
            return Err(LexError {
                message: format!("non-ASCII character '{bad}' in input"),
                location: self.location,
            });
        }

        let mut tokens = Vec::new();
        while let Some(result) = self.next_token() {
            let token = result?;
            if !matches!(
                token.token,
                Token::Whitespace | Token::LineComment | Token::BlockComment
            ) {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }
}

/// Decode the escape sequences of a char or string literal body (the text
/// between the quotes). Returns the decoded characters.
pub fn unescape(body: &str) -> Result<Vec<char>, String> {
    let mut out = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let esc = chars.next().ok_or("dangling escape")?;
        match esc {
            'b' => out.push('\u{0008}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{000c}'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            '0'..='7' => {
                // octal escape: up to three digits, at most 0377
                let mut value = esc.to_digit(8).unwrap();
                let max_len = if esc <= '3' { 2 } else { 1 };
                for _ in 0..max_len {
                    match chars.peek() {
                        Some(d) if d.is_digit(8) => {
                            value = value * 8 + d.to_digit(8).unwrap();
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value).ok_or("invalid octal escape")?);
            }
            other => return Err(format!("invalid escape sequence '\\{other}'")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_identifiers() {
        let tokens = Lexer::new("public class Test extends Object").tokenize().unwrap();
        let kinds: Vec<Token> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(
            kinds,
            vec![Token::Public, Token::Class, Token::Identifier, Token::Extends, Token::Identifier]
        );
        assert_eq!(tokens[2].lexeme, "Test");
    }

    #[test]
    fn literals() {
        let tokens = Lexer::new(r#"42 0 "hi\n" 'a' '\377' true null"#).tokenize().unwrap();
        let kinds: Vec<Token> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::DecimalInteger,
                Token::DecimalInteger,
                Token::StringLiteral,
                Token::CharLiteral,
                Token::CharLiteral,
                Token::True,
                Token::Null,
            ]
        );
    }

    #[test]
    fn leading_zero_integer_is_flagged() {
        let tokens = Lexer::new("017").tokenize().unwrap();
        assert_eq!(tokens[0].token, Token::LeadingZeroInteger);
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = Lexer::new("// line\n/* block\n * more */ x").tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[0].location.line, 3);
    }

    #[test]
    fn locations_track_lines() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!(tokens[1].location.line, 2);
        assert_eq!(tokens[1].location.column, 3);
    }

    #[test]
    fn non_ascii_rejected() {
        assert!(Lexer::new("int \u{00e9} = 1;").tokenize().is_err());
    }

    #[test]
    fn unescape_octal() {
        assert_eq!(unescape(r"\377").unwrap(), vec!['\u{ff}']);
        assert_eq!(unescape(r"a\tb").unwrap(), vec!['a', '\t', 'b']);
        assert!(unescape(r"\q").is_err());
    }
}
