use log::trace;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Function,
    Let,
    Var,
    Const,
    If,
    Else,
    While,
    Return,
    True,
    False,
    /// Reserved words the parser recognises only to reject them.
    Reserved(String),

    // Identifiers and literals
    Identifier(String),
    Number(f64),
    Str(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    AndAnd,
    OrOr,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,
}

/// A token together with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

fn keyword_or_identifier(word: &str) -> Token {
    match word {
        "function" => Token::Function,
        "let" => Token::Let,
        "var" => Token::Var,
        "const" => Token::Const,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "return" => Token::Return,
        "true" => Token::True,
        "false" => Token::False,
        "for" | "do" | "switch" | "case" | "break" | "continue" | "try" | "catch" | "throw"
        | "new" | "class" => Token::Reserved(word.to_string()),
        _ => Token::Identifier(word.to_string()),
    }
}

fn parse_word(input: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"), tag("$"))),
            many0(alt((alphanumeric1, tag("_"), tag("$")))),
        )),
        keyword_or_identifier,
    )(input)
}

fn parse_number(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((digit1, opt(pair(char('.'), digit1))))),
        |s: &str| s.parse::<f64>().map(Token::Number),
    )(input)
}

/// Characters between the quotes, with `\\`, `\'`, `\"` and `\n` unescaped.
fn string_contents<'a>(stop: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    map(
        opt(escaped_transform(
            is_not(stop),
            '\\',
            alt((
                value("\\", char('\\')),
                value("'", char('\'')),
                value("\"", char('"')),
                value("\n", char('n')),
            )),
        )),
        Option::unwrap_or_default,
    )
}

fn parse_string(input: &str) -> IResult<&str, Token> {
    alt((
        map(
            delimited(char('\''), string_contents("\\'\n"), char('\'')),
            Token::Str,
        ),
        map(
            delimited(char('"'), string_contents("\\\"\n"), char('"')),
            Token::Str,
        ),
    ))(input)
}

fn parse_long_operator(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::EqualEqualEqual, tag("===")),
        value(Token::BangEqualEqual, tag("!==")),
        value(Token::EqualEqual, tag("==")),
        value(Token::BangEqual, tag("!=")),
        value(Token::LessEqual, tag("<=")),
        value(Token::GreaterEqual, tag(">=")),
        value(Token::AndAnd, tag("&&")),
        value(Token::OrOr, tag("||")),
        value(Token::PlusPlus, tag("++")),
        value(Token::MinusMinus, tag("--")),
        value(Token::PlusAssign, tag("+=")),
        value(Token::MinusAssign, tag("-=")),
        value(Token::StarAssign, tag("*=")),
        value(Token::SlashAssign, tag("/=")),
        value(Token::PercentAssign, tag("%=")),
    ))(input)
}

fn parse_short_operator(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::Bang, char('!')),
        value(Token::Less, char('<')),
        value(Token::Greater, char('>')),
        value(Token::Assign, char('=')),
    ))(input)
}

fn parse_delimiter(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::LeftParen, char('(')),
        value(Token::RightParen, char(')')),
        value(Token::LeftBrace, char('{')),
        value(Token::RightBrace, char('}')),
        value(Token::Comma, char(',')),
        value(Token::Semicolon, char(';')),
    ))(input)
}

fn parse_token(input: &str) -> IResult<&str, Token> {
    alt((
        parse_word,
        parse_number,
        parse_string,
        parse_long_operator,
        parse_short_operator,
        parse_delimiter,
    ))(input)
}

/// Whitespace and comments; the parsed slice is returned so newlines can be counted.
fn parse_trivia(input: &str) -> IResult<&str, &str> {
    alt((
        multispace1,
        recognize(preceded(tag("//"), not_line_ending)),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut remaining = input;
    let mut line = 1;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        if let Ok((rest, skipped)) = parse_trivia(remaining) {
            line += skipped.matches('\n').count();
            remaining = rest;
            continue;
        }

        match parse_token(remaining) {
            Ok((rest, token)) => {
                trace!("line {}: {:?}", line, token);
                tokens.push(Spanned { token, line });
                remaining = rest;
            }
            Err(_) => {
                let found: String = remaining.chars().take(10).collect();
                return Err(Error::syntax(
                    line,
                    format!("Unexpected input near {:?}", found),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_tokenize_keywords_and_identifiers() {
        assert_eq!(
            kinds("function letter let x"),
            vec![
                Token::Function,
                Token::Identifier("letter".to_string()),
                Token::Let,
                Token::Identifier("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_operators_longest_first() {
        assert_eq!(
            kinds("a === b !== c <= d ++ -= e"),
            vec![
                Token::Identifier("a".to_string()),
                Token::EqualEqualEqual,
                Token::Identifier("b".to_string()),
                Token::BangEqualEqual,
                Token::Identifier("c".to_string()),
                Token::LessEqual,
                Token::Identifier("d".to_string()),
                Token::PlusPlus,
                Token::MinusAssign,
                Token::Identifier("e".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds("42 3.5 'hi' \"yo\" true"),
            vec![
                Token::Number(42.0),
                Token::Number(3.5),
                Token::Str("hi".to_string()),
                Token::Str("yo".to_string()),
                Token::True,
            ]
        );
    }

    #[test]
    fn test_tokenize_tracks_lines_through_comments() {
        let tokens = tokenize("a\n// note\n/* two\nlines */ b\n\nc").unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 4, 6]);
    }

    #[test]
    fn test_tokenize_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "say \"hi\"" 'a\\b' '' 'x\ny'"#),
            vec![
                Token::Str("it's".to_string()),
                Token::Str("say \"hi\"".to_string()),
                Token::Str("a\\b".to_string()),
                Token::Str(String::new()),
                Token::Str("x\ny".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_unterminated_string() {
        assert!(matches!(tokenize("'abc"), Err(Error::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_tokenize_reserved_words() {
        assert_eq!(kinds("for"), vec![Token::Reserved("for".to_string())]);
    }

    #[test]
    fn test_tokenize_rejects_unknown_characters() {
        let err = tokenize("a\n#b").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }));
    }
}
