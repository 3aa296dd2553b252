use pest::{Parser, iterators::Pairs};
use pest_derive::Parser;

use crate::ast::TokenKind;
use crate::error::{Error, Result};

#[derive(Parser)]
#[grammar = "src/netrc.pest"]
pub struct NetrcParser;

/// A scanned slice: leading whitespace followed by a word or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken<'a> {
    text: &'a str,
    payload_start: usize,
}

impl<'a> RawToken<'a> {
    /// All scanned bytes, prefix included
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// The leading whitespace
    pub fn prefix(&self) -> &'a str {
        &self.text[..self.payload_start]
    }

    /// The word or comment after the prefix, empty for trailing whitespace
    pub fn payload(&self) -> &'a str {
        &self.text[self.payload_start..]
    }

    pub fn newlines(&self) -> usize {
        self.text.bytes().filter(|b| *b == b'\n').count()
    }

    /// Split at the first blank line.
    ///
    /// The head ends with the first of the two newlines; the tail starts at
    /// the second one and keeps the payload. A blank line is always inside
    /// the prefix since payloads never hold a newline.
    pub fn split_at_blank_line(&self) -> Option<(&'a str, RawToken<'a>)> {
        let at = self.prefix().find("\n\n")? + 1;
        let tail = RawToken {
            text: &self.text[at..],
            payload_start: self.payload_start - at,
        };
        Some((&self.text[..at], tail))
    }

    /// Determine the kind of this token from its payload.
    pub fn classify(&self) -> Option<TokenKind> {
        classify(self.payload())
    }
}

/// Keyword, comment or whitespace; `None` for anything else.
pub fn classify(payload: &str) -> Option<TokenKind> {
    if let Some(kind) = TokenKind::from_keyword(payload) {
        return Some(kind);
    }
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        Some(TokenKind::Whitespace)
    } else if trimmed.starts_with('#') {
        Some(TokenKind::Comment)
    } else {
        None
    }
}

/// Forward-only sequence of raw tokens over a netrc text
pub struct Scanner<'a> {
    pairs: Pairs<'a, Rule>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Result<Self> {
        let mut pairs = NetrcParser::parse(Rule::file, input).map_err(Box::new)?;
        let file = pairs.next().ok_or_else(|| {
            Error::Grammar(Box::new(pest::error::Error::new_from_pos(
                pest::error::ErrorVariant::CustomError {
                    message: "parser returned no file rule".to_string(),
                },
                pest::Position::from_start(input),
            )))
        })?;

        Ok(Self {
            pairs: file.into_inner(),
        })
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = RawToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for pair in self.pairs.by_ref() {
            let span = pair.as_span();
            match pair.as_rule() {
                Rule::token => {
                    let payload = pair.into_inner().next()?;
                    return Some(RawToken {
                        text: span.as_str(),
                        payload_start: payload.as_span().start() - span.start(),
                    });
                }
                Rule::trailing => {
                    return Some(RawToken {
                        text: span.as_str(),
                        payload_start: span.as_str().len(),
                    });
                }
                _ => continue,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scan(input: &str) -> Vec<(&str, &str)> {
        Scanner::new(input)
            .unwrap()
            .map(|t| (t.prefix(), t.payload()))
            .collect()
    }

    #[test]
    fn test_scan_words_keep_prefix() {
        assert_eq!(
            scan("machine a\n\tlogin b"),
            vec![
                ("", "machine"),
                (" ", "a"),
                ("\n\t", "login"),
                (" ", "b"),
            ]
        );
    }

    #[test]
    fn test_scan_comment_to_end_of_line() {
        assert_eq!(
            scan("  # a comment  \r\nmachine x"),
            vec![
                ("  ", "# a comment  \r"),
                ("\n", "machine"),
                (" ", "x"),
            ]
        );
    }

    #[test]
    fn test_scan_trailing_whitespace() {
        let tokens = scan("default\n\t\n ");
        assert_eq!(tokens, vec![("", "default"), ("\n\t\n ", "")]);
        assert!(scan("").is_empty());
        assert_eq!(scan("\n\n"), vec![("\n\n", "")]);
    }

    #[test]
    fn test_scan_unicode_whitespace() {
        assert_eq!(scan("a\u{a0}b"), vec![("", "a"), ("\u{a0}", "b")]);
    }

    #[test]
    fn test_hash_inside_word_is_not_a_comment() {
        assert_eq!(scan("pass#pass x"), vec![("", "pass#pass"), (" ", "x")]);
    }

    #[test]
    fn test_split_at_blank_line() {
        let token = Scanner::new("\n\n\tmachine").unwrap().next().unwrap();
        let (head, tail) = token.split_at_blank_line().unwrap();
        assert_eq!(head, "\n");
        assert_eq!(tail.prefix(), "\n\t");
        assert_eq!(tail.payload(), "machine");

        let token = Scanner::new("\nmachine").unwrap().next().unwrap();
        assert!(token.split_at_blank_line().is_none());
    }

    #[rstest]
    #[case("machine", TokenKind::Machine)]
    #[case("default", TokenKind::Default)]
    #[case("login", TokenKind::Login)]
    #[case("password", TokenKind::Password)]
    #[case("account", TokenKind::Account)]
    #[case("macdef", TokenKind::Macdef)]
    #[case("# comment stuff ", TokenKind::Comment)]
    #[case("#", TokenKind::Comment)]
    #[case("", TokenKind::Whitespace)]
    fn test_classify(#[case] payload: &str, #[case] kind: TokenKind) {
        assert_eq!(classify(payload), Some(kind));
    }

    #[rstest]
    #[case("junk")]
    #[case("Machine")]
    #[case("account#unspaced")]
    fn test_classify_rejects(#[case] payload: &str) {
        assert_eq!(classify(payload), None);
    }
}
