use crate::ast::{Field, Machine, Token, TokenId, TokenKind};
use crate::error::{Error, Result};
use crate::netrc::Netrc;
use crate::parser::{RawToken, Scanner};

/// Parse a netrc document from raw bytes.
///
/// The ``default`` record is the one with an empty name; there can be only
/// one and it must come last. Parsing stops at the first error.
pub fn parse(input: &[u8]) -> Result<Netrc> {
    match std::str::from_utf8(input) {
        Ok(text) => parse_str(text),
        Err(e) => {
            let valid = &input[..e.valid_up_to()];
            let line = 1 + valid.iter().filter(|b| **b == b'\n').count();
            Err(Error::InvalidUtf8 { line })
        }
    }
}

/// Parse a netrc document from text.
pub fn parse_str(input: &str) -> Result<Netrc> {
    let netrc = Processor::new(Scanner::new(input)?).run()?;
    tracing::debug!(
        machines = netrc.machines().count(),
        macros = netrc.macros().len(),
        "parsed netrc"
    );
    Ok(netrc)
}

/// Record parser: assembles raw tokens into records and macros
struct Processor<'a> {
    scanner: Scanner<'a>,
    line: usize,
    netrc: Netrc,
    current: Option<Machine>,
    default_seen: bool,
    current_macro: Option<TokenId>,
}

impl<'a> Processor<'a> {
    fn new(scanner: Scanner<'a>) -> Self {
        Self {
            scanner,
            line: 1,
            netrc: Netrc::default(),
            current: None,
            default_seen: false,
            current_macro: None,
        }
    }

    fn run(mut self) -> Result<Netrc> {
        while let Some(raw) = self.scanner.next() {
            self.line += raw.newlines();

            let raw = match self.current_macro {
                Some(id) => match self.feed_macro(id, raw) {
                    Some(rest) => rest,
                    None => continue,
                },
                None => raw,
            };
            self.process(raw)?;
        }

        if let Some(id) = self.current_macro.take() {
            self.close_macro(id);
        }
        self.close_machine();
        Ok(self.netrc)
    }

    /// Append a raw token to the open macro body.
    ///
    /// Returns what follows a blank line, which ends the body.
    fn feed_macro(&mut self, id: TokenId, raw: RawToken<'a>) -> Option<RawToken<'a>> {
        match raw.split_at_blank_line() {
            Some((head, rest)) => {
                if let Some(token) = self.netrc.token_mut(id) {
                    token.raw_value.push_str(head);
                }
                self.current_macro = None;
                self.close_macro(id);
                Some(rest)
            }
            None => {
                if let Some(token) = self.netrc.token_mut(id) {
                    token.raw_value.push_str(raw.text());
                }
                None
            }
        }
    }

    fn close_macro(&mut self, id: TokenId) {
        let Some(token) = self.netrc.token_mut(id) else {
            return;
        };
        token.value = token.raw_value.trim_start_matches(['\r', '\n']).to_string();
        let name = token.macro_name.clone().unwrap_or_default();
        let body = token.value.clone();
        tracing::trace!(name = %name, len = body.len(), "closed macro");
        self.netrc.macros_mut().define(name, body);
    }

    fn close_machine(&mut self) {
        if let Some(machine) = self.current.take() {
            self.netrc.push_machine(machine);
        }
    }

    fn process(&mut self, raw: RawToken<'a>) -> Result<()> {
        let kind = raw.classify().ok_or_else(|| Error::Syntax {
            line: self.line,
            word: raw.payload().to_string(),
        })?;
        let mut token = Token::new(kind, raw.text());

        match kind {
            TokenKind::Macdef => {
                let (raw_name, name) = self.next_value(kind)?;
                token.raw_macro_name = raw_name;
                token.macro_name = Some(name);
                self.current_macro = Some(self.netrc.push_token(token));
            }
            TokenKind::Default => {
                if self.default_seen {
                    return Err(Error::DuplicateDefault { line: self.line });
                }
                self.close_machine();
                let id = self.netrc.push_token(token);
                self.current = Some(Machine::new("", id));
                self.default_seen = true;
            }
            TokenKind::Machine => {
                if self.default_seen {
                    return Err(Error::DefaultOrder { line: self.line });
                }
                self.close_machine();
                let (raw_value, name) = self.next_value(kind)?;
                token.raw_value = raw_value;
                token.value = name.clone();
                let id = self.netrc.push_token(token);
                self.current = Some(Machine::new(name, id));
            }
            TokenKind::Login => self.field(Field::Login, token)?,
            TokenKind::Password => self.field(Field::Password, token)?,
            TokenKind::Account => self.field(Field::Account, token)?,
            TokenKind::Comment | TokenKind::Whitespace => {
                self.netrc.push_token(token);
            }
        }
        Ok(())
    }

    fn field(&mut self, field: Field, mut token: Token) -> Result<()> {
        let unexpected = Error::UnexpectedField {
            line: self.line,
            keyword: field.kind(),
        };
        match &self.current {
            Some(machine) if machine.field(field).is_empty() => {}
            _ => return Err(unexpected),
        }

        let (raw_value, value) = self.next_value(field.kind())?;
        token.raw_value = raw_value;
        token.value = value.clone();
        let id = self.netrc.push_token(token);

        if let Some(machine) = self.current.as_mut() {
            *machine.field_mut(field) = value;
            machine.tokens.set(field, id);
        }
        Ok(())
    }

    /// Scan the raw token that follows a keyword as its value.
    fn next_value(&mut self, keyword: TokenKind) -> Result<(String, String)> {
        let line = self.line;
        let raw = self
            .scanner
            .next()
            .ok_or(Error::MissingValue { line, keyword })?;
        self.line += raw.newlines();

        let value = raw.text().trim();
        if value.is_empty() {
            return Err(Error::MissingValue {
                line: self.line,
                keyword,
            });
        }
        Ok((raw.text().to_string(), value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GOOD: &str = include_str!("../testdata/good.netrc");

    fn names(netrc: &Netrc) -> Vec<&str> {
        netrc.machines().map(Machine::name).collect()
    }

    #[test]
    fn test_parse_good() {
        let netrc = parse_str(GOOD).unwrap();
        let machines: Vec<_> = netrc
            .machines()
            .map(|m| (m.name(), m.login(), m.password(), m.account()))
            .collect();
        assert_eq!(
            machines,
            vec![
                ("mail.google.com", "joe@gmail.com", "somethingSecret", "gmail"),
                ("ray", "demo", "mypassword", ""),
                ("weirdlogin", "uname", "pass#pass", ""),
                ("", "anonymous", "joe@example.com", ""),
            ]
        );

        let macros = netrc.macros();
        assert_eq!(macros.len(), 2);
        assert_eq!(macros.get("allput"), Some("put src/*\n"));
        assert_eq!(macros.get("allput2"), Some("  put src/*\nput src2/*\n"));
    }

    #[test]
    fn test_macro_body_boundary() {
        let netrc = parse_str("macdef foo\nline1\nline2\n\nmachine a\n").unwrap();
        assert_eq!(netrc.macros().get("foo"), Some("line1\nline2\n"));
        assert_eq!(names(&netrc), vec!["a"]);
    }

    #[test]
    fn test_macro_body_swallows_keywords() {
        let input = "macdef init\nlogin anonymous\n# not a comment\n\ndefault login x\n";
        let netrc = parse_str(input).unwrap();
        assert_eq!(
            netrc.macros().get("init"),
            Some("login anonymous\n# not a comment\n")
        );
        assert_eq!(names(&netrc), vec![""]);
        assert_eq!(netrc.serialize(), input.as_bytes());
    }

    #[test]
    fn test_macro_closed_at_end_of_input() {
        let netrc = parse_str("machine a\nmacdef bye\nquit\n").unwrap();
        assert_eq!(netrc.macros().get("bye"), Some("quit\n"));
        assert_eq!(names(&netrc), vec!["a"]);
    }

    #[test]
    fn test_junk_after_macro_is_an_error() {
        let err = parse_str("macdef m\nfoo\n\nbar\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 4, ref word } if word == "bar"));
    }

    #[test]
    fn test_default_order() {
        let err = parse_str("machine a\ndefault\nmachine b\n").unwrap_err();
        assert!(err.is_bad_default_order());
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_default_order_fixture() {
        let input = include_str!("../testdata/bad_default_order.netrc");
        let err = parse_str(input).unwrap_err();
        assert!(err.is_bad_default_order());
    }

    #[rstest]
    #[case("machine a\nlogin x\nlogin y\n", 3)]
    #[case("login x\n", 1)]
    #[case("machine a password p\n\n\n  password q", 4)]
    fn test_unexpected_field(#[case] input: &str, #[case] line: usize) {
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, Error::UnexpectedField { .. }), "{err}");
        assert_eq!(err.line(), Some(line));
    }

    #[test]
    fn test_duplicate_default() {
        let err = parse_str("default login a\ndefault login b\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateDefault { line: 2 }));
    }

    #[rstest]
    #[case("machine")]
    #[case("machine a login  \n")]
    #[case("macdef")]
    fn test_missing_value(#[case] input: &str) {
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, Error::MissingValue { .. }), "{err}");
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_str("machine a\n  junk\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2: keyword expected; got junk");
    }

    #[test]
    fn test_keyword_as_value() {
        let netrc = parse_str("machine a login password password login").unwrap();
        let m = netrc.find_record("a").unwrap();
        assert_eq!(m.login(), "password");
        assert_eq!(m.password(), "login");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse(b"machine a\nlogin \xff\n").unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { line: 2 }));
    }

    #[test]
    fn test_empty_input() {
        let netrc = parse(b"").unwrap();
        assert_eq!(netrc.machines().count(), 0);
        assert!(netrc.serialize().is_empty());
    }
}
