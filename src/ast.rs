use std::collections::HashMap;
use std::fmt;

/// Semantic tag of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Machine,
    Default,
    Login,
    Password,
    Account,
    Macdef,
    Comment,
    Whitespace,
}

/// Keyword spellings, matched case-sensitively.
const KEYWORDS: [(&str, TokenKind); 6] = [
    ("machine", TokenKind::Machine),
    ("default", TokenKind::Default),
    ("login", TokenKind::Login),
    ("password", TokenKind::Password),
    ("account", TokenKind::Account),
    ("macdef", TokenKind::Macdef),
];

impl TokenKind {
    /// Look up a scanned word in the keyword table.
    pub fn from_keyword(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, kind)| *kind)
    }

    /// Keyword text, `None` for comments and whitespace.
    pub fn keyword(self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(keyword, _)| *keyword)
    }

    /// Kinds whose prefix is only written while their value is non-empty.
    pub(crate) fn is_value_bearing(self) -> bool {
        matches!(
            self,
            TokenKind::Machine | TokenKind::Login | TokenKind::Password | TokenKind::Account
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword() {
            Some(keyword) => f.write_str(keyword),
            None => write!(f, "{:?}", self),
        }
    }
}

/// Credential fields of a record that can be updated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Login,
    Password,
    Account,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Login, Field::Password, Field::Account];

    pub fn kind(self) -> TokenKind {
        match self {
            Field::Login => TokenKind::Login,
            Field::Password => TokenKind::Password,
            Field::Account => TokenKind::Account,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Field::Login => "login",
            Field::Password => "password",
            Field::Account => "account",
        }
    }
}

/// Stable handle of a token inside a document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TokenId(pub(crate) usize);

/// One classified slice of the input.
///
/// `raw_prefix`, the raw macro name and `raw_value` hold the exact bytes
/// that were scanned, so writing them back in order reproduces the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Leading whitespace plus the keyword or comment text
    pub raw_prefix: String,
    /// Value bytes including their leading whitespace; the body for `macdef`
    pub raw_value: String,
    /// Trimmed value, or the macro body for `macdef`
    pub value: String,
    pub macro_name: Option<String>,
    pub(crate) raw_macro_name: String,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, raw_prefix: impl Into<String>) -> Self {
        Self {
            kind,
            raw_prefix: raw_prefix.into(),
            raw_value: String::new(),
            value: String::new(),
            macro_name: None,
            raw_macro_name: String::new(),
        }
    }

    /// A keyword token carrying `value`, separated from the keyword by a space.
    pub(crate) fn with_value(kind: TokenKind, raw_prefix: impl Into<String>, value: &str) -> Self {
        Self {
            raw_value: format!(" {}", value),
            value: value.to_owned(),
            ..Self::new(kind, raw_prefix)
        }
    }

    /// A field token on its own indented line.
    pub(crate) fn for_field(field: Field, value: &str) -> Self {
        Self::with_value(field.kind(), format!("\n\t{}", field.keyword()), value)
    }

    /// Replace the value, keeping whatever spacing preceded the old one.
    pub(crate) fn set_value(&mut self, value: &str) {
        let kept = match self.raw_value.strip_suffix(self.value.as_str()) {
            Some(head) => head.len(),
            None => self.raw_value.len() - self.raw_value.trim_start().len(),
        };
        self.raw_value.truncate(kept);
        self.raw_value.push_str(value);
        self.value = value.to_owned();
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        if !self.kind.is_value_bearing() || !self.value.is_empty() {
            out.push_str(&self.raw_prefix);
        }
        if self.kind == TokenKind::Macdef {
            out.push_str(&self.raw_macro_name);
        }
        out.push_str(&self.raw_value);
    }
}

/// Handles of the tokens backing each field of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FieldTokens {
    pub(crate) name: Option<TokenId>,
    pub(crate) login: Option<TokenId>,
    pub(crate) password: Option<TokenId>,
    pub(crate) account: Option<TokenId>,
}

impl FieldTokens {
    pub(crate) fn get(&self, field: Field) -> Option<TokenId> {
        match field {
            Field::Login => self.login,
            Field::Password => self.password,
            Field::Account => self.account,
        }
    }

    pub(crate) fn set(&mut self, field: Field, id: TokenId) {
        match field {
            Field::Login => self.login = Some(id),
            Field::Password => self.password = Some(id),
            Field::Account => self.account = Some(id),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = TokenId> {
        [self.name, self.login, self.password, self.account]
            .into_iter()
            .flatten()
    }
}

/// A `machine` entry, or the `default` entry when the name is empty
#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) name: String,
    pub(crate) login: String,
    pub(crate) password: String,
    pub(crate) account: String,
    pub(crate) tokens: FieldTokens,
}

impl Machine {
    pub(crate) fn new(name: impl Into<String>, name_token: TokenId) -> Self {
        Self {
            name: name.into(),
            login: String::new(),
            password: String::new(),
            account: String::new(),
            tokens: FieldTokens {
                name: Some(name_token),
                ..FieldTokens::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Login => &self.login,
            Field::Password => &self.password,
            Field::Account => &self.account,
        }
    }

    pub(crate) fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Login => &mut self.login,
            Field::Password => &mut self.password,
            Field::Account => &mut self.account,
        }
    }

    /// The fallback record matched when no name does.
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }

    pub(crate) fn key(&self) -> (&str, &str, &str) {
        (&self.login, &self.account, &self.name)
    }
}

/// Records compare by their credentials, not by where their tokens live.
impl PartialEq for Machine {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.login == other.login
            && self.password == other.password
            && self.account == other.account
    }
}

impl Eq for Machine {}

/// Macro definitions of a netrc document, keyed by macro name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Macros(HashMap<String, String>);

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define(&mut self, name: String, body: String) {
        self.0.insert(name, body);
    }

    /// Get a macro body by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_is_case_sensitive() {
        assert_eq!(TokenKind::from_keyword("machine"), Some(TokenKind::Machine));
        assert_eq!(TokenKind::from_keyword("Machine"), None);
        assert_eq!(TokenKind::from_keyword("#"), None);
        assert_eq!(TokenKind::Macdef.keyword(), Some("macdef"));
        assert_eq!(TokenKind::Comment.keyword(), None);
    }

    #[test]
    fn test_set_value_keeps_spacing() {
        let mut token = Token::new(TokenKind::Password, "\n\tpassword");
        token.raw_value = "   old".to_string();
        token.value = "old".to_string();

        token.set_value("new");
        assert_eq!(token.raw_value, "   new");
        assert_eq!(token.value, "new");

        let mut out = String::new();
        token.write_to(&mut out);
        assert_eq!(out, "\n\tpassword   new");
    }

    #[test]
    fn test_empty_value_drops_keyword() {
        let mut token = Token::with_value(TokenKind::Login, "\n\tlogin", "joe");
        token.set_value("");

        let mut out = String::new();
        token.write_to(&mut out);
        assert_eq!(out, " ");
    }

    #[test]
    fn test_machine_equality_ignores_tokens() {
        let a = Machine::new("host", TokenId(0));
        let b = Machine::new("host", TokenId(7));
        assert_eq!(a, b);
        assert!(!a.is_default());
        assert!(Machine::new("", TokenId(1)).is_default());
    }
}
