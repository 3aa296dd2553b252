use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::ops::Deref;
use std::path::Path;

use crate::ast::{Field, Machine, Macros, Token, TokenId, TokenKind};
use crate::error::Result;
use crate::processor::parse;

/// A parsed netrc document.
///
/// Tokens live in an arena addressed by stable ids; `order` is the
/// serialization order and records point into the arena, so inserting or
/// removing a record never invalidates the handles held by the others.
/// Slots of removed tokens are reused by later insertions.
#[derive(Debug, Default, Clone)]
pub struct Netrc {
    arena: Vec<Option<Token>>,
    free: Vec<TokenId>,
    order: Vec<TokenId>,
    machines: Vec<Machine>,
    macros: Macros,
}

impl Netrc {
    /// Read everything from `reader` and parse it.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        parse(&buf)
    }

    /// Tokens in document order
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.order.iter().filter_map(|id| self.token(*id))
    }

    /// Records in document order
    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.iter()
    }

    pub fn macros(&self) -> &Macros {
        &self.macros
    }

    /// Call `f` on every record in order, stopping at the first error.
    pub fn visit<E, F>(&self, f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&Machine) -> std::result::Result<(), E>,
    {
        self.machines.iter().try_for_each(f)
    }

    /// Find the record named `name`, falling back to the default record.
    ///
    /// Use [`Machine::is_default`] to tell the fallback from an exact match.
    pub fn find_record(&self, name: &str) -> Option<&Machine> {
        self.position(name).map(|index| &self.machines[index])
    }

    /// Like [`Netrc::find_record`], returning a handle that can update fields.
    pub fn find_record_mut(&mut self, name: &str) -> Option<MachineMut<'_>> {
        let index = self.position(name)?;
        Some(MachineMut { netrc: self, index })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.machines
            .iter()
            .position(|m| m.name == name)
            .or_else(|| self.machines.iter().position(Machine::is_default))
    }

    /// Add a record, placed before the default record if there is one.
    ///
    /// Empty fields get no token. An empty `name` installs the default
    /// record itself, replacing any existing one.
    pub fn create_record(
        &mut self,
        name: &str,
        login: &str,
        password: &str,
        account: &str,
    ) -> MachineMut<'_> {
        if name.is_empty() {
            self.remove_record("");
        }

        let at = self
            .order
            .iter()
            .position(|id| self.token(*id).is_some_and(|t| t.kind == TokenKind::Default))
            .unwrap_or(self.order.len());
        let separator = if at == 0 { "" } else { "\n" };
        if let Some(next) = self.order.get(at).copied().and_then(|id| self.token_mut(id)) {
            if !next.raw_prefix.starts_with('\n') {
                next.raw_prefix.insert(0, '\n');
            }
        }

        let name_token = if name.is_empty() {
            Token::new(TokenKind::Default, format!("{}default", separator))
        } else {
            Token::with_value(TokenKind::Machine, format!("{}machine", separator), name)
        };
        let name_id = self.alloc(name_token);
        let mut ids = vec![name_id];
        let mut machine = Machine::new(name, name_id);
        for (field, value) in Field::ALL.into_iter().zip([login, password, account]) {
            if value.is_empty() {
                continue;
            }
            let id = self.alloc(Token::for_field(field, value));
            machine.tokens.set(field, id);
            *machine.field_mut(field) = value.to_string();
            ids.push(id);
        }
        self.order.splice(at..at, ids);

        let index = self
            .machines
            .iter()
            .position(Machine::is_default)
            .unwrap_or(self.machines.len());
        self.machines.insert(index, machine);
        tracing::debug!(name, index, "created netrc record");

        MachineMut { netrc: self, index }
    }

    /// Remove the first record named `name` together with its tokens.
    pub fn remove_record(&mut self, name: &str) {
        let Some(index) = self.machines.iter().position(|m| m.name == name) else {
            return;
        };
        let machine = self.machines.remove(index);
        for id in machine.tokens.iter() {
            self.order.retain(|other| *other != id);
            if let Some(slot) = self.arena.get_mut(id.0) {
                *slot = None;
                self.free.push(id);
            }
        }
        tracing::debug!(name, index, "removed netrc record");
    }

    /// Write the document back out, preserving untouched bytes exactly.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_string().as_bytes())
    }

    fn token(&self, id: TokenId) -> Option<&Token> {
        self.arena.get(id.0).and_then(Option::as_ref)
    }

    fn alloc(&mut self, token: Token) -> TokenId {
        match self.free.pop() {
            Some(id) => {
                self.arena[id.0] = Some(token);
                id
            }
            None => {
                self.arena.push(Some(token));
                TokenId(self.arena.len() - 1)
            }
        }
    }

    pub(crate) fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.arena.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn push_token(&mut self, token: Token) -> TokenId {
        let id = self.alloc(token);
        self.order.push(id);
        id
    }

    pub(crate) fn push_machine(&mut self, machine: Machine) {
        self.machines.push(machine);
    }

    pub(crate) fn macros_mut(&mut self) -> &mut Macros {
        &mut self.macros
    }

    fn machine_map(&self) -> HashMap<(&str, &str, &str), &Machine> {
        self.machines.iter().map(|m| (m.key(), m)).collect()
    }
}

/// Writes every token in order.
///
/// A macro body only ends at a blank line, so when an edit removed or blanked
/// the token that carried it, the missing newlines are put back in front of
/// whatever text follows the body.
impl fmt::Display for Netrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        let mut macro_end = None;
        for token in self.tokens() {
            let start = text.len();
            token.write_to(&mut text);
            if let (Some(needed), true) = (macro_end, text.len() > start) {
                let have = text[start..]
                    .bytes()
                    .take(needed)
                    .take_while(|b| *b == b'\n')
                    .count();
                text.insert_str(start, &"\n".repeat(needed - have));
                macro_end = None;
            }
            if token.kind == TokenKind::Macdef {
                macro_end = Some(if token.raw_value.ends_with('\n') { 1 } else { 2 });
            }
        }
        f.write_str(&text)
    }
}

/// Documents are equal when they hold the same records and macros,
/// regardless of layout.
impl PartialEq for Netrc {
    fn eq(&self, other: &Self) -> bool {
        self.machine_map() == other.machine_map() && self.macros == other.macros
    }
}

/// Mutable handle to one record of a [`Netrc`]
pub struct MachineMut<'a> {
    netrc: &'a mut Netrc,
    index: usize,
}

impl MachineMut<'_> {
    /// Set `field` to `value`, rewriting only the value bytes of its token.
    ///
    /// A field the record does not have yet gets a new token after the
    /// record's last one.
    pub fn update_field(&mut self, field: Field, value: &str) {
        let tokens = self.netrc.machines[self.index].tokens;
        match tokens.get(field) {
            Some(id) => {
                if let Some(token) = self.netrc.token_mut(id) {
                    token.set_value(value);
                }
            }
            None if value.is_empty() => {}
            None => {
                let at = tokens
                    .iter()
                    .filter_map(|id| self.netrc.order.iter().position(|o| *o == id))
                    .max()
                    .map_or(self.netrc.order.len(), |p| p + 1);
                let id = self.netrc.alloc(Token::for_field(field, value));
                self.netrc.order.insert(at, id);
                self.netrc.machines[self.index].tokens.set(field, id);
            }
        }
        *self.netrc.machines[self.index].field_mut(field) = value.to_string();
    }

    pub fn update_login(&mut self, login: &str) {
        self.update_field(Field::Login, login)
    }

    pub fn update_password(&mut self, password: &str) {
        self.update_field(Field::Password, password)
    }

    pub fn update_account(&mut self, account: &str) {
        self.update_field(Field::Account, account)
    }
}

impl Deref for MachineMut<'_> {
    type Target = Machine;

    fn deref(&self) -> &Machine {
        &self.netrc.machines[self.index]
    }
}

/// Parse the netrc file at `path`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Netrc> {
    let buf = std::fs::read(path)?;
    parse(&buf)
}

/// Parse the netrc file at `path` and look up `name` in it.
///
/// Falls back to the default record like [`Netrc::find_record`].
pub fn find_machine_in_file(path: impl AsRef<Path>, name: &str) -> Result<Option<Machine>> {
    Ok(parse_file(path)?.find_record(name).cloned())
}
