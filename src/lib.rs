//! Lossless reading and editing of netrc files.
//!
//! A parsed [`Netrc`] keeps every scanned byte, so serializing it without
//! edits gives back the input exactly, and edits only touch the bytes of the
//! records they change.

mod ast;
mod error;
mod netrc;
mod parser;
mod processor;
mod shared;

pub use ast::{Field, Machine, Macros, Token, TokenKind};
pub use error::{Error, Result};
pub use netrc::{MachineMut, Netrc, find_machine_in_file, parse_file};
pub use parser::{RawToken, Rule, Scanner, classify};
pub use processor::{parse, parse_str};
pub use shared::SharedNetrc;
