//! Resolution of typed class/command tokens into specification entries.
//!
//! A token that parses as an integer literal small enough to be a key is
//! looked up by key; anything else is looked up by name. The class token and
//! the command token are resolved independently of each other.

use zwave_console_spec_tables::{CommandClassEntry, CommandClassSpecification, CommandEntry, Ident};

use crate::error::ConsoleError;
use crate::literal::{LiteralError, parse_int};

/// Command class version used when `send` carries no `-v=` option.
pub const DEFAULT_VERSION: u8 = 1;

const VERSION_FLAG: &str = "-v=";

/// A command class entry together with one of its commands.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCommand<'s> {
    /// The class, at the requested version.
    pub class: &'s CommandClassEntry,
    /// The command within `class`.
    pub command: &'s CommandEntry,
}

/// Interpret a typed token as a key or a name.
pub fn ident(token: &str) -> Ident<'_> {
    match parse_int(token).ok().and_then(|v| u8::try_from(v).ok()) {
        Some(key) => Ident::Key(key),
        None => Ident::Name(token),
    }
}

/// Recognize a `-v=<version>` option.
///
/// Returns `None` when `token` is not a version option at all, and
/// `Some(Err(_))` when it is but the value is unusable.
pub fn version_option(token: &str) -> Option<Result<u8, LiteralError>> {
    let value = token.strip_prefix(VERSION_FLAG)?;
    Some(parse_int(value).and_then(|v| {
        u8::try_from(v).map_err(|_| LiteralError::Overflow(value.to_string()))
    }))
}

/// Resolve `class_token` at `version`, then `command_token` within it.
pub fn resolve<'s>(
    spec: &'s CommandClassSpecification,
    class_token: &str,
    command_token: &str,
    version: u8,
) -> Result<ResolvedCommand<'s>, ConsoleError> {
    let class = spec
        .resolve_command_class(ident(class_token), version)
        .ok_or_else(|| ConsoleError::CommandClassNotFound {
            class: class_token.to_string(),
            version,
        })?;
    let command =
        class
            .resolve_command(ident(command_token))
            .ok_or_else(|| ConsoleError::CommandNotFound {
                class: class.name.clone(),
                command: command_token.to_string(),
                version,
            })?;
    Ok(ResolvedCommand { class, command })
}
