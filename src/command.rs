//! Text commands for driving a [`Memory`](crate::Memory) interactively.
//!
//! ```text
//! init <size>          create a memory of <size> bytes
//! alloc <size> <alg>   allocate with first|best|worst|next fit
//! freeid <id>          free by allocation id
//! freeaddr <addr>      free by block start address
//! show [width]         draw the memory map
//! stats                print fragmentation statistics
//! exit                 leave the command loop
//! ```

use alloc::string::{String, ToString};

use crate::buddy::{BlockId, FitStrategy};
use crate::render::DEFAULT_MAP_WIDTH;

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init { capacity: usize },
    Alloc { size: usize, strategy: FitStrategy },
    FreeId { id: BlockId },
    FreeAddr { start: usize },
    Show { width: usize },
    Stats,
    Exit,
}

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` expects a {argument} argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unknown algorithm `{0}`, use first|best|worst|next")]
    UnknownStrategy(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// Extra trailing tokens are ignored.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };

        let command = match name {
            "init" => Command::Init {
                capacity: number(tokens.next(), "init", "size")?,
            },
            "alloc" => {
                let size = number(tokens.next(), "alloc", "size")?;
                let token = tokens.next().ok_or(CommandError::MissingArgument {
                    command: "alloc",
                    argument: "algorithm",
                })?;
                let strategy = token
                    .parse()
                    .map_err(|_| CommandError::UnknownStrategy(token.to_string()))?;
                Command::Alloc { size, strategy }
            }
            "freeid" => Command::FreeId {
                id: BlockId::new(number(tokens.next(), "freeid", "id")?),
            },
            "freeaddr" => Command::FreeAddr {
                start: number(tokens.next(), "freeaddr", "address")?,
            },
            "show" => Command::Show {
                width: match tokens.next() {
                    Some(token) => parse_number(token)?,
                    None => DEFAULT_MAP_WIDTH,
                },
            },
            "stats" => Command::Stats,
            "exit" => Command::Exit,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn number<T: core::str::FromStr>(
    token: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandError> {
    let token = token.ok_or(CommandError::MissingArgument { command, argument })?;
    parse_number(token)
}

fn parse_number<T: core::str::FromStr>(token: &str) -> Result<T, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))
}
