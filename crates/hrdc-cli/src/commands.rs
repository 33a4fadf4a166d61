//! Line parsing for the console chat loop.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent to the assistant
    Say(String),
    New,
    List,
    /// 1-based position in the thread list
    Select(usize),
    Delete(usize),
    Clear,
    Usage,
    Upgrade,
    Verify(String),
    Logout,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Not a thread number: {0}")]
    InvalidIndex(String),
}

pub const HELP: &str = "\
Commands:
  /new            start a new conversation
  /list           list conversations
  /select <n>     switch to conversation n
  /delete <n>     delete conversation n
  /clear          delete all conversations
  /usage          show today's usage and plan
  /upgrade        start a Standard plan checkout
  /verify <ref>   confirm a completed payment
  /logout         sign out
  /quit           exit
Anything else is sent to the assistant.";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match name {
            "new" => Ok(Command::New),
            "list" | "ls" => Ok(Command::List),
            "select" => index(arg, "select").map(Command::Select),
            "delete" => index(arg, "delete").map(Command::Delete),
            "clear" => Ok(Command::Clear),
            "usage" => Ok(Command::Usage),
            "upgrade" => Ok(Command::Upgrade),
            "verify" => arg
                .map(|r| Command::Verify(r.to_string()))
                .ok_or(CommandError::MissingArgument("verify")),
            "logout" => Ok(Command::Logout),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn index(arg: Option<&str>, command: &'static str) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(command))?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidIndex(arg.to_string())),
    }
}
