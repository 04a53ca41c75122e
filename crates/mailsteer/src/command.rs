//! Console commands.

use mailsteer_control::{ActionId, ConversationUpdate, DestructiveAction};
use mailsteer_core::{AccountId, ConversationId, FolderId, FolderMembership};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to an account.
    Account(AccountId),
    /// Open a folder of the current account.
    Folder(FolderId),
    /// Open a conversation.
    Open(ConversationId),
    /// Act on the open conversation.
    Action(DestructiveAction),
    /// Update the open conversation.
    Update(ConversationUpdate),
    /// Search the current account.
    Search(String),
    /// Go to the current account's inbox.
    Inbox,
    /// Sync the current folder.
    Refresh,
    /// Answer a confirmation prompt.
    Confirm {
        /// The action being confirmed.
        action: ActionId,
        /// Whether the user agreed.
        accepted: bool,
    },
    /// Leave the conversation view.
    Back,
    /// Print the command list.
    Help,
    /// Save state and exit.
    Quit,
}

/// Why a line is not a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line.
    Empty,
    /// The command word is unknown.
    Unknown(String),
    /// The command needs an argument.
    MissingArgument(&'static str),
    /// The argument is not a number.
    BadNumber(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::Unknown(word) => write!(f, "unknown command '{word}', try 'help'"),
            Self::MissingArgument(what) => write!(f, "missing {what}"),
            Self::BadNumber(arg) => write!(f, "'{arg}' is not an action number"),
        }
    }
}

/// Help text for the console.
pub const HELP: &str = "\
commands:
  account <id>          switch account
  folder <id>           open a folder
  inbox                 open the inbox
  search <query>        search the current account
  refresh               sync the current folder
  open <conversation>   open a conversation
  archive | delete | mute | spam
  move <folder,...>     file the open conversation under these folders
  unread | important | unimportant
  confirm <n> | cancel <n>
  back | help | quit";

impl std::str::FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));
        let arg = |what: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(what))
            } else {
                Ok(rest)
            }
        };
        let action = |what: &'static str| {
            let arg = arg(what)?;
            arg.parse()
                .map(ActionId)
                .map_err(|_| ParseError::BadNumber(arg.to_string()))
        };

        Ok(match word {
            "" => return Err(ParseError::Empty),
            "account" => Self::Account(AccountId::new(arg("account id")?)),
            "folder" => Self::Folder(FolderId::new(arg("folder id")?)),
            "open" => Self::Open(ConversationId::new(arg("conversation id")?)),
            "archive" => Self::Action(DestructiveAction::Archive),
            "delete" => Self::Action(DestructiveAction::Delete),
            "mute" => Self::Action(DestructiveAction::Mute),
            "spam" => Self::Action(DestructiveAction::ReportSpam),
            "move" => Self::Action(DestructiveAction::ChangeFolders(FolderMembership::parse(
                arg("folder list")?,
            ))),
            "unread" => Self::Update(ConversationUpdate::MarkUnread),
            "important" => Self::Update(ConversationUpdate::MarkImportant),
            "unimportant" => Self::Update(ConversationUpdate::MarkNotImportant),
            "search" => Self::Search(arg("query")?.to_string()),
            "inbox" => Self::Inbox,
            "refresh" => Self::Refresh,
            "confirm" | "yes" => Self::Confirm {
                action: action("action number")?,
                accepted: true,
            },
            "cancel" | "no" => Self::Confirm {
                action: action("action number")?,
                accepted: false,
            },
            "back" => Self::Back,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_commands() {
        assert_eq!(
            "account work".parse::<Command>().unwrap(),
            Command::Account(AccountId::new("work"))
        );
        assert_eq!(
            "  folder   work/receipts ".parse::<Command>().unwrap(),
            Command::Folder(FolderId::new("work/receipts"))
        );
        assert_eq!(
            "search from:alice invoices".parse::<Command>().unwrap(),
            Command::Search("from:alice invoices".into())
        );
        assert_eq!("inbox".parse::<Command>().unwrap(), Command::Inbox);
    }

    #[test]
    fn parses_actions() {
        assert_eq!(
            "spam".parse::<Command>().unwrap(),
            Command::Action(DestructiveAction::ReportSpam)
        );
        assert_eq!(
            "move work/inbox, work/receipts".parse::<Command>().unwrap(),
            Command::Action(DestructiveAction::ChangeFolders(FolderMembership::parse(
                "work/inbox,work/receipts"
            )))
        );
        assert_eq!(
            "important".parse::<Command>().unwrap(),
            Command::Update(ConversationUpdate::MarkImportant)
        );
    }

    #[test]
    fn parses_confirmations() {
        assert_eq!(
            "confirm 3".parse::<Command>().unwrap(),
            Command::Confirm {
                action: ActionId(3),
                accepted: true
            }
        );
        assert_eq!(
            "no 1".parse::<Command>().unwrap(),
            Command::Confirm {
                action: ActionId(1),
                accepted: false
            }
        );
        assert_eq!(
            "confirm three".parse::<Command>(),
            Err(ParseError::BadNumber("three".into()))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "account".parse::<Command>(),
            Err(ParseError::MissingArgument("account id"))
        );
        assert_eq!(
            "frobnicate".parse::<Command>(),
            Err(ParseError::Unknown("frobnicate".into()))
        );
    }
}
