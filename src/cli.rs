use clap::Parser;
use std::{path::PathBuf, time::Duration};

use crate::dispatch::DispatchConfig;
use crate::error::IdentityError;
use crate::identity::Identity;

pub const IDENTITY_FILE: &str = "threema.id";
pub const ADDRESS_BOOK_FILE: &str = "address.book";
pub const GROUP_DIRECTORY_FILE: &str = "group.directory";
pub const DEFAULT_NICKNAME: &str = "parrot";
pub const DEFAULT_GREETING: &str = "Say something!";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Replies to every message with a quoted echo", long_about = None)]
pub struct Args {
    /// Nickname announced to everyone we talk to
    #[arg(short = 'n', long, env = "PARROT_NICKNAME", default_value = DEFAULT_NICKNAME)]
    pub nickname: String,

    /// Directory holding the identity, address book and group directory
    #[arg(short = 'c', long, env = "PARROT_CONFIG_DIR", default_value = ".")]
    pub config_dir: PathBuf,

    /// Passphrase protecting the identity file
    #[arg(short = 'p', long, env = "PARROT_PASSPHRASE", default_value = "")]
    pub passphrase: String,

    /// Identity to greet once the session is up
    #[arg(short = 'r', long, env = "PARROT_RECIPIENT")]
    pub recipient: Option<String>,

    /// Greeting sent to --recipient
    #[arg(short = 'm', long, default_value = DEFAULT_GREETING)]
    pub message: String,

    /// Create a new identity if none exists
    #[arg(long)]
    pub create_id: bool,

    /// Read IDENTITY||MESSAGE lines from stdin and send them
    #[arg(long)]
    pub console: bool,
}

/// Everything the bootstrap needs, resolved from [`Args`].
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub nickname: String,
    pub passphrase: Vec<u8>,
    pub identity_path: PathBuf,
    pub address_book_path: PathBuf,
    pub group_directory_path: PathBuf,
    pub greeting: Option<(Identity, String)>,
    pub create_identity: bool,
    pub console: bool,
    pub dispatch: DispatchConfig,
}

impl BotConfig {
    /// Defaults rooted at `config_dir`, no greeting, no console.
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            nickname: DEFAULT_NICKNAME.to_string(),
            passphrase: Vec::new(),
            identity_path: config_dir.join(IDENTITY_FILE),
            address_book_path: config_dir.join(ADDRESS_BOOK_FILE),
            group_directory_path: config_dir.join(GROUP_DIRECTORY_FILE),
            greeting: None,
            create_identity: false,
            console: false,
            dispatch: DispatchConfig::default(),
        }
    }

    pub fn with_group_reply_delay(mut self, delay: Duration) -> Self {
        self.dispatch.group_reply_delay = delay;
        self
    }
}

impl TryFrom<Args> for BotConfig {
    type Error = IdentityError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let greeting = match args.recipient {
            Some(recipient) => Some((recipient.trim().parse()?, args.message)),
            None => None,
        };
        let mut config = BotConfig::in_dir(args.config_dir);
        config.nickname = args.nickname;
        config.passphrase = args.passphrase.into_bytes();
        config.greeting = greeting;
        config.create_identity = args.create_id;
        config.console = args.console;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "parrot-bot",
            "-c",
            "/tmp/parrot",
            "-r",
            "8S3HMY9Z",
            "--create-id",
        ])
        .unwrap();
        let config = BotConfig::try_from(args).unwrap();
        assert_eq!(config.nickname, "parrot");
        assert_eq!(
            config.address_book_path,
            PathBuf::from("/tmp/parrot/address.book")
        );
        assert_eq!(
            config.group_directory_path,
            PathBuf::from("/tmp/parrot/group.directory")
        );
        let (to, msg) = config.greeting.unwrap();
        assert_eq!(to.as_str(), "8S3HMY9Z");
        assert_eq!(msg, "Say something!");
        assert!(config.create_identity);
        assert!(!config.console);
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let args = Args::try_parse_from(["parrot-bot", "-r", "nope"]).unwrap();
        assert!(BotConfig::try_from(args).is_err());
    }
}
