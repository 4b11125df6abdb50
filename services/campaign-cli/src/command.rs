//! Argument parsing
//!
//! Four commands and one flag do not need a parser dependency.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in, with the email from the argument or the config
    Login { email: Option<String> },
    /// `GET /users/me`
    Whoami,
    /// `GET <path>` relative to the API base URL
    Get { path: String },
    /// Tear down locally, revoke server-side best effort
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config_path: Option<String>,
    pub command: Command,
}

/// Parse the arguments after the program name.
pub fn parse(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter
                .next()
                .ok_or_else(|| Error::Usage("--config needs a path".into()))?;
            config_path = Some(path.clone());
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(path.to_string());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match positional.as_slice() {
        ["login"] => Command::Login { email: None },
        ["login", email] => Command::Login {
            email: Some(email.to_string()),
        },
        ["whoami"] => Command::Whoami,
        ["get", path] => Command::Get {
            path: normalize_path(path),
        },
        ["logout"] => Command::Logout,
        [] => return Err(Error::Usage("no command given".into())),
        [name, ..] => {
            return Err(Error::Usage(format!(
                "unknown command or wrong arguments for `{name}`"
            )));
        }
    };

    Ok(Cli {
        config_path,
        command,
    })
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
