//! Command-line surface of `su`.
//!
//! Parsing happens in three stages: a normalization pre-pass rewrites the
//! two legacy multi-character short spellings into their single-character
//! equivalents, a conventional `clap` parser handles the cleaned token
//! stream, and a post-pass resolves the positionals (the lone `-` login
//! marker and the target user). The parser itself has no special cases.
//!
//! The grammar is `su [options] [-] [user [argument...]]`. Trailing
//! arguments after the user are accepted and ignored.

use clap::Parser;
use thiserror::Error;

use protocol::SuRequest;

use crate::defaults;

/// Usage line shown on post-parse errors.
pub const USAGE: &str = "su [options] [-] [user [argument...]]";

/// RootLink su command line.
///
/// `-c` is greedy: once matched, every remaining token (including ones
/// that look like options) becomes part of the command. This mirrors the
/// historical su surface, where nothing after `-c` is ever reinterpreted.
#[derive(Parser, Debug)]
#[command(
    name = "su",
    about = "RootLink su\n\nRequest a command to be executed by the privileged daemon as another identity.",
    override_usage = USAGE
)]
pub struct Cli {
    /// pass COMMAND to the invoked shell
    #[arg(
        short = 'c',
        long = "command",
        value_name = "COMMAND",
        num_args = 1..,
        allow_hyphen_values = true
    )]
    pub command: Option<Vec<String>>,

    /// pretend the shell to be a login shell
    #[arg(short = 'l', long = "login")]
    pub login: bool,

    /// preserve the entire environment
    #[arg(short = 'p', short_alias = 'm', long = "preserve-environment")]
    pub preserve_environment: bool,

    /// use SHELL instead of the default shell
    #[arg(short = 's', long = "shell", value_name = "SHELL")]
    pub shell: Option<String>,

    /// display version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// display version code and exit
    #[arg(short = 'V')]
    pub version_code: bool,

    /// force run in the global mount namespace
    #[arg(short = 'M', long = "mount-master")]
    pub mount_master: bool,

    /// legacy option, accepted and ignored
    #[arg(short = 'z', long = "context", value_name = "CONTEXT", hide = true)]
    pub context: Option<String>,

    /// optional login marker ("-"), target user, and ignored arguments
    #[arg(value_name = "user")]
    pub targets: Vec<String>,
}

/// A usage error found after option parsing (clap reports the lexical
/// ones itself).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// The target is neither a known user name nor a numeric uid.
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

/// Rewrite the legacy multi-character short spellings so a conventional
/// option parser can handle the rest: `-cn` becomes `-z` and `-mm`
/// becomes `-M`.
///
/// Like the historical surface, the rewrite runs over every token before
/// parsing starts, not just over tokens in option position.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-cn" => "-z".to_string(),
            "-mm" => "-M".to_string(),
            _ => arg,
        })
        .collect()
}

/// Parse argv tokens (program name excluded) into a [`Cli`].
pub fn try_parse<I, S>(argv: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut full = vec!["su".to_string()];
    full.extend(normalize_args(argv.into_iter().map(Into::into)));
    Cli::try_parse_from(full)
}

/// Resolve a target token to a uid: user name lookup first, then an
/// integer literal. Resolution happens client-side, before transmission,
/// so the daemon never races a name lookup against use.
fn resolve_uid(token: &str) -> Result<u32, UsageError> {
    if let Ok(Some(user)) = nix::unistd::User::from_name(token) {
        return Ok(user.uid.as_raw());
    }
    token
        .parse::<u32>()
        .map_err(|_| UsageError::UnknownUser(token.to_string()))
}

/// Build the immutable request from a parsed command line.
pub fn request_from_cli(cli: &Cli) -> Result<SuRequest, UsageError> {
    let mut request = SuRequest::new(defaults::DEFAULT_SHELL);
    request.login = cli.login;
    request.keep_env = cli.preserve_environment;
    request.mount_master = cli.mount_master;

    if let Some(shell) = &cli.shell {
        request.shell = shell.clone();
    }
    if let Some(parts) = &cli.command {
        request.command = parts.join(" ");
    }

    let mut targets = cli.targets.iter();
    let mut next = targets.next();
    if next.map(String::as_str) == Some("-") {
        request.login = true;
        next = targets.next();
    }
    if let Some(target) = next {
        request.uid = Some(resolve_uid(target)?);
    }
    // Anything after the user is accepted and ignored.

    Ok(request)
}
