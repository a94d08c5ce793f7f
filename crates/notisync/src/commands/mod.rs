//! Command handlers.

pub mod config_cmd;
pub mod notifications;
pub mod watch;

use secrecy::ExposeSecret;

use notisync_core::{CredentialSource, LiveEngine};

use crate::cli::Command;
use crate::config::{Presentation, Session};
use crate::error::CliError;

/// Route a command that needs the notification server.
pub async fn dispatch(
    cmd: Command,
    session: Session,
    present: Presentation,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => notifications::list(args, session, present).await,
        Command::Open(args) => notifications::open(&args.id, &session, present).await,
        Command::Read(args) => notifications::mark_read(&args.id, &session, present).await,
        Command::Unread(args) => notifications::mark_unread(&args.id, &session, present).await,
        Command::Delete(args) => notifications::delete(&args.id, &session, present).await,
        Command::ReadAll => notifications::read_all(&session, present).await,
        Command::Clear => notifications::clear(&session, present).await,
        Command::Watch(args) => watch::handle(args, session, present).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// An engine whose REST client is already logged in. Nothing runs until
/// `start` is called, so one-shot commands only use its synchronizer.
pub(crate) fn logged_in_engine(
    session: &Session,
) -> Result<(LiveEngine, CredentialSource), CliError> {
    let credentials = CredentialSource::with_token(session.token.expose_secret());
    let engine = LiveEngine::live(session.engine.clone(), credentials.subscribe())?;
    Ok((engine, credentials))
}
