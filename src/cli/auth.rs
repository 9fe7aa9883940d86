//! `login` and `logout`: manage the sign-in the daemon uses for the hosted
//! store.
//!
//! The session is saved in the data directory. A running daemon keeps the
//! store it started with, so both commands remind the user to restart it.

use std::io::BufRead;

use anyhow::{Context, Result};

use super::commands::LoginArgs;
use crate::config::Config;
use crate::store::{AuthClient, SessionFile, SignUpOutcome};

/// Signs in (or signs up) and saves the session. Returns the message to show.
pub async fn login(args: &LoginArgs, config: &Config) -> Result<String> {
    let auth = AuthClient::from_config(&config.hosted)?;
    let password = match &args.password {
        Some(password) => password.clone(),
        None => {
            eprint!("Password: ");
            read_password(std::io::stdin().lock())?
        }
    };
    let file = SessionFile::new(&config.data_dir);

    let session = if args.sign_up {
        match auth.sign_up(&args.email, &password).await? {
            SignUpOutcome::SignedIn(session) => session,
            SignUpOutcome::ConfirmationRequired(_) => {
                return Ok(
                    "Check your email to confirm your account! Then run 'pomodoro-tracker login'"
                        .to_string(),
                )
            }
        }
    } else {
        auth.sign_in(&args.email, &password).await?
    };

    file.save(&session)
        .await
        .context("Failed to save the session")?;

    Ok(format!(
        "Logged in successfully as {}! Restart the daemon to use the hosted store",
        session.user.email.as_deref().unwrap_or(&args.email)
    ))
}

/// Revokes and deletes the saved session. Returns the message to show.
///
/// The local copy is deleted even if the server cannot be reached.
pub async fn logout(config: &Config) -> Result<String> {
    let file = SessionFile::new(&config.data_dir);
    let Some(session) = file.load().await? else {
        return Ok("Not logged in".to_string());
    };

    let revoked = match AuthClient::from_config(&config.hosted) {
        Ok(auth) => auth.sign_out(&session.access_token).await,
        Err(e) => Err(e),
    };
    if let Err(e) = revoked {
        tracing::warn!(error = %e, "Could not revoke the session on the server");
    }

    file.remove().await?;
    Ok("Logged out successfully! Restart the daemon to use the local store".to_string())
}

/// Reads one line from `reader` as the password.
fn read_password(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read the password")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password.to_string())
}
