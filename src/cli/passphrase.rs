//! Passphrase prompts and session handling for CLI commands
//!
//! Every command that touches encrypted data unlocks first and the caller
//! locks again before exiting.

use tracing::warn;

use crate::crypto::{SecureString, SessionState};
use crate::error::{VaultError, VaultResult};
use crate::vault::Vault;

/// Minimum passphrase length accepted at setup
pub const MIN_PASSPHRASE_LEN: usize = 8;

const UNLOCK_ATTEMPTS: usize = 3;

/// Set up the vault passphrase interactively
pub async fn handle_init(vault: &Vault) -> VaultResult<()> {
    match vault.state() {
        SessionState::AwaitingSetup => {}
        SessionState::Locked | SessionState::Unlocked => {
            println!("A passphrase is already set up.");
            return Ok(());
        }
        SessionState::Uninitialized => {
            return Err(VaultError::InvalidState("vault was not opened".into()));
        }
    }

    println!("Set Up Passphrase");
    println!("=================");
    println!();
    println!("Reports and provider keys are encrypted with AES-256-GCM under a key");
    println!("derived from this passphrase.");
    println!();
    println!("IMPORTANT: If you forget your passphrase, your data cannot be recovered!");
    println!();

    let passphrase = prompt_new_passphrase()?;

    println!("Deriving encryption key...");
    vault.setup_passphrase(passphrase).await?;

    println!();
    println!("Passphrase set. Your vault is ready.");
    Ok(())
}

/// Unlock the vault, prompting for the passphrase if needed
pub async fn ensure_unlocked(vault: &Vault) -> VaultResult<()> {
    match vault.state() {
        SessionState::Unlocked => return Ok(()),
        SessionState::AwaitingSetup => {
            return Err(VaultError::InvalidState(
                "no passphrase set up yet; run 'ssa-vault init' first".into(),
            ));
        }
        SessionState::Uninitialized => {
            return Err(VaultError::InvalidState("vault was not opened".into()));
        }
        SessionState::Locked => {}
    }

    for attempt in 1..=UNLOCK_ATTEMPTS {
        let passphrase = prompt_passphrase("Enter passphrase: ")?;
        match vault.unlock(passphrase).await {
            Ok(()) => return Ok(()),
            Err(VaultError::InvalidPassphrase) if attempt < UNLOCK_ATTEMPTS => {
                warn!(attempt, "unlock failed");
                println!("Incorrect passphrase. Please try again.");
            }
            Err(e) => return Err(e),
        }
    }

    Err(VaultError::InvalidPassphrase)
}

/// Prompt for a new passphrase with confirmation
pub fn prompt_new_passphrase() -> VaultResult<SecureString> {
    loop {
        let pass1 = prompt_passphrase("Enter new passphrase: ")?;

        if pass1.len() < MIN_PASSPHRASE_LEN {
            println!(
                "Passphrase must be at least {} characters. Please try again.",
                MIN_PASSPHRASE_LEN
            );
            continue;
        }

        let pass2 = prompt_passphrase("Confirm passphrase: ")?;

        if pass1 != pass2 {
            println!("Passphrases do not match. Please try again.");
            continue;
        }

        return Ok(pass1);
    }
}

/// Prompt for a secret (hidden input)
pub fn prompt_passphrase(prompt: &str) -> VaultResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| VaultError::Io(format!("Failed to read passphrase: {}", e)))
}
