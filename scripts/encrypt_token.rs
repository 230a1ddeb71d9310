//! Credential Encryption Utility
//!
//! Encrypts a secret with AES-256-GCM so it can be stored in one of the
//! secret columns of the `social_accounts` table.
//! Requires the TOKEN_ENCRYPTION_KEY environment variable to be set.

use std::io::{self, Write};

use socialcheck::crypto::{SecretCipher, ENCRYPTION_KEY_VAR};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("🔐 Credential Encryption Utility");
    println!("================================");
    println!();

    let cipher = match SecretCipher::from_env() {
        Ok(Some(cipher)) => cipher,
        Ok(None) => {
            eprintln!("❌ Error: {} environment variable is not set.", ENCRYPTION_KEY_VAR);
            eprintln!();
            eprintln!("Generate a key with:");
            eprintln!("  openssl rand -hex 32");
            eprintln!();
            eprintln!("Then set it:");
            eprintln!("  export {}=\"your_64_char_hex_key\"", ENCRYPTION_KEY_VAR);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    print!("Enter the secret to encrypt: ");
    io::stdout().flush()?;
    let mut secret = String::new();
    io::stdin().read_line(&mut secret)?;
    let secret = secret.trim();

    if secret.is_empty() {
        eprintln!("❌ Error: Secret cannot be empty");
        std::process::exit(1);
    }

    match cipher.encrypt(secret) {
        Ok(encrypted) => {
            println!();
            println!("✅ Secret encrypted successfully!");
            println!();
            println!("Encrypted value (hex):");
            println!("{}", encrypted);
            println!();
            println!("📝 Use this value for access_token, consumer_secret, oauth_token_secret or refresh_token.");
        }
        Err(e) => {
            eprintln!("❌ Encryption failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
