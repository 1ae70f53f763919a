//! Interactive first-run sign-in.

use grammers_client::{Client, SignInError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tgmon_core::{errors::Error, Result};

pub(crate) async fn sign_in(client: &Client, phone: Option<&str>) -> Result<()> {
    let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => phone.to_string(),
        None => prompt("Enter your phone number (international format): ").await?,
    };

    let token = client
        .request_login_code(&phone)
        .await
        .map_err(|e| Error::External(format!("failed to request login code: {e}")))?;
    let code = prompt("Enter the code you received: ").await?;

    match client.sign_in(&token, &code).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&format!("Enter your 2FA password (hint: {hint}): ")).await?;
            client
                .check_password(password_token, password.as_bytes())
                .await
                .map_err(|e| Error::External(format!("2FA sign-in failed: {e}")))?;
        }
        Err(e) => return Err(Error::External(format!("sign-in failed: {e}"))),
    }

    tracing::info!("signed in");
    Ok(())
}

async fn prompt(message: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let line = line.trim().to_string();
    if line.is_empty() {
        return Err(Error::Config("sign-in aborted: empty input".to_string()));
    }
    Ok(line)
}
