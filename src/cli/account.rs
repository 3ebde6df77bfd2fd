//! CLI account commands: `login`, `logout`, `subscribe`.

use anyhow::Result;

use crate::app::App;
use crate::checkout::start_checkout;
use crate::error::Error;

pub fn login(app: &App, token: &str) -> Result<()> {
    app.login(token)?;
    println!("Logged in. Run `sacola list` to fetch your ideas.");
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    app.logout()?;
    println!("Logged out. Local copy cleared.");
    Ok(())
}

pub async fn subscribe(app: &App) -> Result<()> {
    match start_checkout(app.reconciler.client(), app.config.checkout.max_attempts).await {
        Ok(url) => {
            println!("Open this link to finish the subscription:\n  {url}");
            Ok(())
        }
        Err(Error::Unauthenticated) => {
            anyhow::bail!("log in first: sacola login --token <token>")
        }
        Err(e) => Err(e.into()),
    }
}
