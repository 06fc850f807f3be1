//! Sign-in, registration and profile commands.

use bazaar_client::models::{RegisterRequest, UserUpdate};
use bazaar_client::{Marketplace, Result};
use clap::Subcommand;

use crate::output;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile stored by the backend
    Show,
    /// Change profile fields; omitted fields keep their value
    Update {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
    /// Change the password
    Password {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,

        #[arg(long)]
        confirm: String,
    },
}

pub async fn login(market: &Marketplace, email: &str, password: &str) -> Result<()> {
    let user = market.account().login(email, password).await?;
    output::line(format!(
        "Signed in as {} ({})",
        user.display_name(),
        user.role.display_name()
    ));
    Ok(())
}

pub fn logout(market: &Marketplace) -> Result<()> {
    market.account().logout()?;
    output::line("Signed out");
    Ok(())
}

pub fn whoami(market: &Marketplace) {
    match market.auth().current_user() {
        Some(user) => output::line(format!(
            "#{} {} <{}> {}",
            user.id,
            user.display_name(),
            user.email,
            user.role.display_name()
        )),
        None => output::line("Not signed in"),
    }
}

pub async fn register(market: &Marketplace, request: RegisterRequest) -> Result<()> {
    let user = market.account().register(request).await?;
    output::line(format!("Welcome, {}!", user.display_name()));
    Ok(())
}

pub async fn profile(market: &Marketplace, action: Option<ProfileAction>) -> Result<()> {
    match action.unwrap_or(ProfileAction::Show) {
        ProfileAction::Show => {
            let profile = market.account().profile().await?;
            output::user(&profile);
        }
        ProfileAction::Update {
            username,
            email,
            first_name,
            last_name,
        } => {
            let current = market.account().profile().await?;
            let mut update = UserUpdate::from(&current);
            if let Some(username) = username {
                update.username = username;
            }
            if let Some(email) = email {
                update.email = email;
            }
            if let Some(first_name) = first_name {
                update.first_name = first_name;
            }
            if let Some(last_name) = last_name {
                update.last_name = last_name;
            }
            let profile = market.account().update_profile(update).await?;
            output::user(&profile);
        }
        ProfileAction::Password {
            current,
            new,
            confirm,
        } => {
            market
                .account()
                .change_password(&current, &new, &confirm)
                .await?;
            output::line("Password changed");
        }
    }
    Ok(())
}
