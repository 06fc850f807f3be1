//! Admin dashboard: user management.

use bazaar_client::models::{RegisterRequest, UserUpdate};
use bazaar_client::{Marketplace, Result};
use bazaar_core::{UserId, UserRole};
use clap::Subcommand;

use crate::output;

#[derive(Subcommand)]
pub enum AdminAction {
    /// List every user
    Users,
    /// Create a user without signing in as them
    CreateUser {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// `USER`, `SELLER` or `ADMIN`
        #[arg(short, long, default_value = "USER")]
        role: UserRole,
    },
    /// Change a user's role
    SetRole { id: i64, role: UserRole },
    /// Promote to admin, or demote an admin to user
    ToggleAdmin { id: i64 },
    /// Delete a user
    DeleteUser { id: i64 },
}

pub async fn run(market: &Marketplace, action: AdminAction) -> Result<()> {
    let users = market.users();
    match action {
        AdminAction::Users => {
            for user in &users.list().await? {
                output::user(user);
            }
        }
        AdminAction::CreateUser {
            username,
            email,
            password,
            role,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                role,
                ..RegisterRequest::default()
            };
            output::user(&users.register_user(request).await?);
        }
        AdminAction::SetRole { id, role } => {
            let id = UserId::new(id);
            let mut update = UserUpdate::from(&users.get(id).await?);
            update.role = role;
            output::user(&users.update(id, &update).await?);
        }
        AdminAction::ToggleAdmin { id } => {
            let user = users.get(UserId::new(id)).await?;
            output::user(&users.toggle_admin(&user).await?);
        }
        AdminAction::DeleteUser { id } => {
            users.delete(UserId::new(id)).await?;
            output::line("User deleted");
        }
    }
    Ok(())
}
