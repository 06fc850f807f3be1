//! Address book commands.

use bazaar_client::models::Address;
use bazaar_client::{Marketplace, Result};
use bazaar_core::AddressId;
use clap::{Args, Subcommand};

use crate::output;

/// Fields of a new or edited address.
#[derive(Args)]
pub struct AddressFields {
    /// Label such as "Home" or "Office"
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub recipient: String,

    #[arg(long)]
    pub line1: String,

    #[arg(long)]
    pub line2: Option<String>,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub state: String,

    #[arg(long)]
    pub postal_code: String,

    #[arg(long)]
    pub country: String,

    #[arg(long)]
    pub phone: String,

    /// Make this the default address
    #[arg(long)]
    pub default: bool,
}

impl From<AddressFields> for Address {
    fn from(fields: AddressFields) -> Self {
        Self {
            id: None,
            address_line1: fields.line1,
            address_line2: fields.line2,
            city: fields.city,
            state: fields.state,
            postal_code: fields.postal_code,
            country: fields.country,
            phone_number: fields.phone,
            address_name: fields.name,
            recipient_name: fields.recipient,
            is_default: fields.default,
        }
    }
}

#[derive(Subcommand)]
pub enum AddressAction {
    /// List saved addresses
    List,
    /// Show one address
    Show { id: i64 },
    /// Save a new address
    Add(AddressFields),
    /// Replace an address
    Edit {
        id: i64,

        #[command(flatten)]
        fields: AddressFields,
    },
    /// Mark an address as the default
    Default { id: i64 },
    /// Delete an address
    Delete { id: i64 },
}

pub async fn run(market: &Marketplace, action: Option<AddressAction>) -> Result<()> {
    let addresses = market.addresses();
    match action.unwrap_or(AddressAction::List) {
        AddressAction::List => {
            let list = addresses.list().await?;
            if list.is_empty() {
                output::line("No saved addresses");
            }
            for address in &list {
                output::address(address);
            }
        }
        AddressAction::Show { id } => output::address(&addresses.get(AddressId::new(id)).await?),
        AddressAction::Add(fields) => {
            let created = addresses.create(&Address::from(fields)).await?;
            output::address(&created);
        }
        AddressAction::Edit { id, fields } => {
            let updated = addresses
                .update(AddressId::new(id), &Address::from(fields))
                .await?;
            output::address(&updated);
        }
        AddressAction::Default { id } => {
            output::address(&addresses.set_default(AddressId::new(id)).await?);
        }
        AddressAction::Delete { id } => {
            addresses.delete(AddressId::new(id)).await?;
            output::line("Address deleted");
        }
    }
    Ok(())
}
