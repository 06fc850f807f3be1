//! Step 2: choose how to pay.

use bazaar_core::{AddressId, PaymentMethod};
use chrono::Datelike;
use tracing::{info, instrument};

use super::{CardData, CheckoutFlow, CheckoutSelection, Step};
use crate::error::{ClientError, Result};
use crate::storage::{SessionStore, keys};

const CARD_NUMBER_DIGITS: usize = 16;
const MAX_EXPIRY_YEARS_AHEAD: i32 = 10;

/// Raw card form input.
#[derive(Clone, Default)]
pub struct CardForm {
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvc: String,
}

impl std::fmt::Debug for CardForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardForm")
            .field("card_holder_name", &self.card_holder_name)
            .finish_non_exhaustive()
    }
}

impl CardForm {
    /// Validate against the current year.
    ///
    /// # Errors
    ///
    /// See [`validate_for_year`](Self::validate_for_year).
    pub fn validate(&self) -> Result<CardData> {
        self.validate_for_year(chrono::Utc::now().year())
    }

    /// Validate the form, returning the card data to store.
    ///
    /// Spaces and dashes in the card number are ignored.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` listing every invalid field: the number must
    /// be 16 digits, the holder name non-blank, the CVC 3-4 digits, the month
    /// 1-12 and the year within `current_year..=current_year + 10`.
    pub fn validate_for_year(&self, current_year: i32) -> Result<CardData> {
        let mut problems = Vec::new();

        let number: String = self
            .card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if number.len() != CARD_NUMBER_DIGITS || !number.chars().all(|c| c.is_ascii_digit()) {
            problems.push("card number must be 16 digits");
        }

        let holder = self.card_holder_name.trim();
        if holder.is_empty() {
            problems.push("card holder name is required");
        }

        let cvc = self.cvc.trim();
        if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
            problems.push("CVC must be 3 or 4 digits");
        }

        let month = self
            .expiry_month
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m));
        if month.is_none() {
            problems.push("expiry month must be between 1 and 12");
        }

        let year = self
            .expiry_year
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|y| (current_year..=current_year + MAX_EXPIRY_YEARS_AHEAD).contains(y));
        if year.is_none() {
            problems.push("expiry year is out of range");
        }

        match (month, year) {
            (Some(expiry_month), Some(expiry_year)) if problems.is_empty() => Ok(CardData {
                card_number: number,
                card_holder_name: holder.to_string(),
                expiry_month,
                expiry_year,
                cvv: cvc.to_string(),
            }),
            _ => Err(ClientError::Validation(format!(
                "Invalid card details: {}",
                problems.join(", ")
            ))),
        }
    }
}

/// The payment step.
pub struct PaymentStep {
    flow: CheckoutFlow,
    shipping_address_id: AddressId,
    method: PaymentMethod,
    card: CardForm,
}

impl std::fmt::Debug for PaymentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentStep")
            .field("shipping_address_id", &self.shipping_address_id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl PaymentStep {
    /// Start with the method chosen earlier in this session, else credit card.
    pub(super) fn new(
        flow: CheckoutFlow,
        shipping_address_id: AddressId,
        selection: &CheckoutSelection,
    ) -> Self {
        Self {
            flow,
            shipping_address_id,
            method: selection.payment_method.unwrap_or_default(),
            card: CardForm::default(),
        }
    }

    #[must_use]
    pub const fn shipping_address_id(&self) -> AddressId {
        self.shipping_address_id
    }

    /// The offered payment methods.
    #[must_use]
    pub const fn methods() -> [PaymentMethod; 3] {
        PaymentMethod::ALL
    }

    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn select_method(&mut self, method: PaymentMethod) {
        self.method = method;
    }

    /// The card form, for editing.
    pub fn card_form_mut(&mut self) -> &mut CardForm {
        &mut self.card
    }

    pub fn set_card(&mut self, card: CardForm) {
        self.card = card;
    }

    /// Persist the method (and card details for cards) and move to
    /// confirmation.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` when a card is chosen and the form is
    /// invalid; nothing is stored in that case.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn confirm(&self) -> Result<()> {
        let card = if self.method.requires_card() {
            Some(self.card.validate()?)
        } else {
            None
        };

        let store = self.flow.store();
        store.set(keys::PAYMENT_METHOD, self.method.as_str())?;
        match &card {
            Some(card) => SessionStore::set_json(store.session(), keys::CARD_DATA, card)?,
            None => store.remove(keys::CARD_DATA)?,
        }

        info!("payment step complete");
        self.flow.navigator().navigate(&Step::Confirmation.route());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CardForm {
        CardForm {
            card_number: "4111 1111 1111 1111".to_string(),
            card_holder_name: " Jane Doe ".to_string(),
            expiry_month: "4".to_string(),
            expiry_year: "2030".to_string(),
            cvc: "123".to_string(),
        }
    }

    #[test]
    fn test_valid_card() {
        let card = form().validate_for_year(2026).unwrap();
        assert_eq!(card.card_number, "4111111111111111");
        assert_eq!(card.card_holder_name, "Jane Doe");
        assert_eq!(card.expiry_month, 4);
        assert_eq!(card.expiry_year, 2030);
        assert_eq!(card.cvv, "123");
    }

    #[test]
    fn test_card_number_length() {
        let mut short = form();
        short.card_number = "411111111111111".to_string();
        assert!(short.validate_for_year(2026).is_err());

        let mut letters = form();
        letters.card_number = "41111111111111ab".to_string();
        assert!(letters.validate_for_year(2026).is_err());
    }

    #[test]
    fn test_expiry_bounds() {
        let mut card = form();
        card.expiry_year = "2036".to_string();
        assert!(card.validate_for_year(2026).is_ok());
        card.expiry_year = "2037".to_string();
        assert!(card.validate_for_year(2026).is_err());
        card.expiry_year = "2025".to_string();
        assert!(card.validate_for_year(2026).is_err());

        let mut month = form();
        month.expiry_month = "13".to_string();
        assert!(month.validate_for_year(2026).is_err());
        month.expiry_month = "0".to_string();
        assert!(month.validate_for_year(2026).is_err());
    }

    #[test]
    fn test_cvc_and_holder() {
        let mut card = form();
        card.cvc = "12".to_string();
        card.card_holder_name = "  ".to_string();
        let err = card.validate_for_year(2026).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid card details: card holder name is required, CVC must be 3 or 4 digits"
        );

        card.cvc = "1234".to_string();
        card.card_holder_name = "J".to_string();
        assert!(card.validate_for_year(2026).is_ok());
    }
}
