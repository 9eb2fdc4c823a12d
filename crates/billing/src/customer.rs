//! Changing where a billing account is billed.

use std::sync::Arc;

use riverbill_charging::ChargingModule;
use riverbill_charging::models::CustomerChange;
use riverbill_db::repositories::{ChangeAddressInput, ChangedAddress, CustomerDetails};
use tracing::{info, instrument};

use crate::error::ServiceError;
use crate::store::BillingStore;

/// Sends the new address to the Charging Module, then stores it.
#[derive(Clone)]
pub struct ChangeAddressService {
    store: Arc<dyn BillingStore>,
    charging_module: Arc<dyn ChargingModule>,
}

impl ChangeAddressService {
    /// Creates the service.
    pub fn new(store: Arc<dyn BillingStore>, charging_module: Arc<dyn ChargingModule>) -> Self {
        Self {
            store,
            charging_module,
        }
    }

    /// Changes a billing account's address.
    ///
    /// Nothing is stored if the Charging Module rejects the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown, the Charging Module call
    /// fails or the database transaction fails.
    #[instrument(skip_all, fields(billing_account_id = %input.billing_account_id))]
    pub async fn change_address(
        &self,
        input: &ChangeAddressInput,
    ) -> Result<ChangedAddress, ServiceError> {
        let customer = self.store.find_customer(input.billing_account_id).await?;

        self.charging_module
            .create_customer_change(&customer_change(&customer, input))
            .await
            .ensure_succeeded("create customer change")
            .map_err(|err| ServiceError::charging(err, None, None))?;

        let changed = self.store.change_address(input).await?;
        info!(address_id = %changed.address_id, "billing account address changed");
        Ok(changed)
    }
}

fn customer_change(customer: &CustomerDetails, input: &ChangeAddressInput) -> CustomerChange {
    let address = &input.address;
    let customer_name = input
        .agent_company
        .as_ref()
        .map_or_else(|| customer.company_name.clone(), |agent| agent.name.clone());

    CustomerChange {
        region: customer.region_code.clone(),
        customer_reference: customer.account_number.clone(),
        customer_name,
        address_line1: address.address1.clone(),
        address_line2: address.address2.clone(),
        address_line3: address.address3.clone(),
        address_line4: address.address4.clone(),
        address_line5: address.address5.clone(),
        address_line6: address.address6.clone(),
        postcode: address.postcode.clone(),
    }
}
