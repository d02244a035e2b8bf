use crate::models::{Address, Query};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Street,
    HouseNumber,
    City,
    ZipCode,
}

/// Address input shown above the results
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    address: Address,
}

impl SearchForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn set_field(&mut self, field: AddressField, value: impl Into<String>) {
        let value = value.into();
        match field {
            AddressField::Street => self.address.street = value,
            AddressField::HouseNumber => self.address.house_number = value,
            AddressField::City => self.address.city = value,
            AddressField::ZipCode => self.address.zip_code = value,
        }
    }

    /// Copy the query's address while the user has typed nothing yet.
    /// Returns true when the form was filled.
    pub fn prefill_from(&mut self, query: Option<&Query>) -> bool {
        match query {
            Some(query) if self.address.is_empty() && !query.address.is_empty() => {
                self.address = query.address.clone();
                true
            }
            _ => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.address.is_complete()
    }

    /// The trimmed address to search for next
    pub fn submit(&self) -> Option<Address> {
        if !self.is_valid() {
            warn!("Please fill in all address fields");
            return None;
        }
        Some(self.address.trimmed())
    }
}
