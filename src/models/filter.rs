use super::Offer;
use serde::{Deserialize, Serialize};

/// User-selected constraints on the offer list.
///
/// Every field is optional; an absent field (or a blank string) places no
/// constraint. The same shape is sent as the share snapshot, so absent fields
/// are left out of the JSON entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation: Option<bool>,
    /// Minimum speed in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_min: Option<u32>,
    /// Age of the oldest person using the contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Maximum monthly cost in whole euros
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
}

/// Which field of a [`FilterOptions`] a chip refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Provider,
    ConnectionType,
    MinSpeed,
    MaxCost,
    Installation,
    Age,
}

/// Display chip for one active filter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilter {
    pub kind: FilterKind,
    pub label: String,
}

/// The value as given, or None when it is blank. Matching is exact.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl FilterOptions {
    /// Drop the constraint of one field
    pub fn clear(&mut self, kind: FilterKind) {
        match kind {
            FilterKind::Provider => self.provider = None,
            FilterKind::ConnectionType => self.connection_type = None,
            FilterKind::MinSpeed => self.speed_min = None,
            FilterKind::MaxCost => self.cost_max = None,
            FilterKind::Installation => self.installation = None,
            FilterKind::Age => self.age = None,
        }
    }
}

pub fn is_filter_empty(filter: &FilterOptions) -> bool {
    non_blank(&filter.provider).is_none()
        && filter.installation.is_none()
        && filter.speed_min.is_none()
        && filter.age.is_none()
        && filter.cost_max.is_none()
        && non_blank(&filter.connection_type).is_none()
}

/// True when the offer satisfies every specified field of the filter
pub fn filter_offer(offer: &Offer, filter: &FilterOptions) -> bool {
    if let Some(provider) = non_blank(&filter.provider) {
        if offer.provider != provider {
            return false;
        }
    }
    if let Some(installation) = filter.installation {
        if offer.installation_service != installation {
            return false;
        }
    }
    if let Some(speed_min) = filter.speed_min {
        if offer.speed < speed_min {
            return false;
        }
    }
    if let Some(age) = filter.age {
        // Only a positive restriction below the requested age excludes
        if let Some(max_age) = offer.max_age_person.filter(|m| *m > 0) {
            if max_age < age {
                return false;
            }
        }
    }
    if let Some(cost_max) = filter.cost_max {
        if offer.monthly_cost_in_cent > cost_max.saturating_mul(100) {
            return false;
        }
    }
    if let Some(connection_type) = non_blank(&filter.connection_type) {
        if offer.connection_type != connection_type {
            return false;
        }
    }
    true
}

pub fn active_filters(filter: &FilterOptions) -> Vec<ActiveFilter> {
    let mut chips = Vec::new();
    let mut push = |kind, label: String| chips.push(ActiveFilter { kind, label });

    if let Some(provider) = non_blank(&filter.provider) {
        push(FilterKind::Provider, format!("Provider: {provider}"));
    }
    if let Some(connection_type) = non_blank(&filter.connection_type) {
        push(FilterKind::ConnectionType, format!("Type: {connection_type}"));
    }
    if let Some(speed_min) = filter.speed_min {
        push(FilterKind::MinSpeed, format!("Min Speed: {speed_min} Mbps"));
    }
    if let Some(cost_max) = filter.cost_max {
        push(FilterKind::MaxCost, format!("Max Cost: €{cost_max}"));
    }
    match filter.installation {
        Some(true) => push(FilterKind::Installation, "Installation Required".to_string()),
        Some(false) => push(FilterKind::Installation, "No Installation".to_string()),
        None => {}
    }
    if let Some(age) = filter.age {
        push(FilterKind::Age, format!("Max Age: {age}"));
    }
    chips
}
