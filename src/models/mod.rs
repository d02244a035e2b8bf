pub mod filter;
pub mod sort;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub use filter::{active_filters, filter_offer, is_filter_empty, ActiveFilter, FilterKind, FilterOptions};
pub use sort::{sort_offers, SortDirection, SortField, SortOption, SORT_OPTIONS};

/// Postal address an offer search is issued for
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default, alias = "house-number")]
    pub house_number: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "zip-code")]
    pub zip_code: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        house_number: impl Into<String>,
        city: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            house_number: house_number.into(),
            city: city.into(),
            zip_code: zip_code.into(),
        }
    }

    fn fields(&self) -> [&str; 4] {
        [&self.street, &self.house_number, &self.city, &self.zip_code]
    }

    /// True when every field is blank
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.trim().is_empty())
    }

    /// True when no field is blank
    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|f| !f.trim().is_empty())
    }

    pub fn trimmed(&self) -> Self {
        Self::new(
            self.street.trim(),
            self.house_number.trim(),
            self.city.trim(),
            self.zip_code.trim(),
        )
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, {} {}",
            self.street, self.house_number, self.zip_code, self.city
        )
    }
}

/// How a voucher reduces the monthly price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherType {
    Percentage,
    Absolute,
}

/// Structured voucher attached to an offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoucherDetails {
    #[serde(rename = "type")]
    pub voucher_type: VoucherType,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single provider offer as streamed by the comparison backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: String,
    /// Download speed in Mbps
    pub speed: u32,
    #[serde(default)]
    pub contract_duration_in_months: u32,
    /// Open set: DSL, CABLE, FIBER and whatever else providers report
    #[serde(default)]
    pub connection_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_in_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_person: Option<u32>,
    pub monthly_cost_in_cent: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_two_years_monthly_cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cost_in_cent_with_voucher: Option<i64>,
    #[serde(default)]
    pub installation_service: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_details: Option<VoucherDetails>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub is_preliminary: bool,
    pub offer_hash: String,
}

impl Offer {
    /// Monthly cost after the voucher discount, if the provider reported one
    pub fn effective_monthly_cost_in_cent(&self) -> i64 {
        self.monthly_cost_in_cent_with_voucher
            .unwrap_or(self.monthly_cost_in_cent)
    }
}

/// Offers of one query, unique by `offer_hash` and kept in arrival order.
///
/// A JSON object keyed by hash carries no order, so decoding one yields the
/// offers sorted by key. Arrays and streamed offers keep arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OfferSet {
    offers: Vec<Offer>,
}

impl OfferSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by hash. A replaced offer keeps its position.
    /// Returns true when the hash was already present.
    pub fn upsert(&mut self, offer: Offer) -> bool {
        match self.offers.iter_mut().find(|o| o.offer_hash == offer.offer_hash) {
            Some(existing) => {
                *existing = offer;
                true
            }
            None => {
                self.offers.push(offer);
                false
            }
        }
    }

    pub fn get(&self, offer_hash: &str) -> Option<&Offer> {
        self.offers.iter().find(|o| o.offer_hash == offer_hash)
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Offer> {
        self.offers.iter()
    }

    pub fn as_slice(&self) -> &[Offer] {
        &self.offers
    }
}

impl FromIterator<Offer> for OfferSet {
    fn from_iter<I: IntoIterator<Item = Offer>>(iter: I) -> Self {
        let mut set = OfferSet::new();
        for offer in iter {
            set.upsert(offer);
        }
        set
    }
}

impl<'a> IntoIterator for &'a OfferSet {
    type Item = &'a Offer;
    type IntoIter = std::slice::Iter<'a, Offer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for OfferSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The backend has sent both a hash-keyed object and a plain array.
        // A keyed object comes out in hash order.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<Offer>),
            Keyed(BTreeMap<String, Offer>),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            None => OfferSet::new(),
            Some(Repr::List(list)) => list.into_iter().collect(),
            Some(Repr::Keyed(map)) => map.into_values().collect(),
        })
    }
}

/// Aggregate result set of one address search or one shared link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub offers: OfferSet,
    pub address: Address,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sessionID", alias = "sessionId", default)]
    pub session_id: String,
    #[serde(default)]
    pub address_hash: String,
}

/// One decoded line of an offers response body
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    Query(Query),
    Offer(Offer),
}

/// Render an amount in cents as euros, e.g. `29.99 €`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02} €", sign, abs / 100, abs % 100)
}

/// Epoch milliseconds on the way out; milliseconds or RFC 3339 on the way in.
mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(D::Error::custom),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::offer;
    use super::*;
    use serde_json::json;

    #[test]
    fn address_emptiness_ignores_whitespace() {
        assert!(Address::default().is_empty());
        assert!(Address::new(" ", "", "\t", "").is_empty());
        assert!(!Address::new("Main St", "", "", "").is_empty());
        assert!(!Address::new("Main St", "", "", "").is_complete());
        assert!(Address::new("Main St", "1", "Berlin", "10115").is_complete());
    }

    #[test]
    fn address_accepts_server_spelling() {
        let address: Address = serde_json::from_value(json!({
            "street": "Main St",
            "house-number": "1",
            "city": "Berlin",
            "zip-code": "10115"
        }))
        .unwrap();
        assert_eq!(address, Address::new("Main St", "1", "Berlin", "10115"));
    }

    #[test]
    fn offer_decodes_voucher_details_and_defaults() {
        let offer: Offer = serde_json::from_value(json!({
            "provider": "ByteMe",
            "speed": 100,
            "monthlyCostInCent": 2999,
            "offerHash": "x1",
            "voucherDetails": { "type": "PERCENTAGE", "value": 10, "description": "10% off" },
            "voucherType": "legacy",
            "voucherValue": 5
        }))
        .unwrap();

        assert_eq!(offer.provider, "ByteMe");
        assert!(!offer.is_preliminary);
        assert!(!offer.installation_service);
        let voucher = offer.voucher_details.unwrap();
        assert_eq!(voucher.voucher_type, VoucherType::Percentage);
        assert_eq!(voucher.value, 10);
        assert_eq!(voucher.description.as_deref(), Some("10% off"));
    }

    #[test]
    fn offer_without_hash_is_rejected() {
        let result: Result<Offer, _> = serde_json::from_value(json!({
            "provider": "ByteMe",
            "speed": 100,
            "monthlyCostInCent": 2999
        }));
        assert!(result.is_err());
    }

    #[test]
    fn effective_cost_prefers_voucher_price() {
        let mut o = offer("x1", "ByteMe", 100, 2999);
        assert_eq!(o.effective_monthly_cost_in_cent(), 2999);
        o.monthly_cost_in_cent_with_voucher = Some(2499);
        assert_eq!(o.effective_monthly_cost_in_cent(), 2499);
    }

    #[test]
    fn offer_set_upsert_keeps_position_and_last_write() {
        let mut set = OfferSet::new();
        assert!(!set.upsert(offer("a", "ByteMe", 100, 2999)));
        assert!(!set.upsert(offer("b", "WebWunder", 50, 1999)));
        assert!(set.upsert(offer("a", "ByteMe", 100, 2499)));

        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0].offer_hash, "a");
        assert_eq!(set.get("a").unwrap().monthly_cost_in_cent, 2499);
    }

    #[test]
    fn query_decodes_keyed_offers_and_millisecond_timestamp() {
        let query: Query = serde_json::from_value(json!({
            "offers": { "x1": { "provider": "ByteMe", "speed": 100, "monthlyCostInCent": 2999, "offerHash": "x1" } },
            "address": { "street": "Main St", "houseNumber": "1", "city": "Berlin", "zipCode": "10115" },
            "sessionID": "abc",
            "timestamp": 1000,
            "addressHash": "h1"
        }))
        .unwrap();

        assert_eq!(query.offers.len(), 1);
        assert_eq!(query.session_id, "abc");
        assert_eq!(query.timestamp.timestamp_millis(), 1000);
        assert_eq!(query.address_hash, "h1");
    }

    #[test]
    fn keyed_offers_are_ordered_by_hash_and_arrays_by_arrival() {
        let keyed: OfferSet = serde_json::from_value(json!({
            "z9": { "provider": "ByteMe", "speed": 100, "monthlyCostInCent": 2999, "offerHash": "z9" },
            "a1": { "provider": "WebWunder", "speed": 50, "monthlyCostInCent": 1999, "offerHash": "a1" }
        }))
        .unwrap();
        let hashes: Vec<_> = keyed.iter().map(|o| o.offer_hash.as_str()).collect();
        assert_eq!(hashes, ["a1", "z9"]);

        let listed: OfferSet = serde_json::from_value(json!([
            { "provider": "ByteMe", "speed": 100, "monthlyCostInCent": 2999, "offerHash": "z9" },
            { "provider": "WebWunder", "speed": 50, "monthlyCostInCent": 1999, "offerHash": "a1" }
        ]))
        .unwrap();
        let hashes: Vec<_> = listed.iter().map(|o| o.offer_hash.as_str()).collect();
        assert_eq!(hashes, ["z9", "a1"]);
    }

    #[test]
    fn query_decodes_server_shape() {
        let query: Query = serde_json::from_value(json!({
            "address": { "street": "Main St", "house-number": "1", "city": "Berlin", "zip-code": "10115" },
            "timestamp": "2024-05-01T12:30:00.123456789+02:00",
            "sessionId": "abc"
        }))
        .unwrap();

        assert!(query.offers.is_empty());
        assert_eq!(query.session_id, "abc");
        assert!(query.address_hash.is_empty());
        assert_eq!(query.timestamp.to_rfc3339(), "2024-05-01T10:30:00.123456789+00:00");
    }

    #[test]
    fn query_with_null_offers_is_empty() {
        let query: Query = serde_json::from_value(json!({
            "offers": null,
            "address": {},
            "timestamp": 0
        }))
        .unwrap();
        assert!(query.offers.is_empty());
        assert!(query.address.is_empty());
    }

    #[test]
    fn formats_cents_as_euros() {
        assert_eq!(format_cents(2999), "29.99 €");
        assert_eq!(format_cents(5), "0.05 €");
        assert_eq!(format_cents(-150), "-1.50 €");
    }
}
