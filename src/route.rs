use crate::models::Address;
use reqwest::Url;
use std::collections::HashMap;

/// Client-side page a path resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Results(Address),
    Shared(String),
}

impl Route {
    /// Resolve a path with optional query string. Anything unknown or
    /// incomplete redirects to the landing page.
    pub fn parse(path_and_query: &str) -> Route {
        let relative = path_and_query.trim_start_matches('/');
        let Ok(url) = Url::parse("http://localhost/").and_then(|base| base.join(relative)) else {
            return Route::Landing;
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["offers"] => {
                let params: HashMap<_, _> = url.query_pairs().collect();
                let field = |name: &str| params.get(name).map(|v| v.to_string()).unwrap_or_default();
                let address = Address::new(
                    field("street"),
                    field("houseNumber"),
                    field("city"),
                    field("zipCode"),
                );
                if address.is_complete() {
                    Route::Results(address)
                } else {
                    Route::Landing
                }
            }
            ["offers", "shared", share_id] => Route::Shared(share_id.to_string()),
            _ => Route::Landing,
        }
    }

    /// Path and query string for this route
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Results(address) => Url::parse_with_params(
                "http://localhost/offers",
                &[
                    ("street", address.street.as_str()),
                    ("houseNumber", address.house_number.as_str()),
                    ("city", address.city.as_str()),
                    ("zipCode", address.zip_code.as_str()),
                ],
            )
            .map(|url| format!("{}?{}", url.path(), url.query().unwrap_or_default()))
            .unwrap_or_else(|_| "/offers".to_string()),
            Route::Shared(share_id) => format!("/offers/shared/{share_id}"),
        }
    }
}
