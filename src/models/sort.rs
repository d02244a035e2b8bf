use super::Offer;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One entry of the sort dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOption {
    pub key: &'static str,
    pub label: &'static str,
    pub field: SortField,
    pub direction: SortDirection,
}

pub const SORT_OPTIONS: [SortOption; 4] = [
    SortOption {
        key: "price-asc",
        label: "Price: Low to High",
        field: SortField::Price,
        direction: SortDirection::Asc,
    },
    SortOption {
        key: "price-desc",
        label: "Price: High to Low",
        field: SortField::Price,
        direction: SortDirection::Desc,
    },
    SortOption {
        key: "speed-asc",
        label: "Speed: Low to High",
        field: SortField::Speed,
        direction: SortDirection::Asc,
    },
    SortOption {
        key: "speed-desc",
        label: "Speed: High to Low",
        field: SortField::Speed,
        direction: SortDirection::Desc,
    },
];

impl SortOption {
    pub fn from_key(key: &str) -> Option<&'static SortOption> {
        SORT_OPTIONS.iter().find(|o| o.key == key)
    }

    pub fn compare(&self, a: &Offer, b: &Offer) -> Ordering {
        let ordering = match self.field {
            SortField::Price => a.monthly_cost_in_cent.cmp(&b.monthly_cost_in_cent),
            SortField::Speed => a.speed.cmp(&b.speed),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Returns a sorted copy; equal keys keep their input order.
pub fn sort_offers(offers: &[Offer], option: &SortOption) -> Vec<Offer> {
    let mut sorted = offers.to_vec();
    sorted.sort_by(|a, b| option.compare(a, b));
    sorted
}
