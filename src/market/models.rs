//! Marketplace domain types.
//!
//! Mirrors the axie objects returned by the GraphQL gateway. Listings are
//! transient: built per poll cycle, discarded after matching/notification.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Axie class. Wire values match the variant names exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    Beast,
    Aquatic,
    Plant,
    Bird,
    Bug,
    Reptile,
    Mech,
    Dawn,
    Dusk,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Class::Beast => "Beast",
            Class::Aquatic => "Aquatic",
            Class::Plant => "Plant",
            Class::Bird => "Bird",
            Class::Bug => "Bug",
            Class::Reptile => "Reptile",
            Class::Mech => "Mech",
            Class::Dawn => "Dawn",
            Class::Dusk => "Dusk",
        };
        f.write_str(name)
    }
}

/// One of the six body-part slots (eyes, ears, mouth, horn, back, tail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub class: Option<Class>,
    #[serde(rename = "type", default)]
    pub slot: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u32,
    pub speed: u32,
    pub skill: u32,
    pub morale: u32,
}

/// Sale auction attached to a listed axie. Prices are wei strings, the USD
/// price is a decimal string, timestamps are unix-seconds strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub starting_price: String,
    pub ending_price: String,
    pub starting_timestamp: String,
    pub ending_timestamp: String,
    #[serde(default)]
    pub current_price: Option<String>,
    #[serde(rename = "currentPriceUSD")]
    pub current_price_usd: String,
}

impl Auction {
    pub fn starting_time(&self) -> Option<DateTime<Utc>> {
        parse_unix_seconds(&self.starting_timestamp)
    }

    pub fn ending_time(&self) -> Option<DateTime<Utc>> {
        parse_unix_seconds(&self.ending_timestamp)
    }
}

fn parse_unix_seconds(raw: &str) -> Option<DateTime<Utc>> {
    let secs = raw.parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// A marketplace listing snapshot.
///
/// `class` is optional because eggs come back with a null class; they can
/// never match a build but may still appear in the latest-listings feed.
/// `stats` is optional because the brief-list query omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub class: Option<Class>,
    #[serde(default)]
    pub breed_count: u32,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub auction: Option<Auction>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Listing {
    /// Current USD price, parsed from the auction. A listing without a
    /// parseable price is excluded from every price-based filter, silently.
    pub fn price(&self) -> Option<Decimal> {
        let auction = self.auction.as_ref()?;
        Decimal::from_str(&auction.current_price_usd).ok()
    }

    pub fn part_names(&self) -> HashSet<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing_json() -> &'static str {
        r#"{
            "id": "8247198",
            "image": "https://storage.roninchain.com/axie/8247198.png",
            "class": "Beast",
            "breedCount": 2,
            "parts": [
                {"id": "eyes-chubby", "name": "Chubby", "class": "Beast", "type": "Eyes"},
                {"id": "mouth-nut-cracker", "name": "Nut Cracker", "class": "Beast", "type": "Mouth"}
            ],
            "stats": {"hp": 45, "speed": 57, "skill": 35, "morale": 58},
            "auction": {
                "startingPrice": "80000000000000000",
                "endingPrice": "40000000000000000",
                "startingTimestamp": "1630444800",
                "endingTimestamp": "1630704000",
                "currentPrice": "61234000000000000",
                "currentPriceUSD": "39.54"
            }
        }"#
    }

    #[test]
    fn test_deserialize_listing() {
        let listing: Listing = serde_json::from_str(listing_json()).unwrap();
        assert_eq!(listing.id, "8247198");
        assert_eq!(listing.class, Some(Class::Beast));
        assert_eq!(listing.breed_count, 2);
        assert_eq!(listing.price(), Some(dec!(39.54)));
        assert!(listing.part_names().contains("Nut Cracker"));
    }

    #[test]
    fn test_egg_with_null_class() {
        let json = r#"{"id": "123", "class": null, "breedCount": 0, "parts": []}"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert!(listing.class.is_none());
        assert!(listing.price().is_none());
    }

    #[test]
    fn test_unparseable_price_is_none() {
        let mut listing: Listing = serde_json::from_str(listing_json()).unwrap();
        listing.auction.as_mut().unwrap().current_price_usd = "not-a-number".to_string();
        assert!(listing.price().is_none());
    }

    #[test]
    fn test_auction_timestamps() {
        let listing: Listing = serde_json::from_str(listing_json()).unwrap();
        let auction = listing.auction.unwrap();
        assert_eq!(auction.starting_time().unwrap().timestamp(), 1630444800);
        assert_eq!(auction.ending_time().unwrap().timestamp(), 1630704000);
    }
}
