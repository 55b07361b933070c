//! GraphQL documents and variable builders for the marketplace gateway.
//!
//! Two operations are consumed: `GetAxieLatest` (newest currently listed
//! axies) and `GetAxieBriefList` (paginated sweep with server-side class,
//! breed-count and part filters).

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::builds::Build;
use crate::market::models::Class;

pub const NEW_LISTINGS_OPERATION: &str = "GetAxieLatest";

pub const NEW_LISTINGS_QUERY: &str = r#"query GetAxieLatest($auctionType: AuctionType, $criteria: AxieSearchCriteria, $from: Int, $sort: SortBy, $size: Int) {
  axies(auctionType: $auctionType, criteria: $criteria, from: $from, sort: $sort, size: $size) {
    total
    results {
      ...AxieBrief
      __typename
    }
    __typename
  }
}
fragment AxieBrief on Axie {
  id
  image
  class
  breedCount
  parts {
    id
    name
    class
    type
    __typename
  }
  stats {
    hp
    speed
    skill
    morale
    __typename
  }
  auction {
    startingPrice
    endingPrice
    startingTimestamp
    endingTimestamp
    currentPrice
    currentPriceUSD
    __typename
  }
  __typename
}"#;

pub const OLD_LISTINGS_OPERATION: &str = "GetAxieBriefList";

pub const OLD_LISTINGS_QUERY: &str = r#"query GetAxieBriefList($auctionType: AuctionType, $criteria: AxieSearchCriteria, $from: Int, $sort: SortBy, $size: Int) {
  axies(auctionType: $auctionType, criteria: $criteria, from: $from, sort: $sort, size: $size) {
    total
    results {
      id
      image
      class
      breedCount
      parts {
        id
        name
        class
        type
        __typename
      }
      auction {
        startingPrice
        endingPrice
        startingTimestamp
        endingTimestamp
        currentPrice
        currentPriceUSD
        __typename
      }
      __typename
    }
    __typename
  }
}"#;

pub fn new_listings_variables(size: u32) -> Value {
    json!({
        "from": 0,
        "size": size,
        "sort": "Latest",
        "auctionType": "Sale",
        "criteria": {}
    })
}

/// Breed counts eligible under a ceiling: `0..ceiling`, except a ceiling of
/// zero means only unbred axies — `[0]`, never an empty enumeration.
pub fn breed_count_range(max_breed_count: u32) -> Vec<u32> {
    if max_breed_count == 0 {
        vec![0]
    } else {
        (0..max_breed_count).collect()
    }
}

pub fn old_listings_variables(build: &Build, from: u32, size: u32) -> Value {
    json!({
        "from": from,
        "size": size,
        "sort": "PriceAsc",
        "auctionType": "Sale",
        "criteria": {
            "classes": class_names(&build.classes),
            "breedCount": breed_count_range(build.max_breed_count),
            "parts": build.part_ids,
        }
    })
}

fn class_names(classes: &HashSet<Class>) -> Vec<String> {
    let mut names: Vec<String> = classes.iter().map(Class::to_string).collect();
    names.sort();
    names
}
