use super::parser::BusinessListing;
use leadscout_core::PhoneNumber;
use std::collections::HashSet;

/// Tracks listings already seen in a session.
///
/// A listing with a phone number is a duplicate when that number was seen
/// before. A listing without one is a duplicate when a listing with the same
/// name and address (case-insensitive) was seen before.
#[derive(Debug, Default)]
pub struct ListingDeduper {
    phones: HashSet<PhoneNumber>,
    identities: HashSet<(String, String)>,
}

impl ListingDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a listing. Returns `false` if it duplicates an earlier one.
    pub fn insert(&mut self, listing: &BusinessListing) -> bool {
        let identity = (
            normalize(&listing.name),
            normalize(listing.address.as_deref().unwrap_or_default()),
        );

        let duplicate = match &listing.phone {
            Some(phone) => self.phones.contains(phone),
            None => self.identities.contains(&identity),
        };
        if duplicate {
            return false;
        }

        if let Some(phone) = &listing.phone {
            self.phones.insert(phone.clone());
        }
        self.identities.insert(identity);
        true
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, phone: Option<&str>, address: Option<&str>) -> BusinessListing {
        BusinessListing {
            name: name.to_string(),
            phone: phone.map(|p| PhoneNumber::parse(p).expect("valid phone")),
            address: address.map(str::to_string),
            ..BusinessListing::default()
        }
    }

    #[test]
    fn test_same_phone_is_duplicate() {
        let mut deduper = ListingDeduper::new();
        assert!(deduper.insert(&listing("Pipe Pros", Some("082 123 4567"), None)));
        assert!(!deduper.insert(&listing("Pipe Pros Centurion", Some("+27821234567"), None)));
        assert!(deduper.insert(&listing("Pipe Pros", Some("0831234567"), None)));
    }

    #[test]
    fn test_phoneless_listing_matches_name_and_address() {
        let mut deduper = ListingDeduper::new();
        assert!(deduper.insert(&listing("Pipe Pros", Some("0821234567"), Some("12 Church St"))));
        assert!(!deduper.insert(&listing("PIPE  pros", None, Some("12 church st"))));
        assert!(deduper.insert(&listing("Pipe Pros", None, Some("9 Long St"))));
        assert_eq!(deduper.len(), 2);
    }
}
