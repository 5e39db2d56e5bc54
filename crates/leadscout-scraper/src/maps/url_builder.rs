use leadscout_core::SearchTarget;
use url::form_urlencoded::byte_serialize;

const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/";

/// Build the Maps search URL for "<industry> in <town>".
pub fn build_search_url(target: &SearchTarget) -> String {
    format!(
        "{MAPS_SEARCH_BASE}{}+in+{}",
        encode(&target.industry),
        encode(&target.town)
    )
}

fn encode(part: &str) -> String {
    byte_serialize(part.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_url() {
        let target = SearchTarget::new("Pretoria", "Plumbers").expect("valid target");
        assert_eq!(
            build_search_url(&target),
            "https://www.google.com/maps/search/Plumbers+in+Pretoria"
        );
    }

    #[test]
    fn test_build_search_url_encodes_parts() {
        let target =
            SearchTarget::new(" Port Elizabeth ", "Car & Truck Hire").expect("valid target");
        assert_eq!(
            build_search_url(&target),
            "https://www.google.com/maps/search/Car+%26+Truck+Hire+in+Port+Elizabeth"
        );
    }
}
