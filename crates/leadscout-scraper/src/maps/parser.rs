use crate::error::{Result, ScrapeError};
use leadscout_core::PhoneNumber;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

const MAPS_ORIGIN: &str = "https://www.google.com";

/// CSS selectors for the Maps markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsSelectors {
    pub feed: String,
    pub result_item: String,
    pub place_link: String,
    pub result_name: String,
    pub result_phone: String,
    pub place_name: String,
    pub place_address: String,
    pub place_phone: String,
    pub place_website: String,
}

impl Default for MapsSelectors {
    fn default() -> Self {
        Self {
            feed: r#"div[role="feed"]"#.to_string(),
            result_item: r#"div[role="article"]"#.to_string(),
            place_link: r#"a[href*="/maps/place/"]"#.to_string(),
            result_name: ".qBF1Pd, .fontHeadlineSmall".to_string(),
            result_phone: "span.UsdlK".to_string(),
            place_name: "h1".to_string(),
            place_address: r#"button[data-item-id="address"]"#.to_string(),
            place_phone: r#"button[data-item-id^="phone:tel:"]"#.to_string(),
            place_website: r#"a[data-item-id="authority"]"#.to_string(),
        }
    }
}

/// A business as seen on Maps, before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessListing {
    pub name: String,
    pub phone: Option<PhoneNumber>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub maps_url: Option<String>,
}

impl BusinessListing {
    /// Whether the place page could fill in missing contact details.
    pub fn needs_details(&self) -> bool {
        self.phone.is_none() || self.address.is_none()
    }
}

struct CompiledSelectors {
    feed: Selector,
    result_item: Selector,
    place_link: Selector,
    result_name: Selector,
    result_phone: Selector,
    place_name: Selector,
    place_address: Selector,
    place_phone: Selector,
    place_website: Selector,
}

pub struct MapsParser {
    selectors: CompiledSelectors,
}

impl MapsParser {
    pub fn new(selectors: &MapsSelectors) -> Result<Self> {
        Ok(Self {
            selectors: CompiledSelectors {
                feed: compile("feed", &selectors.feed)?,
                result_item: compile("result_item", &selectors.result_item)?,
                place_link: compile("place_link", &selectors.place_link)?,
                result_name: compile("result_name", &selectors.result_name)?,
                result_phone: compile("result_phone", &selectors.result_phone)?,
                place_name: compile("place_name", &selectors.place_name)?,
                place_address: compile("place_address", &selectors.place_address)?,
                place_phone: compile("place_phone", &selectors.place_phone)?,
                place_website: compile("place_website", &selectors.place_website)?,
            },
        })
    }

    /// Extract the result cards of a search page.
    ///
    /// When Maps jumps straight to a single place, that place is returned as
    /// the only listing.
    pub fn parse_results(&self, html: &str, page_url: &str) -> Result<Vec<BusinessListing>> {
        let document = Html::parse_document(html);

        let Some(feed) = document.select(&self.selectors.feed).next() else {
            if document.select(&self.selectors.place_name).next().is_some() {
                let listing = self.place_details(
                    &document,
                    BusinessListing {
                        maps_url: Some(page_url.to_string()),
                        ..BusinessListing::default()
                    },
                );
                return Ok(if listing.name.is_empty() {
                    vec![]
                } else {
                    vec![listing]
                });
            }
            return Err(ScrapeError::SelectorsOutdated {
                reason: format!("results feed not found at {page_url}"),
            });
        };

        Ok(feed
            .select(&self.selectors.result_item)
            .filter_map(|item| self.parse_item(&item))
            .collect())
    }

    /// Fill in a listing from its place page. Fields missing on the page keep
    /// their previous values.
    pub fn parse_place(&self, html: &str, listing: BusinessListing) -> BusinessListing {
        let document = Html::parse_document(html);
        self.place_details(&document, listing)
    }

    fn parse_item(&self, item: &ElementRef) -> Option<BusinessListing> {
        let link = item.select(&self.selectors.place_link).next();

        let name = link
            .and_then(|a| a.value().attr("aria-label"))
            .map(clean_text)
            .filter(|name| !name.is_empty())
            .or_else(|| first_text(item, &self.selectors.result_name))?;

        let maps_url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(absolute_url);

        let phone = first_text(item, &self.selectors.result_phone)
            .and_then(|text| PhoneNumber::parse(&text).ok())
            .or_else(|| find_phone(&item.text().collect::<Vec<_>>().join(" ")));

        Some(BusinessListing {
            name,
            phone,
            address: None,
            website: None,
            maps_url,
        })
    }

    fn place_details(&self, document: &Html, mut listing: BusinessListing) -> BusinessListing {
        let root = document.root_element();

        if let Some(name) = first_text(&root, &self.selectors.place_name) {
            listing.name = name;
        }

        if let Some(button) = root.select(&self.selectors.place_address).next() {
            let address = button
                .value()
                .attr("aria-label")
                .map(|label| clean_text(label.trim_start_matches("Address:")))
                .filter(|a| !a.is_empty())
                .or_else(|| Some(clean_text(&button.text().collect::<String>())))
                .filter(|a| !a.is_empty());
            if address.is_some() {
                listing.address = address;
            }
        }

        if let Some(button) = root.select(&self.selectors.place_phone).next() {
            let phone = button
                .value()
                .attr("data-item-id")
                .and_then(|id| id.strip_prefix("phone:tel:"))
                .and_then(|digits| PhoneNumber::parse(digits).ok())
                .or_else(|| {
                    button
                        .value()
                        .attr("aria-label")
                        .and_then(|label| PhoneNumber::parse(label).ok())
                });
            if phone.is_some() {
                listing.phone = phone;
            }
        }

        if let Some(website) = root
            .select(&self.selectors.place_website)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            listing.website = Some(website.to_string());
        }

        listing
    }
}

impl Default for MapsParser {
    fn default() -> Self {
        Self::new(&MapsSelectors::default()).expect("default Maps selectors are valid")
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::SelectorsOutdated {
        reason: format!("Invalid {field} selector '{selector}': {e}"),
    })
}

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn absolute_url(href: &str) -> Option<String> {
    Url::parse(MAPS_ORIGIN)
        .and_then(|base| base.join(href))
        .ok()
        .map(String::from)
}

/// First South African phone number in free text.
fn find_phone(text: &str) -> Option<PhoneNumber> {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX.get_or_init(|| {
        Regex::new(r"(?:\+27|\b0)\s?\(?\d{2}\)?[\s-]?\d{3}[\s-]?\d{4}\b").expect("valid regex")
    });

    regex
        .find(text)
        .and_then(|m| PhoneNumber::parse(m.as_str()).ok())
}
