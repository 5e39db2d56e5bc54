use crate::captcha::detect_captcha;
use crate::error::{Result, ScrapeError};
use leadscout_browser::PageSession;
use leadscout_core::{PhoneNumber, Provider, ProviderLookupConfig};
use scraper::{Html, Selector};

/// Queries the public lookup site for the network a number belongs to.
pub struct ProviderLookup {
    url_template: String,
    result_selector: Selector,
}

impl ProviderLookup {
    pub fn new(config: &ProviderLookupConfig) -> Result<Self> {
        if !config.url_template.contains("{number}") {
            return Err(ScrapeError::Validation(format!(
                "lookup URL template '{}' has no {{number}} placeholder",
                config.url_template
            )));
        }

        let result_selector = Selector::parse(&config.result_selector).map_err(|e| {
            ScrapeError::SelectorsOutdated {
                reason: format!("Invalid result selector '{}': {e}", config.result_selector),
            }
        })?;

        Ok(Self {
            url_template: config.url_template.clone(),
            result_selector,
        })
    }

    pub fn lookup_url(&self, phone: &PhoneNumber) -> String {
        self.url_template.replace("{number}", phone.as_str())
    }

    /// Look up one number in an open page session.
    pub async fn lookup(
        &self,
        session: &mut dyn PageSession,
        phone: &PhoneNumber,
    ) -> Result<Provider> {
        let url = self.lookup_url(phone);
        let html = session.fetch_html(&url).await?;
        let provider = self.parse_response(&url, &html)?;
        tracing::debug!("Provider for {} is {}", phone, provider);
        Ok(provider)
    }

    /// Read the provider from a lookup response.
    ///
    /// The result container is searched first; a container naming no known
    /// operator means `Other`. Without a container the whole page text is
    /// searched, and finding nothing means the page layout changed.
    pub fn parse_response(&self, url: &str, html: &str) -> Result<Provider> {
        if detect_captcha(html) {
            return Err(ScrapeError::CaptchaRequired {
                url: url.to_string(),
            });
        }

        let document = Html::parse_document(html);

        let results: Vec<String> = document
            .select(&self.result_selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .collect();
        if !results.is_empty() {
            return Ok(Provider::from_label(&results.join(" ")).unwrap_or(Provider::Other));
        }

        let body = document.root_element().text().collect::<Vec<_>>().join(" ");
        Provider::from_label(&body).ok_or_else(|| ScrapeError::SelectorsOutdated {
            reason: format!("no provider found in lookup response from {url}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> ProviderLookup {
        ProviderLookup::new(&ProviderLookupConfig::default()).expect("default config is valid")
    }

    #[test]
    fn test_lookup_url() {
        let phone = PhoneNumber::parse("+27 82 123 4567").unwrap();
        assert_eq!(
            lookup().lookup_url(&phone),
            "https://www.porting.co.za/PublicWebsite/crs?number=0821234567"
        );
    }

    #[test]
    fn test_parse_result_container() {
        let html = r#"<div class="result"><span class="network-name">Vodacom (Pty) Ltd</span></div>"#;
        assert_eq!(lookup().parse_response("u", html).unwrap(), Provider::Vodacom);

        let html = r#"<div id="provider">Telkom Mobile (8ta)</div>"#;
        assert_eq!(lookup().parse_response("u", html).unwrap(), Provider::Telkom);
    }

    #[test]
    fn test_unknown_operator_in_container_is_other() {
        let html = r#"<div class="provider">Liquid Telecom</div>"#;
        assert_eq!(lookup().parse_response("u", html).unwrap(), Provider::Other);
    }

    #[test]
    fn test_falls_back_to_body_text() {
        let html = "<html><body><p>The number is currently serviced by MTN.</p></body></html>";
        assert_eq!(lookup().parse_response("u", html).unwrap(), Provider::Mtn);
    }

    #[test]
    fn test_unrecognized_page() {
        let html = "<html><body><p>Service unavailable</p></body></html>";
        assert!(matches!(
            lookup().parse_response("u", html),
            Err(ScrapeError::SelectorsOutdated { .. })
        ));
    }

    #[test]
    fn test_captcha_response() {
        let html = r#"<div class="g-recaptcha"></div><div class="provider">Vodacom</div>"#;
        assert!(lookup().parse_response("u", html).unwrap_err().is_captcha());
    }

    #[test]
    fn test_template_without_placeholder() {
        let config = ProviderLookupConfig {
            url_template: "https://lookup.example/".to_string(),
            ..ProviderLookupConfig::default()
        };
        assert!(matches!(
            ProviderLookup::new(&config),
            Err(ScrapeError::Validation(_))
        ));
    }
}
