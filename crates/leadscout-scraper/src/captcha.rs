//! Detection of CAPTCHA and "unusual traffic" interstitials.

/// Markers that only appear on challenge pages, matched case-insensitively.
const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "recaptcha/api",
    "hcaptcha.com",
    "id=\"captcha-form\"",
    "www.google.com/sorry",
    "unusual traffic from your computer network",
    "our systems have detected unusual traffic",
];

/// Detect CAPTCHA challenges in HTML content.
pub fn detect_captcha(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}
