/// Countries monitored when no explicit list is configured.
pub const DEFAULT_COUNTRIES: [&str; 6] = ["US", "GB", "DE", "FR", "CA", "AU"];

/// Display name for an ISO 3166-1 alpha-2 code. Unknown codes are returned unchanged.
pub fn country_name(code: &str) -> String {
    match code {
        "US" => "United States",
        "GB" => "United Kingdom",
        "DE" => "Germany",
        "FR" => "France",
        "CA" => "Canada",
        "AU" => "Australia",
        other => other,
    }
    .to_string()
}
