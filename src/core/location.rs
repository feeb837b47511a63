use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_COUNTRY: &str = "USA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Default for ParsedLocation {
    fn default() -> Self {
        Self {
            city: String::new(),
            state: String::new(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

const US_STATES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

pub fn state_abbreviation(state_name: &str) -> Option<&'static str> {
    let needle = state_name.trim().to_lowercase();
    US_STATES
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, abbrev)| *abbrev)
}

/// Splits "City, State, Country" into its parts.
pub fn parse_location(text: &str) -> ParsedLocation {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if text.trim().is_empty() {
        return ParsedLocation::default();
    }

    let city = parts.first().copied().unwrap_or_default().to_string();
    let mut state = parts.get(1).copied().unwrap_or_default().to_string();
    let country = parts
        .get(2)
        .copied()
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COUNTRY)
        .to_string();

    if state.chars().count() > 2 {
        if let Some(abbrev) = state_abbreviation(&state) {
            state = abbrev.to_string();
        }
    }

    ParsedLocation {
        city,
        state,
        country,
    }
}

/// Text sent to the geocoder for a venue.
pub fn geocode_query(name: &str, location: Option<&str>) -> String {
    let name = name.trim();
    let Some(raw) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return name.to_string();
    };

    let parsed = parse_location(raw);
    let parts: Vec<&str> = [parsed.city.as_str(), parsed.state.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        format!("{}, {}", name, raw)
    } else {
        format!("{}, {}", name, parts.join(", "))
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%B %d %Y", "%b %d %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S"];

fn strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s/:-]").expect("valid date strip pattern"))
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"20\d{2}").expect("valid year pattern"))
}

/// Normalises free-form event dates. Falls back to January 1st when only a
/// year can be recognised.
pub fn parse_event_date(text: &str) -> Option<NaiveDate> {
    let cleaned = strip_regex().replace_all(text, "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(datetime.date());
        }
    }

    let year = year_regex().find(text)?.as_str().parse::<i32>().ok()?;
    tracing::debug!("Only a year could be recognised in date '{}'", text);
    NaiveDate::from_ymd_opt(year, 1, 1)
}
