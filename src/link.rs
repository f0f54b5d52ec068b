/*!
 * Booking deep-link codec
 *
 * The gorzdrav schedule page keeps its navigation state in the URL fragment:
 * a percent-encoded JSON array of single-key objects, for example
 *
 * ```text
 * https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22district%22:%225%22%7D,%7B%22lpu%22:%223%22%7D,...%5D
 * ```
 *
 * [`parse`] turns such a link into [`Identifiers`], [`generate`] builds the
 * canonical link back. Older links that do not survive strict JSON decoding
 * are still read by a pattern-based fallback.
 */

use std::str::FromStr;

use lazy_static::lazy_static;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::{GorzdravError, Result};

/// Host serving the booking page
pub const BOOKING_HOST: &str = "gorzdrav.spb.ru";

/// Path of the booking page
pub const BOOKING_PATH: &str = "/service-free-schedule";

/// Canonical link prefix, fragment marker included
pub const BOOKING_BASE_URL: &str = "https://gorzdrav.spb.ru/service-free-schedule#";

/// Characters left literal in the fragment, same as JavaScript `encodeURI`
/// except for `#`, which would end the fragment.
const FRAGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$');

/// Structured identifiers carried by a booking link
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    pub district_id: Option<String>,
    pub lpu_id: Option<i64>,
    pub specialty_id: Option<String>,
    /// Doctor (schedule) identifier
    pub doctor_id: Option<String>,
}

impl Identifiers {
    /// Identifiers for a specialty within an institution
    pub fn new(lpu_id: i64, specialty_id: impl Into<String>) -> Self {
        Self {
            lpu_id: Some(lpu_id),
            specialty_id: Some(specialty_id.into()),
            ..Self::default()
        }
    }

    pub fn with_district(mut self, district_id: impl Into<String>) -> Self {
        self.district_id = Some(district_id.into());
        self
    }

    pub fn with_doctor(mut self, doctor_id: impl Into<String>) -> Self {
        self.doctor_id = Some(doctor_id.into());
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.district_id.is_none()
            && self.lpu_id.is_none()
            && self.specialty_id.is_none()
            && self.doctor_id.is_none()
    }

    /// True when institution and specialty are both known
    pub fn is_complete(&self) -> bool {
        self.lpu_id.is_some() && self.specialty_id.is_some()
    }

    /// Canonical booking link for these identifiers
    pub fn booking_link(&self) -> Result<String> {
        generate(self)
    }
}

impl FromStr for Identifiers {
    type Err = GorzdravError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

/// Check whether `url` points at the booking page.
///
/// Only host and path are compared; query and fragment are ignored. A URL
/// given without a scheme is read as `https://`.
pub fn is_booking_link(url: &str) -> bool {
    parse_url(url).is_some_and(|u| is_booking_page(&u))
}

/// Decode a booking link into [`Identifiers`].
///
/// Returns [`GorzdravError::LinkNotRecognized`] when the input is not a
/// booking link or no decoding strategy finds both an institution and a
/// specialty.
pub fn parse(url: &str) -> Result<Identifiers> {
    if !is_booking_link(url) {
        return Err(GorzdravError::link_not_recognized(url));
    }

    let fragment = match url.trim().split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => fragment,
        _ => return Err(GorzdravError::link_not_recognized(url)),
    };

    STRATEGIES
        .iter()
        .filter_map(|strategy| strategy(fragment))
        .find(Identifiers::is_complete)
        .ok_or_else(|| GorzdravError::link_not_recognized(url))
}

/// Build the canonical booking link.
///
/// Entries are emitted in the order `district, lpu, speciality, schedule,
/// doctor`; the doctor id is written under both `schedule` and `doctor`.
/// Absent fields are left out. Empty strings are rejected, since a link
/// cannot tell them apart from an absent field.
pub fn generate(identifiers: &Identifiers) -> Result<String> {
    if identifiers.is_empty() {
        return Err(GorzdravError::empty_identifiers());
    }
    for (field, value) in [
        ("district", &identifiers.district_id),
        ("specialty", &identifiers.specialty_id),
        ("doctor", &identifiers.doctor_id),
    ] {
        if value.as_deref() == Some("") {
            return Err(GorzdravError::InvalidIdentifiers {
                message: format!("{} id cannot be an empty string", field),
            });
        }
    }

    let mut entries = Vec::with_capacity(5);
    if let Some(district) = &identifiers.district_id {
        entries.push(json!({ "district": district }));
    }
    if let Some(lpu) = identifiers.lpu_id {
        entries.push(json!({ "lpu": lpu.to_string() }));
    }
    if let Some(specialty) = &identifiers.specialty_id {
        entries.push(json!({ "speciality": specialty }));
    }
    if let Some(doctor) = &identifiers.doctor_id {
        entries.push(json!({ "schedule": doctor }));
        entries.push(json!({ "doctor": doctor }));
    }

    let payload = Value::Array(entries).to_string();
    Ok(format!(
        "{}{}",
        BOOKING_BASE_URL,
        utf8_percent_encode(&payload, FRAGMENT_ENCODE_SET)
    ))
}

fn parse_url(input: &str) -> Option<Url> {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", input)).ok(),
        Err(_) => None,
    }
}

fn is_booking_page(url: &Url) -> bool {
    let host_matches = url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(BOOKING_HOST));
    let path = url.path();
    let path = path
        .strip_suffix('/')
        .filter(|p| !p.is_empty())
        .unwrap_or(path);
    host_matches && path == BOOKING_PATH
}

/// A fragment decoding strategy; `None` means "no match", never an error
type Strategy = fn(&str) -> Option<Identifiers>;

/// Tried in order, first complete result wins
const STRATEGIES: &[Strategy] = &[structured_pass, pattern_pass];

/// Percent-decode the fragment and read it as the JSON array of
/// single-key objects.
fn structured_pass(fragment: &str) -> Option<Identifiers> {
    let decoded = percent_decode_str(fragment).decode_utf8().ok()?;
    let entries: Vec<Map<String, Value>> = serde_json::from_str(&decoded).ok()?;

    let mut identifiers = Identifiers::default();
    let mut schedule = None;

    for entry in entries {
        if entry.len() != 1 {
            return None;
        }
        let (key, value) = entry.into_iter().next()?;
        let Some(value) = scalar_text(&value)? else {
            continue;
        };

        match key.as_str() {
            "district" => identifiers.district_id = Some(value),
            "lpu" => identifiers.lpu_id = Some(value.parse().ok()?),
            "speciality" | "specialty" => identifiers.specialty_id = Some(value),
            "schedule" => schedule = Some(value),
            "doctor" => identifiers.doctor_id = Some(value),
            _ => {}
        }
    }

    if identifiers.doctor_id.is_none() {
        identifiers.doctor_id = schedule;
    }
    Some(identifiers)
}

/// String or number as text, strings exactly as written. The empty string
/// reads as "not set" (`Some(None)`), other JSON kinds fail the pass.
fn scalar_text(value: &Value) -> Option<Option<String>> {
    match value {
        Value::String(s) if s.is_empty() => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Number(n) => Some(Some(n.to_string())),
        _ => None,
    }
}

/// Key followed by `=`, `:` or `%3A`, with optional plain or encoded quotes
/// around key and value.
fn field_pattern(keys: &str) -> Regex {
    let pattern = format!(
        r#"(?i)(?:^|[^a-z])(?:{})(?:%22|")?\s*(?:=|:|%3A)\s*(?:%22|")?([^"&,;{{}}\[\]%#/\s]+)"#,
        keys
    );
    Regex::new(&pattern).expect("field pattern is a valid regex")
}

lazy_static! {
    static ref DISTRICT_PATTERN: Regex = field_pattern("district");
    static ref LPU_PATTERN: Regex = field_pattern("lpu");
    static ref SPECIALTY_PATTERN: Regex = field_pattern("speciality|specialty");
    static ref SCHEDULE_PATTERN: Regex = field_pattern("schedule");
    static ref DOCTOR_PATTERN: Regex = field_pattern("doctor");
}

/// Pull the known key/value tokens straight out of the raw fragment.
fn pattern_pass(fragment: &str) -> Option<Identifiers> {
    let find = |pattern: &Regex| {
        pattern
            .captures(fragment)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    let schedule = find(&SCHEDULE_PATTERN);
    let identifiers = Identifiers {
        district_id: find(&DISTRICT_PATTERN),
        lpu_id: find(&LPU_PATTERN).and_then(|lpu| lpu.parse().ok()),
        specialty_id: find(&SPECIALTY_PATTERN),
        doctor_id: find(&DOCTOR_PATTERN).or(schedule),
    };

    (!identifiers.is_empty()).then_some(identifiers)
}
