use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value as Json;
use url::Url;

use crate::foundation::value::Value;

/// Named value representations understood by `Configuration::value_as`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    /// The resolved value as-is, no conversion applied.
    Bare,
    /// The value's raw data view.
    Json,
    /// The value wrapped as a child configuration.
    Configuration,
    /// A configuration wrapper that may or may not be constructible.
    MaybeConfiguration,
    String,
    Number,
    Boolean,
    Date,
    Color,
    Image,
    Url,
    Data,
    Resource,
}

impl Representation {
    /// Get the representation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Representation::Bare => "bare",
            Representation::Json => "json",
            Representation::Configuration => "configuration",
            Representation::MaybeConfiguration => "maybe-configuration",
            Representation::String => "string",
            Representation::Number => "number",
            Representation::Boolean => "boolean",
            Representation::Date => "date",
            Representation::Color => "color",
            Representation::Image => "image",
            Representation::Url => "url",
            Representation::Data => "data",
            Representation::Resource => "resource",
        }
    }
}

/// ARGB colour value parsed from configuration data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    /// Parse `#RGB`, `#RRGGBB` or `#AARRGGBB` hex notation. Colours without
    /// an alpha component are fully opaque.
    pub fn parse(s: &str) -> Option<Color> {
        let hex = s.strip_prefix('#')?;
        match hex.len() {
            3 => {
                let n = u32::from_str_radix(hex, 16).ok()?;
                let (r, g, b) = ((n >> 8) & 0xf, (n >> 4) & 0xf, n & 0xf);
                Some(Color(
                    0xff00_0000 | (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11),
                ))
            }
            6 => Some(Color(0xff00_0000 | u32::from_str_radix(hex, 16).ok()?)),
            8 => Some(Color(u32::from_str_radix(hex, 16).ok()?)),
            _ => None,
        }
    }

    pub fn argb(&self) -> u32 {
        self.0
    }

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Functions for converting resolved values between representations.
///
/// Supplied as a collaborator so that platform-specific representations
/// (e.g. images) can be layered over the standard scalar conversions.
pub trait ConversionService {
    /// Convert a value to the named representation; `None` when the value
    /// cannot be represented that way.
    fn as_representation(&self, value: &Value, representation: Representation) -> Option<Value>;

    /// Parse a JSON data source string.
    fn as_json_data(&self, source: &str) -> Option<Json>;

    /// Parse a colour value.
    fn as_color(&self, value: &str) -> Option<Color>;
}

/// The standard scalar conversions.
pub struct StandardConversions;

impl ConversionService for StandardConversions {
    fn as_representation(&self, value: &Value, representation: Representation) -> Option<Value> {
        match representation {
            Representation::String => to_string(value).map(|s| Value::Json(Json::String(s))),
            Representation::Number => to_number(value)
                .and_then(serde_json::Number::from_f64)
                .map(|n| Value::Json(Json::Number(n))),
            Representation::Boolean => to_bool(value).map(|b| Value::Json(Json::Bool(b))),
            Representation::Date => to_date(value).map(Value::Date),
            Representation::Color => to_color(value).map(Value::Color),
            Representation::Url => to_url(value).map(Value::Url),
            Representation::Data => to_data(value).map(Value::Data),
            Representation::Json => value.as_json().map(Value::Json),
            // structural representations are handled by the configuration
            // itself; images need a platform-supplied service
            _ => None,
        }
    }

    fn as_json_data(&self, source: &str) -> Option<Json> {
        serde_json::from_str(source).ok()
    }

    fn as_color(&self, value: &str) -> Option<Color> {
        Color::parse(value)
    }
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::Json(Json::String(s)) => Some(s.clone()),
        Value::Json(Json::Number(n)) => Some(n.to_string()),
        Value::Json(Json::Bool(b)) => Some(b.to_string()),
        Value::Date(date) => Some(date.to_rfc3339()),
        Value::Url(url) => Some(url.to_string()),
        Value::Color(color) => Some(color.to_string()),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Json(Json::Number(n)) => n.as_f64(),
        Value::Json(Json::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Json(Json::Bool(b)) => Some(*b),
        Value::Json(Json::String(s)) => s.parse().ok(),
        Value::Json(Json::Number(n)) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(date) => Some(*date),
        Value::Json(Json::String(s)) => parse_date(s),
        // numbers are epoch milliseconds
        Value::Json(Json::Number(n)) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn to_color(value: &Value) -> Option<Color> {
    match value {
        Value::Color(color) => Some(*color),
        Value::Json(Json::String(s)) => Color::parse(s),
        Value::Json(Json::Number(n)) => Some(Color(n.as_u64()? as u32)),
        _ => None,
    }
}

fn to_url(value: &Value) -> Option<Url> {
    match value {
        Value::Url(url) => Some(url.clone()),
        Value::Json(Json::String(s)) => Url::parse(s).ok(),
        _ => None,
    }
}

fn to_data(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Data(bytes) => Some(bytes.clone()),
        Value::Json(Json::String(s)) => Some(s.as_bytes().to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#000000"), Some(Color(0xff00_0000)));
        assert_eq!(Color::parse("#ff8000"), Some(Color(0xffff_8000)));
        assert_eq!(Color::parse("#80ff8000"), Some(Color(0x80ff_8000)));
        assert_eq!(Color::parse("#fff"), Some(Color(0xffff_ffff)));
        assert_eq!(Color::parse("ff8000"), None);
        assert_eq!(Color::parse("#zzzzzz"), None);
    }

    #[test]
    fn test_color_channels() {
        let color = Color::parse("#80402010").unwrap();
        assert_eq!(color.alpha(), 0x80);
        assert_eq!(color.red(), 0x40);
        assert_eq!(color.green(), 0x20);
        assert_eq!(color.blue(), 0x10);
    }

    #[test]
    fn test_string_conversion() {
        let conversions = StandardConversions;
        let value = conversions
            .as_representation(&Value::Json(json!(42)), Representation::String)
            .unwrap();
        assert_eq!(value.as_str(), Some("42"));
    }

    #[test]
    fn test_number_conversion_from_string() {
        let conversions = StandardConversions;
        let value = conversions
            .as_representation(&Value::Json(json!("3.5")), Representation::Number)
            .unwrap();
        assert_eq!(value.as_json(), Some(json!(3.5)));
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(to_bool(&Value::Json(json!(true))), Some(true));
        assert_eq!(to_bool(&Value::Json(json!("false"))), Some(false));
        assert_eq!(to_bool(&Value::Json(json!(1))), Some(true));
        assert_eq!(to_bool(&Value::Json(json!(0))), Some(false));
        assert_eq!(to_bool(&Value::Json(json!({}))), None);
    }

    #[test]
    fn test_date_parsing() {
        let date = to_date(&Value::Json(json!("2016-04-15T10:30:00Z"))).unwrap();
        assert_eq!(date.to_rfc3339(), "2016-04-15T10:30:00+00:00");
        let date = to_date(&Value::Json(json!("2016-04-15"))).unwrap();
        assert_eq!(date.to_rfc3339(), "2016-04-15T00:00:00+00:00");
        assert!(to_date(&Value::Json(json!("not a date"))).is_none());
    }

    #[test]
    fn test_url_conversion() {
        let url = to_url(&Value::Json(json!("https://example.com/a"))).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(to_url(&Value::Json(json!("::nope::"))).is_none());
    }

    #[test]
    fn test_unsupported_representation_fails_closed() {
        let conversions = StandardConversions;
        assert!(conversions
            .as_representation(&Value::Json(json!("x")), Representation::Image)
            .is_none());
    }
}
