//! Field normalization: digit stripping, money/rate parsing and formatting,
//! date canonicalization, XML-safe text and Id sanitization.
//!
//! Stateless free functions — every component routes its field formatting
//! through here so the wire rules live in exactly one place.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::error::NfseError;

/// Strip every non-digit character. Used for all tax IDs and postal codes.
/// The result may be shorter than expected — callers must re-validate length.
pub fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a monetary value. Accepts plain decimals ("1234.56", "1234") and
/// the Brazilian comma form ("1.234,56").
pub fn parse_valor(raw: &str) -> Result<Decimal, NfseError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&normalized).map_err(|_| NfseError::InvalidFormat {
        field: "valor".into(),
        message: format!("'{raw}' is not a numeric amount"),
    })
}

/// Parse a monetary value that must be present.
pub fn required_valor(raw: Option<&str>, field: &str) -> Result<Decimal, NfseError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_valor(s).map_err(|e| match e {
            NfseError::InvalidFormat { message, .. } => NfseError::InvalidFormat {
                field: field.to_string(),
                message,
            },
            other => other,
        }),
        _ => Err(NfseError::MissingField(field.to_string())),
    }
}

/// Parse a tax rate. Absence (or a blank string) defaults to zero — only
/// non-numeric content fails.
pub fn parse_aliquota(raw: Option<&str>) -> Result<Decimal, NfseError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_valor(s).map_err(|e| match e {
            NfseError::InvalidFormat { message, .. } => NfseError::InvalidFormat {
                field: "aliquota".into(),
                message,
            },
            other => other,
        }),
        _ => Ok(Decimal::ZERO),
    }
}

/// Render a decimal with exactly `places` fraction digits, dot separator,
/// no thousands separator. Half-up rounding (Brazilian fiscal convention).
pub fn format_decimal(d: Decimal, places: u32) -> String {
    let rounded = d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let s = rounded.to_string();
    if places == 0 {
        return match s.find('.') {
            Some(dot) => s[..dot].to_string(),
            None => s,
        };
    }
    match s.find('.') {
        Some(dot) => {
            let decimals = s.len() - dot - 1;
            if decimals < places as usize {
                format!("{s}{}", "0".repeat(places as usize - decimals))
            } else {
                s[..dot + 1 + places as usize].to_string()
            }
        }
        None => format!("{s}.{}", "0".repeat(places as usize)),
    }
}

/// Monetary rendering: exactly 2 decimals.
pub fn format_valor(d: Decimal) -> String {
    format_decimal(d, 2)
}

/// Date rendering grammar of a municipal schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `YYYY-MM-DDThh:mm:ss`.
    IsoDateTime,
    /// `YYYYMMDD` (time discarded).
    Compact,
}

/// Parse an issue timestamp from whatever form the source records carry:
/// ISO date, ISO datetime with or without offset, or compact digit runs
/// (first 8 or 14 digits, tolerant of trailing time digits).
pub fn parse_data_emissao(raw: &str) -> Result<NaiveDateTime, NfseError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN));
    }

    let digits = only_digits(s);
    if digits.len() >= 14 {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S") {
            return Ok(dt);
        }
    }
    if digits.len() >= 8 {
        if let Ok(d) = NaiveDate::parse_from_str(&digits[..8], "%Y%m%d") {
            return Ok(d.and_time(NaiveTime::MIN));
        }
    }

    Err(NfseError::InvalidFormat {
        field: "data_emissao".into(),
        message: format!("'{raw}' matches no accepted date grammar"),
    })
}

/// Render a timestamp in the grammar the target schema expects.
pub fn format_data(dt: NaiveDateTime, style: DateStyle) -> String {
    match style {
        DateStyle::IsoDateTime => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        DateStyle::Compact => dt.format("%Y%m%d").to_string(),
    }
}

/// Render a competence month.
pub fn format_competencia(d: NaiveDate, style: DateStyle) -> String {
    match style {
        DateStyle::IsoDateTime => d.format("%Y-%m-%d").to_string(),
        DateStyle::Compact => d.format("%Y%m%d").to_string(),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || ('\u{10000}'..='\u{10FFFF}').contains(&c)
}

// A '&' already starting a well-formed entity must not be re-escaped,
// otherwise the function would not be idempotent.
fn starts_entity(rest: &[char]) -> bool {
    let Some(semi) = rest.iter().take(12).position(|&c| c == ';') else {
        return false;
    };
    if semi < 2 {
        return false;
    }
    let body: String = rest[1..semi].iter().collect();
    if matches!(body.as_str(), "amp" | "lt" | "gt" | "quot" | "apos") {
        return true;
    }
    if let Some(num) = body.strip_prefix('#') {
        if let Some(hex) = num.strip_prefix('x') {
            return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
        }
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }
    false
}

/// Drop characters outside the XML 1.0 legal code-point ranges, then
/// entity-escape reserved characters. Idempotent:
/// `xml_safe_text(xml_safe_text(s)) == xml_safe_text(s)`.
pub fn xml_safe_text(s: &str) -> String {
    let chars: Vec<char> = s.chars().filter(|&c| is_xml_char(c)).collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '&' if !starts_entity(&chars[i..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Restrict to characters legal in an XML `Id` attribute value. An empty
/// result falls back to `"0"` so the attribute is never blank.
pub fn xml_safe_id(s: &str) -> String {
    let id: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
        .collect();
    if id.is_empty() { "0".to_string() } else { id }
}

/// Fold Latin accents to plain ASCII (municipal validators routinely choke
/// on accented text in Discriminacao).
pub fn strip_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ý' => 'y',
            'Ý' => 'Y',
            other => other,
        })
        .collect()
}
