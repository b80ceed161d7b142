use once_cell::sync::Lazy;
use regex::Regex;

// E.164: `+`, a non-zero leading digit, then 1-14 further digits.
static E164_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"));

// Permissive shape check: local@domain.tld, no whitespace. Not RFC 5322.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Strips everything except ASCII digits and a leading `+`. Numbers without a
/// country code are assumed North American and get `+1` prepended. Total
/// function; the output is not guaranteed to be a valid E.164 number.
pub fn normalize_phone_number(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len() + 2);
    for c in input.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '+' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }

    if !cleaned.starts_with('+') {
        cleaned.insert_str(0, "+1");
    }
    cleaned
}

pub fn is_valid_e164(phone: &str) -> bool {
    E164_RE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Normalizes and validates submitted bulk-import rows, silently dropping any
/// entry whose phone number does not survive normalization.
pub fn sanitize_bulk_entries<'a, I>(entries: I) -> Vec<(String, i32)>
where
    I: IntoIterator<Item = (&'a str, i32)>,
{
    entries
        .into_iter()
        .filter_map(|(phone, category_id)| {
            let normalized = normalize_phone_number(phone);
            is_valid_e164(&normalized).then_some((normalized, category_id))
        })
        .collect()
}
