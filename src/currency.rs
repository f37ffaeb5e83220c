use std::fmt::Write;

/// Map the free-text currency values found in upstream documents onto
/// canonical 3-letter codes. Unrecognized input is upper-cased and passed
/// through; missing input defaults to USD.
pub fn normalize(currency: &str) -> String {
    let trimmed = currency.trim();
    if trimmed.is_empty() {
        return "USD".to_string();
    }

    match trimmed.to_lowercase().as_str() {
        "dollar" | "dollars" | "usd" => "USD",
        "euro" | "euros" | "eur" => "EUR",
        "pound" | "pounds" | "gbp" => "GBP",
        "yen" | "jpy" => "JPY",
        "cad" => "CAD",
        "aud" => "AUD",
        "chf" => "CHF",
        "cny" => "CNY",
        "inr" => "INR",
        _ => return trimmed.to_uppercase(),
    }
    .to_string()
}

/// Render a balance for the list view: normalized code, thousands grouping,
/// two decimals.
pub fn format_balance(balance: f64, currency: &str) -> String {
    format!("{} {}", normalize(currency), format_amount(balance))
}

fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    let _ = write!(out, ".{:02}", frac);
    out
}
