// Money parsing and formatting (BRL, integer cents)

use anyhow::Result;

/// Format cents as Brazilian currency, e.g. `R$ 1.234.567,89`
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let reais = abs / 100;
    let centavos = abs % 100;

    let digits = reais.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{:02}", sign, grouped, centavos)
}

/// Parse a user-entered price into cents.
///
/// Accepts `450000`, `450000.50`, `450000,50`, `450.000,50` and an optional
/// `R$` prefix. A single separator followed by exactly three digits is read as
/// a thousands separator.
pub fn parse_price(input: &str) -> Result<i64> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        anyhow::bail!("Price cannot be empty");
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        anyhow::bail!("Invalid price: '{}'. Use digits with optional decimal part, e.g. 450000 or 450.000,00", input);
    }

    // The last separator is decimal only when followed by one or two digits
    let (int_part, frac_part) = match cleaned.rfind(|c: char| c == '.' || c == ',') {
        Some(pos) if cleaned.len() - pos - 1 <= 2 => (&cleaned[..pos], &cleaned[pos + 1..]),
        _ => (cleaned.as_str(), ""),
    };

    let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if int_digits.is_empty() && frac_part.is_empty() {
        anyhow::bail!("Invalid price: '{}'", input);
    }

    let reais: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits
            .parse()
            .map_err(|_| anyhow::anyhow!("Price out of range: '{}'", input))?
    };
    let centavos: i64 = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>()? * 10,
        _ => frac_part.parse::<i64>()?,
    };

    reais
        .checked_mul(100)
        .and_then(|c| c.checked_add(centavos))
        .ok_or_else(|| anyhow::anyhow!("Price out of range: '{}'", input))
}
