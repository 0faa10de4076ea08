use crate::transaction::{COIN_DECIMALS, ZATOSHI_PER_COIN};

/// Render a signed zatoshi amount as whole coins with all eight decimals.
pub fn format_zatoshi(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let magnitude = amount.unsigned_abs();
    let per_coin = ZATOSHI_PER_COIN as u64;
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / per_coin,
        magnitude % per_coin,
        width = COIN_DECIMALS as usize
    )
}

/// Parse a non-negative decimal coin amount into zatoshi.
///
/// Digits past the eighth decimal place are dropped, never rounded. Returns `None` for
/// anything that is not a plain decimal number or that overflows.
pub fn parse_coin_amount(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().ok()?
    };

    let decimals = COIN_DECIMALS as usize;
    let kept = &fraction[..fraction.len().min(decimals)];
    let fraction_value = if kept.is_empty() {
        0
    } else {
        kept.parse::<u64>().ok()? * 10u64.pow((decimals - kept.len()) as u32)
    };

    whole_value
        .checked_mul(ZATOSHI_PER_COIN as u64)?
        .checked_add(fraction_value)
}
