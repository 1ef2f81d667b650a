// ISO 8601 duration decoding
// The videos endpoint reports lengths like "PT1H5M30S"; the list shows "1:05:30"

pub const DEFAULT_DURATION: &str = "0:00";

// Reads `<digits><unit>` from the front of `input`.
// Returns the value and the remaining input, or None and the untouched input
// when the component is absent.
fn take_component(input: &str, unit: char) -> (Option<u64>, &str) {
    let digits = input.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || !input[digits..].starts_with(unit) {
        return (None, input);
    }

    match input[..digits].parse::<u64>() {
        Ok(value) => (Some(value), &input[digits + unit.len_utf8()..]),
        Err(_) => (None, input),
    }
}

// Seconds in a token, or None if it overflows
fn total_seconds(hours: u64, minutes: u64, seconds: u64) -> Option<u64> {
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

// ==========================================
// decode_duration()
// ==========================================
// Converts "PT[nH][nM][nS]" into a display string.
//
// - components are summed first, so "PT90S" → "1:30" and "PT90M" → "1:30:00"
// - at least an hour → "H:MM:SS" (hours unpadded)
// - otherwise → "M:SS"
// - missing components count as zero
// - no "PT" prefix, or a total too large to count → "0:00"
//
// Text after the last recognized component is ignored.
pub fn decode_duration(token: &str) -> String {
    let Some(start) = token.find("PT") else {
        return DEFAULT_DURATION.to_string();
    };

    let rest = &token[start + 2..];
    let (hours, rest) = take_component(rest, 'H');
    let (minutes, rest) = take_component(rest, 'M');
    let (seconds, _) = take_component(rest, 'S');

    let Some(total) = total_seconds(
        hours.unwrap_or(0),
        minutes.unwrap_or(0),
        seconds.unwrap_or(0),
    ) else {
        return DEFAULT_DURATION.to_string();
    };

    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
