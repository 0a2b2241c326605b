//! Text formatting helpers used by command replies.

/// Format `value` with `decimals` fractional digits, grouping the integer
/// part every `group` digits with commas.
///
/// `format_number(1234567.891, 2, 3)` yields `"1,234,567.89"`. A `group` of
/// zero disables grouping.
#[must_use]
pub fn format_number(value: f64, decimals: usize, group: usize) -> String {
    let fixed = format!("{value:.decimals$}");
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if group > 0 && i > 0 && (len - i) % group == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Right-pad `text` with repetitions of `pad` until it is at least `width`
/// characters long. Text already that long is returned unchanged.
#[must_use]
pub fn rpad(text: &str, pad: char, width: usize) -> String {
    let mut padded = text.to_string();
    let current = text.chars().count();
    if current < width {
        padded.extend(std::iter::repeat(pad).take(width - current));
    }
    padded
}
