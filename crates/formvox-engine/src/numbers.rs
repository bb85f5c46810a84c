//! Spoken number reading.
//!
//! Utterances are split into tokens and number words are combined
//! arithmetically, so "twenty one" reads as 21 and "one hundred twenty" as
//! 120. Consecutive single numbers that cannot combine ("five five five")
//! are read digit by digit and concatenated, the way people dictate codes.

/// Kind of the previous numeric token, used to decide whether the next one
/// adds to the running value or starts a new group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Nothing,
    Unit,
    Tens,
    Hundred,
    Thousand,
}

fn unit_value(word: &str) -> Option<u64> {
    let value = match word {
        "zero" | "oh" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        _ => return None,
    };
    Some(value)
}

fn tens_value(word: &str) -> Option<u64> {
    let value = match word {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

/// Splits an utterance into lower-case tokens. Hyphens separate words
/// ("twenty-one") except a leading one, which reads as a sign ("-5").
fn tokenize(utterance: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in utterance.to_lowercase().split_whitespace() {
        for (i, part) in chunk.split('-').enumerate() {
            if i == 0 && part.is_empty() && chunk.len() > 1 {
                tokens.push("minus".to_string());
                continue;
            }
            let token = part
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '.')
                .trim_end_matches('.')
                .replace(',', "");
            if !token.is_empty() {
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Accumulates one arithmetic group such as "two thousand five hundred".
#[derive(Debug, Default)]
struct Group {
    thousands: u64,
    small: u64,
    active: bool,
}

impl Group {
    fn value(&self) -> Option<u64> {
        self.thousands.checked_add(self.small)
    }
}

/// Reads the numeric value spoken in `utterance`.
///
/// Returns the canonical digit string (with an optional leading `-` and a
/// single `.`), or `None` when the utterance carries no number at all or
/// one too large to represent.
pub fn read_number(utterance: &str) -> Option<String> {
    let mut integer = String::new();
    let mut fraction = String::new();
    let mut in_fraction = false;
    let mut negative = false;
    let mut group = Group::default();
    let mut last = Last::Nothing;

    let flush = |group: &mut Group, out: &mut String| -> Option<()> {
        if group.active {
            out.push_str(&group.value()?.to_string());
        }
        *group = Group::default();
        Some(())
    };

    for token in tokenize(utterance) {
        let token = token.as_str();

        if in_fraction {
            if let Some(v) = unit_value(token).or_else(|| tens_value(token)) {
                fraction.push_str(&v.to_string());
            } else if token.chars().all(|c| c.is_ascii_digit()) {
                fraction.push_str(token);
            }
            continue;
        }

        match token {
            "minus" | "negative" if integer.is_empty() && !group.active => {
                negative = true;
                continue;
            }
            "point" | "dot" => {
                flush(&mut group, &mut integer)?;
                in_fraction = true;
                continue;
            }
            "and" | "a" => continue,
            _ => {}
        }

        if let Some(v) = unit_value(token) {
            match last {
                Last::Tens if v < 10 => group.small = group.small.checked_add(v)?,
                Last::Hundred | Last::Thousand => group.small = group.small.checked_add(v)?,
                Last::Nothing => group.small = v,
                _ => {
                    flush(&mut group, &mut integer)?;
                    group.small = v;
                }
            }
            group.active = true;
            last = Last::Unit;
        } else if let Some(v) = tens_value(token) {
            match last {
                Last::Hundred | Last::Thousand => group.small = group.small.checked_add(v)?,
                Last::Nothing => group.small = v,
                _ => {
                    flush(&mut group, &mut integer)?;
                    group.small = v;
                }
            }
            group.active = true;
            last = Last::Tens;
        } else if token == "hundred" {
            group.small = group.small.max(1).checked_mul(100)?;
            group.active = true;
            last = Last::Hundred;
        } else if token == "thousand" {
            let thousands = group.small.max(1).checked_mul(1000)?;
            group.thousands = group.thousands.checked_add(thousands)?;
            group.small = 0;
            group.active = true;
            last = Last::Thousand;
        } else if let Some((whole, frac)) = split_decimal(token) {
            flush(&mut group, &mut integer)?;
            if let Ok(n) = whole.parse::<u64>() {
                group.small = n;
                group.active = true;
                last = Last::Unit;
            } else {
                integer.push_str(whole);
                last = Last::Nothing;
            }
            if let Some(frac) = frac {
                flush(&mut group, &mut integer)?;
                fraction.push_str(frac);
                in_fraction = true;
            }
        } else {
            flush(&mut group, &mut integer)?;
            last = Last::Nothing;
        }
    }
    flush(&mut group, &mut integer)?;

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if integer.is_empty() {
        out.push('0');
    } else {
        out.push_str(&integer);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    Some(out)
}

/// Splits a numeric token like `42` or `3.14` into whole and fractional
/// digits; `None` for anything that is not purely numeric.
fn split_decimal(token: &str) -> Option<(&str, Option<&str>)> {
    let (whole, frac) = match token.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (token, None),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && frac.map_or(true, str::is_empty) {
        return None;
    }
    if !digits(whole) || !frac.map_or(true, digits) {
        return None;
    }
    Some((whole, frac.filter(|f| !f.is_empty())))
}

/// Maps each spoken digit word to its digit and keeps every other digit,
/// dropping everything else. Used for phone numbers, which are dictated
/// digit by digit.
pub fn read_digits(utterance: &str) -> String {
    utterance
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|token| {
            let word = token.trim_matches(|c: char| !c.is_alphanumeric());
            match unit_value(word) {
                Some(v) if v < 10 => v.to_string(),
                _ => token.chars().filter(char::is_ascii_digit).collect(),
            }
        })
        .collect()
}
