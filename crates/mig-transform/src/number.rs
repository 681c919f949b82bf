//! Numeric rendering templates.
//!
//! A template is literal text around exactly one placeholder:
//!
//! | placeholder | meaning |
//! |---|---|
//! | `{}` | shortest representation |
//! | `{:.N}` | `N` decimal places |
//! | `{:,}` | thousands separators |
//! | `{:,.N}` | both |
//!
//! A trailing `f` inside the braces (`{:,.2f}`) is accepted and ignored.

/// A parsed number template such as `"{:,.2f} EUR"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberTemplate {
    prefix: String,
    suffix: String,
    grouping: bool,
    precision: Option<usize>,
}

impl NumberTemplate {
    pub fn parse(template: &str) -> Result<Self, String> {
        let start = template
            .find('{')
            .ok_or_else(|| "missing `{}` placeholder".to_string())?;
        let end = template[start..]
            .find('}')
            .map(|offset| start + offset)
            .ok_or_else(|| "unclosed placeholder".to_string())?;
        let prefix = &template[..start];
        let suffix = &template[end + 1..];
        if prefix.contains('}') || suffix.contains(['{', '}']) {
            return Err("exactly one placeholder is allowed".to_string());
        }

        let spec = &template[start + 1..end];
        let (grouping, precision) = parse_spec(spec)?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            grouping,
            precision,
        })
    }

    /// Render `number`; `None` for NaN and infinities.
    pub fn render(&self, number: f64) -> Option<String> {
        if !number.is_finite() {
            return None;
        }
        let digits = match self.precision {
            Some(precision) => format!("{number:.precision$}"),
            None => format!("{number}"),
        };
        let body = if self.grouping {
            group_thousands(&digits)
        } else {
            digits
        };
        Some(format!("{}{body}{}", self.prefix, self.suffix))
    }
}

fn parse_spec(spec: &str) -> Result<(bool, Option<usize>), String> {
    if spec.is_empty() {
        return Ok((false, None));
    }
    let Some(rest) = spec.strip_prefix(':') else {
        return Err(format!("unsupported placeholder {{{spec}}}"));
    };
    let rest = rest.strip_suffix('f').unwrap_or(rest);
    let (grouping, rest) = match rest.strip_prefix(',') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let precision = match rest {
        "" => None,
        _ => {
            let digits = rest
                .strip_prefix('.')
                .ok_or_else(|| format!("unsupported placeholder {{{spec}}}"))?;
            let precision = digits
                .parse::<usize>()
                .map_err(|_| format!("invalid precision in {{{spec}}}"))?;
            Some(precision)
        }
    };
    Ok((grouping, precision))
}

/// Insert `,` every three digits of the integer part.
fn group_thousands(digits: &str) -> String {
    let (sign, unsigned) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}{fraction}")
}
