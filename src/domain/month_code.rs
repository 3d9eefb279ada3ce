//! Futures delivery month letters.

use std::fmt;
use std::str::FromStr;

/// Exchange month letter of a futures contract (F = January .. Z = December).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonthCode {
    F,
    G,
    H,
    J,
    K,
    M,
    N,
    Q,
    U,
    V,
    X,
    Z,
}

impl MonthCode {
    pub const ALL: [MonthCode; 12] = [
        MonthCode::F,
        MonthCode::G,
        MonthCode::H,
        MonthCode::J,
        MonthCode::K,
        MonthCode::M,
        MonthCode::N,
        MonthCode::Q,
        MonthCode::U,
        MonthCode::V,
        MonthCode::X,
        MonthCode::Z,
    ];

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'F' => Some(MonthCode::F),
            'G' => Some(MonthCode::G),
            'H' => Some(MonthCode::H),
            'J' => Some(MonthCode::J),
            'K' => Some(MonthCode::K),
            'M' => Some(MonthCode::M),
            'N' => Some(MonthCode::N),
            'Q' => Some(MonthCode::Q),
            'U' => Some(MonthCode::U),
            'V' => Some(MonthCode::V),
            'X' => Some(MonthCode::X),
            'Z' => Some(MonthCode::Z),
            _ => None,
        }
    }

    /// Calendar month, 1..=12.
    pub fn month(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_month(month: u32) -> Option<Self> {
        Self::ALL.get(month.checked_sub(1)? as usize).copied()
    }

    pub fn letter(self) -> char {
        match self {
            MonthCode::F => 'F',
            MonthCode::G => 'G',
            MonthCode::H => 'H',
            MonthCode::J => 'J',
            MonthCode::K => 'K',
            MonthCode::M => 'M',
            MonthCode::N => 'N',
            MonthCode::Q => 'Q',
            MonthCode::U => 'U',
            MonthCode::V => 'V',
            MonthCode::X => 'X',
            MonthCode::Z => 'Z',
        }
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown month code {0:?} (expected one of FGHJKMNQUVXZ)")]
pub struct UnknownMonthCode(pub String);

impl FromStr for MonthCode {
    type Err = UnknownMonthCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                MonthCode::from_letter(c.to_ascii_uppercase())
                    .ok_or_else(|| UnknownMonthCode(trimmed.to_string()))
            }
            _ => Err(UnknownMonthCode(trimmed.to_string())),
        }
    }
}

/// Parse a comma separated month letter list such as `"H, M, U, Z"`.
pub fn parse_month_codes(input: &str) -> Result<Vec<MonthCode>, UnknownMonthCode> {
    let mut codes = Vec::new();
    for token in input.split(',') {
        if token.trim().is_empty() {
            continue;
        }
        let code: MonthCode = token.parse()?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes.sort();
    Ok(codes)
}
