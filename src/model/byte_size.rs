use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ByteSizeError {
    #[error("size string cannot be empty")]
    Empty,
    #[error("invalid number in size string: {0}")]
    InvalidNumber(String),
    #[error("unknown size unit: {0}")]
    UnknownUnit(String),
}

/// Storage size in bytes, as written in the observation table (`4.7 GB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const KB: u64 = 1_000;
    pub const MB: u64 = 1_000_000;
    pub const GB: u64 = 1_000_000_000;
    pub const TB: u64 = 1_000_000_000_000;

    pub fn new(bytes: u64) -> Self {
        ByteSize(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    pub fn as_gb(&self) -> f64 {
        self.0 as f64 / Self::GB as f64
    }

    fn unit_multiplier(unit: &str) -> Option<u64> {
        let multiplier = match unit.to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "k" | "kb" => Self::KB,
            "m" | "mb" => Self::MB,
            "g" | "gb" => Self::GB,
            "t" | "tb" => Self::TB,
            "kib" => 1 << 10,
            "mib" => 1 << 20,
            "gib" => 1 << 30,
            "tib" => 1 << 40,
            _ => return None,
        };
        Some(multiplier)
    }
}

impl FromStr for ByteSize {
    type Err = ByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ByteSizeError::Empty);
        }

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f64 = number
            .parse()
            .map_err(|_| ByteSizeError::InvalidNumber(number.to_string()))?;
        let multiplier = Self::unit_multiplier(unit.trim())
            .ok_or_else(|| ByteSizeError::UnknownUnit(unit.trim().to_string()))?;

        Ok(ByteSize((value * multiplier as f64).round() as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        if bytes >= Self::TB {
            write!(f, "{:.1} TB", bytes as f64 / Self::TB as f64)
        } else if bytes >= Self::GB {
            write!(f, "{:.1} GB", bytes as f64 / Self::GB as f64)
        } else if bytes >= Self::MB {
            write!(f, "{} MB", bytes / Self::MB)
        } else if bytes >= Self::KB {
            write!(f, "{} KB", bytes / Self::KB)
        } else {
            write!(f, "{} B", bytes)
        }
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

struct ByteSizeVisitor;

impl<'de> de::Visitor<'de> for ByteSizeVisitor {
    type Value = ByteSize;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte count or a string such as \"4.7 GB\"")
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u64::try_from(v)
            .map(ByteSize::new)
            .map_err(|_| E::custom("size cannot be negative"))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ByteSize::new(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl Serialize for ByteSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let short = self.to_string();
        if short.parse::<ByteSize>() == Ok(*self) {
            serializer.serialize_str(&short)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_units() {
        assert_eq!("4.7 GB".parse(), Ok(ByteSize::new(4_700_000_000)));
        assert_eq!("815 MB".parse(), Ok(ByteSize::new(815_000_000)));
        assert_eq!("2gb".parse(), Ok(ByteSize::new(2_000_000_000)));
        assert_eq!("  12 ".parse(), Ok(ByteSize::new(12)));
    }

    #[test]
    fn parses_binary_units() {
        assert_eq!("1 GiB".parse(), Ok(ByteSize::new(1 << 30)));
        assert_eq!("512KiB".parse(), Ok(ByteSize::new(512 * 1024)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ByteSize>(), Err(ByteSizeError::Empty));
        assert_eq!(
            "big".parse::<ByteSize>(),
            Err(ByteSizeError::InvalidNumber(String::new()))
        );
        assert_eq!(
            "3 parsecs".parse::<ByteSize>(),
            Err(ByteSizeError::UnknownUnit("parsecs".to_string()))
        );
    }

    #[test]
    fn displays_like_the_table() {
        assert_eq!(ByteSize::new(4_700_000_000).to_string(), "4.7 GB");
        assert_eq!(ByteSize::new(815_000_000).to_string(), "815 MB");
        assert_eq!(ByteSize::new(999).to_string(), "999 B");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let from_str: ByteSize = serde_json::from_str("\"1.3 GB\"").unwrap();
        let from_int: ByteSize = serde_json::from_str("1300000000").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"1.3 GB\"");
    }

    #[test]
    fn serde_keeps_every_byte() {
        assert_eq!(serde_json::to_string(&ByteSize::new(1_500_000)).unwrap(), "1500000");
        assert_eq!(serde_json::to_string(&ByteSize::new(815_000_000)).unwrap(), "\"815 MB\"");

        for bytes in [0, 999, 1_500, 1_500_000, 1_234_567_891, 4_700_000_000, 9_099_999_999] {
            let size = ByteSize::new(bytes);
            let json = serde_json::to_string(&size).unwrap();
            assert_eq!(serde_json::from_str::<ByteSize>(&json).unwrap(), size, "{}", json);
        }
    }
}
