use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Telegram destination, either a numeric chat id or an `@channel` handle
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct ChatId {
    value: CompactString,
}

/// Lower bound, in epoch seconds, for the next homework status poll
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Cursor {
    value: i64,
}

impl ChatId {
    pub fn new<S: Into<CompactString>>(id: S) -> Self {
        Self { value: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl Cursor {
    pub fn new(value: i64) -> Self {
        Self { value }
    }

    /// Cursor at the current wall-clock time
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().timestamp())
    }

    pub fn value(self) -> i64 {
        self.value
    }

    /// Cursor moved `secs` into the past, saturating at the epoch
    pub fn rewind(self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self::new(self.value.saturating_sub(secs).max(0))
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D>(deserializer: D) -> Result<ChatId, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct ChatIdVisitor;

        impl<'de> Visitor<'de> for ChatIdVisitor {
            type Value = ChatId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a chat ID")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ChatId::new(value.trim()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ChatId::new(value.trim()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ChatId::new(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ChatId::new(value.to_string()))
            }
        }

        deserializer.deserialize_any(ChatIdVisitor)
    }
}

impl Serialize for ChatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Telegram accepts numeric ids as numbers; group ids are negative
        match self.value.parse::<i64>() {
            Ok(id) => serializer.serialize_i64(id),
            Err(_) => serializer.serialize_str(&self.value),
        }
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> Result<Cursor, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Cursor::new(value))
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
