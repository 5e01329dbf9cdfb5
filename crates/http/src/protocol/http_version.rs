use std::fmt::{Display, Formatter};

use crate::protocol::ParseError;

/// The single protocol version this server speaks.
///
/// Any other version token on the request line is answered with
/// `505 HTTP Version Not Supported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    #[default]
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl TryFrom<&str> for HttpVersion {
    type Error = ParseError;

    fn try_from(str: &str) -> Result<Self, Self::Error> {
        match str {
            "HTTP/1.1" => Ok(Self::Http11),
            _ => Err(ParseError::invalid_version(str)),
        }
    }
}

impl Display for HttpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
