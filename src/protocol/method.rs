//! Request methods.

use std::fmt;
use std::str::FromStr;

/// HTTP method carried in `REQUEST_METHOD`.
///
/// Verbs outside the common set are preserved verbatim in `Other`, so they
/// only match a route that names the same verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Other(verb) => verb,
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            other => Method::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_verbs() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);

        let custom: Method = "PROPFIND".parse().unwrap();
        assert_eq!(custom, Method::Other("PROPFIND".into()));
        assert_eq!(custom.to_string(), "PROPFIND");

        // Case matters: the front-end forwards verbs as received.
        assert_ne!("get".parse::<Method>().unwrap(), Method::Get);
    }
}
