//! Page requests and client identification.

use pagevault_core::{DocumentId, UserId};

/// Client address used when no forwarding header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Who is asking, as seen by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client IP; also the rate-limit key.
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Derive client info from request headers.
    ///
    /// The IP is the first `X-Forwarded-For` entry, else `CF-Connecting-IP`,
    /// else [`UNKNOWN_CLIENT`].
    pub fn from_headers(
        forwarded_for: Option<&str>,
        cf_connecting_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        let forwarded = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let cf = cf_connecting_ip.map(str::trim).filter(|v| !v.is_empty());

        Self {
            ip: forwarded.or(cf).unwrap_or(UNKNOWN_CLIENT).to_string(),
            user_agent: user_agent.unwrap_or_default().to_string(),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// One page fetch.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Authenticated user.
    pub user_id: UserId,
    pub document_id: DocumentId,
    /// 1-based page number.
    pub page: u32,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    pub client: ClientInfo,
}

impl PageRequest {
    pub fn new(user_id: UserId, document_id: DocumentId, page: u32, client: ClientInfo) -> Self {
        Self {
            user_id,
            document_id,
            page,
            authorization: None,
            client,
        }
    }

    /// Attach an `Authorization` header value.
    pub fn authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    /// Attach a bare license token.
    pub fn bearer(self, token: &str) -> Self {
        self.authorization(format!("Bearer {token}"))
    }

    /// The presented license token, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization.as_deref().and_then(parse_bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_precedence() {
        let c = ClientInfo::from_headers(Some("203.0.113.7, 10.0.0.1"), Some("198.51.100.2"), None);
        assert_eq!(c.ip, "203.0.113.7");
        assert_eq!(c.user_agent, "");

        let c = ClientInfo::from_headers(None, Some("198.51.100.2"), Some("Reader/1.0"));
        assert_eq!(c.ip, "198.51.100.2");
        assert_eq!(c.user_agent, "Reader/1.0");

        let c = ClientInfo::from_headers(Some(""), None, None);
        assert_eq!(c.ip, UNKNOWN_CLIENT);
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic dXNlcg=="), None);
        assert_eq!(parse_bearer("abc.def.ghi"), None);
    }

    #[test]
    fn test_request_token() {
        let req = PageRequest::new(UserId(1), DocumentId(2), 1, ClientInfo::new("ip", "ua"));
        assert_eq!(req.bearer_token(), None);
        assert_eq!(req.bearer("tok").bearer_token(), Some("tok"));
    }
}
