//! Client session state: the auth cookie handed out by the server.

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth";

/// Explicit session passed through every client operation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Cookie` request header, if a session is held.
    pub fn cookie_header(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| format!("{AUTH_COOKIE}={token}"))
    }

    /// Apply `Set-Cookie` header values from a response.
    ///
    /// An `auth` cookie with an empty value or a non-positive `Max-Age`
    /// ends the session.
    pub fn absorb<'a>(&mut self, set_cookies: impl IntoIterator<Item = &'a str>) {
        for header in set_cookies {
            let mut attributes = header.split(';').map(str::trim);
            let Some((name, value)) = attributes.next().and_then(|kv| kv.split_once('=')) else {
                continue;
            };
            if name.trim() != AUTH_COOKIE {
                continue;
            }

            let expired = attributes.any(|attr| {
                attr.split_once('=')
                    .filter(|(k, _)| k.eq_ignore_ascii_case("max-age"))
                    .and_then(|(_, v)| v.trim().parse::<i64>().ok())
                    .is_some_and(|age| age <= 0)
            });

            let value = value.trim();
            if expired || value.is_empty() {
                self.token = None;
            } else {
                self.token = Some(value.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}
