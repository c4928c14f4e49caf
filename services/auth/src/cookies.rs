//! The refresh token cookie

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "token";

/// How the refresh cookie is issued
///
/// On a localhost backend the cookie is sent over plain HTTP with
/// `SameSite=Lax`; elsewhere it is `Secure` with `SameSite=None` so the
/// separately hosted frontend can send it.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: time::Duration,
}

impl RefreshCookiePolicy {
    pub fn for_backend(is_local: bool) -> Self {
        Self {
            secure: !is_local,
            same_site: if is_local { SameSite::Lax } else { SameSite::None },
            max_age: time::Duration::days(7),
        }
    }

    /// Add the refresh cookie to `jar`
    pub fn issue(&self, jar: CookieJar, token: String) -> CookieJar {
        jar.add(
            Cookie::build((REFRESH_COOKIE, token))
                .http_only(true)
                .path("/")
                .max_age(self.max_age)
                .secure(self.secure)
                .same_site(self.same_site),
        )
    }

    /// Expire the refresh cookie
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(REFRESH_COOKIE).path("/"))
    }
}

/// The refresh token sent by the browser, if any
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_policy() {
        let policy = RefreshCookiePolicy::for_backend(true);
        let jar = policy.issue(CookieJar::new(), "abc".to_string());
        let cookie = jar.get(REFRESH_COOKIE).unwrap();

        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
        assert_eq!(refresh_token(&jar).as_deref(), Some("abc"));
    }

    #[test]
    fn test_remote_policy_and_clear() {
        let policy = RefreshCookiePolicy::for_backend(false);
        assert!(policy.secure);
        assert_eq!(policy.same_site, SameSite::None);

        let jar = policy.issue(CookieJar::new(), "abc".to_string());
        let jar = policy.clear(jar);
        assert!(refresh_token(&jar).is_none());
    }
}
