//! Session cookies: `access_token`, `refresh_token` (HTTP-only) and
//! `logged_in` (script-readable), all scoped to `/` on the serving host.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{CookieConfig, TokenConfig};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const LOGGED_IN_COOKIE: &str = "logged_in";

#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub domain: String,
    pub secure: bool,
    pub access_max_age: time::Duration,
    pub refresh_max_age: time::Duration,
}

impl CookiePolicy {
    pub fn new(cookies: &CookieConfig, access_max_age: Duration, refresh_max_age: Duration) -> Self {
        Self {
            domain: cookies.domain.clone(),
            secure: cookies.secure,
            access_max_age: max_age(access_max_age),
            refresh_max_age: max_age(refresh_max_age),
        }
    }

    pub fn from_config(cookies: &CookieConfig, tokens: &TokenConfig) -> Self {
        Self::new(cookies, tokens.access.cookie_max_age, tokens.refresh.cookie_max_age)
    }

    fn base(&self, name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .domain(self.domain.clone())
            .secure(self.secure)
            .http_only(http_only)
            .same_site(SameSite::Lax)
            .build()
    }

    pub fn access(&self, token: &str) -> Cookie<'static> {
        let mut cookie = self.base(ACCESS_COOKIE, token.to_string(), true);
        cookie.set_max_age(self.access_max_age);
        cookie
    }

    pub fn refresh(&self, token: &str) -> Cookie<'static> {
        let mut cookie = self.base(REFRESH_COOKIE, token.to_string(), true);
        cookie.set_max_age(self.refresh_max_age);
        cookie
    }

    /// Lives as long as the access cookie.
    pub fn logged_in(&self) -> Cookie<'static> {
        let mut cookie = self.base(LOGGED_IN_COOKIE, "true".to_string(), false);
        cookie.set_max_age(self.access_max_age);
        cookie
    }

    /// Empty value, zero max-age and an expiry in the past.
    pub fn cleared(&self) -> [Cookie<'static>; 3] {
        [
            (ACCESS_COOKIE, true),
            (REFRESH_COOKIE, true),
            (LOGGED_IN_COOKIE, false),
        ]
        .map(|(name, http_only)| {
            let mut cookie = self.base(name, String::new(), http_only);
            cookie.make_removal();
            cookie
        })
    }
}

/// Whole seconds, saturating at the largest max-age a cookie can carry.
fn max_age(duration: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}

/// Cookies a session transition wants written on the response.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies(Vec<Cookie<'static>>);

impl SessionCookies {
    pub fn new(cookies: impl IntoIterator<Item = Cookie<'static>>) -> Self {
        Self(cookies.into_iter().collect())
    }

    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.0.iter().find(|cookie| cookie.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.0.iter()
    }

    pub fn apply(self, jar: CookieJar) -> CookieJar {
        self.0.into_iter().fold(jar, |jar, cookie| jar.add(cookie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CookiePolicy {
        CookiePolicy::new(
            &CookieConfig::default(),
            Duration::from_secs(15 * 60),
            Duration::from_secs(60 * 60),
        )
    }

    #[test]
    fn test_access_cookie_attributes() {
        let cookie = policy().access("tok");
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("localhost"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(900)));
    }

    #[test]
    fn test_logged_in_cookie_is_script_readable() {
        let cookie = policy().logged_in();
        assert_eq!(cookie.value(), "true");
        assert_eq!(cookie.http_only(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(900)));
    }

    #[test]
    fn test_refresh_cookie_uses_refresh_max_age() {
        let cookie = policy().refresh("tok");
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[test]
    fn test_sub_minute_max_age_is_kept_in_seconds() {
        let policy = CookiePolicy::new(
            &CookieConfig::default(),
            Duration::from_secs(30),
            Duration::from_secs(90),
        );
        assert_eq!(policy.access("tok").max_age(), Some(time::Duration::seconds(30)));
        assert_eq!(policy.logged_in().max_age(), Some(time::Duration::seconds(30)));
        assert_eq!(policy.refresh("tok").max_age(), Some(time::Duration::seconds(90)));
        assert!(policy.access("tok").to_string().contains("Max-Age=30"));
    }

    #[test]
    fn test_cleared_cookies_expire_immediately() {
        let cleared = policy().cleared();
        let names: Vec<_> = cleared.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec![ACCESS_COOKIE, REFRESH_COOKIE, LOGGED_IN_COOKIE]);
        for cookie in &cleared {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
            assert_eq!(cookie.path(), Some("/"));
        }
    }

    #[test]
    fn test_apply_writes_into_jar() {
        let policy = policy();
        let jar = SessionCookies::new([policy.access("a"), policy.logged_in()]).apply(CookieJar::new());
        assert_eq!(jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()), Some("a".into()));
        assert!(jar.get(REFRESH_COOKIE).is_none());
    }
}
