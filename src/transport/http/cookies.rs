use crate::domain::session::IssuedSession;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
/// The refresh cookie is only sent to the auth endpoints.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// How session cookies are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookiePolicy {
    pub secure: bool,
}

fn max_age_until(expires_at: DateTime<Utc>) -> cookie::time::Duration {
    let secs = (expires_at - Utc::now()).num_seconds().max(0);
    cookie::time::Duration::seconds(secs)
}

impl CookiePolicy {
    fn cookie(
        &self,
        name: &'static str,
        value: String,
        path: &'static str,
        expires_at: DateTime<Utc>,
    ) -> Cookie<'static> {
        Cookie::build((name, value))
            .path(path)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age_until(expires_at))
            .build()
    }

    /// Sets both session cookies.
    pub fn set_session(&self, jar: CookieJar, issued: &IssuedSession) -> CookieJar {
        jar.add(self.cookie(
            ACCESS_COOKIE,
            issued.access_token.clone(),
            "/",
            issued.access_expires_at,
        ))
        .add(self.cookie(
            REFRESH_COOKIE,
            issued.refresh_token.clone(),
            REFRESH_COOKIE_PATH,
            issued.refresh_expires_at,
        ))
    }

    /// Expires both session cookies.
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
            .remove(Cookie::build(REFRESH_COOKIE).path(REFRESH_COOKIE_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn session_cookies_are_http_only_and_scoped() {
        let now = Utc::now();
        let issued = IssuedSession {
            session_id: Uuid::new_v4(),
            access_token: "sga_x".into(),
            refresh_token: "sgr_y".into(),
            access_expires_at: now + Duration::minutes(15),
            refresh_expires_at: now + Duration::days(1),
        };
        let jar = CookiePolicy { secure: true }.set_session(CookieJar::new(), &issued);

        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "sga_x");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));

        let refresh = jar.get(REFRESH_COOKIE).unwrap();
        assert_eq!(refresh.path(), Some(REFRESH_COOKIE_PATH));
    }
}
