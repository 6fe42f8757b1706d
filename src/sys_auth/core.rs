//! Admin session gate: credential check, server-side sessions, cookie sealing.
//!
//! Credentials are compared as plain strings against the configured values.
//! Sessions live in memory only and expire one hour after login with no
//! renewal. The cookie carries the session token plus an HMAC-SHA256 tag keyed
//! by the session secret.

use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Fixed lifetime of an admin session.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

type HmacSha256 = Hmac<Sha256>;

/// Source of the current time, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub is_admin: bool,
    pub expires_at: SystemTime,
}

pub struct SessionGate<C = SystemClock> {
    admin_id: Option<String>,
    admin_pw: Option<String>,
    secret: Vec<u8>,
    sessions: DashMap<String, Session>,
    clock: C,
}

impl SessionGate<SystemClock> {
    pub fn new(admin_id: Option<String>, admin_pw: Option<String>, secret: &str) -> Self {
        Self::with_clock(admin_id, admin_pw, secret, SystemClock)
    }
}

impl<C: Clock> SessionGate<C> {
    pub fn with_clock(
        admin_id: Option<String>,
        admin_pw: Option<String>,
        secret: &str,
        clock: C,
    ) -> Self {
        Self {
            admin_id,
            admin_pw,
            secret: secret.as_bytes().to_vec(),
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Check credentials and open an admin session.
    ///
    /// Returns the new session token, or `None` if the credentials do not
    /// match or no admin account is configured.
    pub fn authenticate(&self, id: &str, password: &str) -> Option<String> {
        let matches = match (&self.admin_id, &self.admin_pw) {
            (Some(expected_id), Some(expected_pw)) => id == expected_id && password == expected_pw,
            _ => false,
        };
        if !matches {
            return None;
        }

        let now = self.clock.now();
        self.sessions.retain(|_, s| s.expires_at > now);

        let token = hex::encode(rand::random::<[u8; 32]>());
        self.sessions.insert(
            token.clone(),
            Session {
                is_admin: true,
                expires_at: now + SESSION_TTL,
            },
        );
        Some(token)
    }

    /// `true` only for a live admin session. Expired entries are dropped.
    pub fn authorize(&self, token: &str) -> bool {
        let now = self.clock.now();
        self.sessions.remove_if(token, |_, s| s.expires_at <= now);
        self.sessions.get(token).is_some_and(|s| s.is_admin)
    }

    /// Drop a session. Unknown tokens are ignored.
    pub fn invalidate(&self, token: &str) {
        self.sessions.remove(token);
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Cookie value for `token`: `<token>.<hex tag>`.
    pub fn seal(&self, token: &str) -> Option<String> {
        let tag = self.mac(token)?.finalize().into_bytes();
        Some(format!("{token}.{}", hex::encode(tag)))
    }

    /// Recover the token from a cookie value if its tag verifies.
    pub fn unseal<'a>(&self, cookie: &'a str) -> Option<&'a str> {
        let (token, tag) = cookie.rsplit_once('.')?;
        let tag = hex::decode(tag).ok()?;
        self.mac(token)?.verify_slice(&tag).ok()?;
        Some(token)
    }

    fn mac(&self, token: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(token.as_bytes());
        Some(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ManualClock(Mutex<SystemTime>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for &ManualClock {
        fn now(&self) -> SystemTime {
            *self.0.lock().unwrap()
        }
    }

    fn gate(clock: &ManualClock) -> SessionGate<&ManualClock> {
        SessionGate::with_clock(
            Some("admin".into()),
            Some("s3cret".into()),
            "signing-key",
            clock,
        )
    }

    #[test]
    fn wrong_password_is_rejected() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        assert!(gate.authenticate("admin", "wrong").is_none());
        assert!(!gate.authorize("anything"));
        assert!(!gate.authorize(""));
        assert_eq!(gate.active_sessions(), 0);
    }

    #[test]
    fn valid_login_authorizes_until_expiry() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        let token = gate.authenticate("admin", "s3cret").unwrap();
        assert!(gate.authorize(&token));

        clock.advance(Duration::from_secs(59 * 60));
        assert!(gate.authorize(&token));

        clock.advance(Duration::from_secs(2 * 60));
        assert!(!gate.authorize(&token));
        assert_eq!(gate.active_sessions(), 0);
    }

    #[test]
    fn access_does_not_extend_expiry() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        let token = gate.authenticate("admin", "s3cret").unwrap();
        for _ in 0..6 {
            clock.advance(Duration::from_secs(10 * 60));
            gate.authorize(&token);
        }
        clock.advance(Duration::from_secs(60));
        assert!(!gate.authorize(&token));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        let token = gate.authenticate("admin", "s3cret").unwrap();
        gate.invalidate(&token);
        gate.invalidate(&token);
        assert!(!gate.authorize(&token));
    }

    #[test]
    fn unconfigured_admin_never_authenticates() {
        let clock = ManualClock::new();
        let gate = SessionGate::with_clock(None, None, "k", &clock);
        assert!(gate.authenticate("", "").is_none());
    }

    #[test]
    fn tokens_are_distinct() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        let a = gate.authenticate("admin", "s3cret").unwrap();
        let b = gate.authenticate("admin", "s3cret").unwrap();
        assert_ne!(a, b);
        assert_eq!(gate.active_sessions(), 2);
    }

    #[test]
    fn login_evicts_expired_sessions() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        gate.authenticate("admin", "s3cret").unwrap();
        clock.advance(SESSION_TTL);
        gate.authenticate("admin", "s3cret").unwrap();
        assert_eq!(gate.active_sessions(), 1);
    }

    #[test]
    fn sealed_cookie_round_trips_and_rejects_tampering() {
        let clock = ManualClock::new();
        let gate = gate(&clock);
        let token = gate.authenticate("admin", "s3cret").unwrap();
        let cookie = gate.seal(&token).unwrap();

        assert_eq!(gate.unseal(&cookie), Some(token.as_str()));

        let forged = format!("{token}.{}", "00".repeat(32));
        assert_eq!(gate.unseal(&forged), None);
        assert_eq!(gate.unseal(&token), None);

        let other = SessionGate::with_clock(None, None, "different-key", &clock);
        assert_eq!(other.unseal(&cookie), None);
    }
}
