use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};
use sha2::Sha256;

use crate::config::Config;

pub type HmacSha256 = Hmac<Sha256>;

/// A stable anonymous identifier for one client, used solely to deduplicate
/// upvotes. Derived by keyed HMAC over the client's network origin and agent
/// string, so it cannot be reversed to either, and the raw attributes are
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint for the given request attributes.
    pub fn derive(origin: &str, agent: &str, config: &Config) -> Self {
        let mut mac = HmacSha256::new_from_slice(config.hmac_secret())
            .expect("HMAC can take key of any size");
        mac.update(origin.as_bytes());
        mac.update(b":");
        mac.update(agent.as_bytes());
        Self(HEXLOWER.encode(&mac.finalize().into_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Fingerprint {
    type Error = ();

    /// Derive the caller's fingerprint from their network origin (first
    /// forwarded address if behind a proxy) and user-agent header.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let forwarded = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|xff| xff.split(',').next())
            .map(|ip| ip.trim().to_string());
        let origin = forwarded
            .or_else(|| req.client_ip().map(|ip| ip.to_string()))
            .unwrap_or_default();
        let agent = req.headers().get_one("User-Agent").unwrap_or_default();

        Outcome::Success(Self::derive(&origin, agent, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "203.0.113.7";
    const AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    #[test]
    fn same_client_always_derives_the_same_fingerprint() {
        let config = Config::example();
        let a = Fingerprint::derive(ORIGIN, AGENT, &config);
        let b = Fingerprint::derive(ORIGIN, AGENT, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn different_clients_differ() {
        let config = Config::example();
        let a = Fingerprint::derive(ORIGIN, AGENT, &config);
        let b = Fingerprint::derive("198.51.100.9", AGENT, &config);
        let c = Fingerprint::derive(ORIGIN, "curl/8.0", &config);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_reveals_nothing_about_the_inputs() {
        let config = Config::example();
        let fp = Fingerprint::derive(ORIGIN, AGENT, &config);
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!fp.as_str().contains(ORIGIN));
    }
}
