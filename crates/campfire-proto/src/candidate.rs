//! Relay candidate parsing.
//!
//! Candidate strings have the form `scheme:[user[:pass]@]host[:port]`. TURN
//! candidates require credentials separable on the first `:` before the `@`;
//! STUN candidates never carry credentials.

use crate::uri::UriError;

/// Placeholder used for the username/credential of credential-less
/// candidates.
pub const NO_CREDENTIAL: &str = "-";

/// Default TURN relay port when the candidate string omits one.
const DEFAULT_TURN_PORT: u16 = 443;

/// Default STUN port when the candidate string omits one.
const DEFAULT_STUN_PORT: u16 = 19302;

/// Which relay service a candidate addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A relay/allocation (TURN-like) server; requires credentials.
    Turn,
    /// A reflexive-address (STUN-like) server; credential-less.
    Stun,
}

impl CandidateKind {
    fn scheme(self) -> &'static str {
        match self {
            Self::Turn => "turn",
            Self::Stun => "stun",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Turn => DEFAULT_TURN_PORT,
            Self::Stun => DEFAULT_STUN_PORT,
        }
    }
}

/// A parsed relay candidate, ready to hand to the transport engine.
///
/// Immutable once parsed. The credential fields hold [`NO_CREDENTIAL`] when
/// the candidate carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCandidate {
    /// Service kind, from the scheme prefix.
    pub kind: CandidateKind,
    /// Server hostname or address.
    pub host: String,
    /// Port, or the scheme's default when the string omits one.
    pub port: u16,
    /// Username, or [`NO_CREDENTIAL`].
    pub username: String,
    /// Password, or [`NO_CREDENTIAL`].
    pub credential: String,
}

impl RelayCandidate {
    /// Parse a TURN candidate string (`turn:user:pass@host[:port]`).
    ///
    /// Credentials are optional as a whole, but when an `@` is present the
    /// part before it must split into `user:pass` on the first `:`. The
    /// scheme prefix may be omitted when credentials are present — the
    /// historical URI vectors carry bare `user:pass@host` strings.
    pub fn parse_turn(raw: &str) -> Result<Self, UriError> {
        Self::parse(raw, CandidateKind::Turn)
    }

    /// Parse a STUN candidate string (`stun:host[:port]`).
    pub fn parse_stun(raw: &str) -> Result<Self, UriError> {
        Self::parse(raw, CandidateKind::Stun)
    }

    fn parse(raw: &str, kind: CandidateKind) -> Result<Self, UriError> {
        let invalid = |reason: &'static str| UriError::InvalidCandidate {
            candidate: raw.to_string(),
            reason,
        };

        let rest = match strip_scheme(raw, kind.scheme()) {
            Some(rest) => rest,
            None if kind == CandidateKind::Turn && is_credentialed(raw) => raw,
            None => return Err(invalid("missing scheme prefix")),
        };
        // Tolerate the common `scheme://` variant.
        let rest = rest.strip_prefix("//").unwrap_or(rest);

        let (username, credential, endpoint) = match rest.split_once('@') {
            Some((creds, endpoint)) => {
                if kind == CandidateKind::Stun {
                    return Err(invalid("stun candidates carry no credentials"));
                }
                let (user, pass) =
                    creds.split_once(':').ok_or_else(|| invalid("credentials must be user:pass"))?;
                if user.is_empty() || pass.is_empty() {
                    return Err(invalid("credentials must be user:pass"));
                }
                (user.to_string(), pass.to_string(), endpoint)
            },
            None => (NO_CREDENTIAL.to_string(), NO_CREDENTIAL.to_string(), rest),
        };

        let (host, port) = match endpoint.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;
                (host, port)
            },
            None => (endpoint, kind.default_port()),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self { kind, host: host.to_string(), port, username, credential })
    }

    /// The credential-stripped connection string, `scheme:host:port`.
    pub fn url(&self) -> String {
        format!("{}:{}:{}", self.kind.scheme(), self.host, self.port)
    }

    /// Whether this candidate carries real credentials.
    pub fn has_credentials(&self) -> bool {
        self.username != NO_CREDENTIAL
    }
}

fn strip_scheme<'a>(raw: &'a str, scheme: &str) -> Option<&'a str> {
    let (prefix, rest) = raw.split_at_checked(scheme.len())?;
    (prefix.eq_ignore_ascii_case(scheme)).then_some(rest)?.strip_prefix(':')
}

/// A `user:pass@host` shape, as carried scheme-less by historical URIs.
fn is_credentialed(raw: &str) -> bool {
    raw.split_once('@').is_some_and(|(creds, _)| creds.contains(':') && !creds.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_with_credentials_and_port() {
        let cand = RelayCandidate::parse_turn("turn:alice:s3cret@relay.example.com:3478").unwrap();
        assert_eq!(cand.kind, CandidateKind::Turn);
        assert_eq!(cand.host, "relay.example.com");
        assert_eq!(cand.port, 3478);
        assert_eq!(cand.username, "alice");
        assert_eq!(cand.credential, "s3cret");
        assert!(cand.has_credentials());
        assert_eq!(cand.url(), "turn:relay.example.com:3478");
    }

    #[test]
    fn turn_without_port_uses_default() {
        let cand =
            RelayCandidate::parse_turn("turn:9d4e8faba9a93ef397554dc4:hLxK4U49l6fcZLH0@a.relay.metered.ca")
                .unwrap();
        assert_eq!(cand.port, 443);
        assert_eq!(cand.username, "9d4e8faba9a93ef397554dc4");
    }

    #[test]
    fn turn_without_credentials_uses_placeholders() {
        let cand = RelayCandidate::parse_turn("turn:relay.example.com").unwrap();
        assert_eq!(cand.username, NO_CREDENTIAL);
        assert_eq!(cand.credential, NO_CREDENTIAL);
        assert!(!cand.has_credentials());
    }

    #[test]
    fn turn_with_unsplittable_credentials_is_invalid() {
        let err = RelayCandidate::parse_turn("turn:justauser@relay.example.com").unwrap_err();
        assert!(matches!(err, UriError::InvalidCandidate { .. }));
    }

    #[test]
    fn scheme_less_credentialed_turn_is_accepted() {
        let cand =
            RelayCandidate::parse_turn("9d4e8faba9a93ef397554dc4:hLxK4U49l6fcZLH0@a.relay.metered.ca")
                .unwrap();
        assert_eq!(cand.kind, CandidateKind::Turn);
        assert_eq!(cand.host, "a.relay.metered.ca");
        assert_eq!(cand.port, 443);
        assert_eq!(cand.username, "9d4e8faba9a93ef397554dc4");
        assert_eq!(cand.credential, "hLxK4U49l6fcZLH0");
    }

    #[test]
    fn scheme_is_matched_case_insensitively() {
        let cand = RelayCandidate::parse_turn("TURN:u:p@host").unwrap();
        assert_eq!(cand.username, "u");
        assert_eq!(cand.host, "host");
    }

    #[test]
    fn turn_double_slash_variant_is_tolerated() {
        let cand = RelayCandidate::parse_turn("turn://u:p@relay.example.com").unwrap();
        assert_eq!(cand.host, "relay.example.com");
    }

    #[test]
    fn stun_is_credential_less() {
        let cand = RelayCandidate::parse_stun("stun:stun.l.google.com:19302").unwrap();
        assert_eq!(cand.kind, CandidateKind::Stun);
        assert_eq!(cand.host, "stun.l.google.com");
        assert_eq!(cand.port, 19302);
        assert_eq!(cand.username, NO_CREDENTIAL);
    }

    #[test]
    fn stun_without_port_uses_default() {
        let cand = RelayCandidate::parse_stun("stun:stun.example.com").unwrap();
        assert_eq!(cand.port, 19302);
    }

    #[test]
    fn stun_with_credentials_is_invalid() {
        let err = RelayCandidate::parse_stun("stun:u:p@stun.example.com").unwrap_err();
        assert!(matches!(err, UriError::InvalidCandidate { .. }));
    }

    #[test]
    fn bad_port_is_invalid() {
        let err = RelayCandidate::parse_turn("turn:relay.example.com:notaport").unwrap_err();
        assert!(matches!(err, UriError::InvalidCandidate { .. }));
    }

    #[test]
    fn missing_host_is_invalid() {
        assert!(RelayCandidate::parse_turn("turn:").is_err());
        assert!(RelayCandidate::parse_turn("turn:u:p@").is_err());
    }

    #[test]
    fn wrong_scheme_is_invalid() {
        assert!(RelayCandidate::parse_turn("stun:host").is_err());
        assert!(RelayCandidate::parse_stun("turn:host").is_err());
    }
}
