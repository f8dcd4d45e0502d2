//! Connection proposal builder.
//!
//! A proposal is the offer/answer surrogate handed to the transport engine.
//! Both peers construct their own local proposal and the proposal they
//! expect from the remote side — nothing is transmitted. Matching is purely
//! a consequence of both sides deriving from the same PSK within the same
//! hour bucket.

use campfire_crypto::{HourBucket, derive_temporal_key, fold_numeric};

/// Tag deriving the session identifier shared by both roles.
pub const SESSION_TAG: &str = "session";

/// Historical fixed fingerprint, used only when a session runs without
/// credential material.
///
/// Conformant deployments derive the fingerprint from the session
/// certificate instead; a fixed value identifies nothing and is kept solely
/// for interop with credential-less reference peers.
pub const PLACEHOLDER_FINGERPRINT: &str = "5F:F6:3B:46:BE:4B:A7:22:F4:4A:29:F7:C5:4F:35:DA:A9:44:24:1C:CB:93:78:64:FD:38:E3:63:75:46:61:E1";

/// Length of the username fragment sliced from the role key.
const UFRAG_LEN: usize = 16;

/// Which side of the notional offer/answer exchange a proposal plays.
///
/// The waiter registers the answer locally and expects an offer; the joiner
/// is the mirror image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalRole {
    /// The notionally-offering peer (the joiner's local role).
    Offer,
    /// The notionally-answering peer (the waiter's local role).
    Answer,
}

impl ProposalRole {
    /// The role's key-derivation tag. Part of the rendezvous contract:
    /// both peers must use these exact strings.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }

    /// The opposite role — what the remote side is expected to play.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Offer => Self::Answer,
            Self::Answer => Self::Offer,
        }
    }
}

/// A minimal session description for one role within one hour bucket.
///
/// Built fresh per rendezvous attempt, never reused across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The role this proposal plays.
    pub role: ProposalRole,
    /// Deterministic numeric session identifier, shared by both roles.
    pub session_id: String,
    /// Per-role username fragment.
    pub ufrag: String,
    /// Per-role password.
    pub password: String,
    /// Certificate fingerprint the remote side should expect.
    pub fingerprint: String,
    /// The rendered session description text.
    pub sdp: String,
}

impl Proposal {
    /// Build the proposal for `role` from the PSK within `bucket`.
    ///
    /// Pure — no I/O, no clock reads; the bucket is the caller's. The
    /// session identifier comes from the shared [`SESSION_TAG`] key,
    /// numerically folded; the ufrag/password split the role's own key.
    /// Two proposals built for opposite roles from the same PSK and bucket
    /// share `session_id` and differ in `ufrag`, which is exactly what the
    /// transport engine needs to treat them as two halves of one exchange.
    pub fn build(psk: &[u8], bucket: HourBucket, role: ProposalRole, fingerprint: &str) -> Self {
        let session_key = derive_temporal_key(psk, bucket, SESSION_TAG);
        let session_id = fold_numeric(&session_key);

        let role_key = derive_temporal_key(psk, bucket, role.tag());
        let (ufrag, password) = role_key.split_at(UFRAG_LEN);

        let sdp = format!(
            "v=0\r\n\
             o=- {session_id} 1 IN IP4 0.0.0.0\r\n\
             s=-\r\n\
             t=0 0\r\n\
             a=fingerprint:sha-256 {fingerprint}\r\n\
             a=ice-ufrag:{ufrag}\r\n\
             a=ice-pwd:{password}\r\n\
             a=extmap-allow-mixed\r\n\
             a=group:BUNDLE\r\n"
        );

        Self {
            role,
            session_id,
            ufrag: ufrag.to_string(),
            password: password.to_string(),
            fingerprint: fingerprint.to_string(),
            sdp,
        }
    }
}

#[cfg(test)]
mod tests {
    use campfire_crypto::HourBucket;

    use super::*;

    const PSK: &[u8] = b"abcdefghijklmnopqrstuvwx12345678";

    fn bucket() -> HourBucket {
        HourBucket::from_unix_secs(1_700_000_000)
    }

    #[test]
    fn opposite_roles_share_the_session_id() {
        let offer = Proposal::build(PSK, bucket(), ProposalRole::Offer, PLACEHOLDER_FINGERPRINT);
        let answer = Proposal::build(PSK, bucket(), ProposalRole::Answer, PLACEHOLDER_FINGERPRINT);
        assert_eq!(offer.session_id, answer.session_id);
        assert_ne!(offer.ufrag, answer.ufrag);
        assert_ne!(offer.password, answer.password);
    }

    #[test]
    fn building_is_deterministic_within_a_bucket() {
        let a = Proposal::build(PSK, bucket(), ProposalRole::Offer, PLACEHOLDER_FINGERPRINT);
        let b = Proposal::build(PSK, bucket(), ProposalRole::Offer, PLACEHOLDER_FINGERPRINT);
        assert_eq!(a, b);
    }

    #[test]
    fn different_buckets_change_everything_derived() {
        let now = Proposal::build(PSK, bucket(), ProposalRole::Offer, PLACEHOLDER_FINGERPRINT);
        let later = Proposal::build(
            PSK,
            HourBucket::from_unix_secs(1_700_000_000 + 3600),
            ProposalRole::Offer,
            PLACEHOLDER_FINGERPRINT,
        );
        assert_ne!(now.session_id, later.session_id);
        assert_ne!(now.ufrag, later.ufrag);
    }

    #[test]
    fn session_id_is_a_64_digit_fold() {
        let proposal = Proposal::build(PSK, bucket(), ProposalRole::Offer, PLACEHOLDER_FINGERPRINT);
        assert_eq!(proposal.session_id.len(), 64);
        assert!(proposal.session_id.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn ufrag_and_password_split_the_role_key() {
        let proposal =
            Proposal::build(PSK, bucket(), ProposalRole::Answer, PLACEHOLDER_FINGERPRINT);
        assert_eq!(proposal.ufrag.len(), 16);
        assert_eq!(proposal.password.len(), 48);
    }

    #[test]
    fn sdp_carries_the_derived_identity() {
        let proposal = Proposal::build(PSK, bucket(), ProposalRole::Offer, "AA:BB:CC");
        assert!(proposal.sdp.starts_with("v=0\r\n"));
        assert!(proposal.sdp.contains(&format!("o=- {} 1 IN IP4 0.0.0.0", proposal.session_id)));
        assert!(proposal.sdp.contains("a=fingerprint:sha-256 AA:BB:CC"));
        assert!(proposal.sdp.contains(&format!("a=ice-ufrag:{}", proposal.ufrag)));
    }

    #[test]
    fn counterpart_is_an_involution() {
        assert_eq!(ProposalRole::Offer.counterpart(), ProposalRole::Answer);
        assert_eq!(ProposalRole::Answer.counterpart(), ProposalRole::Offer);
        assert_eq!(ProposalRole::Offer.counterpart().counterpart(), ProposalRole::Offer);
    }
}
