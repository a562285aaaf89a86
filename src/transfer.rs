//! Transfer codes and account merge
//!
//! A transfer code is a single-use token that, when redeemed by a
//! different identity, re-points every row the issuer owns to the
//! redeemer and is consumed. Exactly one concurrent redeemer wins;
//! every losing outcome (already used, expired, unknown, self-redeem)
//! is the same generic failure.
//!
//! Policy decisions: one live code per issuer (a fresh create
//! supersedes the previous code) and a 7-day expiry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::{InteractionStore, SavedStore};
use crate::types::UserId;

/// Default code lifetime
const CODE_TTL_DAYS: i64 = 7;

/// Entropy bytes per code; base58 keeps the token comfortably over
/// the 10-character floor
const CODE_ENTROPY_BYTES: usize = 16;

#[derive(Debug, Clone)]
struct TransferCode {
    issuer: UserId,
    used: bool,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Issues and redeems single-use merge codes
pub struct TransferCodeService {
    codes: DashMap<String, TransferCode>,
    live_by_issuer: DashMap<UserId, String>,
    ttl: Duration,
    interactions: Arc<InteractionStore>,
    saved: Arc<SavedStore>,
}

impl TransferCodeService {
    pub fn new(interactions: Arc<InteractionStore>, saved: Arc<SavedStore>) -> Self {
        Self::with_ttl(interactions, saved, Duration::days(CODE_TTL_DAYS))
    }

    /// Same service with a caller-chosen code lifetime
    pub fn with_ttl(
        interactions: Arc<InteractionStore>,
        saved: Arc<SavedStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            codes: DashMap::new(),
            live_by_issuer: DashMap::new(),
            ttl,
            interactions,
            saved,
        }
    }

    /// Mint a fresh code for the caller, superseding any live one
    pub fn create(&self, identity: UserId) -> String {
        let code = generate_code();
        let now = Utc::now();

        self.codes.insert(
            code.clone(),
            TransferCode {
                issuer: identity,
                used: false,
                issued_at: now,
                expires_at: now + self.ttl,
            },
        );

        // Single live code per issuer: retire the previous one.
        if let Some(previous) = self.live_by_issuer.insert(identity, code.clone()) {
            if let Some(mut entry) = self.codes.get_mut(&previous) {
                entry.used = true;
            }
        }

        info!("Issued transfer code for {}", identity);
        code
    }

    /// Redeem a code, merging the issuer's rows into the caller.
    ///
    /// The mutable entry guard serializes concurrent redemptions of
    /// one code: the first caller flips `used` and every later caller
    /// observes the terminal state. The flip happens before the row
    /// migration, so a racing redeem can never double-merge.
    pub fn redeem(&self, identity: UserId, code: &str) -> bool {
        let issuer = {
            let Some(mut entry) = self.codes.get_mut(code) else {
                debug!("Redeem failed for {}", identity);
                return false;
            };

            if entry.used || entry.issuer == identity || Utc::now() >= entry.expires_at {
                debug!("Redeem failed for {}", identity);
                return false;
            }

            entry.used = true;
            entry.issuer
        };

        let moved_events = self.interactions.reassign_owner(issuer, identity);
        let moved_marks = self.saved.reassign_owner(issuer, identity);
        info!(
            "Transfer merge {} -> {} ({} events, {} saved marks)",
            issuer, identity, moved_events, moved_marks
        );
        true
    }

    /// Codes are never readable through any projection; this exists
    /// for tests and diagnostics only.
    #[cfg(test)]
    fn is_used(&self, code: &str) -> Option<bool> {
        self.codes.get(code).map(|e| e.used)
    }
}

fn generate_code() -> String {
    let mut bytes = [0u8; CODE_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bs58::encode(bytes).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InteractionRow;
    use serde_json::json;
    use uuid::Uuid;

    fn event(owner: UserId) -> InteractionRow {
        InteractionRow {
            owner,
            event_uuid: Uuid::new_v4(),
            event_type: "merge_test_event".to_string(),
            target_id: None,
            meta: json!({}),
            created_at: Utc::now(),
        }
    }

    fn service() -> (TransferCodeService, Arc<InteractionStore>) {
        let interactions = Arc::new(InteractionStore::new());
        let saved = Arc::new(SavedStore::new());
        (
            TransferCodeService::new(Arc::clone(&interactions), saved),
            interactions,
        )
    }

    #[test]
    fn test_code_meets_entropy_floor() {
        let (svc, _) = service();
        let code = svc.create(UserId::new());
        assert!(code.len() >= 10, "code too short: {}", code);
    }

    #[test]
    fn test_redeem_once_migrates_rows() {
        let (svc, interactions) = service();
        let a = UserId::new();
        let b = UserId::new();

        interactions.insert_ignore(event(a));
        interactions.insert_ignore(event(b));
        let before_b = interactions.count_for(b);

        let code = svc.create(a);
        assert!(svc.redeem(b, &code));

        assert!(interactions.count_for(b) >= before_b);
        assert_eq!(interactions.count_for(b), 2);
        assert_eq!(interactions.count_for(a), 0);
    }

    #[test]
    fn test_second_redeem_and_unknown_code_fail_alike() {
        let (svc, interactions) = service();
        let a = UserId::new();
        let b = UserId::new();
        interactions.insert_ignore(event(a));

        let code = svc.create(a);
        assert!(svc.redeem(b, &code));
        assert!(!svc.redeem(b, &code));
        assert!(!svc.redeem(b, "this_is_not_a_real_code_123"));
    }

    #[test]
    fn test_self_redeem_rejected() {
        let (svc, _) = service();
        let a = UserId::new();
        let code = svc.create(a);
        assert!(!svc.redeem(a, &code));
        assert_eq!(svc.is_used(&code), Some(false));
    }

    #[test]
    fn test_expired_code_fails_without_migrating_rows() {
        let interactions = Arc::new(InteractionStore::new());
        let saved = Arc::new(SavedStore::new());
        let svc = TransferCodeService::with_ttl(
            Arc::clone(&interactions),
            saved,
            Duration::seconds(-1),
        );
        let a = UserId::new();
        let b = UserId::new();
        interactions.insert_ignore(event(a));

        let code = svc.create(a);
        assert!(!svc.redeem(b, &code));
        assert_eq!(interactions.count_for(a), 1);
        assert_eq!(interactions.count_for(b), 0);
        assert_eq!(svc.is_used(&code), Some(false));
    }

    #[test]
    fn test_new_code_supersedes_previous() {
        let (svc, _) = service();
        let a = UserId::new();
        let b = UserId::new();

        let first = svc.create(a);
        let second = svc.create(a);

        assert!(!svc.redeem(b, &first));
        assert!(svc.redeem(b, &second));
    }

    #[tokio::test]
    async fn test_exactly_one_concurrent_redeemer_wins() {
        let interactions = Arc::new(InteractionStore::new());
        let saved = Arc::new(SavedStore::new());
        let svc = Arc::new(TransferCodeService::new(
            Arc::clone(&interactions),
            saved,
        ));

        let issuer = UserId::new();
        interactions.insert_ignore(event(issuer));
        let code = svc.create(issuer);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = Arc::clone(&svc);
            let code = code.clone();
            let redeemer = UserId::new();
            handles.push(tokio::spawn(async move { svc.redeem(redeemer, &code) }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
