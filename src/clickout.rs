//! Clickout tickets
//!
//! A ticket is a single-use token minted against a redirect target
//! and burned exactly once to produce the redirect URL. The resolved
//! host must sit in the allowlist at mint time and again at burn time
//! - the allowlist can change in between. A burn that fails the
//! re-check still consumes the ticket and reveals nothing.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use std::collections::HashSet;
use std::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Entropy bytes per ticket token
const TICKET_ENTROPY_BYTES: usize = 16;

/// Redirect mapping: where a clickout for a target/operator/slot goes.
/// Loaded by operators at startup or via seeding; not user-mutable.
pub struct RedirectTable {
    routes: DashMap<(Uuid, Option<Uuid>, String), String>,
}

impl RedirectTable {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    pub fn set(&self, target_id: Uuid, operator_id: Option<Uuid>, slot: &str, url: &str) {
        self.routes
            .insert((target_id, operator_id, slot.to_string()), url.to_string());
    }

    /// Resolve a redirect, falling back from the operator-specific
    /// route to the target's default route.
    pub fn resolve(&self, target_id: Uuid, operator_id: Option<Uuid>, slot: &str) -> Option<String> {
        if operator_id.is_some() {
            if let Some(url) = self
                .routes
                .get(&(target_id, operator_id, slot.to_string()))
            {
                return Some(url.clone());
            }
        }
        self.routes
            .get(&(target_id, None, slot.to_string()))
            .map(|url| url.clone())
    }
}

impl Default for RedirectTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct Ticket {
    target_id: Uuid,
    operator_id: Option<Uuid>,
    slot: String,
    redirect_url: String,
    burned: bool,
    minted_at: DateTime<Utc>,
}

/// Mints and burns single-use clickout tickets
pub struct ClickoutService {
    redirects: RedirectTable,
    tickets: DashMap<String, Ticket>,
    allow_hosts: RwLock<HashSet<String>>,
}

impl ClickoutService {
    pub fn new(redirects: RedirectTable, allow_hosts: HashSet<String>) -> Self {
        Self {
            redirects,
            tickets: DashMap::new(),
            allow_hosts: RwLock::new(allow_hosts),
        }
    }

    /// Administrative reload hook. Outstanding tickets are re-checked
    /// against the new set at burn time.
    pub fn replace_allow_hosts(&self, hosts: HashSet<String>) {
        *self.allow_hosts.write().expect("allowlist lock poisoned") = hosts;
    }

    pub fn redirects(&self) -> &RedirectTable {
        &self.redirects
    }

    /// Mint a ticket for a target/operator/slot.
    ///
    /// Fails generically when no redirect is mapped or the resolved
    /// host is outside the allowlist. Burn re-validates regardless.
    pub fn mint(&self, target_id: Uuid, operator_id: Option<Uuid>, slot: &str) -> Option<String> {
        let redirect_url = self.redirects.resolve(target_id, operator_id, slot)?;

        if !self.host_allowed(&redirect_url) {
            warn!("Refused mint: redirect host not allowlisted");
            return None;
        }

        let ticket = generate_ticket();
        self.tickets.insert(
            ticket.clone(),
            Ticket {
                target_id,
                operator_id,
                slot: slot.to_string(),
                redirect_url,
                burned: false,
                minted_at: Utc::now(),
            },
        );

        debug!("Minted clickout ticket for target {}", target_id);
        Some(ticket)
    }

    /// Burn a ticket, yielding its redirect URL on success.
    ///
    /// The mutable entry guard serializes concurrent burns: the first
    /// caller flips `burned`, every later one fails. A ticket whose
    /// host has dropped off the allowlist is consumed without
    /// revealing the URL, so retry-till-allowlisted gets nothing.
    pub fn burn(&self, ticket: &str) -> Option<String> {
        let (redirect_url, target_id, operator_id, slot, minted_at) = {
            let mut entry = self.tickets.get_mut(ticket)?;
            if entry.burned {
                debug!("Rejected burn of consumed ticket");
                return None;
            }
            entry.burned = true;
            (
                entry.redirect_url.clone(),
                entry.target_id,
                entry.operator_id,
                entry.slot.clone(),
                entry.minted_at,
            )
        };

        if !self.host_allowed(&redirect_url) {
            warn!("Burned ticket with de-allowlisted host; URL withheld");
            return None;
        }

        info!(
            "Clickout redirect issued: target {} operator {:?} slot {} (minted {})",
            target_id, operator_id, slot, minted_at
        );
        Some(redirect_url)
    }

    fn host_allowed(&self, raw_url: &str) -> bool {
        let Ok(parsed) = Url::parse(raw_url) else {
            return false;
        };
        let hosts = self.allow_hosts.read().expect("allowlist lock poisoned");
        match parsed.host_str() {
            Some(host) => hosts.contains(&host.to_ascii_lowercase()),
            None => false,
        }
    }
}

fn generate_ticket() -> String {
    let mut bytes = [0u8; TICKET_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bs58::encode(bytes).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn service(hosts: &[&str]) -> (ClickoutService, Uuid) {
        let redirects = RedirectTable::new();
        let target = Uuid::new_v4();
        redirects.set(target, None, "main", "https://store.example.com/game/42");
        let allow: HashSet<String> = hosts.iter().map(|h| h.to_string()).collect();
        (ClickoutService::new(redirects, allow), target)
    }

    #[test]
    fn test_mint_and_burn_resolve_allowlisted_host() {
        let (svc, target) = service(&["store.example.com"]);

        let ticket = svc.mint(target, None, "main").unwrap();
        let url = svc.burn(&ticket).unwrap();
        assert_eq!(Url::parse(&url).unwrap().host_str(), Some("store.example.com"));
    }

    #[test]
    fn test_second_burn_fails() {
        let (svc, target) = service(&["store.example.com"]);

        let ticket = svc.mint(target, None, "main").unwrap();
        assert!(svc.burn(&ticket).is_some());
        assert!(svc.burn(&ticket).is_none());
    }

    #[test]
    fn test_unknown_ticket_fails() {
        let (svc, _) = service(&["store.example.com"]);
        assert!(svc.burn("not_a_ticket").is_none());
    }

    #[test]
    fn test_mint_refuses_non_allowlisted_host() {
        let (svc, target) = service(&["other.example.com"]);
        assert!(svc.mint(target, None, "main").is_none());
    }

    #[test]
    fn test_delisted_host_consumes_ticket_without_url() {
        let (svc, target) = service(&["store.example.com"]);
        let ticket = svc.mint(target, None, "main").unwrap();

        svc.replace_allow_hosts(HashSet::new());
        assert!(svc.burn(&ticket).is_none());

        // Re-allowing the host must not resurrect the ticket.
        svc.replace_allow_hosts(["store.example.com".to_string()].into_iter().collect());
        assert!(svc.burn(&ticket).is_none());
    }

    #[test]
    fn test_unmapped_slot_fails_mint() {
        let (svc, target) = service(&["store.example.com"]);
        assert!(svc.mint(target, None, "sidebar").is_none());
    }

    #[test]
    fn test_operator_route_overrides_default() {
        let redirects = RedirectTable::new();
        let target = Uuid::new_v4();
        let operator = Uuid::new_v4();
        redirects.set(target, None, "main", "https://store.example.com/game/42");
        redirects.set(
            target,
            Some(operator),
            "main",
            "https://store.example.com/game/42?op=partner",
        );
        let allow: HashSet<String> = ["store.example.com".to_string()].into_iter().collect();
        let svc = ClickoutService::new(redirects, allow);

        let ticket = svc.mint(target, Some(operator), "main").unwrap();
        let url = svc.burn(&ticket).unwrap();
        assert!(url.contains("op=partner"));
    }

    #[tokio::test]
    async fn test_exactly_one_concurrent_burn_wins() {
        let (svc, target) = service(&["store.example.com"]);
        let svc = Arc::new(svc);
        let ticket = svc.mint(target, None, "main").unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = Arc::clone(&svc);
            let ticket = ticket.clone();
            handles.push(tokio::spawn(async move { svc.burn(&ticket) }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
