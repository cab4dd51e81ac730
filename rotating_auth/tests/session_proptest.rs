/// Property-based tests for token issuance using proptest
///
/// These tests verify that login followed by validate returns the same owner,
/// and that refresh keeps the owner stable, across arbitrary owners, device
/// fingerprints and origin addresses.
use proptest::prelude::*;
use rotating_auth::auth::{AuthConfig, SessionManager, SessionService};
use rotating_auth::db::MemorySessionRepository;
use rotating_auth::notify::NotificationHandle;
use std::sync::Arc;
use uuid::Uuid;

// Strategy to generate an owner id from arbitrary 128-bit values
fn owner_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

// Strategy to generate a printable User-Agent-like fingerprint
fn fingerprint_strategy() -> impl Strategy<Value = String> {
    "[ -~]{0,64}"
}

// Strategy to generate an IPv4 origin
fn origin_strategy() -> impl Strategy<Value = String> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d))
}

fn manager() -> SessionManager {
    SessionManager::new(
        Arc::new(MemorySessionRepository::new()),
        &AuthConfig::new("proptest-secret-0123456789abcdefghij"),
        NotificationHandle::disabled(),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn login_then_validate_returns_owner(
        owner in owner_strategy(),
        fingerprint in fingerprint_strategy(),
        origin in origin_strategy(),
    ) {
        let rt = runtime();
        let manager = manager();

        let pair = rt.block_on(manager.login(owner, &fingerprint, &origin)).unwrap();
        prop_assert_eq!(manager.validate(&pair.access_token).unwrap(), owner);
    }

    #[test]
    fn refresh_preserves_owner_and_consumes_token(
        owner in owner_strategy(),
        fingerprint in fingerprint_strategy(),
        first_origin in origin_strategy(),
        second_origin in origin_strategy(),
    ) {
        let rt = runtime();
        let manager = manager();

        let p1 = rt.block_on(manager.login(owner, &fingerprint, &first_origin)).unwrap();
        let p2 = rt
            .block_on(manager.refresh(&p1.refresh_token, &fingerprint, &second_origin))
            .unwrap();

        prop_assert_eq!(manager.validate(&p2.access_token).unwrap(), owner);
        prop_assert_ne!(&p1.refresh_token, &p2.refresh_token);
        prop_assert!(rt
            .block_on(manager.refresh(&p1.refresh_token, &fingerprint, &second_origin))
            .is_err());
    }

    #[test]
    fn different_fingerprint_never_refreshes(
        owner in owner_strategy(),
        fingerprint in fingerprint_strategy(),
        other in fingerprint_strategy(),
        origin in origin_strategy(),
    ) {
        prop_assume!(fingerprint != other);
        let rt = runtime();
        let manager = manager();

        let pair = rt.block_on(manager.login(owner, &fingerprint, &origin)).unwrap();
        let result = rt.block_on(manager.refresh(&pair.refresh_token, &other, &origin));
        prop_assert!(matches!(result, Err(rotating_auth::AuthError::DeviceMismatch)));
    }
}
