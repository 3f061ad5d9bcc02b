use chrono::Duration;

use mailcode_auth::domain::repository::CodeStore;
use mailcode_auth::error::AuthServiceError;
use mailcode_auth::infra::memory::InMemoryCodeStore;
use mailcode_auth::usecase::otc::{CodePolicy, RequestCodeInput};

use crate::helpers::{ManualClock, TEST_EMAIL, fresh_store, identity, known_code, request_usecase, t0};

#[tokio::test]
async fn should_store_six_digit_code_with_ttl() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let uc = request_usecase(&store, &clock, CodePolicy::default());

    let issued = uc
        .execute(RequestCodeInput {
            email: TEST_EMAIL.to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(issued.code.as_str().len(), 6);
    assert!(issued.code.as_str().bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(issued.expires_at, t0() + Duration::minutes(5));

    let stored = store.get(&identity(TEST_EMAIL)).expect("pending code stored");
    assert!(stored.code.matches(&issued.code));
    assert_eq!(stored.issued_at, t0());
    assert_eq!(stored.expires_at, issued.expires_at);
    assert_eq!(stored.attempts_left, Some(5));
}

#[tokio::test]
async fn should_key_codes_by_normalized_email() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let uc = request_usecase(&store, &clock, CodePolicy::default());

    let issued = uc
        .execute(RequestCodeInput {
            email: "  Someone@Example.COM ".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(issued.identity.as_str(), "someone@example.com");
    assert!(store.get(&identity("someone@example.com")).is_some());
}

#[tokio::test]
async fn should_reject_empty_email() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let uc = request_usecase(&store, &clock, CodePolicy::default());

    let result = uc
        .execute(RequestCodeInput {
            email: String::new(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidIdentity)),
        "expected InvalidIdentity, got {result:?}"
    );
    assert!(store.is_empty(), "nothing should be stored for invalid input");
}

#[tokio::test]
async fn should_reject_malformed_email() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let uc = request_usecase(&store, &clock, CodePolicy::default());

    let result = uc
        .execute(RequestCodeInput {
            email: "not-an-email".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidIdentity)),
        "expected InvalidIdentity, got {result:?}"
    );
}

#[tokio::test]
async fn should_replace_previous_code_and_reset_timer() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let policy = CodePolicy::default();
    store
        .upsert(known_code(TEST_EMAIL, "482913", &clock, policy))
        .await
        .unwrap();

    clock.advance(Duration::minutes(4));
    let uc = request_usecase(&store, &clock, policy);
    let issued = uc
        .execute(RequestCodeInput {
            email: TEST_EMAIL.to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(store.len(), 1);
    let stored = store.get(&identity(TEST_EMAIL)).unwrap();
    assert!(stored.code.matches(&issued.code));
    assert_eq!(stored.expires_at, t0() + Duration::minutes(9));
}

#[tokio::test]
async fn should_not_touch_other_identities() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let policy = CodePolicy::default();
    store
        .upsert(known_code("other@b.com", "111111", &clock, policy))
        .await
        .unwrap();

    request_usecase(&store, &clock, policy)
        .execute(RequestCodeInput {
            email: TEST_EMAIL.to_owned(),
        })
        .await
        .unwrap();

    let other = store.get(&identity("other@b.com")).unwrap();
    assert_eq!(other.code.as_str(), "111111");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn should_apply_configured_policy() {
    let store = fresh_store();
    let clock = ManualClock::at(t0());
    let policy = CodePolicy {
        ttl: Duration::seconds(90),
        max_attempts: None,
    };

    let issued = request_usecase(&store, &clock, policy)
        .execute(RequestCodeInput {
            email: TEST_EMAIL.to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(issued.expires_at, t0() + Duration::seconds(90));
    assert_eq!(store.get(&identity(TEST_EMAIL)).unwrap().attempts_left, None);
}

#[tokio::test]
async fn should_fail_with_store_full_when_capacity_reached() {
    let store = InMemoryCodeStore::new(1);
    let clock = ManualClock::at(t0());
    let uc = request_usecase(&store, &clock, CodePolicy::default());

    uc.execute(RequestCodeInput {
        email: "first@b.com".to_owned(),
    })
    .await
    .unwrap();
    let result = uc
        .execute(RequestCodeInput {
            email: "second@b.com".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::StoreFull)),
        "expected StoreFull, got {result:?}"
    );
}
