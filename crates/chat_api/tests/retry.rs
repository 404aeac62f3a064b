use std::time::Duration;

use chat_api::retry::*;

#[test]
fn retry_defaults_follow_service_constants() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.base, Duration::from_millis(BASE_DELAY_MS));
    assert_eq!(policy.jitter_ceiling, Duration::from_millis(JITTER_CEILING_MS));
    assert_eq!(policy.max_delay, Duration::from_millis(MAX_DELAY_MS));
    assert_eq!(DEFAULT_MAX_ATTEMPTS, 3);
}

#[test]
fn retry_delay_is_exponential_without_jitter() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay_with_jitter(0, Duration::ZERO).as_millis(), 500);
    assert_eq!(policy.delay_with_jitter(1, Duration::ZERO).as_millis(), 1000);
    assert_eq!(policy.delay_with_jitter(2, Duration::ZERO).as_millis(), 2000);
    assert_eq!(policy.delay_with_jitter(3, Duration::ZERO).as_millis(), 4000);
    assert_eq!(policy.delay_with_jitter(4, Duration::ZERO).as_millis(), 5000);
}

#[test]
fn retry_delay_is_capped_and_non_decreasing() {
    let policy = BackoffPolicy::default();
    let mut previous = Duration::ZERO;
    for attempt in 0..64 {
        let floor = policy.delay_with_jitter(attempt, Duration::ZERO);
        assert!(floor >= previous, "attempt {attempt} shrank the delay");
        previous = floor;

        for _ in 0..16 {
            let sampled = policy.delay(attempt, None);
            assert!(sampled <= policy.max_delay);
            assert!(sampled >= floor);
            assert!(sampled < floor + policy.jitter_ceiling || sampled == policy.max_delay);
        }
    }
}

#[test]
fn retry_delay_honors_integer_server_hint() {
    let policy = BackoffPolicy::default();
    for seconds in [0_u64, 1, 3, 30, 120] {
        let hint = seconds.to_string();
        for attempt in [0, 2, 9] {
            assert_eq!(
                policy.delay(attempt, Some(&hint)),
                Duration::from_millis(seconds * 1000)
            );
        }
    }
}

#[test]
fn retry_delay_falls_back_to_base_for_unparseable_hint() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay(4, Some("later")), policy.base);
    assert_eq!(
        policy.delay(4, Some("Wed, 21 Oct 2015 07:28:00 GMT")),
        policy.base
    );
}
