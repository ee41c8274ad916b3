//! End-to-end session lifecycle: warning, resume, expiry and teardown.
//!
//! All tests run on paused time; `elapse` drives the idle clock.

use guard_core::{EventKind, ExpiryReason, ExtensionOutcome, MessageKey, Phase};
use integration_tests::fixtures::{self, just_after, MINUTE};
use integration_tests::setup::{elapse, settle, TestContext};
use monitor::now;

/// 26 idle minutes on the default timeline: ACTIVE -> WARNING, one notice.
#[tokio::test(start_paused = true)]
async fn test_idle_session_enters_warning() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(24 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Active);
    assert!(ctx.notifier.kinds().is_empty());

    elapse(2 * MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);
    assert_eq!(ctx.notifier.kinds(), vec![MessageKey::Warning]);

    let text = ctx.notifier.last_text(MessageKey::Warning).unwrap();
    assert!(text.contains("5 minutes"), "unexpected warning text: {text}");
}

/// Activity at minute 26, tick at minute 27: WARNING -> ACTIVE, one resume.
#[tokio::test(start_paused = true)]
async fn test_activity_resumes_warned_session() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(26 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);

    ctx.bus().publish(EventKind::MouseMove);
    settle().await;
    // Activity alone does not move the phase; the next tick does.
    assert_eq!(engine.machine().phase(), Phase::Warning);

    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Active);
    assert_eq!(ctx.notifier.count(MessageKey::ActivityResume), 1);
    assert_eq!(ctx.notifier.count(MessageKey::Logout), 0);
    assert!(ctx.terminator.calls().is_empty());
}

/// Warning fires once no matter how many ticks stay inside the window.
#[tokio::test(start_paused = true)]
async fn test_warning_not_repeated() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(29 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);
    assert_eq!(ctx.notifier.count(MessageKey::Warning), 1);
}

/// 31 idle minutes: EXPIRED, secure then reauth exactly once.
#[tokio::test(start_paused = true)]
async fn test_expiry_terminates_once() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(31 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert_eq!(
        ctx.notifier.kinds(),
        vec![
            MessageKey::Warning,
            MessageKey::Logout,
            MessageKey::SecuringData,
            MessageKey::DataSecured,
        ]
    );

    // Minute 35: nothing runs again, whether ticked or evaluated by hand.
    elapse(4 * MINUTE).await;
    let transition = engine.machine().evaluate(now()).await;
    assert_eq!(transition.to, Phase::Expired);
    assert_eq!(transition.effect, None);
    assert!(!engine.logout_now().await);

    assert_eq!(ctx.terminator.secure_count(), 1);
    assert_eq!(ctx.terminator.reauth_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_stops_clock_and_sampler() {
    let (ctx, engine) = TestContext::started(fixtures::short_config());

    elapse(just_after(10 * fixtures::SECOND)).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);

    // The sampler notices on its next event.
    ctx.bus().publish(EventKind::Click);
    settle().await;
    assert!(!engine.is_running());
    assert_eq!(engine.machine().phase(), Phase::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_secure_data_failure_still_forces_reauth() {
    let (ctx, engine) = TestContext::started(fixtures::short_config());
    ctx.terminator.set_should_fail(true);

    elapse(just_after(10 * fixtures::SECOND)).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert_eq!(ctx.notifier.count(MessageKey::DataSecured), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_panic_is_contained() {
    let (ctx, engine) = TestContext::started(fixtures::short_config());
    ctx.notifier.set_panic_on(Some(MessageKey::Warning));

    // The warning notice panics inside the notifier; later ticks still run.
    elapse(just_after(10 * fixtures::SECOND)).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.reauth_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_notice_panic_still_reauths() {
    let (ctx, engine) = TestContext::started(fixtures::short_config());
    ctx.notifier.set_panic_on(Some(MessageKey::Logout));

    elapse(15 * fixtures::SECOND).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert!(engine.machine().is_terminated());
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert_eq!(ctx.notifier.count(MessageKey::DataSecured), 1);
}

#[tokio::test(start_paused = true)]
async fn test_secure_data_panic_still_reauths() {
    let (ctx, engine) = TestContext::started(fixtures::short_config());
    ctx.terminator.set_should_panic(true);

    elapse(15 * fixtures::SECOND).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert_eq!(ctx.notifier.count(MessageKey::DataSecured), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_logout_with_panicking_notifier_still_reauths() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    ctx.notifier.set_panic_on(Some(MessageKey::SecuringData));

    assert!(engine.logout_now().await);
    assert_eq!(ctx.terminator.reauth_count(), 1);
    assert_eq!(ctx.notifier.kinds(), vec![MessageKey::Logout, MessageKey::DataSecured]);
}

#[tokio::test(start_paused = true)]
async fn test_visibility_events() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(26 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);

    ctx.bus().publish(EventKind::VisibilityHidden);
    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);

    ctx.bus().publish(EventKind::VisibilityShown);
    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Active);
}

#[tokio::test(start_paused = true)]
async fn test_idle_is_monotonic_between_activity() {
    let (_ctx, engine) = TestContext::started(fixtures::office_config());

    let mut last = 0;
    for _ in 0..10 {
        elapse(MINUTE).await;
        let idle = engine.status().idle_secs;
        assert!(idle >= last);
        last = idle;
    }
    assert!(last >= 10 * 60);
}

#[tokio::test(start_paused = true)]
async fn test_extend_session_from_warning() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(26 * MINUTE)).await;
    assert_eq!(
        engine.extend_session().await,
        ExtensionOutcome::Granted { remaining: 2 }
    );

    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Active);
    assert_eq!(engine.status().extensions_remaining, 2);
    assert_eq!(ctx.notifier.count(MessageKey::ActivityResume), 1);
}

#[tokio::test(start_paused = true)]
async fn test_extension_past_limit_is_refused() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    for remaining in (0..3).rev() {
        assert_eq!(
            engine.extend_session().await,
            ExtensionOutcome::Granted { remaining }
        );
    }
    assert_eq!(engine.extend_session().await, ExtensionOutcome::LimitReached);

    let status = engine.status();
    assert_eq!(status.phase, Phase::Active);
    assert_eq!(status.expiry_reason, None);
    assert_eq!(status.extensions_remaining, 0);
    assert!(ctx.terminator.calls().is_empty());

    // The refused request did not count as activity either.
    elapse(just_after(30 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.reauth_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_now() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    assert!(engine.logout_now().await);
    assert!(!engine.logout_now().await);

    let status = ctx.registry.status();
    let session = status.session.unwrap();
    assert_eq!(session.phase, Phase::Expired);
    assert_eq!(session.expiry_reason, Some(ExpiryReason::Manual));
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert!(ctx.registry.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_everything() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    settle().await;
    assert!(engine.is_running());
    assert_eq!(ctx.bus().subscriber_count(), 1);

    engine.shutdown();
    engine.shutdown();
    settle().await;

    assert!(engine.is_shut_down());
    assert!(!engine.is_running());
    assert!(!ctx.store().has_listener());
    assert_eq!(ctx.bus().subscriber_count(), 0);

    elapse(31 * MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Active);
    assert!(ctx.terminator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_status_serializes() {
    let (ctx, _engine) = TestContext::started(fixtures::office_config());
    elapse(5 * MINUTE).await;

    let json = serde_json::to_value(ctx.registry.status()).unwrap();
    assert_eq!(json["state"], "active");
    assert_eq!(json["session"]["phase"], "ACTIVE");
    assert_eq!(json["session"]["idle_secs"], 300);
    assert_eq!(json["session"]["time_until_warning_secs"], 20 * 60);
}
