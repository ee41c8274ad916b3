//! Runtime reconfiguration reaching a live engine.

use guard_core::{Configuration, Error, MessageKey, PartialConfiguration, Phase};
use integration_tests::fixtures::{self, just_after, MINUTE, SECOND};
use integration_tests::setup::{elapse, TestContext};
use std::time::Duration;

/// PUBLIC applied at 9 idle minutes warns on the very next tick.
#[tokio::test(start_paused = true)]
async fn test_preset_applies_to_idle_session() {
    let (ctx, engine) =
        TestContext::started(fixtures::config_with_check_interval(30 * SECOND));

    elapse(9 * MINUTE + 10 * SECOND).await;
    assert_eq!(engine.machine().phase(), Phase::Active);

    ctx.store().apply_preset("PUBLIC").unwrap();
    let settings = engine.machine().settings();
    assert_eq!(settings.inactivity_timeout, 10 * MINUTE);
    assert_eq!(settings.warning_time, 8 * MINUTE);

    elapse(30 * SECOND).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);
    assert_eq!(ctx.notifier.count(MessageKey::Warning), 1);
    let text = ctx.notifier.last_text(MessageKey::Warning).unwrap();
    assert!(text.contains("1 minutes"), "unexpected warning text: {text}");
}

/// Shrinking the timeout below the current idle time expires next tick.
#[tokio::test(start_paused = true)]
async fn test_shortened_timeout_expires_next_tick() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    elapse(just_after(20 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Active);

    ctx.store()
        .update(&PartialConfiguration::timeline(15 * MINUTE, 12 * MINUTE))
        .unwrap();

    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Expired);
    assert_eq!(ctx.terminator.calls(), vec!["secure_data", "force_reauth"]);
    assert_eq!(ctx.notifier.count(MessageKey::Warning), 0);
}

/// A new check interval takes effect right away, not after the old period.
#[tokio::test(start_paused = true)]
async fn test_check_interval_reschedules_immediately() {
    let config = Configuration {
        inactivity_timeout_ms: 120_000,
        warning_time_ms: 60_000,
        check_interval_ms: 600_000,
        ..Default::default()
    };
    let (ctx, engine) = TestContext::started(config);

    elapse(30 * SECOND).await;
    ctx.store()
        .update(&fixtures::check_interval_patch(20 * SECOND))
        .unwrap();

    // Ticks now land at 50s and 70s.
    elapse(45 * SECOND).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_update_leaves_engine_untouched() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    let before = engine.machine().settings();

    let err = ctx
        .store()
        .update(&PartialConfiguration::timeline(10 * MINUTE, 10 * MINUTE))
        .unwrap_err();
    assert_eq!(err.error_code(), Some("CONFIG_001"));
    assert_eq!(engine.machine().settings(), before);
    assert_eq!(ctx.store().get(), fixtures::office_config());

    let err = ctx
        .store()
        .update(&fixtures::check_interval_patch(Duration::ZERO))
        .unwrap_err();
    assert_eq!(err.error_code(), Some("CONFIG_002"));
    assert_eq!(engine.machine().settings(), before);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_preset_is_rejected() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    let before = engine.machine().settings();

    let err = ctx.store().apply_preset("KIOSK").unwrap_err();
    assert!(matches!(err, Error::UnknownPreset(ref name) if name == "KIOSK"));
    assert_eq!(engine.machine().settings(), before);
}

#[tokio::test(start_paused = true)]
async fn test_debug_mode_and_reset_reach_engine() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());

    ctx.store().apply_preset("development").unwrap();
    assert!(engine.machine().debug_mode());
    assert_eq!(engine.machine().settings().inactivity_timeout, 5 * MINUTE);

    ctx.store().reset().unwrap();
    assert!(!engine.machine().debug_mode());
    assert_eq!(engine.machine().settings().inactivity_timeout, 30 * MINUTE);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_notices_stay_silent() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    ctx.store()
        .update(&PartialConfiguration {
            show_warning: Some(false),
            show_activity_resume: Some(false),
            ..Default::default()
        })
        .unwrap();

    elapse(just_after(26 * MINUTE)).await;
    assert_eq!(engine.machine().phase(), Phase::Warning);
    ctx.bus().publish(guard_core::EventKind::KeyPress);
    elapse(MINUTE).await;
    assert_eq!(engine.machine().phase(), Phase::Active);

    assert!(ctx.notifier.kinds().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_messages_are_rendered() {
    let (ctx, _engine) = TestContext::started(fixtures::office_config());
    let patch = PartialConfiguration {
        messages: Some([(MessageKey::Warning, "{1} of {0} left".to_string())].into()),
        ..Default::default()
    };
    ctx.store().update(&patch).unwrap();

    elapse(just_after(25 * MINUTE)).await;
    assert_eq!(
        ctx.notifier.last_text(MessageKey::Warning).as_deref(),
        Some("5 of 30 left")
    );
}

#[tokio::test(start_paused = true)]
async fn test_shut_down_engine_ignores_updates() {
    let (ctx, engine) = TestContext::started(fixtures::office_config());
    let before = engine.machine().settings();

    engine.shutdown();
    ctx.store().apply_preset("PUBLIC").unwrap();

    assert_eq!(engine.machine().settings(), before);
    assert_eq!(ctx.store().get().inactivity_timeout_ms, 10 * 60_000);
}
