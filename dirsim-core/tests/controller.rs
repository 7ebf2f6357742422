mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{recording_controller, recording_controller_with, tempo_sends, OscReceiver, WAIT};
use dirsim_core::types::{ConfigError, ConfigUpdate, DecayTarget, Mode, Zone};
use dirsim_core::{ControlCommand, ControllerSettings, DispatchSettings, TempoController};

#[test]
fn test_motion_session_over_udp() {
    let receiver = OscReceiver::bind().unwrap();
    let mut controller =
        TempoController::new(ControllerSettings::default(), Arc::new(receiver.sink())).unwrap();

    controller.observe_position(Some((320.0, 240.0)), 0.0);
    assert!(controller.queue().flush(WAIT));

    assert_eq!(
        receiver.recv_addresses(6),
        vec![
            "/stop",
            "/time",
            "/play",
            "/tempo/raw",
            "/track/5/volume",
            "/track/4/volume"
        ]
    );
    controller.shutdown();
}

#[test]
fn test_still_hand_drifts_to_floor() {
    let (mut controller, sink) = recording_controller();
    let mut t = 0.0;
    while t <= 12.0 {
        controller.observe_position(Some((320.0, 240.0)), t);
        t += 0.25;
    }
    assert!(controller.queue().flush(WAIT));
    assert_eq!(controller.current_bpm(), 100.0);

    let sends = tempo_sends(&sink);
    assert_eq!(sends.first(), Some(&104));
    assert_eq!(sends.last(), Some(&100));
    assert!(sends.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_resting_variant_returns_to_initial() {
    let mut settings = ControllerSettings::default();
    settings.tempo.decay_target = DecayTarget::Resting;
    let (mut controller, _sink) = recording_controller_with(settings);

    controller.observe_position(Some((0.0, 0.0)), 0.0);
    controller.observe_position(Some((1000.0, 0.0)), 0.25);
    assert!(controller.current_bpm() > 104.0);
    let mut t = 0.5;
    while t < 120.0 {
        controller.observe_position(Some((1000.0, 0.0)), t);
        t += 0.5;
    }
    assert_eq!(controller.current_bpm(), 104.0);
}

#[test]
fn test_pattern_cycle_at_half_second() {
    let (mut controller, sink) = recording_controller();
    controller.set_mode(Mode::Pattern);

    let cycle = [Zone::Down, Zone::Left, Zone::Right, Zone::Up];
    let mut t = 0.0;
    for _ in 0..2 {
        for zone in cycle {
            assert!(controller.observe_touch(zone, t));
            t += 0.5;
        }
    }
    assert!(controller.session_started());
    assert!((controller.current_bpm() - 120.0).abs() < 1e-9);
    assert!(controller.queue().flush(WAIT));
    assert_eq!(tempo_sends(&sink).last(), Some(&120));
}

#[test]
fn test_config_narrowing_clamps_output() {
    let (mut controller, sink) = recording_controller();
    controller.observe_position(Some((0.0, 0.0)), 0.0);
    controller.observe_position(Some((1000.0, 0.0)), 0.25);

    controller.update_config(ConfigUpdate::MaxBpm(110.0)).unwrap();
    assert_eq!(controller.config().initial_bpm, 104.0);
    controller.observe_position(Some((2000.0, 0.0)), 1.0);
    assert!(controller.current_bpm() <= 110.0);

    controller.update_config(ConfigUpdate::MaxBpm(102.0)).unwrap();
    assert_eq!(controller.config().initial_bpm, 102.0);

    assert_eq!(
        controller.update_config(ConfigUpdate::MinBpm(105.0)),
        Err(ConfigError::RangeViolation {
            min: 105.0,
            max: 102.0
        })
    );
    assert!(controller.queue().flush(WAIT));
    assert!(tempo_sends(&sink).iter().all(|bpm| (100..=125).contains(bpm)));
}

#[test]
fn test_reset_command_restarts_session() {
    let (mut controller, sink) = recording_controller();
    controller.observe_position(Some((1.0, 1.0)), 0.0);
    controller
        .apply_command(ControlCommand::Reset)
        .unwrap();
    controller.observe_position(Some((1.0, 1.0)), 0.25);
    assert!(controller.queue().flush(WAIT));

    let plays = sink.addresses().iter().filter(|a| *a == "/play").count();
    assert_eq!(plays, 2);
}

#[test]
fn test_custom_cadence() {
    let settings = ControllerSettings {
        dispatch: DispatchSettings {
            tempo_interval: Duration::from_millis(250),
            slider_interval: Duration::from_secs(10),
            ..DispatchSettings::default()
        },
        ..ControllerSettings::default()
    };
    let (mut controller, sink) = recording_controller_with(settings);
    for i in 0..8 {
        controller.tick(i as f64 * 0.125);
    }
    assert!(controller.queue().flush(WAIT));
    assert_eq!(tempo_sends(&sink).len(), 4);
    let volumes = sink
        .addresses()
        .iter()
        .filter(|a| a.starts_with("/track/"))
        .count();
    assert_eq!(volumes, 2);
}
