//! Servo clamping, bank ordering and teardown


use inmoov_vision::{
    config::RigConfig,
    constants::SERVO_QUEUE_CAPACITY,
    servo::{Joint, Servo},
    servo_controller::{ServoController, ServoHandle},
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant};
use test_helpers::RecordingBus;

fn head_bank(bus: &RecordingBus) -> (ServoController, ServoHandle) {
    let rig = RigConfig::default();
    let mut controller = ServoController::new();
    for joint in Joint::ALL {
        controller.register_servo(rig.servo(joint).to_servo()).unwrap();
    }
    let bus = bus.clone();
    let servos = controller.start(move || Ok(bus)).unwrap();
    (controller, servos)
}

proptest! {
    #[test]
    fn test_pulse_width_always_within_bounds(
        lo in 500u16..2500,
        span in 0u16..1500,
        commands in prop::collection::vec((any::<bool>(), -5000i32..5000), 0..50),
    ) {
        let hi = lo + span;
        let mut servo = Servo::new(0, lo, lo, hi);
        for (absolute, value) in commands {
            if absolute {
                servo.set_pw(value);
            } else {
                servo.change_pw_relative(value);
            }
            prop_assert!(servo.pw() >= lo && servo.pw() <= hi);
        }
    }
}

#[test]
fn test_random_command_sequences_stay_clamped() {
    let mut rng = StdRng::seed_from_u64(7);
    let bus = RecordingBus::default();
    let (mut controller, servos) = head_bank(&bus);
    let rig = RigConfig::default();

    for _ in 0..200 {
        let joint = Joint::ALL[rng.gen_range(0..Joint::ALL.len())];
        let channel = rig.channel(joint);
        match rng.gen_range(0..4) {
            0 => servos.set_pw(channel, rng.gen_range(-1000..5000)),
            1 => servos.change_pw_relative(channel, rng.gen_range(-800..800)),
            2 => servos.set_off(channel),
            _ => servos.home(channel),
        }
    }

    for joint in Joint::ALL {
        let servo = servos.snapshot(rig.channel(joint)).unwrap();
        let (lo, hi) = servo.bounds();
        assert!(servo.pw() >= lo && servo.pw() <= hi, "{joint:?} out of bounds");
    }
    controller.close();

    for event in bus.events() {
        if let Some(rest) = event.strip_prefix("set ") {
            let mut parts = rest.split(' ');
            let channel: u8 = parts.next().unwrap().parse().unwrap();
            let pw: u16 = parts.next().unwrap().parse().unwrap();
            let limits = Joint::ALL
                .iter()
                .map(|&j| rig.servo(j))
                .find(|s| s.channel == channel)
                .unwrap();
            assert!(pw >= limits.min_pw && pw <= limits.max_pw);
        }
    }
}

#[test]
fn test_close_twice_closes_bus_once() {
    let bus = RecordingBus::default();
    let (mut controller, _servos) = head_bank(&bus);
    controller.close();
    controller.close();
    drop(controller);

    let closes = bus.events().iter().filter(|e| *e == "close").count();
    assert_eq!(closes, 1);
}

#[test]
fn test_shutdown_releases_every_servo() {
    let bus = RecordingBus::default();
    let (mut controller, _servos) = head_bank(&bus);
    controller.close();

    let events = bus.events();
    for joint in Joint::ALL {
        let off = format!("off {}", RigConfig::default().channel(joint));
        assert!(events.contains(&off), "missing {off}");
    }
    assert_eq!(events.last().map(String::as_str), Some("close"));
}

#[test]
fn test_commands_from_cloned_handles_share_one_queue() {
    let bus = RecordingBus::default();
    let (mut controller, servos) = head_bank(&bus);
    let tracker_side = servos.clone();

    tracker_side.change_pw_relative(0, -10);
    servos.increment(0, 50);
    tracker_side.decrement(0, 20);
    let pan = servos.snapshot(0).unwrap();
    assert_eq!(pan.pw(), 2100 - 10 + 50 - 20);
    assert!(pan.is_powered());
    controller.close();

    assert_eq!(
        bus.events()[..3].to_vec(),
        vec!["set 0 2090", "set 0 2140", "set 0 2120"]
    );
}

#[test]
fn test_handle_after_close_is_inert() {
    let bus = RecordingBus::default();
    let (mut controller, servos) = head_bank(&bus);
    controller.close();
    let before = bus.events().len();

    servos.set_pw(0, 2000);
    assert!(servos.snapshot(0).is_none());
    assert_eq!(bus.events().len(), before);
}

#[test]
fn test_position_does_not_wait_behind_settles() {
    let bus = RecordingBus::default();
    let (mut controller, servos) = head_bank(&bus);

    for _ in 0..5 {
        servos.change_pw_relative(0, 10);
        servos.settle(Duration::from_millis(100));
    }
    let started = Instant::now();
    let pan = servos.position(0);
    assert!(started.elapsed() < Duration::from_millis(50));
    assert!(matches!(pan, Some(2100..=2150)), "{pan:?}");

    // Once the queue drains the published width matches the bank
    assert_eq!(servos.snapshot(0).unwrap().pw(), 2150);
    assert_eq!(servos.position(0), Some(2150));
    assert_eq!(servos.position(1), None);
    controller.close();
}

#[test]
fn test_try_move_is_dropped_when_queue_is_full() {
    let bus = RecordingBus::default();
    let (mut controller, servos) = head_bank(&bus);

    servos.settle(Duration::from_millis(300));
    for _ in 0..SERVO_QUEUE_CAPACITY {
        servos.settle(Duration::ZERO);
    }
    let started = Instant::now();
    assert!(!servos.try_change_pw_relative(0, -10));
    assert!(started.elapsed() < Duration::from_millis(50));

    assert_eq!(servos.snapshot(0).unwrap().pw(), 2100);
    assert!(servos.try_change_pw_relative(0, -10));
    assert_eq!(servos.snapshot(0).unwrap().pw(), 2090);
    controller.close();
    assert!(!bus.events().contains(&"set 0 2080".to_string()));
}
