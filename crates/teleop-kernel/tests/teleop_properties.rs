use std::time::{Duration, Instant};

use teleop_kernel::config::{SpeedScale, TORSO_DOWN_VELOCITY, TORSO_UP_VELOCITY};
use teleop_kernel::{ArbiterConfig, CommandArbiter, GateState, InputSampler, SafetyWindow};
use teleop_types::{JoySample, OutboundCommand, Twist};

const DEADMAN: usize = 4;
const RUN: usize = 5;
const HEAD: usize = 6;
const TORSO_DN: usize = 7;
const TORSO_UP: usize = 8;

fn pr2_config() -> ArbiterConfig {
    ArbiterConfig {
        axis_vx: 1,
        axis_vy: 0,
        axis_vw: 2,
        axis_pan: 2,
        axis_tilt: 3,
        deadman_button: DEADMAN as i32,
        run_button: RUN as i32,
        head_button: HEAD as i32,
        torso_dn_button: TORSO_DN as i32,
        torso_up_button: TORSO_UP as i32,
        ..ArbiterConfig::default()
    }
}

fn sample(axes: &[f64], held: &[usize]) -> JoySample {
    let mut buttons = vec![false; 12];
    for &b in held {
        buttons[b] = true;
    }
    JoySample::new(axes.to_vec(), buttons)
}

/// Feed one sample through the sampler and arbiter, as the node does.
fn feed(sampler: &InputSampler, arbiter: &CommandArbiter, s: JoySample, at: Instant) {
    let frame = sampler.record_at(s, at);
    arbiter.on_sample(&frame);
}

#[test]
fn vx_half_stick_at_nominal_scale() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(ArbiterConfig {
        nominal: SpeedScale {
            vx: 0.6,
            vy: 0.6,
            vw: 0.8,
        },
        ..pr2_config()
    });
    let now = Instant::now();
    feed(&sampler, &arbiter, sample(&[0.0, 0.5, 0.0, 0.0], &[DEADMAN]), now);

    let out = arbiter.tick(sampler.latest().as_ref(), now);
    assert_eq!(out.gate, GateState::Engaged);
    assert!((out.state.base.linear_x - 0.30).abs() < 1e-9);
}

#[test]
fn vx_half_stick_at_run_scale() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(ArbiterConfig {
        run: SpeedScale {
            vx: 0.6,
            vy: 0.6,
            vw: 0.8,
        },
        ..pr2_config()
    });
    let now = Instant::now();
    feed(
        &sampler,
        &arbiter,
        sample(&[0.0, 0.5, 0.0, 0.0], &[DEADMAN, RUN]),
        now,
    );

    let out = arbiter.tick(sampler.latest().as_ref(), now);
    assert!((out.state.base.linear_x - 0.30).abs() < 1e-9);
}

#[test]
fn timeout_disengages_without_new_frame() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(ArbiterConfig {
        safety: SafetyWindow::from_secs(0.2),
        ..pr2_config()
    });
    let t0 = Instant::now();
    feed(&sampler, &arbiter, sample(&[0.0, 1.0, 0.0, 0.0], &[DEADMAN]), t0);

    let at_boundary = arbiter.tick(sampler.latest().as_ref(), t0 + Duration::from_millis(200));
    assert_eq!(at_boundary.gate, GateState::Engaged);

    let late = arbiter.tick(sampler.latest().as_ref(), t0 + Duration::from_millis(300));
    assert_eq!(late.gate, GateState::Disengaged);
    assert_eq!(late.state.base, Twist::ZERO);
    assert_eq!(late.state.torso, 0.0);
}

#[test]
fn fresh_deadman_frame_reengages_after_timeout() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(ArbiterConfig {
        safety: SafetyWindow::from_secs(0.2),
        ..pr2_config()
    });
    let t0 = Instant::now();
    feed(&sampler, &arbiter, sample(&[0.0; 4], &[DEADMAN]), t0);
    let t1 = t0 + Duration::from_secs(1);
    assert_eq!(
        arbiter.tick(sampler.latest().as_ref(), t1).gate,
        GateState::Disengaged
    );

    feed(&sampler, &arbiter, sample(&[0.0; 4], &[DEADMAN]), t1);
    assert_eq!(
        arbiter.tick(sampler.latest().as_ref(), t1).gate,
        GateState::Engaged
    );
}

#[test]
fn disengaged_ticks_never_leak_velocity() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(pr2_config());
    let now = Instant::now();

    feed(
        &sampler,
        &arbiter,
        sample(&[1.0, 1.0, 1.0, 1.0], &[DEADMAN, RUN, TORSO_UP]),
        now,
    );
    let engaged = arbiter.tick(sampler.latest().as_ref(), now);
    assert_ne!(engaged.state.base, Twist::ZERO);
    assert_eq!(engaged.state.torso, TORSO_UP_VELOCITY);

    feed(
        &sampler,
        &arbiter,
        sample(&[1.0, 1.0, 1.0, 1.0], &[RUN, TORSO_UP]),
        now,
    );
    for _ in 0..5 {
        let out = arbiter.tick(sampler.latest().as_ref(), now);
        assert_eq!(out.gate, GateState::Disengaged);
        assert_eq!(out.state.base, Twist::ZERO);
        assert_eq!(out.state.torso, 0.0);
        for cmd in &out.commands {
            match cmd {
                OutboundCommand::BaseVelocity(t) => assert_eq!(*t, Twist::ZERO),
                OutboundCommand::TorsoVelocity(v) => assert_eq!(*v, 0.0),
                OutboundCommand::Head(_) => {}
            }
        }
    }
}

#[test]
fn torso_ignores_axes() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(pr2_config());
    let now = Instant::now();
    let cases: [(&[usize], f64); 4] = [
        (&[DEADMAN], 0.0),
        (&[DEADMAN, TORSO_UP, TORSO_DN], 0.0),
        (&[DEADMAN, TORSO_UP], TORSO_UP_VELOCITY),
        (&[DEADMAN, TORSO_DN], TORSO_DOWN_VELOCITY),
    ];
    for axes in [[0.0; 4], [1.0, -1.0, 0.3, -0.7]] {
        for (held, expected) in cases {
            feed(&sampler, &arbiter, sample(&axes, held), now);
            let out = arbiter.tick(sampler.latest().as_ref(), now);
            assert_eq!(out.state.torso, expected, "held {held:?}");
        }
    }
}

#[test]
fn head_pose_stays_clamped_under_full_scale_pushes() {
    let sampler = InputSampler::new();
    let cfg = ArbiterConfig {
        pan_step: 0.5,
        tilt_step: 0.5,
        ..pr2_config()
    };
    let limits = cfg.head_limits;
    let arbiter = CommandArbiter::new(cfg);
    let now = Instant::now();

    let pushes = [1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, 1.0];
    for (i, &p) in pushes.iter().cycle().take(200).enumerate() {
        let tilt = if i % 3 == 0 { -p } else { p };
        feed(
            &sampler,
            &arbiter,
            sample(&[0.0, 0.0, p, tilt], &[DEADMAN, HEAD]),
            now,
        );
        let pose = arbiter.head_pose();
        assert!(pose.pan >= -limits.max_pan && pose.pan <= limits.max_pan);
        assert!(pose.tilt >= limits.min_tilt && pose.tilt <= limits.max_tilt);
    }
}

#[test]
fn disabled_head_axes_leave_pose_unchanged() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(pr2_config());
    let now = Instant::now();
    feed(
        &sampler,
        &arbiter,
        sample(&[0.0, 0.0, 1.0, 1.0], &[DEADMAN, HEAD]),
        now,
    );
    let before = arbiter.head_pose();

    // Only two axes: pan (2) and tilt (3) are both out of range.
    feed(&sampler, &arbiter, sample(&[1.0, 1.0], &[DEADMAN, HEAD]), now);
    let out = arbiter.tick(sampler.latest().as_ref(), now);
    assert_eq!(arbiter.head_pose(), before);
    assert_eq!(out.state.head, before);
}

#[test]
fn head_pose_survives_deadman_release_and_mode_switch() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(pr2_config());
    let now = Instant::now();
    feed(
        &sampler,
        &arbiter,
        sample(&[0.0, 0.0, 1.0, 0.0], &[DEADMAN, HEAD]),
        now,
    );
    let pose = arbiter.head_pose();
    assert!(pose.pan > 0.0);

    feed(&sampler, &arbiter, sample(&[0.0, 0.0, 1.0, 0.0], &[]), now);
    assert_eq!(arbiter.tick(sampler.latest().as_ref(), now).state.head, pose);

    feed(&sampler, &arbiter, sample(&[0.0, 0.0, 1.0, 0.0], &[DEADMAN]), now);
    assert_eq!(arbiter.tick(sampler.latest().as_ref(), now).state.head, pose);
}

#[test]
fn repeated_ticks_on_unchanged_frame_are_identical() {
    let sampler = InputSampler::new();
    let arbiter = CommandArbiter::new(pr2_config());
    let now = Instant::now();
    feed(
        &sampler,
        &arbiter,
        sample(&[0.2, -0.4, 0.6, 0.1], &[DEADMAN, HEAD, TORSO_DN]),
        now,
    );

    let first = arbiter.tick(sampler.latest().as_ref(), now);
    for i in 1..10 {
        let next = arbiter.tick(
            sampler.latest().as_ref(),
            now + Duration::from_millis(50 * i),
        );
        assert_eq!(next, first);
    }
}

#[test]
fn no_frame_yet_emits_zero_command() {
    let arbiter = CommandArbiter::new(pr2_config());
    let out = arbiter.tick(None, Instant::now());
    assert_eq!(out.gate, GateState::Disengaged);
    assert_eq!(out.commands[0], OutboundCommand::BaseVelocity(Twist::ZERO));
    assert_eq!(out.commands[1], OutboundCommand::TorsoVelocity(0.0));
}
