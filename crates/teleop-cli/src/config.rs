//! Parameter file – reads `~/.teleop/config.toml`.
//!
//! Every key is optional.  Missing speed scales and head limits fall back to
//! their documented defaults with a warning; missing bindings fall back
//! silently.  A missing file means "all defaults".

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use teleop_kernel::config::{
    DEFAULT_MAX_PAN, DEFAULT_MAX_TILT, DEFAULT_MAX_VW, DEFAULT_MAX_VX, DEFAULT_MAX_VY,
    DEFAULT_MIN_TILT, DEFAULT_PAN_STEP, DEFAULT_TILT_STEP, SpeedScale,
};
use teleop_kernel::{ArbiterConfig, HeadLimits, SafetyWindow};
use teleop_runtime::NodeConfig;
use teleop_runtime::node::DEFAULT_PUBLISH_RATE_HZ;
use teleop_types::{HeadFormat, TeleopError};
use tracing::{debug, info, warn};

/// Default rosbridge listen address of the joystick node.
pub const DEFAULT_BRIDGE_ADDR: &str = "127.0.0.1:9090";
/// Default rosbridge listen address of the keyboard head teleop.
pub const DEFAULT_KEYBOARD_BRIDGE_ADDR: &str = "127.0.0.1:9091";
/// Tilt step used by the keyboard head teleop when none is configured.
pub const DEFAULT_KEYBOARD_TILT_STEP: f64 = 0.02;

/// Raw parameters as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub max_vx: Option<f64>,
    pub max_vy: Option<f64>,
    pub max_vw: Option<f64>,
    pub max_vx_run: Option<f64>,
    pub max_vy_run: Option<f64>,
    pub max_vw_run: Option<f64>,

    pub max_pan: Option<f64>,
    pub max_tilt: Option<f64>,
    pub min_tilt: Option<f64>,
    pub pan_step: Option<f64>,
    pub tilt_step: Option<f64>,

    pub axis_vx: Option<i32>,
    pub axis_vy: Option<i32>,
    pub axis_vw: Option<i32>,
    pub axis_pan: Option<i32>,
    pub axis_tilt: Option<i32>,

    pub deadman_button: Option<i32>,
    pub run_button: Option<i32>,
    pub torso_dn_button: Option<i32>,
    pub torso_up_button: Option<i32>,
    pub head_button: Option<i32>,

    /// Seconds; `<= 0` disables the staleness timeout.
    pub joy_msg_timeout: Option<f64>,

    pub head_format: Option<HeadFormat>,
    pub publish_rate_hz: Option<f64>,
    pub bridge_addr: Option<String>,
    pub keyboard_bridge_addr: Option<String>,
}

fn or_warn(value: Option<f64>, name: &str, default: f64) -> f64 {
    value.unwrap_or_else(|| {
        warn!(param = name, default, "parameter not set; using default");
        default
    })
}

impl Params {
    /// Resolve into an [`ArbiterConfig`].
    pub fn resolve(&self, deadman_no_publish: bool) -> ArbiterConfig {
        let nominal = SpeedScale {
            vx: or_warn(self.max_vx, "max_vx", DEFAULT_MAX_VX),
            vy: or_warn(self.max_vy, "max_vy", DEFAULT_MAX_VY),
            vw: or_warn(self.max_vw, "max_vw", DEFAULT_MAX_VW),
        };
        let run = SpeedScale {
            vx: or_warn(self.max_vx_run, "max_vx_run", DEFAULT_MAX_VX),
            vy: or_warn(self.max_vy_run, "max_vy_run", DEFAULT_MAX_VY),
            vw: or_warn(self.max_vw_run, "max_vw_run", DEFAULT_MAX_VW),
        };
        let defaults = ArbiterConfig::default();
        let timeout = self.joy_msg_timeout.unwrap_or(-1.0);

        let cfg = ArbiterConfig {
            nominal,
            run,
            head_limits: self.head_limits(),
            pan_step: or_warn(self.pan_step, "pan_step", DEFAULT_PAN_STEP),
            tilt_step: or_warn(self.tilt_step, "tilt_step", DEFAULT_TILT_STEP),
            axis_vx: self.axis_vx.unwrap_or(defaults.axis_vx),
            axis_vy: self.axis_vy.unwrap_or(defaults.axis_vy),
            axis_vw: self.axis_vw.unwrap_or(defaults.axis_vw),
            axis_pan: self.axis_pan.unwrap_or(defaults.axis_pan),
            axis_tilt: self.axis_tilt.unwrap_or(defaults.axis_tilt),
            deadman_button: self.deadman_button.unwrap_or(defaults.deadman_button),
            run_button: self.run_button.unwrap_or(defaults.run_button),
            torso_dn_button: self.torso_dn_button.unwrap_or(defaults.torso_dn_button),
            torso_up_button: self.torso_up_button.unwrap_or(defaults.torso_up_button),
            head_button: self.head_button.unwrap_or(defaults.head_button),
            safety: SafetyWindow::from_secs(timeout),
            deadman_no_publish,
            head_format: self.head_format.unwrap_or_default(),
        };

        debug!(
            max_vx = cfg.nominal.vx,
            max_vy = cfg.nominal.vy,
            max_vw_deg = cfg.nominal.vw.to_degrees(),
            max_vx_run = cfg.run.vx,
            max_vy_run = cfg.run.vy,
            max_vw_run_deg = cfg.run.vw.to_degrees(),
            pan_step = cfg.pan_step,
            tilt_step = cfg.tilt_step,
            "speed and head parameters"
        );
        debug!(
            axis_vx = cfg.axis_vx,
            axis_vy = cfg.axis_vy,
            axis_vw = cfg.axis_vw,
            axis_pan = cfg.axis_pan,
            axis_tilt = cfg.axis_tilt,
            deadman_button = cfg.deadman_button,
            run_button = cfg.run_button,
            torso_dn_button = cfg.torso_dn_button,
            torso_up_button = cfg.torso_up_button,
            head_button = cfg.head_button,
            "bindings"
        );
        match cfg.safety.timeout() {
            Some(t) => debug!(joy_msg_timeout = t.as_secs_f64(), "joy timeout enabled"),
            None => debug!("joy_msg_timeout <= 0 -> no timeout"),
        }
        cfg
    }

    pub fn resolve_node(&self, deadman_no_publish: bool) -> NodeConfig {
        NodeConfig {
            arbiter: self.resolve(deadman_no_publish),
            publish_rate_hz: self.publish_rate_hz.unwrap_or(DEFAULT_PUBLISH_RATE_HZ),
        }
    }

    pub fn head_limits(&self) -> HeadLimits {
        HeadLimits {
            max_pan: or_warn(self.max_pan, "max_pan", DEFAULT_MAX_PAN),
            min_tilt: or_warn(self.min_tilt, "min_tilt", DEFAULT_MIN_TILT),
            max_tilt: or_warn(self.max_tilt, "max_tilt", DEFAULT_MAX_TILT),
        }
    }

    /// `(pan_step, tilt_step)` for the keyboard head teleop.
    pub fn keyboard_steps(&self) -> (f64, f64) {
        (
            or_warn(self.pan_step, "pan_step", DEFAULT_PAN_STEP),
            or_warn(self.tilt_step, "tilt_step", DEFAULT_KEYBOARD_TILT_STEP),
        )
    }

    pub fn bridge_addr(&self) -> Result<SocketAddr, TeleopError> {
        parse_addr(
            "bridge_addr",
            self.bridge_addr.as_deref().unwrap_or(DEFAULT_BRIDGE_ADDR),
        )
    }

    /// Listen address of the keyboard head teleop; distinct from
    /// [`Params::bridge_addr`] so both binaries can run side by side.
    pub fn keyboard_bridge_addr(&self) -> Result<SocketAddr, TeleopError> {
        parse_addr(
            "keyboard_bridge_addr",
            self.keyboard_bridge_addr
                .as_deref()
                .unwrap_or(DEFAULT_KEYBOARD_BRIDGE_ADDR),
        )
    }
}

fn parse_addr(name: &str, raw: &str) -> Result<SocketAddr, TeleopError> {
    raw.parse()
        .map_err(|e| TeleopError::Config(format!("invalid {name} '{raw}': {e}")))
}

/// Return the path to `~/.teleop/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".teleop").join("config.toml")
}

/// Load parameters from `path`, then apply environment overrides.
///
/// A missing file yields all-default parameters.
pub fn load_from(path: &Path) -> Result<Params, TeleopError> {
    let mut params = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| {
            TeleopError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| TeleopError::Config(format!("failed to parse {}: {e}", path.display())))?
    } else {
        info!(path = %path.display(), "no parameter file; using defaults");
        Params::default()
    };
    apply_env_overrides(&mut params);
    Ok(params)
}

/// Apply `TELEOP_*` environment variable overrides to `params`.
///
/// | Variable | Parameter |
/// |---|---|
/// | `TELEOP_BRIDGE_ADDR` | `bridge_addr` |
/// | `TELEOP_KEYBOARD_BRIDGE_ADDR` | `keyboard_bridge_addr` |
/// | `TELEOP_PUBLISH_RATE_HZ` | `publish_rate_hz` |
pub fn apply_env_overrides(params: &mut Params) {
    apply_overrides(params, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`, keyed by environment variable name.
fn apply_overrides(params: &mut Params, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TELEOP_BRIDGE_ADDR") {
        params.bridge_addr = Some(v);
    }
    if let Some(v) = lookup("TELEOP_KEYBOARD_BRIDGE_ADDR") {
        params.keyboard_bridge_addr = Some(v);
    }
    if let Some(v) = lookup("TELEOP_PUBLISH_RATE_HZ") {
        match v.parse::<f64>() {
            Ok(hz) => params.publish_rate_hz = Some(hz),
            Err(_) => warn!(value = %v, "ignoring invalid TELEOP_PUBLISH_RATE_HZ"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_params_resolve_to_defaults() {
        let cfg = Params::default().resolve(false);
        assert_eq!(cfg, ArbiterConfig::default());
    }

    #[test]
    fn parses_pr2_style_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
max_vx = 0.6
max_vx_run = 1.0
axis_vx = 3
axis_pan = -1
deadman_button = 10
head_button = 8
torso_dn_button = 14
joy_msg_timeout = 0.2
head_format = "command_array"
"#,
        )
        .unwrap();

        let params = load_from(&path).expect("load ok");
        let cfg = params.resolve(true);
        assert_eq!(cfg.run.vx, 1.0);
        assert_eq!(cfg.run.vy, DEFAULT_MAX_VY);
        assert_eq!(cfg.axis_pan, -1);
        assert_eq!(cfg.deadman_button, 10);
        assert!(cfg.torso_enabled());
        assert!(cfg.head_enabled());
        assert!(cfg.deadman_no_publish);
        assert_eq!(cfg.head_format, HeadFormat::CommandArray);
        assert_eq!(
            cfg.safety.timeout(),
            Some(std::time::Duration::from_millis(200))
        );
    }

    #[test]
    fn non_positive_timeout_disables_window() {
        let params = Params {
            joy_msg_timeout: Some(0.0),
            ..Params::default()
        };
        assert_eq!(params.resolve(false).safety.timeout(), None);
    }

    #[test]
    fn out_of_range_durations_resolve_without_panicking() {
        let params = Params {
            joy_msg_timeout: Some(1e20),
            publish_rate_hz: Some(1e-30),
            ..Params::default()
        };
        let node = params.resolve_node(false);
        assert_eq!(node.arbiter.safety.timeout(), None);
        assert_eq!(node.period(), std::time::Duration::from_millis(50));
    }

    #[test]
    fn missing_file_is_all_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let params = load_from(&path).expect("no error");
        assert_eq!(params.max_vx, None);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_vx = \"fast\"").unwrap();
        assert!(matches!(load_from(&path), Err(TeleopError::Config(_))));
    }

    #[test]
    fn config_path_points_to_teleop_dir() {
        let p = config_path_for_home("/home/operator");
        assert!(p.to_string_lossy().contains(".teleop"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn bridge_addr_default_and_invalid() {
        assert_eq!(
            Params::default().bridge_addr().unwrap(),
            "127.0.0.1:9090".parse::<SocketAddr>().unwrap()
        );
        let bad = Params {
            bridge_addr: Some("nowhere".to_string()),
            ..Params::default()
        };
        assert!(bad.bridge_addr().is_err());
    }

    #[test]
    fn keyboard_tilt_step_default_differs() {
        assert_eq!(
            Params::default().keyboard_steps(),
            (DEFAULT_PAN_STEP, DEFAULT_KEYBOARD_TILT_STEP)
        );
    }

    #[test]
    fn node_rate_defaults_to_twenty_hz() {
        let node = Params::default().resolve_node(false);
        assert_eq!(node.publish_rate_hz, 20.0);
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn overrides_change_bridge_addrs() {
        let mut params = Params {
            bridge_addr: Some("127.0.0.1:1".to_string()),
            ..Params::default()
        };
        apply_overrides(
            &mut params,
            env(&[
                ("TELEOP_BRIDGE_ADDR", "0.0.0.0:9999"),
                ("TELEOP_KEYBOARD_BRIDGE_ADDR", "0.0.0.0:9998"),
            ]),
        );
        assert_eq!(params.bridge_addr.as_deref(), Some("0.0.0.0:9999"));
        assert_eq!(params.keyboard_bridge_addr.as_deref(), Some("0.0.0.0:9998"));
    }

    #[test]
    fn overrides_set_valid_rate_and_ignore_invalid() {
        let mut params = Params::default();
        apply_overrides(&mut params, env(&[("TELEOP_PUBLISH_RATE_HZ", "50")]));
        assert_eq!(params.publish_rate_hz, Some(50.0));

        let mut params = Params::default();
        apply_overrides(&mut params, env(&[("TELEOP_PUBLISH_RATE_HZ", "fast")]));
        assert_eq!(params.publish_rate_hz, None);
    }

    #[test]
    fn no_overrides_leave_params_untouched() {
        let mut params = Params::default();
        apply_overrides(&mut params, env(&[]));
        assert_eq!(params, Params::default());
    }

    #[test]
    fn both_binaries_default_to_distinct_ports() {
        let params = Params::default();
        assert_ne!(
            params.bridge_addr().unwrap(),
            params.keyboard_bridge_addr().unwrap()
        );
        assert_eq!(
            params.keyboard_bridge_addr().unwrap(),
            "127.0.0.1:9091".parse::<SocketAddr>().unwrap()
        );
    }
}
