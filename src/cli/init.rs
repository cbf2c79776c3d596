//! Init command implementation

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use jetctl::config::Config;

/// Default configuration content for jetctl init
pub const DEFAULT_CONFIG: &str = r#"# jetctl configuration
# ====================

# ============================================================================
# DEVICE - The rig's HTTP device API
# ============================================================================
#
# Available options:
#   api_base_url         - Base URL every device path is appended to
#   token                - Bearer token sent as `Authorization` (empty = none)
#   max_pwm_limited      - Laser controller caps PWM at 95 % (default: false)
#   main_gas_flow_unit   - "mL/min", "L/min", "m^3/h" or "raw" (default: "L/min")
#   heater_decimal_point - Heater set value is sent in tenths (default: false)

[device]
api_base_url = "http://localhost:5555/api"
token = ""
max_pwm_limited = false
main_gas_flow_unit = "L/min"
heater_decimal_point = false

# ============================================================================
# ENGINE - Run timing
# ============================================================================
#
# A device call that takes longer than dispatch_timeout_secs ends the run as
# interrupted. error_policy is used when neither the sequence file nor the
# command line chooses one: "break-on-error" or "continue-on-error".

[engine]
dispatch_timeout_secs = 30
animation_millis = 1000
frame_millis = 16
error_policy = "break-on-error"
"#;

/// Write the default config to `config_path` (or the global location)
pub fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    Config::write_locked(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    println!("Created: {}", config_path.display());

    Ok(())
}
