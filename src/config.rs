//! Interpreter-level runtime configuration (spec §9 "global state" note):
//! screen geometry, RNG policy, and default output streams. This is
//! configuration for the *interpreter*, not game save state, and is loaded
//! once at startup from an optional TOML file via `serde` + `toml`,
//! matching the pattern used elsewhere in this codebase for config files.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub screen: ScreenConfig,
    pub random: RandomConfig,
    pub interpreter_number: u8,
    pub interpreter_version: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width_chars: u8,
    pub height_chars: u8,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            width_chars: 80,
            height_chars: 24,
        }
    }
}

/// Mirrors the `random` opcode's two non-uniform modes (spec §4.10):
/// leaving the seed unset means "true random" (the VM's default at boot).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RandomConfig {
    pub predictable_seed: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            screen: ScreenConfig::default(),
            random: RandomConfig::default(),
            // 6 = "IBM PC" in the standard interpreter-number table, a
            // reasonably neutral default; version 'Z' (0x5A) is the Infocom
            // convention for "generic interpreter".
            interpreter_number: 6,
            interpreter_version: b'Z',
        }
    }
}

impl InterpreterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = InterpreterConfig::default();
        assert_eq!(config.screen.width_chars, 80);
        assert_eq!(config.random.predictable_seed, None);
    }

    #[test]
    fn parses_partial_toml() {
        let config = InterpreterConfig::from_toml_str(
            r#"
            [screen]
            width_chars = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.screen.width_chars, 64);
        assert_eq!(config.screen.height_chars, 24);
    }
}
