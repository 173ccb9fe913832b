use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};
use thiserror::Error;

/// Largest accepted table index width, i.e. at most 2^24 entries per table
pub const MAX_TABLE_BITS: u32 = 24;

pub const DEFAULT_GSHARE_GHISTORY_BITS: u32 = 13;
pub const DEFAULT_TOURNAMENT_GHISTORY_BITS: u32 = 9;
pub const DEFAULT_TOURNAMENT_LHISTORY_BITS: u32 = 10;
pub const DEFAULT_TOURNAMENT_PC_INDEX_BITS: u32 = 10;
pub const DEFAULT_CUSTOM_GHISTORY_BITS: u32 = 13;
pub const DEFAULT_CUSTOM_CHOICE_BITS: u32 = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least 1 bit for the {scheme} predictor")]
    ZeroWidth {
        scheme: &'static str,
        field: &'static str,
    },
    #[error("{field} = {bits} is too wide for the {scheme} predictor (at most {max} bits)")]
    TooWide {
        scheme: &'static str,
        field: &'static str,
        bits: u32,
        max: u32,
    },
    #[error("unknown predictor scheme '{0}', expected static, gshare, tournament or custom")]
    UnknownScheme(String),
    #[error("malformed predictor specification '{spec}': {reason}")]
    Malformed { spec: String, reason: String },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Always predict taken
    Static,
    /// PC xor global history into one pattern table
    Gshare,
    /// Global and local sub-predictors with a chooser
    Tournament,
    /// Two gshare-indexed tables with a PC-indexed choice table
    Custom,
}

impl Scheme {
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Static => "Static",
            Scheme::Gshare => "Gshare",
            Scheme::Tournament => "Tournament",
            Scheme::Custom => "Custom",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Scheme::Static),
            "gshare" => Ok(Scheme::Gshare),
            "tournament" => Ok(Scheme::Tournament),
            "custom" => Ok(Scheme::Custom),
            _ => Err(ConfigError::UnknownScheme(s.to_string())),
        }
    }
}

/// Table widths for a predictor. Only the fields used by `scheme` matter.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[serde(try_from = "PredictorConfigFile")]
pub struct PredictorConfig {
    pub scheme: Scheme,
    /// Global history length, also the gshare/chooser index width
    pub ghistory_bits: u32,
    /// Per-branch history length of the tournament local predictor
    pub lhistory_bits: u32,
    /// Index width of the tournament local history table
    pub pc_index_bits: u32,
    /// Index width of the custom choice table
    pub choice_bits: u32,
}

impl PredictorConfig {
    pub fn static_taken() -> Self {
        Self {
            scheme: Scheme::Static,
            ghistory_bits: 0,
            lhistory_bits: 0,
            pc_index_bits: 0,
            choice_bits: 0,
        }
    }

    pub fn gshare(ghistory_bits: u32) -> Self {
        Self {
            scheme: Scheme::Gshare,
            ghistory_bits,
            ..Self::static_taken()
        }
    }

    pub fn tournament(ghistory_bits: u32, lhistory_bits: u32, pc_index_bits: u32) -> Self {
        Self {
            scheme: Scheme::Tournament,
            ghistory_bits,
            lhistory_bits,
            pc_index_bits,
            choice_bits: 0,
        }
    }

    pub fn custom(ghistory_bits: u32, choice_bits: u32) -> Self {
        Self {
            scheme: Scheme::Custom,
            ghistory_bits,
            choice_bits,
            ..Self::static_taken()
        }
    }

    /// Coursework default widths for `scheme`
    pub fn with_defaults(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Static => Self::static_taken(),
            Scheme::Gshare => Self::gshare(DEFAULT_GSHARE_GHISTORY_BITS),
            Scheme::Tournament => Self::tournament(
                DEFAULT_TOURNAMENT_GHISTORY_BITS,
                DEFAULT_TOURNAMENT_LHISTORY_BITS,
                DEFAULT_TOURNAMENT_PC_INDEX_BITS,
            ),
            Scheme::Custom => {
                Self::custom(DEFAULT_CUSTOM_GHISTORY_BITS, DEFAULT_CUSTOM_CHOICE_BITS)
            }
        }
    }

    /// Load a config from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<PredictorConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read predictor config {}", path.display()))?;
        let config: PredictorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse predictor config {}", path.display()))?;
        Ok(config)
    }

    /// Widths the selected scheme allocates tables for
    fn used_widths(&self) -> Vec<(&'static str, u32)> {
        match self.scheme {
            Scheme::Static => vec![],
            Scheme::Gshare => vec![("ghistory_bits", self.ghistory_bits)],
            Scheme::Tournament => vec![
                ("ghistory_bits", self.ghistory_bits),
                ("lhistory_bits", self.lhistory_bits),
                ("pc_index_bits", self.pc_index_bits),
            ],
            Scheme::Custom => vec![
                ("ghistory_bits", self.ghistory_bits),
                ("choice_bits", self.choice_bits),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.scheme.name();
        for (field, bits) in self.used_widths() {
            if bits == 0 {
                return Err(ConfigError::ZeroWidth { scheme, field });
            }
            if bits > MAX_TABLE_BITS {
                return Err(ConfigError::TooWide {
                    scheme,
                    field,
                    bits,
                    max: MAX_TABLE_BITS,
                });
            }
        }
        Ok(())
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self::with_defaults(Scheme::Gshare)
    }
}

impl fmt::Display for PredictorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Static => write!(f, "static"),
            Scheme::Gshare => write!(f, "gshare:{}", self.ghistory_bits),
            Scheme::Tournament => write!(
                f,
                "tournament:{}:{}:{}",
                self.ghistory_bits, self.lhistory_bits, self.pc_index_bits
            ),
            Scheme::Custom => write!(f, "custom:{}:{}", self.ghistory_bits, self.choice_bits),
        }
    }
}

/// Parses the command line form: `static`, `gshare:<ghist>`,
/// `tournament:<ghist>:<lhist>:<pcindex>` or `custom:<ghist>:<choice>`.
/// A bare scheme name uses the default widths.
impl FromStr for PredictorConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim().trim_start_matches("--");
        let mut parts = spec.split(':');
        let scheme: Scheme = parts.next().unwrap_or_default().parse()?;

        let widths = parts
            .map(|part| {
                part.parse::<u32>().map_err(|err| ConfigError::Malformed {
                    spec: s.to_string(),
                    reason: format!("'{part}' is not a bit width: {err}"),
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let config = match (scheme, widths.as_slice()) {
            (scheme, []) => Self::with_defaults(scheme),
            (Scheme::Gshare, [ghist]) => Self::gshare(*ghist),
            (Scheme::Tournament, [ghist, lhist, pc_index]) => {
                Self::tournament(*ghist, *lhist, *pc_index)
            }
            (Scheme::Custom, [ghist, choice]) => Self::custom(*ghist, *choice),
            (scheme, widths) => {
                let expected = match scheme {
                    Scheme::Static => 0,
                    Scheme::Gshare => 1,
                    Scheme::Tournament => 3,
                    Scheme::Custom => 2,
                };
                return Err(ConfigError::Malformed {
                    spec: s.to_string(),
                    reason: format!(
                        "{} takes {expected} bit widths, got {}",
                        scheme.name(),
                        widths.len()
                    ),
                });
            }
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk form, missing widths fall back to the scheme's defaults
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PredictorConfigFile {
    scheme: Scheme,
    ghistory_bits: Option<u32>,
    lhistory_bits: Option<u32>,
    pc_index_bits: Option<u32>,
    choice_bits: Option<u32>,
}

impl TryFrom<PredictorConfigFile> for PredictorConfig {
    type Error = ConfigError;

    fn try_from(file: PredictorConfigFile) -> Result<Self, Self::Error> {
        let defaults = PredictorConfig::with_defaults(file.scheme);
        let config = PredictorConfig {
            scheme: file.scheme,
            ghistory_bits: file.ghistory_bits.unwrap_or(defaults.ghistory_bits),
            lhistory_bits: file.lhistory_bits.unwrap_or(defaults.lhistory_bits),
            pc_index_bits: file.pc_index_bits.unwrap_or(defaults.pc_index_bits),
            choice_bits: file.choice_bits.unwrap_or(defaults.choice_bits),
        };
        config.validate()?;
        Ok(config)
    }
}
