use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use jgrade_core::Config;
use serde::Deserialize;

/// Settings read from `JGRADE_*` environment variables. They override the config file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct EnvOverrides {
    pub timeout_secs: Option<f64>,
    pub preview_width: Option<usize>,
}

impl EnvOverrides {
    pub const PREFIX: &str = "JGRADE_";

    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .context("Invalid JGRADE_* environment variable")
    }

    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(Self::PREFIX)
            .from_iter::<_, Self>(vars)
            .context("Invalid JGRADE_* environment variable")
    }

    pub fn apply(&self, cfg: &mut Config) -> anyhow::Result<()> {
        if let Some(secs) = self.timeout_secs {
            cfg.run.timeout = timeout_from_secs(secs)?;
        }
        if let Some(width) = self.preview_width {
            cfg.report.preview_width = width;
        }
        Ok(())
    }
}

pub fn timeout_from_secs(secs: f64) -> anyhow::Result<Duration> {
    ensure!(
        secs.is_finite() && secs > 0.0,
        "Timeout must be a positive number of seconds: {}",
        secs
    );
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Timeout is out of range: {} seconds", secs))
}

/// Config file (nearest to `dir`), then environment, then the `--timeout` flag.
pub fn load(dir: impl AsRef<Path>, timeout_secs: Option<f64>) -> anyhow::Result<Config> {
    let mut cfg = Config::from_file_finding_in_ancestors_or_default(dir)?;
    EnvOverrides::from_env()?.apply(&mut cfg)?;
    if let Some(secs) = timeout_secs {
        cfg.run.timeout = timeout_from_secs(secs)?;
    }
    log::debug!("{:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod test {
    use super::*;

    fn vars(kv: &[(&str, &str)]) -> Vec<(String, String)> {
        kv.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_overrides() {
        let env = EnvOverrides::from_vars(vars(&[
            ("JGRADE_TIMEOUT_SECS", "1.5"),
            ("JGRADE_PREVIEW_WIDTH", "20"),
            ("HOME", "/home/someone"),
        ]))
        .unwrap();
        assert_eq!(env.timeout_secs, Some(1.5));
        assert_eq!(env.preview_width, Some(20));

        let mut cfg = Config::default();
        env.apply(&mut cfg).unwrap();
        assert_eq!(cfg.run.timeout, Duration::from_millis(1500));
        assert_eq!(cfg.report.preview_width, 20);
    }

    #[test]
    fn empty_env_changes_nothing() {
        let env = EnvOverrides::from_vars(vars(&[])).unwrap();
        assert_eq!(env, EnvOverrides::default());

        let mut cfg = Config::default();
        env.apply(&mut cfg).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn invalid_env_ng() {
        assert!(EnvOverrides::from_vars(vars(&[("JGRADE_PREVIEW_WIDTH", "wide")])).is_err());

        let env = EnvOverrides::from_vars(vars(&[("JGRADE_TIMEOUT_SECS", "0")])).unwrap();
        assert!(env.apply(&mut Config::default()).is_err());

        let env = EnvOverrides::from_vars(vars(&[("JGRADE_TIMEOUT_SECS", "1e30")])).unwrap();
        assert!(env.apply(&mut Config::default()).is_err());
    }

    #[test]
    fn timeout_range() {
        assert_eq!(timeout_from_secs(0.25).unwrap(), Duration::from_millis(250));
        assert!(timeout_from_secs(-1.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
        assert!(timeout_from_secs(f64::INFINITY).is_err());

        let err = timeout_from_secs(1e30).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
    }
}
