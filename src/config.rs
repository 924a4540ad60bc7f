use std::time::Duration;

use crate::{
    errors::{Error, Result},
    vars::{CLEANUP_EXPORT_TIMEOUT, CLEANUP_EXPORT_TTL, CLEANUP_EXPORT_WORKERS},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_TTL: Duration = Duration::from_secs(336 * 60 * 60);
const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // 单次清理允许的最长执行时间
    pub timeout: Duration,
    // 导出批次的保留时长
    pub ttl: Duration,
    // 并发处理的批次数量上限
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: DEFAULT_TIMEOUT,
            ttl: DEFAULT_TTL,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::parse(*CLEANUP_EXPORT_TIMEOUT, *CLEANUP_EXPORT_TTL, *CLEANUP_EXPORT_WORKERS)
    }

    fn parse(timeout: &str, ttl: &str, workers: &str) -> Result<Self> {
        let timeout = parse_duration("CLEANUP_EXPORT_TIMEOUT", timeout)?;
        let ttl = parse_duration("CLEANUP_EXPORT_TTL", ttl)?;
        let workers = workers.trim().parse::<usize>().map_err(|e| {
            Error::InvalidConfig(format!("CLEANUP_EXPORT_WORKERS={workers:?}: {e}"))
        })?;

        let config = Config {
            timeout,
            ttl,
            workers,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "the export cleanup timeout must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "at least one cleanup worker is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| Error::InvalidConfig(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.ttl, Duration::from_secs(14 * 24 * 3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse() {
        let config = Config::parse("10s", "2h 30m", "8").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.ttl, Duration::from_secs(9000));
        assert_eq!(config.workers, 8);

        // TTL 可以为 0
        assert!(Config::parse("1m", "0s", "1").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Config::parse("0s", "336h", "4"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("5m", "two weeks", "4"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("5m", "336h", "0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("5m", "336h", "-1"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
