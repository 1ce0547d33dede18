//! Server configuration loaded via OrthoConfig.
//!
//! Values layer CLI flags over `POINTMINER_*` environment variables over an
//! optional configuration file. Most fields are optional and their
//! accessors supply the defaults, so an empty environment yields a working
//! in-memory server.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    DEFAULT_MAX_ACCRUAL_ATTEMPTS, DEFAULT_MINING_SPEED, NewUserDefaults, ReferralPolicy,
};

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("mining speed must be positive")]
    ZeroMiningSpeed,
    #[error("max accrual attempts must be positive")]
    ZeroAccrualAttempts,
    #[error("database max connections must be positive")]
    ZeroPoolSize,
}

/// Configuration values for the `pointminer` server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "POINTMINER")]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<SocketAddr>,
    /// PostgreSQL connection URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Upper bound of pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Mining speed assigned to new users, in points per hour.
    pub mining_speed: Option<u32>,
    /// Points credited to a referrer per referral.
    pub referral_bonus_points: Option<u64>,
    /// Permanent referrer speed increase in permille (50 = +5 %).
    pub referral_speed_bonus_permille: Option<u32>,
    /// Compare-and-swap attempts per mining claim.
    pub max_accrual_attempts: Option<u32>,
    /// Seconds between expired-boost sweeps; 0 disables the sweeper.
    #[ortho_config(default = 300)]
    pub sweep_interval_secs: u64,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn new_user_defaults(&self) -> NewUserDefaults {
        NewUserDefaults {
            mining_speed: self.mining_speed.unwrap_or(DEFAULT_MINING_SPEED),
        }
    }

    pub fn referral_policy(&self) -> ReferralPolicy {
        let defaults = ReferralPolicy::default();
        ReferralPolicy {
            bonus_points: self.referral_bonus_points.unwrap_or(defaults.bonus_points),
            speed_bonus_permille: self
                .referral_speed_bonus_permille
                .unwrap_or(defaults.speed_bonus_permille),
        }
    }

    pub fn max_accrual_attempts(&self) -> u32 {
        self.max_accrual_attempts
            .unwrap_or(DEFAULT_MAX_ACCRUAL_ATTEMPTS)
    }

    /// Interval of the expired-boost sweeper, or `None` when disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        match self.sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Reject values the services cannot honour.
    ///
    /// # Errors
    /// Returns the first [`SettingsError`] found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.mining_speed == Some(0) {
            return Err(SettingsError::ZeroMiningSpeed);
        }
        if self.max_accrual_attempts == Some(0) {
            return Err(SettingsError::ZeroAccrualAttempts);
        }
        if self.db_max_connections == Some(0) {
            return Err(SettingsError::ZeroPoolSize);
        }
        Ok(())
    }
}
