use std::env;

use crate::engine::draft::PlanningSettings;
use crate::engine::eta::EtaEstimator;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub average_speed_kmh: f64,
    pub max_stops_per_route: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            average_speed_kmh: parse_or_default("AVERAGE_SPEED_KMH", 30.0)?,
            max_stops_per_route: parse_or_default("MAX_STOPS_PER_ROUTE", 60)?,
        })
    }

    pub fn planning(&self) -> PlanningSettings {
        PlanningSettings {
            eta: EtaEstimator::from_kmh(self.average_speed_kmh),
            default_max_stops: Some(self.max_stops_per_route),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
