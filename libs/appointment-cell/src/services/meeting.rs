// libs/appointment-cell/src/services/meeting.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, MeetingConfiguration, MeetingLinkType, MeetingStrategiesResponse,
};

const GOOGLE_MEET_BASE_URL: &str = "https://meet.google.com";
const MEET_CODE_KEY_LIMIT: usize = 50;
const MEET_CODE_LENGTH: usize = 10;

/// Identity and timing of an appointment, which is all a link derivation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingLinkInput {
    pub appointment_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub appointment_date: DateTime<Utc>,
}

impl From<&Appointment> for MeetingLinkInput {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            appointment_date: appointment.appointment_date,
        }
    }
}

pub trait MeetingLinkGenerator {
    fn generate_meeting_link(&self, input: &MeetingLinkInput) -> String;
    fn validate_meeting_link(&self, link: &str) -> bool;
    fn meeting_link_type(&self) -> MeetingLinkType;
}

/// 32-bit rolling hash over UTF-16 code units: `hash = (hash << 5) - hash + unit`,
/// wrapping on every step.
pub fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32)
    })
}

pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}

fn hash_base36(input: &str) -> String {
    to_base36((rolling_hash(input) as i64).unsigned_abs())
}

// ==============================================================================
// GOOGLE MEET STYLE
// ==============================================================================

#[derive(Debug, Clone)]
pub struct GoogleMeetStrategy {
    link_pattern: Regex,
}

impl GoogleMeetStrategy {
    pub fn new() -> Result<Self, AppointmentError> {
        let link_pattern = Regex::new(r"(?i)^https://meet\.google\.com/[a-z0-9-]+$")
            .map_err(|e| AppointmentError::Configuration(e.to_string()))?;
        Ok(Self { link_pattern })
    }

    /// `xxx-xxxx-xxx` code derived from the appointment identity and timestamp.
    pub fn meet_code(input: &MeetingLinkInput) -> String {
        let key = format!(
            "medflow-{}-{}-{}-{}",
            input.appointment_id,
            input.doctor_id,
            input.patient_id,
            input.appointment_date.timestamp_millis()
        );
        let truncated: Vec<u16> = key.encode_utf16().take(MEET_CODE_KEY_LIMIT).collect();
        let truncated = String::from_utf16_lossy(&truncated);

        let code = format!("{:0>width$}", hash_base36(&truncated), width = MEET_CODE_LENGTH);
        format!("{}-{}-{}", &code[0..3], &code[3..7], &code[7..10])
    }
}

impl MeetingLinkGenerator for GoogleMeetStrategy {
    fn generate_meeting_link(&self, input: &MeetingLinkInput) -> String {
        format!("{}/{}", GOOGLE_MEET_BASE_URL, Self::meet_code(input))
    }

    fn validate_meeting_link(&self, link: &str) -> bool {
        self.link_pattern.is_match(link)
    }

    fn meeting_link_type(&self) -> MeetingLinkType {
        MeetingLinkType::GoogleMeet
    }
}

// ==============================================================================
// CUSTOM URL ROOMS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct CustomUrlStrategy {
    base_url: String,
    link_pattern: Regex,
}

impl CustomUrlStrategy {
    pub fn new(base_url: &str) -> Result<Self, AppointmentError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let link_pattern = Regex::new(&format!(
            r"(?i)^{}/room/[a-z0-9-]+$",
            regex::escape(&base_url)
        ))
        .map_err(|e| AppointmentError::Configuration(e.to_string()))?;

        Ok(Self { base_url, link_pattern })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Room slug keyed by identity and calendar day, so it is stable across time edits within a day.
    pub fn room_id(input: &MeetingLinkInput) -> String {
        let key = format!(
            "{}-{}-{}-{}",
            input.appointment_id,
            input.doctor_id,
            input.patient_id,
            input.appointment_date.format("%Y-%m-%d")
        );
        format!("medflow-{}", hash_base36(&key))
    }
}

impl MeetingLinkGenerator for CustomUrlStrategy {
    fn generate_meeting_link(&self, input: &MeetingLinkInput) -> String {
        format!("{}/room/{}", self.base_url, Self::room_id(input))
    }

    fn validate_meeting_link(&self, link: &str) -> bool {
        self.link_pattern.is_match(link)
    }

    fn meeting_link_type(&self) -> MeetingLinkType {
        MeetingLinkType::CustomUrl
    }
}

// ==============================================================================
// STRATEGY SELECTION
// ==============================================================================

#[derive(Debug, Clone)]
pub enum MeetingLinkStrategy {
    GoogleMeet(GoogleMeetStrategy),
    CustomUrl(CustomUrlStrategy),
}

impl MeetingLinkGenerator for MeetingLinkStrategy {
    fn generate_meeting_link(&self, input: &MeetingLinkInput) -> String {
        match self {
            MeetingLinkStrategy::GoogleMeet(strategy) => strategy.generate_meeting_link(input),
            MeetingLinkStrategy::CustomUrl(strategy) => strategy.generate_meeting_link(input),
        }
    }

    fn validate_meeting_link(&self, link: &str) -> bool {
        match self {
            MeetingLinkStrategy::GoogleMeet(strategy) => strategy.validate_meeting_link(link),
            MeetingLinkStrategy::CustomUrl(strategy) => strategy.validate_meeting_link(link),
        }
    }

    fn meeting_link_type(&self) -> MeetingLinkType {
        match self {
            MeetingLinkStrategy::GoogleMeet(strategy) => strategy.meeting_link_type(),
            MeetingLinkStrategy::CustomUrl(strategy) => strategy.meeting_link_type(),
        }
    }
}

/// Immutable catalog of link strategies, built once at startup.
#[derive(Debug, Clone)]
pub struct MeetingLinkFactory {
    strategies: BTreeMap<MeetingLinkType, MeetingLinkStrategy>,
    configured_type: String,
    default_type: MeetingLinkType,
    custom_base_url: String,
    custom_platform_enabled: bool,
}

impl MeetingLinkFactory {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppointmentError> {
        let google = GoogleMeetStrategy::new()?;
        let custom = CustomUrlStrategy::new(&config.custom_meeting_base_url)?;
        let custom_base_url = custom.base_url().to_string();

        let mut strategies = BTreeMap::new();
        strategies.insert(MeetingLinkType::GoogleMeet, MeetingLinkStrategy::GoogleMeet(google));
        strategies.insert(MeetingLinkType::CustomUrl, MeetingLinkStrategy::CustomUrl(custom));

        let default_type = match config.meeting_link_type.parse::<MeetingLinkType>() {
            Ok(link_type) if strategies.contains_key(&link_type) => link_type,
            Ok(link_type) => {
                warn!("Meeting link type {} has no strategy, falling back to google_meet", link_type);
                MeetingLinkType::GoogleMeet
            }
            Err(e) => {
                warn!("{}, falling back to google_meet", e);
                MeetingLinkType::GoogleMeet
            }
        };

        debug!("Meeting link factory ready with default {}", default_type);

        Ok(Self {
            strategies,
            configured_type: config.meeting_link_type.clone(),
            default_type,
            custom_base_url,
            custom_platform_enabled: config.enable_custom_meeting_platform,
        })
    }

    pub fn get_strategy(&self, link_type: MeetingLinkType) -> Result<&MeetingLinkStrategy, AppointmentError> {
        self.strategies.get(&link_type).ok_or_else(|| {
            AppointmentError::Configuration(format!(
                "No meeting link strategy registered for {}",
                link_type
            ))
        })
    }

    pub fn get_default_strategy(&self) -> &MeetingLinkStrategy {
        match self.strategies.get(&self.default_type) {
            Some(strategy) => strategy,
            None => &self.strategies[&MeetingLinkType::GoogleMeet],
        }
    }

    pub fn get_available_strategies(&self) -> Vec<MeetingLinkType> {
        self.strategies.keys().copied().collect()
    }

    pub fn describe(&self) -> MeetingStrategiesResponse {
        MeetingStrategiesResponse {
            current: self.get_default_strategy().meeting_link_type(),
            available: self.get_available_strategies(),
            configuration: MeetingConfiguration {
                meeting_link_type: self.configured_type.clone(),
                custom_base_url: self.custom_base_url.clone(),
                custom_platform_enabled: self.custom_platform_enabled,
            },
        }
    }
}
