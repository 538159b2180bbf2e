//! Therapy plan prioritization
//!
//! Re-orders the standing therapy tracks from the latest screening's risk
//! markers: low attention promotes social and speech work, high motor variance
//! promotes motor regulation.

use crate::types::Screening;
use serde::{Deserialize, Serialize};

/// Attention below this marks attention as needing work
pub const ATTENTION_NEEDS_WORK_BELOW: f64 = 50.0;

/// Motor variance above this marks motor regulation as needing work
pub const MOTOR_NEEDS_WORK_ABOVE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TherapyConfig {
    pub attention_threshold: f64,
    pub motor_threshold: f64,
}

impl Default for TherapyConfig {
    fn default() -> Self {
        Self {
            attention_threshold: ATTENTION_NEEDS_WORK_BELOW,
            motor_threshold: MOTOR_NEEDS_WORK_ABOVE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapyTrack {
    SpeechLanguage,
    MotorRegulation,
    SocialInteraction,
}

impl TherapyTrack {
    pub fn title(&self) -> &'static str {
        match self {
            TherapyTrack::SpeechLanguage => "Speech & Language",
            TherapyTrack::MotorRegulation => "Motor Skills & Regulation",
            TherapyTrack::SocialInteraction => "Social Interaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapyRecommendation {
    pub track: TherapyTrack,
    pub title: String,
    /// Higher runs first
    pub priority: u8,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapyPlan {
    pub attention_needs_work: bool,
    pub motor_needs_work: bool,
    /// Sorted by priority, highest first
    pub recommendations: Vec<TherapyRecommendation>,
}

/// Rule-based therapy planner
#[derive(Debug, Clone, Default)]
pub struct TherapyPlanner {
    config: TherapyConfig,
}

impl TherapyPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TherapyConfig) -> Self {
        Self { config }
    }

    /// Plan from the most recent screening, if any
    pub fn plan(&self, latest: Option<&Screening>) -> TherapyPlan {
        let attention_needs_work =
            latest.is_some_and(|s| s.attention_metric < self.config.attention_threshold);
        let motor_needs_work = latest.is_some_and(|s| s.motor_metric > self.config.motor_threshold);

        let speech = TherapyRecommendation {
            track: TherapyTrack::SpeechLanguage,
            title: TherapyTrack::SpeechLanguage.title().to_string(),
            priority: if attention_needs_work { 2 } else { 1 },
            suggestion: attention_needs_work.then(|| {
                "Recent screening shows low attention. Open speech sessions with uniform \
                 high-contrast visual aids."
                    .to_string()
            }),
        };

        let motor = TherapyRecommendation {
            track: TherapyTrack::MotorRegulation,
            title: TherapyTrack::MotorRegulation.title().to_string(),
            priority: if motor_needs_work { 3 } else { 1 },
            suggestion: Some(if motor_needs_work {
                "High motor variance detected. Schedule heavy-work sensory activities \
                 before seated tasks to support regulation."
                    .to_string()
            } else {
                "Motor stability is holding. Increase the complexity of fine motor tasks."
                    .to_string()
            }),
        };

        let social = TherapyRecommendation {
            track: TherapyTrack::SocialInteraction,
            title: TherapyTrack::SocialInteraction.title().to_string(),
            priority: if attention_needs_work { 3 } else { 1 },
            suggestion: attention_needs_work.then(|| {
                "Low eye contact detected. Focus on face-to-face engagement games.".to_string()
            }),
        };

        let mut recommendations = vec![speech, motor, social];
        // Stable sort keeps declaration order for equal priorities
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));

        TherapyPlan {
            attention_needs_work,
            motor_needs_work,
            recommendations,
        }
    }
}
