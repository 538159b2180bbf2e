//! Per-patient screening history
//!
//! An append-only, time-ordered sequence of screenings owned by one patient.
//! Storage belongs to the caller; this type only enforces ordering, ownership
//! and tier consistency, and round-trips through JSON for hand-off.

use crate::error::EngineError;
use crate::types::Screening;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHistory {
    patient_id: String,
    screenings: Vec<Screening>,
}

impl PatientHistory {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            screenings: Vec::new(),
        }
    }

    /// Build from existing records, checking every invariant
    pub fn from_screenings(
        patient_id: impl Into<String>,
        screenings: Vec<Screening>,
    ) -> Result<Self, EngineError> {
        let mut history = Self::new(patient_id);
        for screening in screenings {
            history.append(screening)?;
        }
        Ok(history)
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Append a screening; it must belong to this patient and not predate the latest
    pub fn append(&mut self, screening: Screening) -> Result<(), EngineError> {
        if screening.patient_id != self.patient_id {
            return Err(EngineError::PatientMismatch {
                expected: self.patient_id.clone(),
                actual: screening.patient_id,
            });
        }

        if !screening.is_consistent() {
            return Err(EngineError::ParseError(format!(
                "screening {} has risk level {} for score {}",
                screening.id,
                screening.risk_level.as_str(),
                screening.overall_score
            )));
        }

        if let Some(last) = self.screenings.last() {
            if screening.timestamp < last.timestamp {
                return Err(EngineError::OutOfOrder {
                    last: last.timestamp.to_rfc3339(),
                    incoming: screening.timestamp.to_rfc3339(),
                });
            }
        }

        self.screenings.push(screening);
        Ok(())
    }

    pub fn latest(&self) -> Option<&Screening> {
        self.screenings.last()
    }

    /// Oldest-first view of every screening
    pub fn as_slice(&self) -> &[Screening] {
        &self.screenings
    }

    /// The most recent `n` screenings, oldest-first
    pub fn tail(&self, n: usize) -> &[Screening] {
        let start = self.screenings.len().saturating_sub(n);
        &self.screenings[start..]
    }

    pub fn len(&self) -> usize {
        self.screenings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screenings.is_empty()
    }

    /// Load a history from JSON, re-validating every record
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let raw: PatientHistory = serde_json::from_str(json)?;
        Self::from_screenings(raw.patient_id, raw.screenings)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}
