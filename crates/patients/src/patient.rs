use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use dentalcare_auth::PrincipalId;
use dentalcare_core::{DomainError, Entity, Record, record_id};

record_id!(PatientId, "PatientId");

/// Row of the `patients` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    /// Staff member who registered the patient.
    #[serde(default)]
    pub created_by: Option<PrincipalId>,
    /// Set by the remote service on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Patient {
    type Id = PatientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Patient {
    const TABLE: &'static str = "patients";
}

/// Form input for creating or editing a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl PatientDraft {
    fn normalized(self, today: NaiveDate) -> Result<Self, DomainError> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }
        let email = non_blank(self.email).map(|e| e.to_lowercase());
        if email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(DomainError::validation("invalid email format"));
        }
        if self.date_of_birth.is_some_and(|dob| dob > today) {
            return Err(DomainError::validation("date of birth cannot be in the future"));
        }
        Ok(Self {
            full_name,
            email,
            phone: non_blank(self.phone),
            date_of_birth: self.date_of_birth,
            address: non_blank(self.address),
            medical_history: non_blank(self.medical_history),
            allergies: non_blank(self.allergies),
        })
    }
}

impl Patient {
    /// Build a new patient row from validated form input.
    pub fn create(draft: PatientDraft, created_by: PrincipalId, today: NaiveDate) -> Result<Self, DomainError> {
        let d = draft.normalized(today)?;
        Ok(Self {
            id: PatientId::new(),
            full_name: d.full_name,
            email: d.email,
            phone: d.phone,
            date_of_birth: d.date_of_birth,
            address: d.address,
            medical_history: d.medical_history,
            allergies: d.allergies,
            created_by: Some(created_by),
            created_at: None,
        })
    }

    /// Apply edited form input, keeping identity and provenance.
    pub fn revise(&self, draft: PatientDraft, today: NaiveDate) -> Result<Self, DomainError> {
        let d = draft.normalized(today)?;
        Ok(Self {
            full_name: d.full_name,
            email: d.email,
            phone: d.phone,
            date_of_birth: d.date_of_birth,
            address: d.address,
            medical_history: d.medical_history,
            allergies: d.allergies,
            ..self.clone()
        })
    }

    /// Case-insensitive match on name, email or phone.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.full_name.to_lowercase().contains(&term)
            || self.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&term))
            || self.phone.as_deref().is_some_and(|p| p.contains(&term))
    }

    /// Age in whole years at `on`, if the date of birth is known.
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| on.years_since(dob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn draft(name: &str) -> PatientDraft {
        PatientDraft {
            full_name: name.to_string(),
            email: Some(" Sara.Idrissi@Mail.TEST ".into()),
            phone: Some("0612345678".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 16),
            address: Some("   ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_normalizes_and_records_creator() {
        let creator = PrincipalId::new();
        let p = Patient::create(draft("  Sara Idrissi "), creator, today()).unwrap();
        assert_eq!(p.full_name, "Sara Idrissi");
        assert_eq!(p.email.as_deref(), Some("sara.idrissi@mail.test"));
        assert_eq!(p.address, None);
        assert_eq!(p.created_by, Some(creator));
        assert_eq!(p.age_on(today()), Some(33));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Patient::create(draft("   "), PrincipalId::new(), today()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let mut d = draft("Baby");
        d.date_of_birth = NaiveDate::from_ymd_opt(2030, 1, 1);
        assert!(Patient::create(d, PrincipalId::new(), today()).is_err());
    }

    #[test]
    fn revise_keeps_identity() {
        let p = Patient::create(draft("Sara"), PrincipalId::new(), today()).unwrap();
        let revised = p.revise(draft("Sara I."), today()).unwrap();
        assert_eq!(revised.id, p.id);
        assert_eq!(revised.created_by, p.created_by);
        assert_eq!(revised.full_name, "Sara I.");
    }

    #[test]
    fn search_covers_name_email_and_phone() {
        let p = Patient::create(draft("Sara Idrissi"), PrincipalId::new(), today()).unwrap();
        assert!(p.matches("idris"));
        assert!(p.matches("MAIL.test"));
        assert!(p.matches("06123"));
        assert!(p.matches(""));
        assert!(!p.matches("benali"));
    }

    #[test]
    fn row_without_created_at_omits_it() {
        let p = Patient::create(draft("Sara"), PrincipalId::new(), today()).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("created_at").is_none());
        assert_eq!(json["full_name"], "Sara");
    }
}
