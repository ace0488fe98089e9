use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

use crate::constants::{MAX_CHARS_EXPERIENCE, MAX_CHARS_NAME, MAX_CHARS_SKILLS};

/// Roles a candidate can interview for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum Position {
    #[default]
    #[serde(rename = "Junior Salesforce Developer")]
    #[strum(to_string = "Junior Salesforce Developer")]
    JuniorDeveloper,
    #[serde(rename = "Middle Salesforce Developer")]
    #[strum(to_string = "Middle Salesforce Developer")]
    MiddleDeveloper,
    #[serde(rename = "Senior Salesforce Developer")]
    #[strum(to_string = "Senior Salesforce Developer")]
    SeniorDeveloper,
    #[serde(rename = "Salesforce Lead Developer")]
    #[strum(to_string = "Salesforce Lead Developer")]
    LeadDeveloper,
    #[serde(rename = "Salesforce Architect")]
    #[strum(to_string = "Salesforce Architect")]
    Architect,
    #[serde(rename = "Salesforce Business Analyst")]
    #[strum(to_string = "Salesforce Business Analyst")]
    BusinessAnalyst,
    #[serde(rename = "Salesforce Admin")]
    #[strum(to_string = "Salesforce Admin")]
    Admin,
    #[serde(rename = "Salesforce QA Engineer")]
    #[strum(to_string = "Salesforce QA Engineer")]
    QaEngineer,
    #[serde(rename = "Salesforce Consultant")]
    #[strum(to_string = "Salesforce Consultant")]
    Consultant,
}

impl Position {
    /// All positions in menu order.
    pub fn all() -> Vec<Position> {
        Position::iter().collect()
    }
}

/// Organisations a candidate can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum Company {
    #[default]
    #[serde(rename = "Salesforce")]
    #[strum(to_string = "Salesforce")]
    Salesforce,
    #[serde(rename = "Deloitte Digital")]
    #[strum(to_string = "Deloitte Digital")]
    DeloitteDigital,
    #[serde(rename = "Accenture")]
    #[strum(to_string = "Accenture")]
    Accenture,
    #[serde(rename = "PwC")]
    #[strum(to_string = "PwC")]
    PwC,
    #[serde(rename = "Capgemini")]
    #[strum(to_string = "Capgemini")]
    Capgemini,
    #[serde(rename = "IBM")]
    #[strum(to_string = "IBM")]
    Ibm,
    #[serde(rename = "Slalom")]
    #[strum(to_string = "Slalom")]
    Slalom,
    #[serde(rename = "CloudKettle")]
    #[strum(to_string = "CloudKettle")]
    CloudKettle,
    #[serde(rename = "Simplus")]
    #[strum(to_string = "Simplus")]
    Simplus,
}

impl Company {
    /// All companies in menu order.
    pub fn all() -> Vec<Company> {
        Company::iter().collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Candidate data collected by the setup form.
///
/// Text fields may be empty; they are only bounded in length.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    experience: String,
    skills: String,
    position: Position,
    company: Company,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        experience: impl Into<String>,
        skills: impl Into<String>,
        position: Position,
        company: Company,
    ) -> Result<Self, ProfileError> {
        let profile = Self {
            name: name.into(),
            experience: experience.into(),
            skills: skills.into(),
            position,
            company,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks the length caps. Deserialized profiles bypass `new`, so callers
    /// accepting external input run this explicitly.
    pub fn validate(&self) -> Result<(), ProfileError> {
        check_len("name", &self.name, MAX_CHARS_NAME)?;
        check_len("experience", &self.experience, MAX_CHARS_EXPERIENCE)?;
        check_len("skills", &self.skills, MAX_CHARS_SKILLS)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn experience(&self) -> &str {
        &self.experience
    }

    pub fn skills(&self) -> &str {
        &self.skills
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn company(&self) -> Company {
        self.company
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ProfileError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ProfileError::TooLong { field, max, actual });
    }
    Ok(())
}

/// Accumulates form fields one at a time. Unset fields fall back to empty
/// text or the default position/company.
#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    name: String,
    experience: String,
    skills: String,
    position: Position,
    company: Company,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn experience(mut self, experience: impl Into<String>) -> Self {
        self.experience = experience.into();
        self
    }

    pub fn skills(mut self, skills: impl Into<String>) -> Self {
        self.skills = skills.into();
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn company(mut self, company: Company) -> Self {
        self.company = company;
        self
    }

    pub fn build(self) -> Result<Profile, ProfileError> {
        Profile::new(self.name, self.experience, self.skills, self.position, self.company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_position_labels_round_trip_through_from_str() {
        for position in Position::all() {
            let label = position.to_string();
            assert_eq!(Position::from_str(&label).unwrap(), position);
        }
        assert_eq!(Position::all().len(), 9);
        assert_eq!(Position::default().to_string(), "Junior Salesforce Developer");
    }

    #[test]
    fn test_company_list_order_and_default() {
        let labels: Vec<String> = Company::all().iter().map(|c| c.to_string()).collect();
        assert_eq!(labels.first().map(String::as_str), Some("Salesforce"));
        assert_eq!(labels.last().map(String::as_str), Some("Simplus"));
        assert!(labels.contains(&"Deloitte Digital".to_string()));
        assert_eq!(Company::default(), Company::Salesforce);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert!(Position::from_str("Rust Developer").is_err());
        assert!(Company::from_str("Initech").is_err());
    }

    #[test]
    fn test_serde_uses_display_labels() {
        let json = serde_json::to_string(&Position::Admin).unwrap();
        assert_eq!(json, "\"Salesforce Admin\"");
        let company: Company = serde_json::from_str("\"Deloitte Digital\"").unwrap();
        assert_eq!(company, Company::DeloitteDigital);
    }

    #[test]
    fn test_empty_fields_are_accepted() {
        let profile = Profile::new("", "", "", Position::Architect, Company::Ibm).unwrap();
        assert_eq!(profile.name(), "");
        assert_eq!(profile.position(), Position::Architect);
    }

    #[test]
    fn test_name_cap_counts_chars_not_bytes() {
        let name = "é".repeat(MAX_CHARS_NAME);
        assert!(Profile::new(name, "", "", Position::default(), Company::default()).is_ok());

        let too_long = "a".repeat(MAX_CHARS_NAME + 1);
        let err = Profile::new(too_long, "", "", Position::default(), Company::default()).unwrap_err();
        assert_eq!(
            err,
            ProfileError::TooLong {
                field: "name",
                max: MAX_CHARS_NAME,
                actual: MAX_CHARS_NAME + 1
            }
        );
    }

    #[test]
    fn test_builder_defaults() {
        let profile = ProfileBuilder::new().name("Ana").build().unwrap();
        assert_eq!(profile.name(), "Ana");
        assert_eq!(profile.skills(), "");
        assert_eq!(profile.position(), Position::JuniorDeveloper);
        assert_eq!(profile.company(), Company::Salesforce);
    }

    #[test]
    fn test_builder_rejects_long_skills() {
        let err = ProfileBuilder::new()
            .skills("x".repeat(MAX_CHARS_SKILLS + 5))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("skills must be at most 200"));
    }
}
