//! List filters for each resource
//!
//! Filters serialize straight into the query string and into the cache key,
//! so absent fields are always skipped: `{classId: None}` and `{}` must be
//! the same filter.

use serde::{Deserialize, Serialize};

use super::{Audience, Role};
use crate::error::{Error, Result};

/// A filter object accepted by a list endpoint
pub trait ListFilters: Serialize + Clone + Send + Sync + 'static {
    /// Reject filters the backend would refuse, before any round-trip
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ListFilters for SubjectFilters {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ListFilters for ClassFilters {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl EnrollmentFilters {
    /// Roster of a single class
    pub fn for_class(class_id: impl Into<String>) -> Self {
        Self {
            class_id: Some(class_id.into()),
            ..Default::default()
        }
    }

    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            ..Default::default()
        }
    }
}

impl ListFilters for EnrollmentFilters {
    fn validate(&self) -> Result<()> {
        if is_blank(&self.class_id) && is_blank(&self.student_id) {
            return Err(Error::validation(
                "Enrollment list requires a classId or studentId filter",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ListFilters for GradeFilters {
    fn validate(&self) -> Result<()> {
        if is_blank(&self.class_id) && is_blank(&self.student_id) {
            return Err(Error::validation(
                "Grade list requires a classId or studentId filter",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ListFilters for RecommendationFilters {
    fn validate(&self) -> Result<()> {
        if is_blank(&self.class_id) && is_blank(&self.student_id) && self.audience.is_none() {
            return Err(Error::validation(
                "Recommendation list requires a classId, studentId or audience filter",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ListFilters for UserFilters {}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_filters_require_class_or_student() {
        assert!(EnrollmentFilters::default().validate().unwrap_err().is_validation());
        assert!(EnrollmentFilters::for_class("c-1").validate().is_ok());
        assert!(EnrollmentFilters::for_student("s-1").validate().is_ok());
    }

    #[test]
    fn test_blank_ids_do_not_count_as_filters() {
        let filters = GradeFilters {
            class_id: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn test_recommendation_filters_accept_audience_alone() {
        let filters = RecommendationFilters {
            audience: Some(Audience::Teacher),
            ..Default::default()
        };
        assert!(filters.validate().is_ok());
        assert!(RecommendationFilters::default().validate().is_err());
    }

    #[test]
    fn test_unfiltered_resources_always_valid() {
        assert!(SubjectFilters::default().validate().is_ok());
        assert!(ClassFilters::default().validate().is_ok());
        assert!(UserFilters::default().validate().is_ok());
    }

    #[test]
    fn test_filters_skip_absent_fields() {
        let filters = GradeFilters {
            class_id: Some("c-9".to_string()),
            page: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json, serde_json::json!({"classId": "c-9", "page": 2}));
    }
}
