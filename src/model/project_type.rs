use super::ModelError;
use uuid::Uuid;

/// Catalog entry bounding the estimated duration of a project, in months.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectType {
    pub id: Uuid,
    pub name: String,
    pub min_estimated_months: u32,
    pub max_estimated_months: u32,
}

impl ProjectType {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        min_estimated_months: u32,
        max_estimated_months: u32,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if min_estimated_months > max_estimated_months {
            return Err(ModelError::InvalidDuration {
                name,
                min: min_estimated_months,
                max: max_estimated_months,
            });
        }
        Ok(Self {
            id,
            name,
            min_estimated_months,
            max_estimated_months,
        })
    }
}

#[test]
fn test_project_type_duration() {
    assert!(ProjectType::new(Uuid::nil(), "thesis", 6, 9).is_ok());
    assert!(ProjectType::new(Uuid::nil(), "sprint", 3, 3).is_ok());
    assert_eq!(
        ProjectType::new(Uuid::nil(), "broken", 9, 6),
        Err(ModelError::InvalidDuration {
            name: "broken".into(),
            min: 9,
            max: 6
        })
    );
}
