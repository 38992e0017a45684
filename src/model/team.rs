use super::ModelError;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TeamMember {
    pub id: Uuid,
    pub role: String,
}

impl TeamMember {
    pub fn new(id: Uuid, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }
}

/// Upper bound of a role headcount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MaxCount {
    Bounded(u32),
    Unbounded,
}

impl MaxCount {
    pub fn is_exceeded_by(self, count: u32) -> bool {
        match self {
            MaxCount::Bounded(max) => count > max,
            MaxCount::Unbounded => false,
        }
    }

    pub fn bound(self) -> Option<u32> {
        match self {
            MaxCount::Bounded(max) => Some(max),
            MaxCount::Unbounded => None,
        }
    }
}

impl From<Option<u32>> for MaxCount {
    fn from(max: Option<u32>) -> Self {
        max.map_or(MaxCount::Unbounded, MaxCount::Bounded)
    }
}

impl fmt::Display for MaxCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxCount::Bounded(max) => write!(f, "{max}"),
            MaxCount::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoleConstraint {
    pub min: u32,
    pub max: MaxCount,
}

impl RoleConstraint {
    pub fn new(role: &str, min: u32, max: MaxCount) -> Result<Self, ModelError> {
        match max {
            MaxCount::Bounded(bound) if bound < min => Err(ModelError::InvalidConstraint {
                role: role.to_owned(),
                min,
                max: bound,
            }),
            _ => Ok(Self { min, max }),
        }
    }
}

/// Constraint as returned by the backend, where a missing maximum means
/// "no upper bound".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawRoleConstraint {
    pub min_count: u32,
    pub max_count: Option<u32>,
}

/// Per-role headcount policy, ordered by role name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoleConstraints(BTreeMap<String, RoleConstraint>);

impl RoleConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the list of maps sent by the backend into a single policy.
    /// A role appearing in several maps takes its last definition.
    pub fn merge<I>(maps: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = BTreeMap<String, RawRoleConstraint>>,
    {
        let mut constraints = Self::new();
        for map in maps {
            for (role, raw) in map {
                let constraint = RoleConstraint::new(&role, raw.min_count, raw.max_count.into())?;
                constraints.0.insert(role, constraint);
            }
        }
        Ok(constraints)
    }

    pub fn with(mut self, role: &str, min: u32, max: MaxCount) -> Result<Self, ModelError> {
        self.0.insert(role.to_owned(), RoleConstraint::new(role, min, max)?);
        Ok(self)
    }

    pub fn get(&self, role: &str) -> Option<&RoleConstraint> {
        self.0.get(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RoleConstraint> {
        self.0.iter()
    }
}
