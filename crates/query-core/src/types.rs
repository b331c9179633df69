use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical data category backing one cache pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    Users,
    Buildings,
    Residences,
    Documents,
    Bills,
    Maintenance,
    Notifications,
    Organizations,
    Invitations,
    Financial,
    Statistics,
    Search,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 12] = [
        CacheCategory::Users,
        CacheCategory::Buildings,
        CacheCategory::Residences,
        CacheCategory::Documents,
        CacheCategory::Bills,
        CacheCategory::Maintenance,
        CacheCategory::Notifications,
        CacheCategory::Organizations,
        CacheCategory::Invitations,
        CacheCategory::Financial,
        CacheCategory::Statistics,
        CacheCategory::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Users => "users",
            CacheCategory::Buildings => "buildings",
            CacheCategory::Residences => "residences",
            CacheCategory::Documents => "documents",
            CacheCategory::Bills => "bills",
            CacheCategory::Maintenance => "maintenance",
            CacheCategory::Notifications => "notifications",
            CacheCategory::Organizations => "organizations",
            CacheCategory::Invitations => "invitations",
            CacheCategory::Financial => "financial",
            CacheCategory::Statistics => "statistics",
            CacheCategory::Search => "search",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CacheError::UnknownCategory(s.to_string()))
    }
}

/// Domain entity whose mutation can invalidate cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Building,
    Residence,
    Organization,
    Document,
    Bill,
    Invitation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Building => "building",
            EntityType::Residence => "residence",
            EntityType::Organization => "organization",
            EntityType::Document => "document",
            EntityType::Bill => "bill",
            EntityType::Invitation => "invitation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(EntityType::User),
            "building" => Ok(EntityType::Building),
            "residence" => Ok(EntityType::Residence),
            "organization" => Ok(EntityType::Organization),
            "document" => Ok(EntityType::Document),
            "bill" => Ok(EntityType::Bill),
            "invitation" => Ok(EntityType::Invitation),
            _ => Err(CacheError::UnknownEntityType(s.to_string())),
        }
    }
}

/// Kind of write that triggered an invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    #[default]
    Update,
    Delete,
}
