//! Cache key templates
//!
//! Readers build their keys here and the invalidation rules reference the
//! same prefixes, so a key shape can't drift away from the rule that clears
//! it. Entity-scoped keys have the shape `prefix:id`; variants of the same
//! query append further `:`-separated segments (`building_residences:7:page:2`).

pub const USER: &str = "user";
pub const BUILDING: &str = "building";
pub const RESIDENCE: &str = "residence";
pub const ORGANIZATION: &str = "organization";
pub const DOCUMENT: &str = "document";
pub const BILL: &str = "bill";
pub const INVITATION: &str = "invitation";

pub const USER_RESIDENCES: &str = "user_residences";
pub const USER_DOCUMENTS: &str = "user_documents";
pub const USER_NOTIFICATIONS: &str = "user_notifications";
pub const BUILDING_RESIDENCES: &str = "building_residences";
pub const BUILDING_DOCUMENTS: &str = "building_documents";
pub const BUILDING_FINANCIAL: &str = "building_financial";
pub const BUILDING_STATS: &str = "building_stats";
pub const BUILDING_INVITATIONS: &str = "building_invitations";
pub const RESIDENCE_DOCUMENTS: &str = "residence_documents";
pub const RESIDENCE_BILLS: &str = "residence_bills";
pub const RESIDENCE_MAINTENANCE: &str = "residence_maintenance";
pub const ORGANIZATION_BUILDINGS: &str = "organization_buildings";
pub const ORGANIZATION_STATS: &str = "organization_stats";
pub const ORGANIZATION_INVITATIONS: &str = "organization_invitations";

pub const ALL_USERS: &str = "all_users";
pub const ALL_USERS_WITH_ASSIGNMENTS: &str = "all_users_with_assignments";
pub const ALL_BUILDINGS: &str = "all_buildings";
pub const ALL_RESIDENCES: &str = "all_residences";
pub const ALL_ORGANIZATIONS: &str = "all_organizations";
pub const ALL_DOCUMENTS: &str = "all_documents";
pub const ALL_BILLS: &str = "all_bills";
pub const ALL_INVITATIONS: &str = "all_invitations";

/// Key for an entity-scoped entry: `prefix:id`
pub fn scoped(prefix: &str, id: &str) -> String {
    format!("{}:{}", prefix, id)
}

/// Key for a variant of an entity-scoped query: `prefix:id:part:part...`
pub fn scoped_with(prefix: &str, id: &str, parts: &[&str]) -> String {
    let mut key = scoped(prefix, id);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

/// Key for a variant of an aggregate query: `aggregate:part:part...`
pub fn aggregate_with(aggregate: &str, parts: &[&str]) -> String {
    let mut key = aggregate.to_string();
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

pub fn user(id: &str) -> String {
    scoped(USER, id)
}

pub fn building(id: &str) -> String {
    scoped(BUILDING, id)
}

pub fn residence(id: &str) -> String {
    scoped(RESIDENCE, id)
}

pub fn organization(id: &str) -> String {
    scoped(ORGANIZATION, id)
}

pub fn user_residences(user_id: &str) -> String {
    scoped(USER_RESIDENCES, user_id)
}

pub fn building_residences(building_id: &str) -> String {
    scoped(BUILDING_RESIDENCES, building_id)
}

pub fn residence_documents(residence_id: &str) -> String {
    scoped(RESIDENCE_DOCUMENTS, residence_id)
}

pub fn organization_buildings(organization_id: &str) -> String {
    scoped(ORGANIZATION_BUILDINGS, organization_id)
}
