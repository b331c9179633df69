//! Entity-aware cache invalidation
//!
//! Aggregate and list queries embed data from child entities, so a write to
//! one entity has to clear more than its own key. Which pools and keys each
//! entity type reaches is declared once, in [`rules_for`], rather than being
//! inferred from key names at call sites.

use crate::cache::CachePool;
use crate::keys;
use crate::manager::QueryCacheManager;
use crate::pattern::KeyPattern;
use query_core::CacheCategory as C;
use query_core::{CacheCategory, EntityType, MutationKind};
use tracing::{debug, info, warn};

/// What a rule removes inside its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// `prefix:{id}` of the mutated entity and every `prefix:{id}:*` variant
    Entity(&'static str),
    /// The aggregate key and every `aggregate:*` variant
    Aggregate(&'static str),
    /// `prefix:{parent_id}` and its variants, when the context names the parent
    Parent {
        prefix: &'static str,
        parent: EntityType,
    },
    /// Every entry in the pool
    Pool,
}

/// One cascade edge: mutating an entity clears `target` in `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationRule {
    pub category: CacheCategory,
    pub target: RuleTarget,
}

const fn entity(category: CacheCategory, prefix: &'static str) -> InvalidationRule {
    InvalidationRule {
        category,
        target: RuleTarget::Entity(prefix),
    }
}

const fn aggregate(category: CacheCategory, key: &'static str) -> InvalidationRule {
    InvalidationRule {
        category,
        target: RuleTarget::Aggregate(key),
    }
}

const fn parent(
    category: CacheCategory,
    prefix: &'static str,
    parent: EntityType,
) -> InvalidationRule {
    InvalidationRule {
        category,
        target: RuleTarget::Parent { prefix, parent },
    }
}

static USER_RULES: &[InvalidationRule] = &[
    entity(C::Users, keys::USER),
    entity(C::Residences, keys::USER_RESIDENCES),
    entity(C::Documents, keys::USER_DOCUMENTS),
    entity(C::Notifications, keys::USER_NOTIFICATIONS),
    aggregate(C::Users, keys::ALL_USERS),
    aggregate(C::Users, keys::ALL_USERS_WITH_ASSIGNMENTS),
];

static BUILDING_RULES: &[InvalidationRule] = &[
    entity(C::Buildings, keys::BUILDING),
    entity(C::Residences, keys::BUILDING_RESIDENCES),
    entity(C::Documents, keys::BUILDING_DOCUMENTS),
    entity(C::Financial, keys::BUILDING_FINANCIAL),
    entity(C::Statistics, keys::BUILDING_STATS),
    entity(C::Invitations, keys::BUILDING_INVITATIONS),
    aggregate(C::Buildings, keys::ALL_BUILDINGS),
    aggregate(C::Users, keys::ALL_USERS_WITH_ASSIGNMENTS),
    parent(C::Buildings, keys::ORGANIZATION_BUILDINGS, EntityType::Organization),
    parent(C::Statistics, keys::ORGANIZATION_STATS, EntityType::Organization),
];

static RESIDENCE_RULES: &[InvalidationRule] = &[
    entity(C::Residences, keys::RESIDENCE),
    entity(C::Documents, keys::RESIDENCE_DOCUMENTS),
    entity(C::Bills, keys::RESIDENCE_BILLS),
    entity(C::Maintenance, keys::RESIDENCE_MAINTENANCE),
    aggregate(C::Residences, keys::ALL_RESIDENCES),
    aggregate(C::Users, keys::ALL_USERS_WITH_ASSIGNMENTS),
    parent(C::Residences, keys::BUILDING_RESIDENCES, EntityType::Building),
    parent(C::Statistics, keys::BUILDING_STATS, EntityType::Building),
    parent(C::Residences, keys::USER_RESIDENCES, EntityType::User),
];

static ORGANIZATION_RULES: &[InvalidationRule] = &[
    entity(C::Organizations, keys::ORGANIZATION),
    entity(C::Buildings, keys::ORGANIZATION_BUILDINGS),
    entity(C::Statistics, keys::ORGANIZATION_STATS),
    entity(C::Invitations, keys::ORGANIZATION_INVITATIONS),
    aggregate(C::Organizations, keys::ALL_ORGANIZATIONS),
    aggregate(C::Users, keys::ALL_USERS_WITH_ASSIGNMENTS),
];

static DOCUMENT_RULES: &[InvalidationRule] = &[
    entity(C::Documents, keys::DOCUMENT),
    aggregate(C::Documents, keys::ALL_DOCUMENTS),
    parent(C::Documents, keys::RESIDENCE_DOCUMENTS, EntityType::Residence),
    parent(C::Documents, keys::BUILDING_DOCUMENTS, EntityType::Building),
    parent(C::Documents, keys::USER_DOCUMENTS, EntityType::User),
];

static BILL_RULES: &[InvalidationRule] = &[
    entity(C::Bills, keys::BILL),
    aggregate(C::Bills, keys::ALL_BILLS),
    parent(C::Bills, keys::RESIDENCE_BILLS, EntityType::Residence),
    parent(C::Financial, keys::BUILDING_FINANCIAL, EntityType::Building),
];

static INVITATION_RULES: &[InvalidationRule] = &[
    entity(C::Invitations, keys::INVITATION),
    aggregate(C::Invitations, keys::ALL_INVITATIONS),
    parent(C::Invitations, keys::ORGANIZATION_INVITATIONS, EntityType::Organization),
    parent(C::Invitations, keys::BUILDING_INVITATIONS, EntityType::Building),
];

/// Applied on top of the entity's rules when it is deleted
static DELETE_RULES: &[InvalidationRule] = &[InvalidationRule {
    category: C::Search,
    target: RuleTarget::Pool,
}];

/// Cascade table for one entity type
pub fn rules_for(entity: EntityType) -> &'static [InvalidationRule] {
    match entity {
        EntityType::User => USER_RULES,
        EntityType::Building => BUILDING_RULES,
        EntityType::Residence => RESIDENCE_RULES,
        EntityType::Organization => ORGANIZATION_RULES,
        EntityType::Document => DOCUMENT_RULES,
        EntityType::Bill => BILL_RULES,
        EntityType::Invitation => INVITATION_RULES,
    }
}

/// Extra rules for a kind of write
pub fn mutation_rules(mutation: MutationKind) -> &'static [InvalidationRule] {
    match mutation {
        MutationKind::Delete => DELETE_RULES,
        MutationKind::Create | MutationKind::Update => &[],
    }
}

/// Details of the write that triggered an invalidation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationContext {
    pub mutation: MutationKind,
    pub user_id: Option<String>,
    pub building_id: Option<String>,
    pub residence_id: Option<String>,
    pub organization_id: Option<String>,
}

impl InvalidationContext {
    pub fn new(mutation: MutationKind) -> Self {
        Self {
            mutation,
            ..Default::default()
        }
    }

    pub fn created() -> Self {
        Self::new(MutationKind::Create)
    }

    pub fn updated() -> Self {
        Self::new(MutationKind::Update)
    }

    pub fn deleted() -> Self {
        Self::new(MutationKind::Delete)
    }

    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_building(mut self, id: impl Into<String>) -> Self {
        self.building_id = Some(id.into());
        self
    }

    pub fn with_residence(mut self, id: impl Into<String>) -> Self {
        self.residence_id = Some(id.into());
        self
    }

    pub fn with_organization(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    /// Id of the related entity of the given type, if known
    pub fn parent_id(&self, entity: EntityType) -> Option<&str> {
        match entity {
            EntityType::User => self.user_id.as_deref(),
            EntityType::Building => self.building_id.as_deref(),
            EntityType::Residence => self.residence_id.as_deref(),
            EntityType::Organization => self.organization_id.as_deref(),
            EntityType::Document | EntityType::Bill | EntityType::Invitation => None,
        }
    }
}

/// A write that should invalidate cached data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub entity: EntityType,
    pub entity_id: String,
    pub context: InvalidationContext,
}

impl InvalidationEvent {
    pub fn new(
        entity: EntityType,
        entity_id: impl Into<String>,
        context: InvalidationContext,
    ) -> Self {
        Self {
            entity,
            entity_id: entity_id.into(),
            context,
        }
    }

    /// Create an entity creation event
    pub fn created(entity: EntityType, entity_id: impl Into<String>) -> Self {
        Self::new(entity, entity_id, InvalidationContext::created())
    }

    /// Create an entity modification event
    pub fn updated(entity: EntityType, entity_id: impl Into<String>) -> Self {
        Self::new(entity, entity_id, InvalidationContext::updated())
    }

    /// Create an entity deletion event
    pub fn deleted(entity: EntityType, entity_id: impl Into<String>) -> Self {
        Self::new(entity, entity_id, InvalidationContext::deleted())
    }

    /// Attach related entity ids
    pub fn with_context(mut self, context: InvalidationContext) -> Self {
        let mutation = self.context.mutation;
        self.context = InvalidationContext { mutation, ..context };
        self
    }
}

/// Trait for components that react to data changes by dropping cached data
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate everything cached about one entity
    fn invalidate_entity(
        &self,
        entity: EntityType,
        entity_id: &str,
        context: &InvalidationContext,
    ) -> usize;

    /// Invalidate all cache entries
    fn invalidate_all(&self);

    /// Check if the invalidator is enabled
    fn is_enabled(&self) -> bool;

    /// Apply an invalidation event
    fn apply(&self, event: &InvalidationEvent) -> usize {
        self.invalidate_entity(event.entity, &event.entity_id, &event.context)
    }
}

/// Concrete removal derived from a rule
#[derive(Debug, Clone, PartialEq, Eq)]
enum Removal {
    Key(String),
    /// Every `key:...` variant, with `key` matched literally
    Below(String),
    Pool,
}

impl InvalidationRule {
    fn removals(&self, entity_id: &str, context: &InvalidationContext) -> Vec<Removal> {
        let scoped = |key: String| vec![Removal::Key(key.clone()), Removal::Below(key)];

        match self.target {
            RuleTarget::Entity(prefix) => scoped(keys::scoped(prefix, entity_id)),
            RuleTarget::Aggregate(key) => scoped(key.to_string()),
            RuleTarget::Parent { prefix, parent } => context
                .parent_id(parent)
                .map(|id| scoped(keys::scoped(prefix, id)))
                .unwrap_or_default(),
            RuleTarget::Pool => vec![Removal::Pool],
        }
    }
}

fn apply_removal(pool: &CachePool, removal: &Removal) -> usize {
    match removal {
        Removal::Key(key) => usize::from(pool.remove(key)),
        Removal::Below(key) => match KeyPattern::below(key) {
            Ok(compiled) => pool.remove_matching(&compiled),
            Err(e) => {
                warn!("{}; clearing cache pool '{}' instead", e, pool.category());
                pool.clear()
            }
        },
        Removal::Pool => pool.clear(),
    }
}

impl QueryCacheManager {
    /// Clear every cache entry that can embed data of the given entity.
    ///
    /// Applies the entity's cascade table, plus the mutation-specific rules
    /// (deletes also clear cached search results). Rules targeting pools that
    /// are not configured are skipped. Returns the number of removed entries.
    pub fn invalidate_entity_caches(
        &self,
        entity: EntityType,
        entity_id: &str,
        context: &InvalidationContext,
    ) -> usize {
        let rules = rules_for(entity)
            .iter()
            .chain(mutation_rules(context.mutation));

        let mut removed = 0;
        for rule in rules {
            let Some(pool) = self.pool(rule.category) else {
                debug!(
                    "Skipping invalidation of unconfigured pool '{}' for {} {}",
                    rule.category, entity, entity_id
                );
                continue;
            };

            for removal in rule.removals(entity_id, context) {
                removed += apply_removal(&pool, &removal);
            }
        }

        info!(
            "Invalidated {} cache entries after {:?} of {} {}",
            removed, context.mutation, entity, entity_id
        );
        removed
    }
}

impl CacheInvalidator for QueryCacheManager {
    fn invalidate_entity(
        &self,
        entity: EntityType,
        entity_id: &str,
        context: &InvalidationContext,
    ) -> usize {
        self.invalidate_entity_caches(entity, entity_id, context)
    }

    fn invalidate_all(&self) {
        for category in self.categories() {
            self.invalidate(category, None);
        }
    }

    fn is_enabled(&self) -> bool {
        QueryCacheManager::is_enabled(self)
    }
}
