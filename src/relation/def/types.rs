//! Relation type definitions.
//!
//! This module provides the `RelationType` enum which represents the type
//! of relationship between models.

/// Type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relationship, foreign key on the target table
    HasOne,
    /// One-to-many relationship, foreign key on the target table
    HasMany,
    /// Many-to-one relationship (`belongs_to`), foreign key on this table
    BelongsTo,
    /// Many-to-many relationship through a join table
    HasManyThrough,
}

impl RelationType {
    /// Whether the relation resolves to a single record
    pub fn is_one_to_one(self) -> bool {
        matches!(self, RelationType::HasOne | RelationType::BelongsTo)
    }

    pub fn name(self) -> &'static str {
        match self {
            RelationType::HasOne => "has_one",
            RelationType::HasMany => "has_many",
            RelationType::BelongsTo => "belongs_to",
            RelationType::HasManyThrough => "has_many_through",
        }
    }
}
