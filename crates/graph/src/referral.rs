use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use referral_core::{AggregateRoot, DomainError, DomainResult, EdgeId, Entity, UserId};

use crate::user::User;

/// One accepted referral: `from` referred `to` at `created_at`.
///
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEdge {
    id: EdgeId,
    from: User,
    to: User,
    created_at: DateTime<Utc>,
}

impl ReferralEdge {
    pub fn new(id: EdgeId, from: User, to: User, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            from,
            to,
            created_at,
        }
    }

    pub fn from(&self) -> &User {
        &self.from
    }

    pub fn to(&self) -> &User {
        &self.to
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this edge connects the same `(from, to)` identifier pair.
    pub fn connects(&self, from: UserId, to: UserId) -> bool {
        self.from.id_typed() == from && self.to.id_typed() == to
    }
}

impl Entity for ReferralEdge {
    type Id = EdgeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Outcome of offering a new edge to a [`Referral`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    /// The edge was appended and the aggregate version advanced.
    Appended(EdgeId),
    /// The owner already referred this recipient; nothing changed.
    AlreadyPresent(EdgeId),
}

impl EdgeDecision {
    pub fn is_appended(&self) -> bool {
        matches!(self, EdgeDecision::Appended(_))
    }
}

/// Aggregate root: the referrals authored by one owner.
///
/// Invariants:
/// - every edge originates from the owner
/// - no two edges share the same `(from, to)` identifier pair
/// - `version` equals the number of appended edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    owner: UserId,
    edges: Vec<ReferralEdge>,
    version: u64,
}

impl Referral {
    /// Create an empty aggregate for an owner who just joined the program.
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            edges: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild an aggregate from persisted parts, re-checking its invariants.
    ///
    /// Intended for persistence adapters that load aggregates from a durable medium.
    pub fn restore(owner: UserId, edges: Vec<ReferralEdge>, version: u64) -> DomainResult<Self> {
        for (idx, edge) in edges.iter().enumerate() {
            if edge.from.id_typed() != owner {
                return Err(DomainError::invariant(format!(
                    "edge {idx} originates from {}, not owner {owner}",
                    edge.from.id_typed()
                )));
            }
            let recipient = edge.to.id_typed();
            if edges[..idx].iter().any(|e| e.connects(owner, recipient)) {
                return Err(DomainError::invariant(format!(
                    "duplicate edge {owner} -> {recipient}"
                )));
            }
        }
        if edges.len() as u64 != version {
            return Err(DomainError::invariant(format!(
                "version {version} does not match edge count {}",
                edges.len()
            )));
        }

        Ok(Self {
            owner,
            edges,
            version,
        })
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[ReferralEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_to(&self, recipient: UserId) -> Option<&ReferralEdge> {
        self.edges.iter().find(|e| e.connects(self.owner, recipient))
    }

    pub fn has_edge_to(&self, recipient: UserId) -> bool {
        self.edge_to(recipient).is_some()
    }

    /// Record that `from` referred `to`.
    ///
    /// A repeated `(from, to)` pair is a no-op reported as
    /// [`EdgeDecision::AlreadyPresent`]; a `from` other than the owner is rejected.
    pub fn record_edge(
        &mut self,
        edge_id: EdgeId,
        from: User,
        to: User,
        at: DateTime<Utc>,
    ) -> DomainResult<EdgeDecision> {
        if from.id_typed() != self.owner {
            return Err(DomainError::invariant(format!(
                "referral owned by {} cannot hold an edge from {}",
                self.owner,
                from.id_typed()
            )));
        }

        if let Some(existing) = self.edge_to(to.id_typed()) {
            return Ok(EdgeDecision::AlreadyPresent(*existing.id()));
        }

        self.edges.push(ReferralEdge::new(edge_id, from, to, at));
        self.version += 1;
        Ok(EdgeDecision::Appended(edge_id))
    }
}

impl AggregateRoot for Referral {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.owner
    }

    fn version(&self) -> u64 {
        self.version
    }
}
