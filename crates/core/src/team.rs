//! Team roster: the registry of handlers requests can be routed to.
//!
//! A roster is assembled once through [`TeamRosterBuilder`] and is immutable
//! afterwards. The builder enforces the invariants the rest of the pipeline
//! relies on: non-blank fields, unique ids, at most one default member and
//! no member claiming the reserved [`UNKNOWN_TEAM_MEMBER`] id.

use serde::{Deserialize, Serialize};
use crate::error::CouplerError;

/// Reserved id meaning "no registered team member matches".
pub const UNKNOWN_TEAM_MEMBER: &str = "UNKNOWN";

/// A registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Unique identifier (e.g., "MARKETING")
    pub id: String,

    /// What this member is responsible for, in natural language
    pub responsibility: String,

    /// Receives requests that match no other member
    #[serde(default)]
    pub is_default: bool,
}

/// Collects team members and validates them as they are registered.
#[derive(Debug, Default)]
pub struct TeamRosterBuilder {
    members: Vec<TeamMember>,
}

impl TeamRosterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a team member.
    ///
    /// Fails on a blank id or responsibility, a duplicate id, the reserved
    /// `UNKNOWN` id, or a second default member.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        responsibility: impl Into<String>,
        is_default: bool,
    ) -> Result<&mut Self, CouplerError> {
        let id = id.into().trim().to_string();
        let responsibility = responsibility.into().trim().to_string();

        if id.is_empty() {
            return Err(CouplerError::Validation("team member id must not be empty".into()));
        }
        if responsibility.is_empty() {
            return Err(CouplerError::Validation(format!(
                "team member '{id}' must have a responsibility"
            )));
        }
        if id.eq_ignore_ascii_case(UNKNOWN_TEAM_MEMBER) {
            return Err(CouplerError::Validation(format!(
                "'{UNKNOWN_TEAM_MEMBER}' is reserved and cannot be registered"
            )));
        }
        if self.members.iter().any(|m| m.id == id) {
            return Err(CouplerError::Validation(format!(
                "team member '{id}' is already registered"
            )));
        }
        if is_default {
            if let Some(existing) = self.members.iter().find(|m| m.is_default) {
                return Err(CouplerError::Validation(format!(
                    "'{id}' cannot be the default team member, '{}' already is",
                    existing.id
                )));
            }
        }

        self.members.push(TeamMember {
            id,
            responsibility,
            is_default,
        });
        Ok(self)
    }

    /// Freeze the roster.
    pub fn build(self) -> TeamRoster {
        TeamRoster {
            members: self.members,
        }
    }
}

/// An ordered, immutable set of team members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRoster {
    members: Vec<TeamMember>,
}

impl TeamRoster {
    pub fn builder() -> TeamRosterBuilder {
        TeamRosterBuilder::new()
    }

    /// Get a member by id.
    pub fn get(&self, id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// The first member flagged as default, if any.
    pub fn default_handler(&self) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.is_default)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter()
    }

    /// Member ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }

    /// Map an id reported by a model onto a registered id.
    ///
    /// Exact matches win; otherwise the first case-insensitive match is
    /// returned with the registered spelling. The sentinel resolves to itself.
    pub fn resolve_id(&self, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(UNKNOWN_TEAM_MEMBER) {
            return Some(UNKNOWN_TEAM_MEMBER);
        }
        if let Some(member) = self.get(raw) {
            return Some(member.id.as_str());
        }
        self.members
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(raw))
            .map(|m| m.id.as_str())
    }

    /// Render the roster as the prompt fragment embedded in the classifier
    /// instructions. Wording and order are stable across runs.
    pub fn describe_all(&self) -> String {
        let mut prompt = String::new();
        for member in &self.members {
            prompt.push_str(&format!(
                "Use {} as the team member id if the user has made a request that matches the following description:\n{}\n",
                member.id, member.responsibility
            ));
        }
        prompt.push_str(&format!(
            "Use {UNKNOWN_TEAM_MEMBER} if the user has made a request that does not match any of the above descriptions."
        ));
        prompt
    }
}
