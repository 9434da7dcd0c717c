//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, TeamId, GroupId)
//! - Permission and authorization types
//! - The typed values that form fields are parsed into at the request boundary
//!
//! # ID Types
//!
//! Entity IDs are the integer row ids used by the notebook's schema:
//!
//! - [`UserId`]: User account identifier
//! - [`TeamId`]: Team identifier, the scope of every team group
//! - [`GroupId`]: Team group identifier
//!
//! # Boundary Types
//!
//! - [`ElementRef`]: the `<kind>_<id>` element id sent by the inline editor
//! - [`MemberAction`]: the `add`/`rm` membership keyword
//! - [`Outcome`]: whether a successful mutation actually changed a row

use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

// Type aliases for IDs
pub type UserId = i64;
pub type TeamId = i64;
pub type GroupId = i64;

/// Element kind prefix used by the inline editor for team groups.
pub const TEAM_GROUP_ELEMENT: &str = "teamgroup";

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    UpdateAll,
    DeleteAll,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    TeamGroups,
    Memberships,
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Principal must be an admin of the given team
    TeamAdmin(TeamId),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll => write!(f, "Create"),
            Operation::UpdateAll => write!(f, "Update"),
            Operation::DeleteAll => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::TeamGroups => write!(f, "team groups"),
            Resource::Memberships => write!(f, "team group members"),
        }
    }
}

/// An element id as sent by the inline name editor, e.g. `teamgroup_5`.
///
/// Only a `teamgroup` kind followed by a positive integer is recognized; everything
/// else is kept verbatim so callers can log it and ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRef {
    TeamGroup(GroupId),
    Unrecognized(String),
}

impl ElementRef {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('_');
        let kind = parts.next();
        let id = parts.next().and_then(|id| id.parse::<GroupId>().ok()).filter(|id| *id > 0);

        match (kind, id) {
            (Some(TEAM_GROUP_ELEMENT), Some(id)) => ElementRef::TeamGroup(id),
            _ => ElementRef::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::TeamGroup(id) => write!(f, "{TEAM_GROUP_ELEMENT}_{id}"),
            ElementRef::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// Membership change requested for a (user, group) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    Add,
    Remove,
}

impl FromStr for MemberAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(MemberAction::Add),
            "rm" => Ok(MemberAction::Remove),
            _ => Err(Error::BadRequest {
                message: "Bad action keyword".to_string(),
            }),
        }
    }
}

/// Result of a mutation that completed without error.
///
/// `Unchanged` means the statement ran but matched nothing (re-adding an existing member,
/// deleting a missing row). Callers collapse this to the legacy `1`/`0` answer themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Applied(T),
    Unchanged,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Unchanged => None,
        }
    }
}

impl Outcome {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows > 0 { Outcome::Applied(()) } else { Outcome::Unchanged }
    }
}
