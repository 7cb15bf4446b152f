//! Application record variants.
//!
//! Records are a tagged union discriminated by `$type`, so the discriminator
//! and payload shape are enforced together at compile time. Each record gets
//! its creation timestamp stamped at build time and is never mutated after
//! submission.

pub mod tid;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use tid::TidGenerator;

pub const PROPOSAL: &str = "app.dao.proposal";
pub const REPLY: &str = "app.dao.reply";
pub const PROFILE: &str = "app.dao.profile";
pub const LIKE: &str = "app.dao.like";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Record {
    /// A funding proposal.
    #[serde(rename = "app.dao.proposal")]
    Proposal {
        title: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        budget: Option<String>,
        #[serde(rename = "createdAt")]
        created_at: String,
    },

    /// A reply on a proposal timeline.
    #[serde(rename = "app.dao.reply")]
    Reply {
        /// URI of the record being replied to.
        to: String,
        content: String,
        #[serde(rename = "createdAt")]
        created_at: String,
    },

    /// The author's profile.
    #[serde(rename = "app.dao.profile")]
    Profile {
        #[serde(rename = "displayName")]
        display_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "createdAt")]
        created_at: String,
    },

    /// An endorsement of another record.
    #[serde(rename = "app.dao.like")]
    Like {
        /// URI of the liked record.
        to: String,
        /// DID of the liking identity.
        viewer: String,
        #[serde(rename = "createdAt")]
        created_at: String,
    },
}

impl Record {
    pub fn proposal(title: String, content: String, budget: Option<String>) -> Self {
        Record::Proposal {
            title,
            content,
            budget,
            created_at: now(),
        }
    }

    pub fn reply(to: String, content: String) -> Self {
        Record::Reply {
            to,
            content,
            created_at: now(),
        }
    }

    pub fn profile(display_name: String, description: Option<String>) -> Self {
        Record::Profile {
            display_name,
            description,
            created_at: now(),
        }
    }

    pub fn like(to: String, viewer: String) -> Self {
        Record::Like {
            to,
            viewer,
            created_at: now(),
        }
    }

    /// The collection a record of this type lives in (same name as its
    /// `$type` discriminator).
    pub fn collection(&self) -> &'static str {
        match self {
            Record::Proposal { .. } => PROPOSAL,
            Record::Reply { .. } => REPLY,
            Record::Profile { .. } => PROFILE,
            Record::Like { .. } => LIKE,
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_serializes_with_type_tag() {
        let record = Record::like("uri:123".into(), "did:abc".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["$type"], "app.dao.like");
        assert_eq!(json["to"], "uri:123");
        assert_eq!(json["viewer"], "did:abc");
        assert!(json["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn type_tag_selects_variant_on_deserialize() {
        let json = serde_json::json!({
            "$type": "app.dao.proposal",
            "title": "Fund the bridge",
            "content": "Three-month grant.",
            "createdAt": "2026-08-25T00:00:00.000Z",
        });
        let record: Record = serde_json::from_value(json).unwrap();
        assert!(matches!(record, Record::Proposal { .. }));
        assert_eq!(record.collection(), PROPOSAL);
    }

    #[test]
    fn absent_budget_is_omitted_on_the_wire() {
        let record = Record::proposal("t".into(), "c".into(), None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("budget").is_none());
    }

    #[test]
    fn collection_matches_variant() {
        assert_eq!(Record::reply("u".into(), "c".into()).collection(), REPLY);
        assert_eq!(Record::profile("n".into(), None).collection(), PROFILE);
    }
}
