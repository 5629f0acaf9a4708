use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::InterestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Innovator,
    Investor,
    Admin,
}

/// The authenticated user as reported by `/auth/verify` or `/auth/login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(alias = "userId")]
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(default, alias = "isVerified")]
    pub verified: bool,
}

// -- Deals --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    Draft,
    PendingApproval,
    Active,
    Rejected,
    Closed,
}

/// Public projection of a deal, visible to every visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default, alias = "teaser")]
    pub teaser_summary: Option<String>,
    #[serde(default, alias = "fundingGoal")]
    pub target_amount: Option<f64>,
    pub status: DealStatus,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "innovator")]
    pub innovator_id: Uuid,
}

/// Private projection: the public fields plus the data-room documents.
/// Only served to investors whose request is approved and NDA-signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateDeal {
    #[serde(flatten)]
    pub deal: Deal,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl PrivateDeal {
    pub fn document(&self, doc_id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == doc_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    PitchDeck,
    Financials,
    Legal,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub file_type: DocType,
    #[serde(default = "default_private", alias = "isPrivate")]
    pub private: bool,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_private() -> bool {
    true
}

// -- Access requests --

/// Server-side status of an access request. A missing request is the
/// `NONE` state and is modelled as `Option<AccessRequest>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessStatus {
    Pending,
    Approved,
    #[serde(alias = "DENIED")]
    Rejected,
}

impl InterestStatus for AccessStatus {
    const PENDING: Self = Self::Pending;
    const ACCEPTED: Self = Self::Approved;
    const DECLINED: Self = Self::Rejected;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "deal")]
    pub deal_id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "investor")]
    pub investor_id: Uuid,
    pub status: AccessStatus,
    #[serde(default)]
    pub nda_signed: bool,
    #[serde(default)]
    pub intro_requested: bool,
    #[serde(default, with = "crate::models::lenient_ts::option")]
    pub nda_signed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::lenient_ts::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    /// Approved and NDA signed: the private projection may be fetched.
    pub fn is_unlocked(&self) -> bool {
        self.status == AccessStatus::Approved && self.nda_signed
    }

    /// `ndaSigned` implies APPROVED, `introRequested` implies `ndaSigned`.
    pub fn is_consistent(&self) -> bool {
        (!self.nda_signed || self.status == AccessStatus::Approved)
            && (!self.intro_requested || self.nda_signed)
    }
}

// -- Chat --

/// A chat message. `recipient_id == None` is a deal-wide broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "deal")]
    pub deal_id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "sender")]
    pub sender_id: Uuid,
    #[serde(default, deserialize_with = "crate::models::id_ref::option", alias = "recipient")]
    pub recipient_id: Option<Uuid>,
    pub content: String,
    #[serde(with = "crate::models::lenient_ts")]
    pub created_at: DateTime<Utc>,
}

// -- Mandates --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mandate {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_industry: Option<String>,
    #[serde(default)]
    pub stage_preference: Option<String>,
    #[serde(default)]
    pub min_ticket_size: Option<f64>,
    #[serde(default)]
    pub max_ticket_size: Option<f64>,
    #[serde(default)]
    pub geography: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "investor")]
    pub investor_id: Uuid,
    #[serde(default)]
    pub investor_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MandateInterestStatus {
    Pending,
    Contacted,
    Rejected,
}

impl MandateInterestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Contacted => "CONTACTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl InterestStatus for MandateInterestStatus {
    const PENDING: Self = Self::Pending;
    const ACCEPTED: Self = Self::Contacted;
    const DECLINED: Self = Self::Rejected;
}

/// An innovator's expression of interest in an investor's mandate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateInterest {
    pub id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "mandate")]
    pub mandate_id: Uuid,
    #[serde(deserialize_with = "crate::models::id_ref::deserialize", alias = "innovator")]
    pub innovator_id: Uuid,
    #[serde(default)]
    pub innovator_name: Option<String>,
    pub status: MandateInterestStatus,
    #[serde(default, with = "crate::models::lenient_ts::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Foreign keys arrive either as a bare id or as the embedded entity.
pub(crate) mod id_ref {
    use serde::{Deserialize, Deserializer};
    use uuid::Uuid;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRef {
        Id(Uuid),
        Entity { id: Uuid },
    }

    impl IdRef {
        fn id(self) -> Uuid {
            match self {
                IdRef::Id(id) | IdRef::Entity { id } => id,
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Uuid, D::Error> {
        Ok(IdRef::deserialize(d)?.id())
    }

    /// Nullable reference; `null` is `None`.
    pub fn option<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Uuid>, D::Error> {
        Ok(Option::<IdRef>::deserialize(d)?.map(IdRef::id))
    }
}

/// The server stores `LocalDateTime` values, which serialize without an
/// offset. Accept RFC 3339 and fall back to naive timestamps read as UTC.
pub(crate) mod lenient_ts {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        raw.parse::<DateTime<Utc>>().ok().or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
                .map(|ndt| ndt.and_utc())
                .ok()
        })
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{raw}'")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_some(&ts.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{raw}'"))),
                None => Ok(None),
            }
        }
    }
}
