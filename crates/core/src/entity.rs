//! Entity kinds, identities and version rows
//!
//! The set of tariff record kinds is closed: `EntityKind` enumerates every
//! kind the store knows about, and carries its TARIC record codes. Concrete
//! domain fields live in `RecordData::attributes`; the substrate only reads
//! the identity, validity period and links.

use crate::traits::{HasIdentity, HasValidity};
use crate::types::{ChangeKind, TransactionId, VersionGroupId, VersionId};
use crate::validity::ValidityPeriod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every kind of tariff record tracked by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Footnote type
    FootnoteType,
    /// Certificate type
    CertificateType,
    /// Additional code type
    AdditionalCodeType,
    /// Footnote
    Footnote,
    /// Certificate
    Certificate,
    /// Measure type
    MeasureType,
    /// Additional code
    AdditionalCode,
    /// Geographical area
    GeographicalArea,
    /// Base regulation
    Regulation,
    /// Quota order number
    QuotaOrderNumber,
    /// Quota definition
    QuotaDefinition,
    /// Goods nomenclature (commodity code)
    GoodsNomenclature,
    /// Measure
    Measure,
}

impl EntityKind {
    /// All kinds, in record code order
    pub const ALL: [EntityKind; 13] = [
        EntityKind::FootnoteType,
        EntityKind::CertificateType,
        EntityKind::AdditionalCodeType,
        EntityKind::Footnote,
        EntityKind::Certificate,
        EntityKind::MeasureType,
        EntityKind::AdditionalCode,
        EntityKind::GeographicalArea,
        EntityKind::Regulation,
        EntityKind::QuotaOrderNumber,
        EntityKind::QuotaDefinition,
        EntityKind::GoodsNomenclature,
        EntityKind::Measure,
    ];

    /// TARIC record code
    pub fn record_code(&self) -> &'static str {
        match self {
            EntityKind::FootnoteType => "100",
            EntityKind::CertificateType => "110",
            EntityKind::AdditionalCodeType => "120",
            EntityKind::Footnote => "200",
            EntityKind::Certificate => "205",
            EntityKind::MeasureType => "235",
            EntityKind::AdditionalCode => "245",
            EntityKind::GeographicalArea => "250",
            EntityKind::Regulation => "285",
            EntityKind::QuotaOrderNumber => "360",
            EntityKind::QuotaDefinition => "370",
            EntityKind::GoodsNomenclature => "400",
            EntityKind::Measure => "430",
        }
    }

    /// TARIC subrecord code
    pub fn subrecord_code(&self) -> &'static str {
        "00"
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::FootnoteType => "FootnoteType",
            EntityKind::CertificateType => "CertificateType",
            EntityKind::AdditionalCodeType => "AdditionalCodeType",
            EntityKind::Footnote => "Footnote",
            EntityKind::Certificate => "Certificate",
            EntityKind::MeasureType => "MeasureType",
            EntityKind::AdditionalCode => "AdditionalCode",
            EntityKind::GeographicalArea => "GeographicalArea",
            EntityKind::Regulation => "Regulation",
            EntityKind::QuotaOrderNumber => "QuotaOrderNumber",
            EntityKind::QuotaDefinition => "QuotaDefinition",
            EntityKind::GoodsNomenclature => "GoodsNomenclature",
            EntityKind::Measure => "Measure",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business key of a logical record, stable across all its versions
///
/// Field names are kept sorted so that two keys built in a different
/// order compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentifyingKey {
    /// Kind of record
    pub kind: EntityKind,
    fields: BTreeMap<String, String>,
}

impl IdentifyingKey {
    /// Start a key for `kind` with no fields
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Add an identifying field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get an identifying field value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Iterate identifying fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for IdentifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.kind)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

/// Field payload of one version row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    /// Business key
    pub identity: IdentifyingKey,
    /// When the record is live
    pub validity: ValidityPeriod,
    /// Identities of records this record references
    pub links: Vec<IdentifyingKey>,
    /// Domain fields the substrate does not interpret
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl RecordData {
    /// Create a payload with no links or attributes
    pub fn new(identity: IdentifyingKey, validity: ValidityPeriod) -> Self {
        Self {
            identity,
            validity,
            links: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a reference to another record
    pub fn link(mut self, target: IdentifyingKey) -> Self {
        if !self.links.contains(&target) {
            self.links.push(target);
        }
        self
    }

    /// Set a domain attribute
    pub fn attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Replace the validity period
    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = validity;
        self
    }

    /// First linked identity of the given kind
    pub fn link_of_kind(&self, kind: EntityKind) -> Option<&IdentifyingKey> {
        self.links.iter().find(|link| link.kind == kind)
    }
}

/// One immutable row of a logical record's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityVersion {
    /// Row id, assigned monotonically on append
    pub id: VersionId,
    /// Logical identity this row belongs to
    pub group: VersionGroupId,
    /// Transaction that introduced the row
    pub transaction: TransactionId,
    /// What this row does to the record
    pub change_kind: ChangeKind,
    /// Field payload
    pub data: RecordData,
    /// Wall-clock time of the append
    pub recorded_at: DateTime<Utc>,
}

impl EntityVersion {
    /// Kind of record
    pub fn kind(&self) -> EntityKind {
        self.data.identity.kind
    }

    /// Check if the row references `target`
    pub fn links_to(&self, target: &IdentifyingKey) -> bool {
        self.data.links.contains(target)
    }

    /// Check if this row is a DELETE
    pub fn is_delete(&self) -> bool {
        self.change_kind.is_delete()
    }
}

impl HasIdentity for EntityVersion {
    fn identity(&self) -> &IdentifyingKey {
        &self.data.identity
    }
}

impl HasValidity for EntityVersion {
    fn validity(&self) -> &ValidityPeriod {
        &self.data.validity
    }
}

impl HasIdentity for RecordData {
    fn identity(&self) -> &IdentifyingKey {
        &self.identity
    }
}

impl HasValidity for RecordData {
    fn validity(&self) -> &ValidityPeriod {
        &self.validity
    }
}
