//! Vessel identity resolution
//!
//! A vessel can be named by three identifier schemes: the internal reference
//! number (CFR), the external reference number (hull marking) and the IRCS
//! radio call sign. Every record that refers to a vessel carries all three
//! optional references plus a discriminant saying which one is authoritative.
//! The discriminant-selected value is the correlation key used by lookups.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier scheme declared as authoritative for a vessel reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VesselIdentifier {
    InternalReferenceNumber,
    ExternalReferenceNumber,
    Ircs,
}

impl VesselIdentifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            VesselIdentifier::InternalReferenceNumber => "INTERNAL_REFERENCE_NUMBER",
            VesselIdentifier::ExternalReferenceNumber => "EXTERNAL_REFERENCE_NUMBER",
            VesselIdentifier::Ircs => "IRCS",
        }
    }

    /// Name of the identity field this discriminant selects
    pub fn field_name(&self) -> &'static str {
        match self {
            VesselIdentifier::InternalReferenceNumber => "internalReferenceNumber",
            VesselIdentifier::ExternalReferenceNumber => "externalReferenceNumber",
            VesselIdentifier::Ircs => "ircs",
        }
    }
}

impl fmt::Display for VesselIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VesselIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INTERNAL_REFERENCE_NUMBER" => Ok(VesselIdentifier::InternalReferenceNumber),
            "EXTERNAL_REFERENCE_NUMBER" => Ok(VesselIdentifier::ExternalReferenceNumber),
            "IRCS" => Ok(VesselIdentifier::Ircs),
            other => Err(Error::InvalidInput(format!(
                "Unknown vessel identifier: {}",
                other
            ))),
        }
    }
}

/// Partial vessel reference plus the declared authoritative scheme
///
/// Never persisted on its own; owning entities embed these columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselIdentity {
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub vessel_identifier: VesselIdentifier,
}

impl VesselIdentity {
    pub fn by_internal_reference_number(cfr: impl Into<String>) -> Self {
        Self {
            internal_reference_number: Some(cfr.into()),
            external_reference_number: None,
            ircs: None,
            vessel_identifier: VesselIdentifier::InternalReferenceNumber,
        }
    }

    pub fn by_external_reference_number(external: impl Into<String>) -> Self {
        Self {
            internal_reference_number: None,
            external_reference_number: Some(external.into()),
            ircs: None,
            vessel_identifier: VesselIdentifier::ExternalReferenceNumber,
        }
    }

    pub fn by_ircs(ircs: impl Into<String>) -> Self {
        Self {
            internal_reference_number: None,
            external_reference_number: None,
            ircs: Some(ircs.into()),
            vessel_identifier: VesselIdentifier::Ircs,
        }
    }

    fn selected(&self) -> Option<&str> {
        let value = match self.vessel_identifier {
            VesselIdentifier::InternalReferenceNumber => self.internal_reference_number.as_deref(),
            VesselIdentifier::ExternalReferenceNumber => self.external_reference_number.as_deref(),
            VesselIdentifier::Ircs => self.ircs.as_deref(),
        };
        // Blank strings are treated like absent values
        value.filter(|v| !v.trim().is_empty())
    }

    /// Return the authoritative lookup value
    ///
    /// Fails with [`Error::MissingIdentifier`] when the discriminant-selected
    /// field is absent or blank.
    pub fn resolve(&self) -> Result<&str> {
        self.selected().ok_or_else(|| Error::MissingIdentifier {
            identifier: self.vessel_identifier.to_string(),
            field: self.vessel_identifier.field_name().to_string(),
        })
    }

    /// Discriminant and value pair, as used by repository lookups
    pub fn lookup_key(&self) -> Result<(VesselIdentifier, String)> {
        let value = self.resolve()?;
        Ok((self.vessel_identifier, value.to_string()))
    }

    /// Whether any of the three references equals the other identity's
    /// corresponding reference. Used for cross-scheme matching where the
    /// caller explicitly opts in (e.g. silenced alert suppression).
    pub fn shares_any_reference(&self, other: &VesselIdentity) -> bool {
        fn same(a: &Option<String>, b: &Option<String>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if !x.trim().is_empty() && x == y)
        }
        same(&self.internal_reference_number, &other.internal_reference_number)
            || same(&self.external_reference_number, &other.external_reference_number)
            || same(&self.ircs, &other.ircs)
    }
}

/// Identities are equal when they use the same scheme and the selected
/// values match. The other two references are ignored.
impl PartialEq for VesselIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.vessel_identifier == other.vessel_identifier && self.selected() == other.selected()
    }
}

impl Eq for VesselIdentity {}
