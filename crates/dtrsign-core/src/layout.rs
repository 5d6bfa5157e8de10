//! Field layout policy
//!
//! Maps a signer role and date-range mode to the named signature boxes
//! for that role. The mapping is a pure table lookup; coordinates are
//! page units with the origin at the bottom-left, as produced by the
//! report templates these documents come from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// DTR second-column fields sit this far right of the first column.
const DTR_COLUMN_SHIFT: f64 = 310.0;

/// Leave-application boxes share one size.
const LEAVE_BOX: (f64, f64) = (220.0, 70.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignerRole {
    Owner,
    Incharge,
    LeaveOwner,
    LeaveHead,
    LeaveSao,
    LeaveCao,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRangeMode {
    WholeMonth,
    PartialMonth,
}

impl DateRangeMode {
    pub fn from_whole_month(whole_month: bool) -> Self {
        if whole_month {
            DateRangeMode::WholeMonth
        } else {
            DateRangeMode::PartialMonth
        }
    }
}

/// One signature field to add and sign, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// (x0, y0, x1, y1) in page units.
    pub rect: (f64, f64, f64, f64),
    /// When set, an existing unsigned field of this name is signed in
    /// place instead of a duplicate being created.
    pub reuse_existing: bool,
}

/// Layout rule for one role.
///
/// DTR roles place a two-column pair whose vertical position depends on
/// the date-range mode; leave roles place a single fixed-size box and
/// ignore the mode.
enum LayoutRule {
    Dtr {
        prefix: &'static str,
        first: (f64, f64, f64, f64),
        partial_shift: f64,
        reuse_first: bool,
    },
    Leave {
        name: &'static str,
        anchor: (f64, f64),
    },
}

fn rule(role: SignerRole) -> LayoutRule {
    match role {
        SignerRole::Owner => LayoutRule::Dtr {
            prefix: "Owner",
            first: (50.0, 105.0, 250.0, 165.0),
            partial_shift: 250.0,
            reuse_first: false,
        },
        SignerRole::Incharge => LayoutRule::Dtr {
            prefix: "Incharge",
            first: (50.0, 70.0, 250.0, 130.0),
            partial_shift: 255.0,
            reuse_first: true,
        },
        SignerRole::LeaveOwner => LayoutRule::Leave {
            name: "OwnerSignature2",
            anchor: (330.0, 535.0),
        },
        SignerRole::LeaveHead => LayoutRule::Leave {
            name: "HeadSignature2",
            anchor: (330.0, 355.0),
        },
        SignerRole::LeaveSao => LayoutRule::Leave {
            name: "SaoSignature2",
            anchor: (50.0, 355.0),
        },
        SignerRole::LeaveCao => LayoutRule::Leave {
            name: "CaoSignature2",
            anchor: (200.0, 155.0),
        },
    }
}

/// Expand a role and mode into the ordered field specs to sign.
pub fn layout(role: SignerRole, mode: DateRangeMode) -> Vec<FieldSpec> {
    match rule(role) {
        LayoutRule::Dtr {
            prefix,
            first,
            partial_shift,
            reuse_first,
        } => {
            let dy = match mode {
                DateRangeMode::WholeMonth => 0.0,
                DateRangeMode::PartialMonth => partial_shift,
            };
            let (x0, y0, x1, y1) = first;
            vec![
                FieldSpec {
                    name: format!("{prefix}Signature1"),
                    rect: (x0, y0 + dy, x1, y1 + dy),
                    reuse_existing: reuse_first,
                },
                FieldSpec {
                    name: format!("{prefix}Signature2"),
                    rect: (x0 + DTR_COLUMN_SHIFT, y0 + dy, x1 + DTR_COLUMN_SHIFT, y1 + dy),
                    reuse_existing: false,
                },
            ]
        }
        LayoutRule::Leave { name, anchor } => {
            let (x, y) = anchor;
            let (w, h) = LEAVE_BOX;
            vec![FieldSpec {
                name: name.to_string(),
                rect: (x, y, x + w, y + h),
                reuse_existing: false,
            }]
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignerRole::Owner => "owner",
            SignerRole::Incharge => "incharge",
            SignerRole::LeaveOwner => "leave-owner",
            SignerRole::LeaveHead => "leave-head",
            SignerRole::LeaveSao => "leave-sao",
            SignerRole::LeaveCao => "leave-cao",
        };
        f.write_str(name)
    }
}

impl FromStr for SignerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(SignerRole::Owner),
            "incharge" => Ok(SignerRole::Incharge),
            "leave-owner" => Ok(SignerRole::LeaveOwner),
            "leave-head" => Ok(SignerRole::LeaveHead),
            "leave-sao" => Ok(SignerRole::LeaveSao),
            "leave-cao" => Ok(SignerRole::LeaveCao),
            other => Err(format!("unknown signer role: {other}")),
        }
    }
}
