//! Product-type codes and triggering-condition (rule) names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream/derived product-type code, as stored in `raw_inputs.product_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum ProductType {
    #[sqlx(rename = "IW_GRDH_1S")]
    IwGrdh1s,
    #[sqlx(rename = "S2_MAJA_L2A")]
    S2MajaL2a,
    #[sqlx(rename = "S1_NRB_L2A")]
    S1NrbL2a,
    #[sqlx(rename = "S2_FSC_L2B")]
    S2FscL2b,
    #[sqlx(rename = "S1_SWS_L2B")]
    S1SwsL2b,
    #[sqlx(rename = "S1_WDS_L2B")]
    S1WdsL2b,
    #[sqlx(rename = "S1_WICS1_L2B")]
    S1Wics1L2b,
    #[sqlx(rename = "S2_WICS2_L2B")]
    S2Wics2L2b,
    #[sqlx(rename = "S2_CC_L2B")]
    S2CcL2b,
    #[sqlx(rename = "S2MSI1C")]
    S2Msi1c,
    #[sqlx(rename = "COMB_WICS1S2")]
    CombWics1s2,
    #[sqlx(rename = "GFSC_L2C")]
    GfscL2c,
}

impl ProductType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProductType::IwGrdh1s => "IW_GRDH_1S",
            ProductType::S2MajaL2a => "S2_MAJA_L2A",
            ProductType::S1NrbL2a => "S1_NRB_L2A",
            ProductType::S2FscL2b => "S2_FSC_L2B",
            ProductType::S1SwsL2b => "S1_SWS_L2B",
            ProductType::S1WdsL2b => "S1_WDS_L2B",
            ProductType::S1Wics1L2b => "S1_WICS1_L2B",
            ProductType::S2Wics2L2b => "S2_WICS2_L2B",
            ProductType::S2CcL2b => "S2_CC_L2B",
            ProductType::S2Msi1c => "S2MSI1C",
            ProductType::CombWics1s2 => "COMB_WICS1S2",
            ProductType::GfscL2c => "GFSC_L2C",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown product type: {0}")]
pub struct UnknownProductType(String);

impl FromStr for ProductType {
    type Err = UnknownProductType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "IW_GRDH_1S" => ProductType::IwGrdh1s,
            "S2_MAJA_L2A" => ProductType::S2MajaL2a,
            "S1_NRB_L2A" => ProductType::S1NrbL2a,
            "S2_FSC_L2B" => ProductType::S2FscL2b,
            "S1_SWS_L2B" => ProductType::S1SwsL2b,
            "S1_WDS_L2B" => ProductType::S1WdsL2b,
            "S1_WICS1_L2B" => ProductType::S1Wics1L2b,
            "S2_WICS2_L2B" => ProductType::S2Wics2L2b,
            "S2_CC_L2B" => ProductType::S2CcL2b,
            "S2MSI1C" => ProductType::S2Msi1c,
            "COMB_WICS1S2" => ProductType::CombWics1s2,
            "GFSC_L2C" => ProductType::GfscL2c,
            other => return Err(UnknownProductType(other.to_string())),
        })
    }
}

/// Name of a static triggering-condition (rule), as stored in
/// `trigger_validation.triggering_condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum RuleName {
    #[sqlx(rename = "Backscatter_10m_TC")]
    Backscatter10mTc,
    #[sqlx(rename = "FSC_TC")]
    FscTc,
    #[sqlx(rename = "WICS2_TC")]
    Wics2Tc,
    #[sqlx(rename = "SWS_TC")]
    SwsTc,
    #[sqlx(rename = "WICS1_TC")]
    Wics1Tc,
    #[sqlx(rename = "WDS_TC")]
    WdsTc,
    #[sqlx(rename = "CC_TC")]
    CcTc,
    #[sqlx(rename = "WICS1S2_TC")]
    Wics1s2Tc,
    #[sqlx(rename = "GFSC_TC")]
    GfscTc,
}

impl RuleName {
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleName::Backscatter10mTc => "Backscatter_10m_TC",
            RuleName::FscTc => "FSC_TC",
            RuleName::Wics2Tc => "WICS2_TC",
            RuleName::SwsTc => "SWS_TC",
            RuleName::Wics1Tc => "WICS1_TC",
            RuleName::WdsTc => "WDS_TC",
            RuleName::CcTc => "CC_TC",
            RuleName::Wics1s2Tc => "WICS1S2_TC",
            RuleName::GfscTc => "GFSC_TC",
        }
    }

    /// Processing routine invoked once a task for this rule is dispatched.
    pub const fn routine(self) -> &'static str {
        match self {
            RuleName::Backscatter10mTc => "Sig0",
            RuleName::FscTc => "FSC",
            RuleName::Wics2Tc => "WICS2",
            RuleName::SwsTc => "SWS",
            RuleName::Wics1Tc => "WICS1",
            RuleName::WdsTc => "WDS",
            RuleName::CcTc => "CC",
            RuleName::Wics1s2Tc => "WICS1S2",
            RuleName::GfscTc => "GFSC",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_type_round_trips_through_str() {
        for pt in [
            ProductType::IwGrdh1s,
            ProductType::S2MajaL2a,
            ProductType::S1NrbL2a,
            ProductType::GfscL2c,
        ] {
            let parsed: ProductType = pt.as_str().parse().unwrap();
            assert_eq!(parsed, pt);
        }
    }

    #[test]
    fn unknown_product_type_is_rejected() {
        assert!("NOT_A_TYPE".parse::<ProductType>().is_err());
    }

    #[test]
    fn rule_name_maps_to_routine() {
        assert_eq!(RuleName::CcTc.routine(), "CC");
        assert_eq!(RuleName::WdsTc.routine(), "WDS");
    }
}
