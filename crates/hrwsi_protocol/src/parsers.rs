//! Bit-exact product-identifier parsers (spec.md §6).
//!
//! Each parser turns an upstream product identifier string into the subset
//! of `RawInput` attributes that cannot be recovered from the catalog
//! response alone (tile, measurement day, relative orbit). Malformed
//! identifiers are a `DataShape` condition: the caller skips the item and
//! the harvesting rule advances (spec.md §7).

use thiserror::Error;

use crate::product_type::ProductType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdentifierError {
    #[error("identifier '{0}' has too few '_'-delimited fields for {1}")]
    TooFewFields(String, &'static str),
    #[error("identifier '{0}' is missing the expected 'T' tile prefix")]
    MissingTilePrefix(String),
    #[error("identifier '{0}' has a non-numeric relative orbit field")]
    BadRelativeOrbit(String),
    #[error("identifier '{0}' has a malformed measurement day")]
    BadMeasurementDay(String),
}

/// Attributes recovered from a product identifier, independent of the
/// catalog's own per-product attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentifier {
    pub tile: String,
    pub measurement_day: i32,
    pub relative_orbit: Option<i32>,
}

fn strip_tile_prefix(field: &str, identifier: &str) -> Result<String, ParseIdentifierError> {
    field
        .strip_prefix('T')
        .map(|t| t.to_string())
        .ok_or_else(|| ParseIdentifierError::MissingTilePrefix(identifier.to_string()))
}

fn parse_measurement_day(digits: &str, identifier: &str) -> Result<i32, ParseIdentifierError> {
    if digits.len() < 8 || !digits.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
        return Err(ParseIdentifierError::BadMeasurementDay(
            identifier.to_string(),
        ));
    }
    digits[..8]
        .parse()
        .map_err(|_| ParseIdentifierError::BadMeasurementDay(identifier.to_string()))
}

/// `S2_MAJA_L2A`: `SENTINEL2{A|B|C}_YYYYMMDD-HHMMSS-mmm_L2A_T{TILE}_C_V...`
///
/// tile = field index 3 with leading `T` dropped; measurement_day = the
/// part of field index 1 before the first `-`.
pub fn parse_s2_maja_l2a(identifier: &str) -> Result<ParsedIdentifier, ParseIdentifierError> {
    let fields: Vec<&str> = identifier.split('_').collect();
    if fields.len() < 4 {
        return Err(ParseIdentifierError::TooFewFields(
            identifier.to_string(),
            "S2_MAJA_L2A",
        ));
    }
    let tile = strip_tile_prefix(fields[3], identifier)?;
    let date_part = fields[1]
        .split('-')
        .next()
        .ok_or_else(|| ParseIdentifierError::BadMeasurementDay(identifier.to_string()))?;
    let measurement_day = parse_measurement_day(date_part, identifier)?;
    Ok(ParsedIdentifier {
        tile,
        measurement_day,
        relative_orbit: None,
    })
}

/// `S1_NRB_L2A`: `SIG0_YYYYMMDDThhmmss_..._{RELORBIT}_T{TILE}_10m_..._ENVEO`
///
/// tile = field index 5 with leading `T` dropped; relative_orbit = field
/// index 4, parsed as int.
pub fn parse_s1_nrb_l2a(identifier: &str) -> Result<ParsedIdentifier, ParseIdentifierError> {
    let fields: Vec<&str> = identifier.split('_').collect();
    if fields.len() < 6 {
        return Err(ParseIdentifierError::TooFewFields(
            identifier.to_string(),
            "S1_NRB_L2A",
        ));
    }
    let relative_orbit: i32 = fields[4]
        .parse()
        .map_err(|_| ParseIdentifierError::BadRelativeOrbit(identifier.to_string()))?;
    let tile = strip_tile_prefix(fields[5], identifier)?;
    let date_part = fields[1]
        .split('T')
        .next()
        .ok_or_else(|| ParseIdentifierError::BadMeasurementDay(identifier.to_string()))?;
    let measurement_day = parse_measurement_day(date_part, identifier)?;
    Ok(ParsedIdentifier {
        tile,
        measurement_day,
        relative_orbit: Some(relative_orbit),
    })
}

/// Layer-2B products (`S2_WICS2_L2B`, `S2_FSC_L2B`, `S1_WDS_L2B`,
/// `S1_SWS_L2B`, `S1_WICS1_L2B`, `S2_CC_L2B`) and `COMB_WICS1S2` (same
/// skeleton, trailing 4-char suffix ignored):
/// `CLMS_WSI_{CODE}_{RES}_T{TILE}_YYYYMMDDThhmmss_{PLATFORM}_Vxxx_{LAYER}`
pub fn parse_layer2b(identifier: &str) -> Result<ParsedIdentifier, ParseIdentifierError> {
    let fields: Vec<&str> = identifier.split('_').collect();
    if fields.len() < 6 {
        return Err(ParseIdentifierError::TooFewFields(
            identifier.to_string(),
            "layer-2B",
        ));
    }
    let tile = strip_tile_prefix(fields[4], identifier)?;
    let date_part = fields[5]
        .split('T')
        .next()
        .ok_or_else(|| ParseIdentifierError::BadMeasurementDay(identifier.to_string()))?;
    let measurement_day = parse_measurement_day(date_part, identifier)?;
    Ok(ParsedIdentifier {
        tile,
        measurement_day,
        relative_orbit: None,
    })
}

/// `GFSC_L2C`: `CLMS_WSI_GFSC_060m_T{TILE}_YYYYMMDDPxD_COMB_Vxxx_{LAYER}`
///
/// measurement_day is the 8-digit date prefix of the `YYYYMMDDPxD` field;
/// the `PxD` suffix denotes the aggregation window and is not part of the
/// measurement day itself.
pub fn parse_gfsc_l2c(identifier: &str) -> Result<ParsedIdentifier, ParseIdentifierError> {
    let fields: Vec<&str> = identifier.split('_').collect();
    if fields.len() < 6 {
        return Err(ParseIdentifierError::TooFewFields(
            identifier.to_string(),
            "GFSC_L2C",
        ));
    }
    let tile = strip_tile_prefix(fields[4], identifier)?;
    let measurement_day = parse_measurement_day(fields[5], identifier)?;
    Ok(ParsedIdentifier {
        tile,
        measurement_day,
        relative_orbit: None,
    })
}

/// `IW_GRDH_1S` raw inputs keep their original SAFE-style filename in
/// `input_path` rather than a `SIG0_...` identifier:
/// `S1{x}_IW_GRDH_1S{pol}_{START}_{STOP}_{orbit}_{rel_orbit}_{mission}`.
/// Partial-swath pairing needs the literal start/stop timestamp tokens at
/// field indices 4 and 5 of the basename, directory and extension stripped.
pub fn grdh_swath_boundary(input_path: &str) -> Option<(&str, &str)> {
    let basename = input_path.rsplit('/').next().unwrap_or(input_path);
    let stem = basename.split('.').next().unwrap_or(basename);
    let fields: Vec<&str> = stem.split('_').collect();
    if fields.len() < 6 {
        return None;
    }
    Some((fields[4], fields[5]))
}

/// Dispatch to the right parser for a known, eligible product type.
/// `IW_GRDH_1S` carries tile/measurement_day/relative_orbit directly from
/// the catalog response rather than its identifier and has no parser here.
pub fn parse_identifier(
    product_type: ProductType,
    identifier: &str,
) -> Result<ParsedIdentifier, ParseIdentifierError> {
    match product_type {
        ProductType::S2MajaL2a => parse_s2_maja_l2a(identifier),
        ProductType::S1NrbL2a => parse_s1_nrb_l2a(identifier),
        ProductType::S2FscL2b
        | ProductType::S1SwsL2b
        | ProductType::S1WdsL2b
        | ProductType::S1Wics1L2b
        | ProductType::S2Wics2L2b
        | ProductType::S2CcL2b
        | ProductType::CombWics1s2 => parse_layer2b(identifier),
        ProductType::GfscL2c => parse_gfsc_l2c(identifier),
        ProductType::IwGrdh1s | ProductType::S2Msi1c => parse_layer2b(identifier)
            .or_else(|_| parse_s2_maja_l2a(identifier))
            .map_err(|_| ParseIdentifierError::TooFewFields(identifier.to_string(), "generic")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s2_maja_l2a() {
        let id = "SENTINEL2A_20240115-103045-123_L2A_T31TCH_C_V1-0";
        let parsed = parse_s2_maja_l2a(id).unwrap();
        assert_eq!(parsed.tile, "31TCH");
        assert_eq!(parsed.measurement_day, 20_240_115);
        assert_eq!(parsed.relative_orbit, None);
    }

    #[test]
    fn parses_s1_nrb_l2a() {
        let id = "SIG0_20240115T103045_20240115T103200_012345_045_T31TCH_10m_PRODUCT_ENVEO";
        let parsed = parse_s1_nrb_l2a(id).unwrap();
        assert_eq!(parsed.tile, "31TCH");
        assert_eq!(parsed.measurement_day, 20_240_115);
        assert_eq!(parsed.relative_orbit, Some(45));
    }

    #[test]
    fn parses_layer2b() {
        let id = "CLMS_WSI_FSC_020m_T31TCH_20240115T103045_S2_V100_FSCOG";
        let parsed = parse_layer2b(id).unwrap();
        assert_eq!(parsed.tile, "31TCH");
        assert_eq!(parsed.measurement_day, 20_240_115);
    }

    #[test]
    fn parses_comb_wics1s2_with_trailing_suffix() {
        let id = "CLMS_WSI_WICS1S2_060m_T31TCH_20240115T103045_COMB_V100_WDSOG_ABCD";
        let parsed = parse_layer2b(id).unwrap();
        assert_eq!(parsed.tile, "31TCH");
        assert_eq!(parsed.measurement_day, 20_240_115);
    }

    #[test]
    fn parses_gfsc_l2c() {
        let id = "CLMS_WSI_GFSC_060m_T31TCH_20240115P7D_COMB_V100_GFSCOG";
        let parsed = parse_gfsc_l2c(id).unwrap();
        assert_eq!(parsed.tile, "31TCH");
        assert_eq!(parsed.measurement_day, 20_240_115);
    }

    #[test]
    fn rejects_missing_tile_prefix() {
        let id = "CLMS_WSI_FSC_020m_31TCH_20240115T103045_S2_V100_FSCOG";
        assert_eq!(
            parse_layer2b(id),
            Err(ParseIdentifierError::MissingTilePrefix(id.to_string()))
        );
    }

    #[test]
    fn extracts_grdh_swath_boundary() {
        let path = "/data/S1A_IW_GRDH_1SDV_20210102T074131_20210102T074200_043635_053255_ABCD.SAFE";
        let (start, stop) = grdh_swath_boundary(path).unwrap();
        assert_eq!(start, "20210102T074131");
        assert_eq!(stop, "20210102T074200");
    }

    #[test]
    fn rejects_too_few_fields() {
        let id = "CLMS_WSI";
        assert!(matches!(
            parse_layer2b(id),
            Err(ParseIdentifierError::TooFewFields(_, _))
        ));
    }
}
