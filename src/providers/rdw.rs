use async_trait::async_trait;
use serde_json::Value;
use crate::error::ProviderError;
use crate::plate;
use crate::providers::RegistryLookup;
use crate::types::RegistryInfo;

pub const DEFAULT_RDW_URL: &str = "https://opendata.rdw.nl/resource/m9d7-ebf2.json";

/// Registry lookup against the RDW open-data vehicle dataset.
pub struct RdwRegistry {
    client:   reqwest::Client,
    base_url: String,
}

impl RdwRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client:   reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Maps an RDW body onto `RegistryInfo`.
    ///
    /// The dataset answers with an array of vehicles; some mirrors answer with
    /// a single object. An empty array means the plate is unknown.
    fn parse(body: Value) -> Result<RegistryInfo, ProviderError> {
        let vehicle = match body {
            Value::Array(mut rows) => {
                if rows.is_empty() {
                    return Ok(RegistryInfo::not_found());
                }
                rows.swap_remove(0)
            }
            obj @ Value::Object(_) => obj,
            other => {
                return Err(ProviderError::Malformed(format!(
                    "expected array or object, got {}", other
                )));
            }
        };

        let field = |name: &str| {
            vehicle.get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // datum_eerste_toelating is YYYYMMDD
        let year = field("datum_eerste_toelating")
            .filter(|d| d.len() >= 4)
            .and_then(|d| d.get(..4).map(str::to_string));

        Ok(RegistryInfo {
            found:           true,
            make:            field("merk"),
            commercial_name: field("handelsbenaming"),
            year,
            color:           field("eerste_kleur"),
        })
    }
}

#[async_trait]
impl RegistryLookup for RdwRegistry {
    async fn lookup(&self, plate_id: &str) -> Result<RegistryInfo, ProviderError> {
        let kenteken = plate::normalize(plate_id);
        if kenteken.is_empty() {
            return Ok(RegistryInfo::not_found());
        }

        let response = self.client
            .get(&self.base_url)
            .query(&[("kenteken", kenteken.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body   = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body: Value = response.json().await?;
        let info = Self::parse(body)?;
        tracing::debug!(kenteken = %kenteken, found = info.found, "rdw lookup");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_row_of_array() {
        let info = RdwRegistry::parse(json!([{
            "kenteken": "AB123C",
            "merk": "PORSCHE",
            "handelsbenaming": "718 CAYMAN",
            "eerste_kleur": "GRIJS",
            "datum_eerste_toelating": "20190314"
        }])).unwrap();

        assert!(info.found);
        assert_eq!(info.make.as_deref(), Some("PORSCHE"));
        assert_eq!(info.commercial_name.as_deref(), Some("718 CAYMAN"));
        assert_eq!(info.year.as_deref(), Some("2019"));
        assert_eq!(info.color.as_deref(), Some("GRIJS"));
    }

    #[test]
    fn empty_array_is_not_found() {
        assert_eq!(RdwRegistry::parse(json!([])).unwrap(), RegistryInfo::not_found());
    }

    #[test]
    fn single_object_with_missing_fields() {
        let info = RdwRegistry::parse(json!({ "eerste_kleur": "ROOD", "datum_eerste_toelating": "19" })).unwrap();
        assert!(info.found);
        assert_eq!(info.year, None);
        assert_eq!(info.make, None);
        assert_eq!(info.enrichment(), vec!["ROOD"]);
    }

    #[test]
    fn scalar_body_is_malformed() {
        assert!(matches!(RdwRegistry::parse(json!("nope")), Err(ProviderError::Malformed(_))));
    }
}
