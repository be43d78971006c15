//! Search query construction.
//!
//! `build` is a pure function of its inputs. Registry enrichment is used only
//! when the plate passes the format check *and* the registry produced at least
//! one usable field; in every other case the raw query is returned unchanged.

use crate::plate;
use crate::types::RegistryInfo;

/// Builds the image-search query for one attempt.
///
/// ```
/// use carfinder::{query, RegistryInfo};
///
/// let info = RegistryInfo {
///     found: true,
///     year:  Some("2019".into()),
///     color: Some("GRIJS".into()),
///     ..Default::default()
/// };
/// assert_eq!(query::build("Porsche Cayman", "ab-123-c", Some(&info)), "Porsche Cayman 2019 GRIJS AB123C");
/// assert_eq!(query::build("Porsche Cayman", "ab-123-c", None), "Porsche Cayman");
/// ```
pub fn build(raw_query: &str, license_plate: &str, registry: Option<&RegistryInfo>) -> String {
    let raw_query = raw_query.trim();

    if !plate::looks_like_plate(license_plate) {
        return raw_query.to_string();
    }

    let enrichment = registry.map(RegistryInfo::enrichment).unwrap_or_default();
    if enrichment.is_empty() {
        return raw_query.to_string();
    }

    let normalized = plate::normalize(license_plate);
    std::iter::once(raw_query)
        .chain(enrichment)
        .chain(std::iter::once(normalized.as_str()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
