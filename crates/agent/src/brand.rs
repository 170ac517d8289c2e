//! Brand directory and knowledge-base filter resolution

use concierge_config::BrandEntry;
use concierge_core::SourceFilter;

/// Brand value meaning "no particular brand"
pub const ANY_BRAND: &str = "Any";

/// Known brands and the document prefix of each
#[derive(Debug, Clone, Default)]
pub struct BrandDirectory {
    entries: Vec<BrandEntry>,
}

impl BrandDirectory {
    pub fn new(entries: Vec<BrandEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BrandEntry] {
        &self.entries
    }

    /// Document prefix of a brand, ignoring case
    pub fn prefix_for(&self, brand: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(brand))
            .map(|b| b.prefix.as_str())
    }

    /// The only brand named in `text`, if exactly one is
    pub fn single_brand_mentioned(&self, text: &str) -> Option<&BrandEntry> {
        let text = text.to_lowercase();
        let mut mentioned = self
            .entries
            .iter()
            .filter(|b| text.contains(&b.name.to_lowercase()));

        match (mentioned.next(), mentioned.next()) {
            (Some(brand), None) => Some(brand),
            _ => None,
        }
    }

    /// Source filter for a knowledge base stored in `bucket`
    ///
    /// Unknown or absent brands scope the search to the whole bucket.
    pub fn source_filter(&self, bucket: &str, brand: Option<&str>) -> SourceFilter {
        let prefix = brand.and_then(|b| self.prefix_for(b)).unwrap_or("");
        SourceFilter::brand_prefix(bucket, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_config::Settings;
    use concierge_core::SOURCE_URI_KEY;

    fn directory() -> BrandDirectory {
        BrandDirectory::new(Settings::default().brands)
    }

    #[test]
    fn test_prefix_lookup() {
        let brands = directory();
        assert_eq!(brands.prefix_for("Example Corp Party Times"), Some("/party-times"));
        assert_eq!(brands.prefix_for("example corp waypoint inns"), Some("/waypoint-inns"));
        assert_eq!(brands.prefix_for(ANY_BRAND), None);
    }

    #[test]
    fn test_single_brand_mentioned() {
        let brands = directory();
        let found = brands.single_brand_mentioned(
            "The example corp luxury suites property has a rooftop pool.",
        );
        assert_eq!(found.map(|b| b.name.as_str()), Some("Example Corp Luxury Suites"));

        let two = "Both Example Corp Luxury Suites and Example Corp Party Times allow pets.";
        assert!(brands.single_brand_mentioned(two).is_none());
        assert!(brands.single_brand_mentioned("No brands here.").is_none());
    }

    #[test]
    fn test_source_filter() {
        let brands = directory();
        let filter = brands.source_filter("hotel-docs", Some("Example Corp Seaside Resorts"));
        assert_eq!(
            filter,
            SourceFilter::StartsWith {
                key: SOURCE_URI_KEY.to_string(),
                value: "s3://hotel-docs/seaside-resorts".to_string(),
            }
        );

        let SourceFilter::StartsWith { value, .. } = brands.source_filter("hotel-docs", Some(ANY_BRAND));
        assert_eq!(value, "s3://hotel-docs");
    }
}
