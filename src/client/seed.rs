use crate::models::{Resource, ResourceKind};

/// Bundled first-run content, one JSON array per kind.
pub fn seed_json(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Product => include_str!("seed/products.json"),
        ResourceKind::Document => include_str!("seed/documents.json"),
        ResourceKind::Notice => include_str!("seed/notices.json"),
        ResourceKind::TeamMember => include_str!("seed/team_members.json"),
        ResourceKind::MediaItem => include_str!("seed/media_items.json"),
        ResourceKind::CarouselSlide => include_str!("seed/carousel.json"),
        ResourceKind::MailSubmission => include_str!("seed/mail_submissions.json"),
        ResourceKind::Factory => include_str!("seed/factories.json"),
    }
}

pub fn seed_records<R: Resource>() -> Result<Vec<R>, serde_json::Error> {
    serde_json::from_str(seed_json(R::KIND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CarouselSlide, Document, Factory, MailSubmission, MediaItem, Notice, Product, ProductCategory, TeamMember,
    };

    #[test]
    fn every_bundled_seed_parses() {
        assert_eq!(seed_records::<Product>().unwrap().len(), 5);
        assert!(!seed_records::<Document>().unwrap().is_empty());
        assert!(!seed_records::<Notice>().unwrap().is_empty());
        assert!(!seed_records::<TeamMember>().unwrap().is_empty());
        assert!(!seed_records::<MediaItem>().unwrap().is_empty());
        assert!(!seed_records::<CarouselSlide>().unwrap().is_empty());
        assert!(seed_records::<MailSubmission>().unwrap().is_empty());
        assert!(!seed_records::<Factory>().unwrap().is_empty());
    }

    #[test]
    fn seeds_follow_category_rules() {
        for product in seed_records::<Product>().unwrap() {
            assert!(!product.meta.has_server_id());
            if let Some(sub) = &product.subcategory {
                assert!(product.category.subcategories().contains(&sub.as_str()));
            }
            if product.category == ProductCategory::Bhus {
                assert_eq!(product.subcategory, None);
            }
        }
    }
}
