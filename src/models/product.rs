use super::{EntityMeta, Resource, ResourceKind, ValidationError};
use crate::helper::form_helpers::{self, JsonMap};
use serde::{Deserialize, Serialize};

choice_enum!(ProductCategory {
    Dana => "dana",
    Bhus => "bhus",
    Pitho => "pitho",
    Tel => "tel",
    Other => "other",
});

impl ProductCategory {
    /// Subcategories accepted under this category. Empty means none are defined.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            ProductCategory::Dana => &["poultry", "cattle", "goat", "pig", "fish"],
            ProductCategory::Pitho => &["wheat", "maize", "rice"],
            ProductCategory::Tel => &["mustard", "soybean", "sunflower"],
            ProductCategory::Bhus | ProductCategory::Other => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub description: String,
    /// Free-form display price, e.g. "Rs. 1,200 / 25kg".
    pub price: String,
    pub category: ProductCategory,
    pub subcategory: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub contact_phone: Option<String>,
}

impl Resource for Product {
    const KIND: ResourceKind = ResourceKind::Product;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        let name = form_helpers::required_string(body, "name")?;
        let description = form_helpers::required_string(body, "description")?;
        let price = form_helpers::required_string(body, "price")?;
        let category: ProductCategory = form_helpers::required_choice(body, "category")?;

        let subcategory = form_helpers::optional_string(body, "subcategory")?;
        if let Some(sub) = &subcategory {
            let allowed = category.subcategories();
            if allowed.is_empty() {
                return Err(ValidationError::new(format!(
                    "Category '{}' does not have subcategories.",
                    category.as_str()
                )));
            }
            if !allowed.contains(&sub.as_str()) {
                return Err(ValidationError::new(format!(
                    "Invalid subcategory '{}' for category '{}'. Allowed values: {}.",
                    sub,
                    category.as_str(),
                    allowed.join(", ")
                )));
            }
        }

        Ok(Product {
            meta: EntityMeta::default(),
            name,
            description,
            price,
            category,
            subcategory,
            image_url: form_helpers::optional_string(body, "imageUrl")?,
            in_stock: form_helpers::optional_bool(body, "inStock")?.unwrap_or(true),
            contact_phone: form_helpers::optional_string(body, "contactPhone")?,
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn payload(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn bhus_rejects_any_subcategory() {
        let body = payload(json!({
            "name": "Rice Bran", "description": "Fresh bran", "price": "Rs. 900",
            "category": "bhus", "subcategory": "poultry"
        }));
        let err = Product::from_payload(&body).unwrap_err();
        assert_eq!(err.0, "Category 'bhus' does not have subcategories.");
    }

    #[test]
    fn blank_subcategory_is_dropped() {
        let body = payload(json!({
            "name": "Rice Bran", "description": "Fresh bran", "price": "Rs. 900",
            "category": "bhus", "subcategory": "  "
        }));
        let product = Product::from_payload(&body).unwrap();
        assert_eq!(product.subcategory, None);
        assert!(product.in_stock);
    }

    #[test]
    fn subcategory_must_belong_to_category() {
        let body = payload(json!({
            "name": "Layer Feed", "description": "Complete feed", "price": "Rs. 2,450",
            "category": "dana", "subcategory": "wheat"
        }));
        assert!(Product::from_payload(&body).is_err());

        let body = payload(json!({
            "name": " Layer Feed ", "description": "Complete feed", "price": "Rs. 2,450",
            "category": "dana", "subcategory": "poultry", "inStock": false
        }));
        let product = Product::from_payload(&body).unwrap();
        assert_eq!(product.name, "Layer Feed");
        assert_eq!(product.subcategory.as_deref(), Some("poultry"));
        assert!(!product.in_stock);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let body = payload(json!({
            "name": "Tractor", "description": "Big", "price": "n/a", "category": "machinery"
        }));
        assert!(Product::from_payload(&body).unwrap_err().0.starts_with("Invalid category"));
    }
}
