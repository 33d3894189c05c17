//! Tours

use heck::ToKebabCase;
use serde_json::Value;

use super::{reviews, users, Collections, ResourceKind, TourStore};
use crate::handlers::ResourceHandlers;
use crate::query::{Filter, ParameterPolicy, Projection, QueryAlias, QueryOptions};
use crate::repository::{Document, Expansion, FieldRule, FieldType, Schema, ScopedStore};

pub const COLLECTION: &str = "tours";

/// Parameters that may repeat in a tour list query.
pub const REPEATABLE_PARAMETERS: [&str; 6] = [
    "duration",
    "ratingsQuantity",
    "ratingsAverage",
    "maxGroupSize",
    "difficulty",
    "price",
];

pub fn schema() -> Schema {
    Schema::new(COLLECTION, "tour")
        .field(
            FieldRule::string("name")
                .required("A tour must have a name")
                .unique()
                .trim()
                .max_length(40, "Tour name cannot be more than 40 characters")
                .min_length(10, "Tour name cannot be less than 10 characters"),
        )
        .field(FieldRule::number("price").required("A tour must have a price"))
        .field(FieldRule::number("duration").required("A tour must have a duration"))
        .field(FieldRule::number("maxGroupSize").required("A tour must have a group size"))
        .field(
            FieldRule::string("difficulty")
                .required("A tour must have a difficulty")
                .enum_values(
                    ["easy", "medium", "difficult"],
                    "Difficulty should be easy, medium or difficult",
                ),
        )
        .field(
            FieldRule::number("ratingsAverage")
                .default_value(4)
                .min(1.0, "Rating must be above 1")
                .max(5.0, "Rating must be below 5")
                .round_to(1),
        )
        .field(FieldRule::number("ratingsQuantity").default_value(0))
        .field(FieldRule::number("priceDiscount"))
        .field(FieldRule::string("summary").trim().required("A tour must have a description"))
        .field(FieldRule::string("description").trim())
        .field(FieldRule::string("imageCover").required("A tour must have a cover image"))
        .field(FieldRule::array("images", FieldType::String))
        .field(FieldRule::date("createdAt").default_now().hidden())
        .field(FieldRule::array("startDates", FieldType::Date))
        .field(FieldRule::string("slug"))
        .field(FieldRule::boolean("secretTour").default_value(false))
        .field(FieldRule::object("startLocation"))
        .field(FieldRule::array("locations", FieldType::Object))
        .field(FieldRule::array("guides", FieldType::Reference))
        .rule(discount_below_price)
        .before_create(slugify_name)
        .virtual_field("durationWeeks", duration_weeks)
}

fn discount_below_price(doc: &Document) -> Option<String> {
    let discount = doc.get("priceDiscount").and_then(Value::as_f64)?;
    let price = doc.get("price").and_then(Value::as_f64)?;
    (discount >= price).then(|| "Price is less than price discount".to_string())
}

fn slugify_name(doc: &mut Document) {
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = name.to_kebab_case();
        doc.insert("slug".to_string(), Value::String(slug));
    }
}

fn duration_weeks(doc: &Document) -> Option<Value> {
    let days = doc.get("duration").and_then(Value::as_f64)?;
    serde_json::Number::from_f64(days / 7.0).map(Value::Number)
}

/// Secret tours are never listed, fetched, updated or deleted.
pub fn visibility() -> Filter {
    Filter::ne("secretTour", true)
}

pub fn parameter_policy() -> ParameterPolicy {
    ParameterPolicy::new().with_whitelist(REPEATABLE_PARAMETERS)
}

/// The five best rated tours, cheapest first among equals.
pub fn top_five_cheap() -> QueryAlias {
    QueryAlias::new("top-5-cheap")
        .set("limit", "5")
        .set("sort", "-ratingsAverage,price")
        .set("fields", "name,price,ratingsAverage,summary,difficulty")
}

/// Inline guide profiles in place of their ids.
pub fn guides() -> Expansion {
    Expansion::reference("guides", users::COLLECTION)
        .select(Projection::exclude(["__v", "passwordChangedAt"]))
        .only(users::visibility())
}

/// Inline the tour's reviews with their authors.
pub fn reviews() -> Expansion {
    Expansion::virtual_field("reviews", reviews::COLLECTION, "tour").then(reviews::author())
}

pub fn store(collections: &Collections) -> TourStore {
    ScopedStore::new(collections.tours.clone(), visibility())
}

pub fn handlers(collections: &Collections, options: QueryOptions) -> ResourceHandlers<TourStore> {
    ResourceHandlers::new(ResourceKind::Tours.to_string(), store(collections))
        .with_options(options)
        .with_policy(parameter_policy())
        .expand_list(vec![guides()])
        .expand_item(vec![guides(), reviews()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{DocumentStore, MemoryDatabase, RepositoryErrorKind};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn sample(name: &str, price: f64) -> Document {
        doc(json!({
            "name": name,
            "price": price,
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "summary": "  Breathtaking hike through the Canadian Banff National Park  ",
            "imageCover": "tour-1-cover.jpg",
        }))
    }

    #[tokio::test]
    async fn test_create_fills_defaults_and_slug() {
        let db = MemoryDatabase::new();
        let tours = db.register(schema());
        let created = tours.create(sample("The Forest Hiker", 397.0)).await.unwrap();

        assert!(created["_id"].as_str().unwrap().starts_with("tour_"));
        assert_eq!(created["slug"], json!("the-forest-hiker"));
        assert_eq!(created["ratingsAverage"], json!(4));
        assert_eq!(created["ratingsQuantity"], json!(0));
        assert_eq!(created["secretTour"], json!(false));
        assert_eq!(created["summary"], json!("Breathtaking hike through the Canadian Banff National Park"));
        assert_eq!(created["durationWeeks"].as_f64().unwrap(), 5.0 / 7.0);
        assert!(!created.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let db = MemoryDatabase::new();
        let tours = db.register(schema());

        let mut body = sample("Short", 397.0);
        body.insert("difficulty".into(), json!("extreme"));
        body.insert("priceDiscount".into(), json!(500));
        let err = tours.create(body).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(
            err.message,
            "Invalid input data : Tour name cannot be less than 10 characters. \
             Difficulty should be easy, medium or difficult. Price is less than price discount"
        );
        assert!(tours.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let db = MemoryDatabase::new();
        let tours = db.register(schema());
        tours.create(sample("The Sea Explorer", 497.0)).await.unwrap();
        let err = tours.create(sample("The Sea Explorer", 297.0)).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(
            err.message,
            "Duplicate field value : 'The Sea Explorer'. Please use another value."
        );
    }

    #[test]
    fn test_ratings_average_is_rounded() {
        let mut body = sample("The Snow Adventurer", 997.0);
        body.insert("ratingsAverage".into(), json!(4.666));
        let prepared = schema().prepare_new(body).unwrap();
        assert_eq!(prepared["ratingsAverage"], json!(4.7));
    }

    #[test]
    fn test_top_five_cheap_alias() {
        let alias = top_five_cheap();
        assert_eq!(alias.name(), "top-5-cheap");
        assert!(parameter_policy().allows_repeated("price"));
        assert!(!parameter_policy().allows_repeated("sort"));
    }
}
