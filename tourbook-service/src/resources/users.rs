//! Users
//!
//! Accounts are created by the identity provider, so the API only lists,
//! reads, updates and deletes them. Password fields can never be changed
//! through it.

use std::sync::LazyLock;

use regex::Regex;

use super::{Collections, ResourceKind, UserStore};
use crate::handlers::{ApiOperation, ResourceHandlers};
use crate::query::{Filter, QueryOptions};
use crate::repository::{Document, FieldRule, Schema, ScopedStore};

pub const COLLECTION: &str = "users";

/// Fields the update handler drops from every body.
pub const PROTECTED_FIELDS: [&str; 2] = ["password", "passwordConfirm"];

/// Routes mounted for users.
pub const OPERATIONS: [ApiOperation; 4] = [
    ApiOperation::List,
    ApiOperation::Get,
    ApiOperation::Update,
    ApiOperation::Delete,
];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

pub fn schema() -> Schema {
    Schema::new(COLLECTION, "user")
        .field(
            FieldRule::string("name")
                .required("User name must be entered...")
                .unique()
                .trim(),
        )
        .field(
            FieldRule::string("email")
                .required("User email address must be provided...")
                .unique()
                .lowercase()
                .matches(&EMAIL, "Invalid email..."),
        )
        .field(FieldRule::string("photo").default_value("default.jpg"))
        .field(
            FieldRule::string("role")
                .enum_values(
                    ["user", "guide", "lead-guide", "admin"],
                    "Role should be user, guide, lead-guide or admin",
                )
                .default_value("user"),
        )
        .field(
            FieldRule::string("password")
                .required("please provide a password...")
                .min_length(4, "Password must be at least 4 characters")
                .hidden(),
        )
        .field(
            FieldRule::string("passwordConfirm")
                .required("please confirm your password...")
                .transient(),
        )
        .field(FieldRule::date("passwordChangedAt"))
        .field(FieldRule::string("passwordResetToken").hidden())
        .field(FieldRule::date("passwordResetExpires").hidden())
        .field(FieldRule::boolean("active").default_value(true).hidden())
        .rule(passwords_match)
}

fn passwords_match(doc: &Document) -> Option<String> {
    let confirm = doc.get("passwordConfirm")?;
    (doc.get("password") != Some(confirm)).then(|| "passwords don't match".to_string())
}

/// Deactivated accounts are invisible.
pub fn visibility() -> Filter {
    Filter::ne("active", false)
}

pub fn store(collections: &Collections) -> UserStore {
    ScopedStore::new(collections.users.clone(), visibility())
}

pub fn handlers(collections: &Collections, options: QueryOptions) -> ResourceHandlers<UserStore> {
    ResourceHandlers::new(ResourceKind::Users.to_string(), store(collections))
        .with_options(options)
        .protect_fields(PROTECTED_FIELDS)
}
