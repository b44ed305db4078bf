mod category_service;
mod errors;

pub use category_service::{
    ServiceDependencies, associations_of, bulk_associate, create_category, delete_category,
    get_category, items_tagged_by, list_categories, reconcile_associations, update_category,
};
pub use errors::{CategoryApplicationError, Result};
