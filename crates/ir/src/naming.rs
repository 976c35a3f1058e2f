//! Naming conventions shared by the model and the generators
//!
//! Pure functions that derive table, column, constraint and accessor names
//! from the names declared in the schema.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Accessor name for a reference or collector ("lineItems" → "LineItems")
pub fn method_name(name: &str) -> String {
    name.to_upper_camel_case()
}

/// Default table name for a class ("OrderLine" → "order_line")
pub fn default_table_name(class_name: &str) -> String {
    class_name.to_snake_case()
}

/// Default local column for a reference mapping ("customer", "id" → "customer_id")
pub fn reference_column_name(reference_name: &str, foreign_attribute: &str) -> String {
    format!(
        "{}_{}",
        reference_name.to_snake_case(),
        foreign_attribute.to_snake_case()
    )
}

/// Default foreign key constraint name ("orders", "customer" → "orders_customer")
pub fn constraint_name(table: &str, reference_name: &str) -> String {
    format!("{}_{}", table, reference_name.to_snake_case())
}

/// Strip a namespace prefix (`App\Model\Order` or `app::model::Order` → `Order`)
pub fn short_class_name(name: &str) -> &str {
    let name = name.rsplit('\\').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
