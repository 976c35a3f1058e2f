//! MySQL column migrator

use super::{ColumnMigrator, TABLE_PLACEHOLDER};
use tablesmith_core::DatabaseType;
use tablesmith_ir::{Attribute, Entity, Index, IndexPart, Reference};

/// Index types MySQL writes as an index kind rather than `USING`
const INDEX_KINDS: &[&str] = &["fulltext", "spatial"];

// ============================================================================
// MySqlColumnMigrator
// ============================================================================

/// Writes MySQL DDL
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlColumnMigrator;

impl MySqlColumnMigrator {
    pub fn new() -> Self {
        Self
    }

    fn quote_list<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> String {
        names
            .into_iter()
            .map(|n| self.quote(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn add_column(&self, name: &str, database_type: &str) -> String {
        format!(
            "ALTER TABLE {TABLE_PLACEHOLDER} ADD {} {}",
            self.quote(name),
            database_type.trim()
        )
    }

    fn drop_column(&self, name: &str) -> String {
        format!("ALTER TABLE {TABLE_PLACEHOLDER} DROP COLUMN {}", self.quote(name))
    }

    // ========================================================================
    // References
    // ========================================================================

    /// `FOREIGN KEY (...) REFERENCES ... ON DELETE ... ON UPDATE ...`
    fn foreign_key_clause(&self, reference: &Reference) -> String {
        let columns = reference.columns();
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.quote(&reference.constraint_name),
            self.quote_list(columns.iter().map(|c| c.database_name.as_str())),
            self.quote(reference.foreign_table().unwrap_or_default()),
            self.quote_list(columns.iter().map(|c| c.referenced_database_name.as_str())),
            reference.on_delete.to_sql(),
            reference.on_update.to_sql(),
        )
    }

    fn add_reference(&self, reference: &Reference) -> Vec<String> {
        let mut statements: Vec<String> = reference
            .columns()
            .iter()
            .map(|c| self.add_column(&c.database_name, &c.database_type))
            .collect();

        statements.push(format!(
            "ALTER TABLE {TABLE_PLACEHOLDER} ADD {}",
            self.foreign_key_clause(reference)
        ));
        statements
    }

    fn drop_reference(&self, reference: &Reference) -> Vec<String> {
        let mut statements = vec![format!(
            "ALTER TABLE {TABLE_PLACEHOLDER} DROP FOREIGN KEY {}",
            self.quote(&reference.constraint_name)
        )];
        statements.extend(reference.column_names().map(|c| self.drop_column(c)));
        statements
    }

    fn same_reference(as_is: &Reference, to_be: &Reference) -> bool {
        if as_is.foreign_table() != to_be.foreign_table() {
            return false;
        }
        if as_is.on_delete != to_be.on_delete || as_is.on_update != to_be.on_update {
            return false;
        }

        let (a, b) = (as_is.columns(), to_be.columns());
        a.len() == b.len()
            && a.iter().zip(b).all(|(a, b)| {
                a.database_name == b.database_name
                    && a.referenced_database_name == b.referenced_database_name
                    && a.database_type.trim().eq_ignore_ascii_case(b.database_type.trim())
            })
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    fn index_part(&self, part: &IndexPart) -> String {
        let mut sql = self.quote(part.database_name());
        if let Some(length) = part.length {
            sql.push_str(&format!("({length})"));
        }
        if let Some(sort_order) = part.sort_order {
            sql.push(' ');
            sql.push_str(sort_order.to_sql());
        }
        sql
    }

    /// `[UNIQUE |FULLTEXT |SPATIAL ]INDEX name (parts)[ USING type]`
    fn index_definition(&self, index: &Index) -> String {
        let index_type = index.index_type();
        let kind = match index_type {
            Some(t) if INDEX_KINDS.contains(&t) => format!("{} ", t.to_uppercase()),
            _ if index.is_unique => "UNIQUE ".to_string(),
            _ => String::new(),
        };
        let using = match index_type {
            Some(t) if !INDEX_KINDS.contains(&t) => format!(" USING {}", t.to_uppercase()),
            _ => String::new(),
        };
        let parts = index
            .parts
            .iter()
            .map(|p| self.index_part(p))
            .collect::<Vec<_>>()
            .join(", ");

        format!("{kind}INDEX {} ({parts}){using}", self.quote(&index.name))
    }

    fn add_index(&self, index: &Index) -> String {
        format!(
            "ALTER TABLE {TABLE_PLACEHOLDER} ADD {}",
            self.index_definition(index)
        )
    }

    fn drop_index(&self, index: &Index) -> String {
        format!(
            "ALTER TABLE {TABLE_PLACEHOLDER} DROP INDEX {}",
            self.quote(&index.name)
        )
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn table_definition(&self, entity: &Entity, foreign_keys: bool) -> String {
        let mut definitions: Vec<String> = entity
            .attributes
            .iter()
            .map(|a| self.column_definition(a))
            .collect();

        for reference in &entity.references {
            for column in reference.columns() {
                let mut sql = format!(
                    "{} {}",
                    self.quote(&column.database_name),
                    column.database_type.trim()
                );
                if reference.is_required {
                    sql.push_str(" NOT NULL");
                }
                definitions.push(sql);
            }
        }

        let primary_key: Vec<&str> = entity
            .primary_key_attributes()
            .map(|a| a.database_name.as_str())
            .collect();
        if !primary_key.is_empty() {
            definitions.push(format!("PRIMARY KEY ({})", self.quote_list(primary_key)));
        }

        definitions.extend(entity.indexes.iter().map(|i| self.index_definition(i)));
        if foreign_keys {
            definitions.extend(
                entity
                    .references
                    .iter()
                    .filter(|r| r.foreign_table().is_some())
                    .map(|r| self.foreign_key_clause(r)),
            );
        }

        format!(
            "CREATE TABLE {TABLE_PLACEHOLDER} (\n    {}\n)",
            definitions.join(",\n    ")
        )
    }

    // ========================================================================
    // Columns
    // ========================================================================

    fn column_definition(&self, attribute: &Attribute) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote(&attribute.database_name),
            attribute.database_type.trim()
        );
        if attribute.is_required || attribute.is_primary_key {
            sql.push_str(" NOT NULL");
        }
        if attribute.is_auto_increment() {
            sql.push_str(" AUTO_INCREMENT");
        }
        if let Some(default) = &attribute.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

impl ColumnMigrator for MySqlColumnMigrator {
    fn database(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    fn quote(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn drop_table_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {TABLE_PLACEHOLDER}")
    }

    fn create_table_statement(&self, entity: &Entity) -> String {
        self.table_definition(entity, true)
    }

    fn create_table_without_foreign_keys(&self, entity: &Entity) -> String {
        self.table_definition(entity, false)
    }

    fn attribute_statements(
        &self,
        as_is: Option<&Attribute>,
        to_be: Option<&Attribute>,
    ) -> Vec<String> {
        match (as_is, to_be) {
            (None, None) => Vec::new(),
            (None, Some(to_be)) => {
                vec![self.add_column(&to_be.database_name, &to_be.database_type)]
            }
            (Some(as_is), None) => vec![self.drop_column(&as_is.database_name)],
            (Some(as_is), Some(to_be)) if as_is.same_type_as(to_be) => Vec::new(),
            (Some(as_is), Some(to_be)) => vec![format!(
                "ALTER TABLE {TABLE_PLACEHOLDER} MODIFY {} {}",
                self.quote(&as_is.database_name),
                to_be.database_type.trim()
            )],
        }
    }

    fn reference_statements(
        &self,
        as_is: Option<&Reference>,
        to_be: Option<&Reference>,
    ) -> Vec<String> {
        match (as_is, to_be) {
            (None, None) => Vec::new(),
            (None, Some(to_be)) => self.add_reference(to_be),
            (Some(as_is), None) => self.drop_reference(as_is),
            (Some(as_is), Some(to_be)) if Self::same_reference(as_is, to_be) => Vec::new(),
            (Some(as_is), Some(to_be)) => {
                let mut statements = self.drop_reference(as_is);
                statements.extend(self.add_reference(to_be));
                statements
            }
        }
    }

    fn index_statements(&self, as_is: Option<&Index>, to_be: Option<&Index>) -> Vec<String> {
        match (as_is, to_be) {
            (None, None) => Vec::new(),
            (None, Some(to_be)) => vec![self.add_index(to_be)],
            (Some(as_is), None) => vec![self.drop_index(as_is)],
            (Some(as_is), Some(to_be)) if as_is.same_definition(to_be) => Vec::new(),
            (Some(as_is), Some(to_be)) => vec![self.drop_index(as_is), self.add_index(to_be)],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tablesmith_core::ReferentialAction;
    use tablesmith_ir::{DataModelContainer, SortOrder};

    fn migrator() -> MySqlColumnMigrator {
        MySqlColumnMigrator::new()
    }

    /// Resolved `orders.customer` reference with the given mappings
    fn resolved_reference(reference: Reference) -> Reference {
        let mut container = DataModelContainer::new();
        container
            .register_entity(
                Entity::new("Customer", "customers")
                    .with_attribute(Attribute::primary_key())
                    .with_attribute(Attribute::new("code", "CHAR(8)")),
            )
            .unwrap();
        container
            .register_entity(
                Entity::new("Order", "orders")
                    .with_attribute(Attribute::primary_key())
                    .with_reference(reference),
            )
            .unwrap();
        container.resolve_all();
        container.get_entity_by_table("orders").unwrap().references[0].clone()
    }

    #[test]
    fn test_quote() {
        assert_eq!(migrator().quote("orders"), "`orders`");
        assert_eq!(migrator().quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_attribute_equal_types_no_statements() {
        let a = Attribute::new("email", "VARCHAR(100)");
        let b = Attribute::new("email", "varchar(100) ");
        assert!(migrator().attribute_statements(Some(&a), Some(&b)).is_empty());
        assert!(migrator().attribute_statements(None, None).is_empty());
    }

    #[test]
    fn test_attribute_add_drop_modify() {
        let a = Attribute::new("email", "VARCHAR(100)");
        let b = Attribute::new("email", "VARCHAR(200)");

        assert_eq!(
            migrator().attribute_statements(None, Some(&b)),
            vec!["ALTER TABLE !TABLE! ADD `email` VARCHAR(200)"]
        );
        assert_eq!(
            migrator().attribute_statements(Some(&a), None),
            vec!["ALTER TABLE !TABLE! DROP COLUMN `email`"]
        );
        assert_eq!(
            migrator().attribute_statements(Some(&a), Some(&b)),
            vec!["ALTER TABLE !TABLE! MODIFY `email` VARCHAR(200)"]
        );
    }

    #[test]
    fn test_reference_add() {
        let reference = resolved_reference(
            Reference::new("customer", "Customer")
                .with_mapping("customer_id", "id")
                .with_mapping("customer_code", "code")
                .on_delete(ReferentialAction::Cascade),
        );

        let statements = migrator().reference_statements(None, Some(&reference));
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE !TABLE! ADD `customer_id` INT",
                "ALTER TABLE !TABLE! ADD `customer_code` CHAR(8)",
                "ALTER TABLE !TABLE! ADD CONSTRAINT `orders_customer` \
                 FOREIGN KEY (`customer_id`, `customer_code`) \
                 REFERENCES `customers` (`id`, `code`) ON DELETE CASCADE ON UPDATE RESTRICT",
            ]
        );
    }

    #[test]
    fn test_reference_drop() {
        let reference = resolved_reference(
            Reference::new("customer", "Customer")
                .with_mapping("customer_id", "id")
                .with_mapping("customer_code", "code"),
        );

        let statements = migrator().reference_statements(Some(&reference), None);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE !TABLE! DROP FOREIGN KEY `orders_customer`",
                "ALTER TABLE !TABLE! DROP COLUMN `customer_id`",
                "ALTER TABLE !TABLE! DROP COLUMN `customer_code`",
            ]
        );
    }

    #[test]
    fn test_reference_modify_is_drop_then_add() {
        let as_is = resolved_reference(
            Reference::new("customer", "Customer").with_mapping("customer_id", "id"),
        );
        let same = resolved_reference(
            Reference::new("customer", "Customer").with_mapping("customer_id", "id"),
        );
        assert!(migrator().reference_statements(Some(&as_is), Some(&same)).is_empty());

        let to_be = resolved_reference(
            Reference::new("customer", "Customer")
                .with_mapping("customer_id", "id")
                .on_delete(ReferentialAction::SetNull),
        );
        let statements = migrator().reference_statements(Some(&as_is), Some(&to_be));
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("DROP FOREIGN KEY"));
        assert!(statements[1].contains("DROP COLUMN"));
        assert!(statements[2].contains("ADD `customer_id` INT"));
        assert!(statements[3].contains("ON DELETE SET NULL"));
    }

    #[test]
    fn test_index_statements() {
        let mut as_is = Index::new("idx_email").unique().on("email");
        as_is.resolve(
            &Entity::new("User", "users").with_attribute(Attribute::new("email", "VARCHAR(100)")),
        );
        let identical = as_is.clone();
        assert!(migrator().index_statements(Some(&as_is), Some(&identical)).is_empty());

        let to_be = Index::new("idx_email")
            .with_index_type("btree")
            .with_part(IndexPart::new("email").with_length(20).with_sort_order(SortOrder::Desc));
        assert_eq!(
            migrator().index_statements(Some(&as_is), Some(&to_be)),
            vec![
                "ALTER TABLE !TABLE! DROP INDEX `idx_email`",
                "ALTER TABLE !TABLE! ADD INDEX `idx_email` (`email`(20) DESC) USING BTREE",
            ]
        );

        let fulltext = Index::new("ft_body").with_index_type("fulltext").on("body");
        assert_eq!(
            migrator().index_statements(None, Some(&fulltext)),
            vec!["ALTER TABLE !TABLE! ADD FULLTEXT INDEX `ft_body` (`body`)"]
        );
        assert_eq!(
            migrator().index_statements(Some(&as_is), None),
            vec!["ALTER TABLE !TABLE! DROP INDEX `idx_email`"]
        );
    }

    #[test]
    fn test_create_table() {
        let mut container = DataModelContainer::new();
        container
            .register_entity(
                Entity::new("Customer", "customers").with_attribute(Attribute::primary_key()),
            )
            .unwrap();
        container
            .register_entity(
                Entity::new("Order", "orders")
                    .with_attribute(Attribute::primary_key())
                    .with_attribute(
                        Attribute::new("status", "VARCHAR(10)")
                            .required()
                            .with_default("'new'"),
                    )
                    .with_reference(
                        Reference::new("customer", "Customer")
                            .with_default_mapping("id")
                            .required(),
                    )
                    .with_index(Index::new("idx_status").on("status")),
            )
            .unwrap();
        container.resolve_all();

        let orders = container.get_entity_by_table("orders").unwrap();
        let sql = migrator().create_table_statement(orders);
        assert_eq!(
            sql,
            "CREATE TABLE !TABLE! (\n    \
             `id` INT NOT NULL AUTO_INCREMENT,\n    \
             `status` VARCHAR(10) NOT NULL DEFAULT 'new',\n    \
             `customer_id` INT NOT NULL,\n    \
             PRIMARY KEY (`id`),\n    \
             INDEX `idx_status` (`status`),\n    \
             CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) \
             REFERENCES `customers` (`id`) ON DELETE RESTRICT ON UPDATE RESTRICT\n\
             )"
        );

        let bare = migrator().create_table_without_foreign_keys(orders);
        assert!(bare.contains("`customer_id` INT NOT NULL,\n"));
        assert!(bare.ends_with("INDEX `idx_status` (`status`)\n)"));
        assert!(!bare.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(migrator().drop_table_statement(), "DROP TABLE IF EXISTS !TABLE!");
    }
}
