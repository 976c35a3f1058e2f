//! Schema diff between two data models
//!
//! Entities are matched by table name, references by constraint name,
//! indexes by name and attributes by column name.
//!
//! A plan runs in steps that span every table, so a foreign key is never
//! alive while one of its columns (local or referenced) changes:
//!
//! 1. foreign key constraints of changed references are dropped
//! 2. changed indexes are dropped
//! 3. removed tables are dropped, in reverse dependency order
//! 4. new tables are created without foreign keys, in dependency order
//! 5. columns are dropped, modified and added
//! 6. foreign key constraints are added
//! 7. indexes are added

use super::{ColumnMigrator, bind_statements};
use std::collections::HashSet;
use tablesmith_ir::{DataModelContainer, Entity, Index, Reference};

// ============================================================================
// MigrationPlan
// ============================================================================

/// What happens to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    Create,
    Alter,
    Drop,
}

impl TableChange {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            TableChange::Create => "create",
            TableChange::Alter => "alter",
            TableChange::Drop => "drop",
        }
    }
}

/// Plan-wide step a group of statements belongs to, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationStep {
    DropForeignKeys,
    DropIndexes,
    DropTables,
    CreateTables,
    ChangeColumns,
    AddForeignKeys,
    AddIndexes,
}

impl MigrationStep {
    /// Every step in execution order
    pub const ALL: [MigrationStep; 7] = [
        MigrationStep::DropForeignKeys,
        MigrationStep::DropIndexes,
        MigrationStep::DropTables,
        MigrationStep::CreateTables,
        MigrationStep::ChangeColumns,
        MigrationStep::AddForeignKeys,
        MigrationStep::AddIndexes,
    ];
}

/// Bound statements for one table within one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMigration {
    pub table: String,
    pub change: TableChange,
    pub step: MigrationStep,
    pub statements: Vec<String>,
}

/// Ordered statements turning one model into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Statement groups ordered by step; a table may appear in several
    pub tables: Vec<TableMigration>,
}

impl MigrationPlan {
    /// Whether the models are equivalent
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of statements
    pub fn statement_count(&self) -> usize {
        self.tables.iter().map(|t| t.statements.len()).sum()
    }

    /// Number of distinct tables touched
    pub fn table_count(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.table.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// All statements in execution order
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .flat_map(|t| t.statements.iter().map(String::as_str))
    }

    /// First statement group of a table, if it changes
    pub fn table(&self, table: &str) -> Option<&TableMigration> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Every statement touching a table, in execution order
    pub fn statements_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a str> {
        self.tables
            .iter()
            .filter(move |t| t.table == table)
            .flat_map(|t| t.statements.iter().map(String::as_str))
    }

    /// Render as a SQL script, one `;`-terminated statement per line
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for table in &self.tables {
            sql.push_str(&format!(
                "-- {} {}\n",
                table.change.display_name(),
                table.table
            ));
            for statement in &table.statements {
                sql.push_str(statement);
                sql.push_str(";\n");
            }
            sql.push('\n');
        }
        sql
    }

    fn push(
        &mut self,
        table: &str,
        change: TableChange,
        step: MigrationStep,
        statements: Vec<String>,
    ) {
        if !statements.is_empty() {
            self.tables.push(TableMigration {
                table: table.to_string(),
                change,
                step,
                statements,
            });
        }
    }
}

// ============================================================================
// Per-table diff
// ============================================================================

/// Unbound statements of one table, grouped by step
#[derive(Debug, Default)]
struct TableDiff {
    foreign_key_drops: Vec<String>,
    index_drops: Vec<String>,
    table_drop: Vec<String>,
    table_create: Vec<String>,
    column_changes: Vec<String>,
    foreign_key_adds: Vec<String>,
    index_adds: Vec<String>,
}

impl TableDiff {
    fn create(entity: &Entity, migrator: &dyn ColumnMigrator) -> Self {
        let mut diff = TableDiff {
            table_create: vec![migrator.create_table_without_foreign_keys(entity)],
            ..TableDiff::default()
        };
        for reference in entity
            .references
            .iter()
            .filter(|r| r.foreign_table().is_some())
        {
            let (_, constraint) = reference_add(migrator, reference);
            diff.foreign_key_adds.extend(constraint);
        }
        diff
    }

    fn drop(migrator: &dyn ColumnMigrator) -> Self {
        TableDiff {
            table_drop: vec![migrator.drop_table_statement()],
            ..TableDiff::default()
        }
    }

    fn alter(as_is: &Entity, to_be: &Entity, migrator: &dyn ColumnMigrator) -> Self {
        let mut diff = TableDiff::default();

        let reference_changed = |current: &Reference, target: &Reference| {
            !migrator
                .reference_statements(Some(current), Some(target))
                .is_empty()
        };

        // Columns of dropped or rebuilt references; indexes on them go too
        let mut rebuilt_columns: HashSet<&str> = HashSet::new();
        let mut reference_column_drops = Vec::new();
        for reference in &as_is.references {
            let changed = match to_be.get_reference_by_constraint(&reference.constraint_name) {
                None => true,
                Some(target) => reference_changed(reference, target),
            };
            if changed {
                let (constraint, columns) = reference_drop(migrator, reference);
                diff.foreign_key_drops.extend(constraint);
                reference_column_drops.extend(columns);
                rebuilt_columns.extend(reference.column_names());
            }
        }

        let mut reference_column_adds = Vec::new();
        for reference in &to_be.references {
            let changed = match as_is.get_reference_by_constraint(&reference.constraint_name) {
                None => true,
                Some(current) => reference_changed(current, reference),
            };
            if changed {
                let (columns, constraint) = reference_add(migrator, reference);
                reference_column_adds.extend(columns);
                diff.foreign_key_adds.extend(constraint);
            }
        }

        let touches_rebuilt = |index: &Index| {
            index
                .parts
                .iter()
                .any(|p| rebuilt_columns.contains(p.database_name()))
        };
        for index in &as_is.indexes {
            let keep = to_be
                .get_index(&index.name)
                .is_some_and(|target| index.same_definition(target) && !touches_rebuilt(index));
            if !keep {
                diff.index_drops
                    .extend(migrator.index_statements(Some(index), None));
            }
        }
        for index in &to_be.indexes {
            let keep = as_is
                .get_index(&index.name)
                .is_some_and(|current| current.same_definition(index) && !touches_rebuilt(current));
            if !keep {
                diff.index_adds
                    .extend(migrator.index_statements(None, Some(index)));
            }
        }

        let mut attribute_drops = Vec::new();
        let mut attribute_changes = Vec::new();
        for attribute in &as_is.attributes {
            if to_be
                .get_attribute_by_database_name(&attribute.database_name)
                .is_none()
            {
                attribute_drops.extend(migrator.attribute_statements(Some(attribute), None));
            }
        }
        for attribute in &to_be.attributes {
            let current = as_is.get_attribute_by_database_name(&attribute.database_name);
            attribute_changes.extend(migrator.attribute_statements(current, Some(attribute)));
        }

        diff.column_changes = reference_column_drops;
        diff.column_changes.extend(attribute_drops);
        diff.column_changes.extend(attribute_changes);
        diff.column_changes.extend(reference_column_adds);
        diff
    }

    fn step(&self, step: MigrationStep) -> &[String] {
        match step {
            MigrationStep::DropForeignKeys => &self.foreign_key_drops,
            MigrationStep::DropIndexes => &self.index_drops,
            MigrationStep::DropTables => &self.table_drop,
            MigrationStep::CreateTables => &self.table_create,
            MigrationStep::ChangeColumns => &self.column_changes,
            MigrationStep::AddForeignKeys => &self.foreign_key_adds,
            MigrationStep::AddIndexes => &self.index_adds,
        }
    }

    fn into_statements(self) -> Vec<String> {
        let mut statements = self.foreign_key_drops;
        statements.extend(self.index_drops);
        statements.extend(self.table_drop);
        statements.extend(self.table_create);
        statements.extend(self.column_changes);
        statements.extend(self.foreign_key_adds);
        statements.extend(self.index_adds);
        statements
    }
}

/// Split a reference drop into the constraint drop and the column drops.
///
/// A migrator's drop sequence starts with the constraint.
fn reference_drop(
    migrator: &dyn ColumnMigrator,
    reference: &Reference,
) -> (Vec<String>, Vec<String>) {
    let mut constraint = migrator.reference_statements(Some(reference), None);
    let columns = constraint.split_off(constraint.len().min(1));
    (constraint, columns)
}

/// Split a reference add into the column adds and the constraint add.
///
/// A migrator's add sequence ends with the constraint.
fn reference_add(
    migrator: &dyn ColumnMigrator,
    reference: &Reference,
) -> (Vec<String>, Vec<String>) {
    let mut columns = migrator.reference_statements(None, Some(reference));
    let constraint = columns.pop().into_iter().collect();
    (columns, constraint)
}

// ============================================================================
// Diff
// ============================================================================

/// Compute the migration from `as_is` to `to_be`.
///
/// Both containers are expected to be resolved. New tables are created in
/// dependency order and removed tables dropped in reverse dependency order.
pub fn diff_containers(
    as_is: &DataModelContainer,
    to_be: &DataModelContainer,
    migrator: &dyn ColumnMigrator,
) -> MigrationPlan {
    let mut tables: Vec<(&str, TableChange, TableDiff)> = Vec::new();

    for entity in as_is.entities_in_dependency_order().into_iter().rev() {
        if to_be.get_entity_by_table(&entity.table).is_none() {
            tables.push((entity.table.as_str(), TableChange::Drop, TableDiff::drop(migrator)));
        }
    }
    for entity in to_be.entities_in_dependency_order() {
        let (change, diff) = match as_is.get_entity_by_table(&entity.table) {
            None => (TableChange::Create, TableDiff::create(entity, migrator)),
            Some(current) => (TableChange::Alter, TableDiff::alter(current, entity, migrator)),
        };
        tables.push((entity.table.as_str(), change, diff));
    }

    let mut plan = MigrationPlan::default();
    for step in MigrationStep::ALL {
        for (table, change, diff) in &tables {
            let quoted = migrator.quote(table);
            plan.push(table, *change, step, bind_statements(diff.step(step), &quoted));
        }
    }

    tracing::debug!(
        tables = plan.table_count(),
        statements = plan.statement_count(),
        "computed schema diff",
    );

    plan
}

/// Unbound statements turning one table into another.
///
/// Order: foreign key drops, index drops, column changes (reference column
/// drops, column drops, column adds and modifications, reference column
/// adds), foreign key adds, index adds. A new table is created with its
/// foreign keys inline.
pub fn diff_entities(
    as_is: Option<&Entity>,
    to_be: Option<&Entity>,
    migrator: &dyn ColumnMigrator,
) -> Vec<String> {
    match (as_is, to_be) {
        (None, None) => Vec::new(),
        (None, Some(to_be)) => vec![migrator.create_table_statement(to_be)],
        (Some(_), None) => TableDiff::drop(migrator).into_statements(),
        (Some(as_is), Some(to_be)) => TableDiff::alter(as_is, to_be, migrator).into_statements(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::MySqlColumnMigrator;
    use pretty_assertions::assert_eq;
    use tablesmith_core::ReferentialAction;
    use tablesmith_ir::Attribute;

    fn resolved(entities: Vec<Entity>) -> DataModelContainer {
        let mut container = DataModelContainer::new();
        for entity in entities {
            container.register_entity(entity).unwrap();
        }
        container.resolve_all();
        container
    }

    fn customer() -> Entity {
        Entity::new("Customer", "customers").with_attribute(Attribute::primary_key())
    }

    fn order() -> Entity {
        Entity::new("Order", "orders")
            .with_attribute(Attribute::primary_key())
            .with_attribute(Attribute::new("email", "VARCHAR(100)"))
            .with_index(Index::new("idx_email").on("email"))
    }

    fn customer_reference() -> Reference {
        Reference::new("customer", "Customer").with_default_mapping("id")
    }

    #[test]
    fn test_identical_models_have_empty_plan() {
        let as_is = resolved(vec![customer(), order()]);
        let to_be = resolved(vec![customer(), order()]);

        let plan = diff_containers(&as_is, &to_be, &MySqlColumnMigrator::new());
        assert!(plan.is_empty());
        assert_eq!(plan.to_sql(), "");
    }

    #[test]
    fn test_create_in_dependency_order_and_drop_in_reverse() {
        let empty = DataModelContainer::new();
        let shop = resolved(vec![order().with_reference(customer_reference()), customer()]);
        let migrator = MySqlColumnMigrator::new();

        let plan = diff_containers(&empty, &shop, &migrator);
        let steps: Vec<(&str, MigrationStep)> = plan
            .tables
            .iter()
            .map(|t| (t.table.as_str(), t.step))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("customers", MigrationStep::CreateTables),
                ("orders", MigrationStep::CreateTables),
                ("orders", MigrationStep::AddForeignKeys),
            ]
        );
        assert!(plan.tables.iter().all(|t| t.change == TableChange::Create));
        assert_eq!(plan.table_count(), 2);

        let orders: Vec<&str> = plan.statements_for("orders").collect();
        assert!(orders[0].starts_with("CREATE TABLE `orders` ("));
        assert!(!orders[0].contains("FOREIGN KEY"));
        assert_eq!(
            orders[1],
            "ALTER TABLE `orders` ADD CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) \
             REFERENCES `customers` (`id`) ON DELETE RESTRICT ON UPDATE RESTRICT"
        );

        let plan = diff_containers(&shop, &empty, &migrator);
        let tables: Vec<&str> = plan.tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(tables, vec!["orders", "customers"]);
        assert_eq!(
            plan.table("orders").unwrap().statements,
            vec!["DROP TABLE IF EXISTS `orders`"]
        );
    }

    #[test]
    fn test_alter_orders_drops_before_adds() {
        let as_is = resolved(vec![
            customer(),
            order()
                .with_attribute(Attribute::new("legacy", "INT"))
                .with_reference(customer_reference()),
        ]);
        let to_be = resolved(vec![
            customer(),
            Entity::new("Order", "orders")
                .with_attribute(Attribute::primary_key())
                .with_attribute(Attribute::new("email", "VARCHAR(200)"))
                .with_index(Index::new("idx_email").unique().on("email"))
                .with_reference(customer_reference().on_delete(ReferentialAction::Cascade)),
        ]);

        let plan = diff_containers(&as_is, &to_be, &MySqlColumnMigrator::new());
        assert_eq!(plan.table_count(), 1);
        assert!(plan.tables.iter().all(|t| t.change == TableChange::Alter));
        assert_eq!(
            plan.statements().collect::<Vec<_>>(),
            vec![
                "ALTER TABLE `orders` DROP FOREIGN KEY `orders_customer`",
                "ALTER TABLE `orders` DROP INDEX `idx_email`",
                "ALTER TABLE `orders` DROP COLUMN `customer_id`",
                "ALTER TABLE `orders` DROP COLUMN `legacy`",
                "ALTER TABLE `orders` MODIFY `email` VARCHAR(200)",
                "ALTER TABLE `orders` ADD `customer_id` INT",
                "ALTER TABLE `orders` ADD CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) \
                 REFERENCES `customers` (`id`) ON DELETE CASCADE ON UPDATE RESTRICT",
                "ALTER TABLE `orders` ADD UNIQUE INDEX `idx_email` (`email`)",
            ]
        );

        let sql = plan.to_sql();
        assert!(sql.starts_with("-- alter orders\n"));
        assert_eq!(sql.matches(";\n").count(), 8);
    }

    #[test]
    fn test_referenced_column_change_runs_between_foreign_key_drop_and_add() {
        let as_is = resolved(vec![customer(), order().with_reference(customer_reference())]);
        let to_be = resolved(vec![
            Entity::new("Customer", "customers").with_attribute(
                Attribute::new("id", "BIGINT")
                    .primary()
                    .with_auto_value("autoincrement"),
            ),
            order().with_reference(customer_reference()),
        ]);

        let plan = diff_containers(&as_is, &to_be, &MySqlColumnMigrator::new());
        assert_eq!(
            plan.statements().collect::<Vec<_>>(),
            vec![
                "ALTER TABLE `orders` DROP FOREIGN KEY `orders_customer`",
                "ALTER TABLE `customers` MODIFY `id` BIGINT",
                "ALTER TABLE `orders` DROP COLUMN `customer_id`",
                "ALTER TABLE `orders` ADD `customer_id` BIGINT",
                "ALTER TABLE `orders` ADD CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) \
                 REFERENCES `customers` (`id`) ON DELETE RESTRICT ON UPDATE RESTRICT",
            ]
        );
    }

    #[test]
    fn test_new_table_references_column_added_in_same_plan() {
        let as_is = resolved(vec![customer()]);
        let to_be = resolved(vec![
            customer().with_attribute(Attribute::new("code", "CHAR(8)")),
            Entity::new("Order", "orders")
                .with_attribute(Attribute::primary_key())
                .with_reference(
                    Reference::new("customer", "Customer").with_mapping("customer_code", "code"),
                ),
        ]);

        let plan = diff_containers(&as_is, &to_be, &MySqlColumnMigrator::new());
        let statements: Vec<&str> = plan.statements().collect();
        let add_code = statements
            .iter()
            .position(|s| *s == "ALTER TABLE `customers` ADD `code` CHAR(8)")
            .unwrap();
        let constraint = statements
            .iter()
            .position(|s| s.contains("ADD CONSTRAINT `orders_customer`"))
            .unwrap();
        assert!(statements[0].starts_with("CREATE TABLE `orders` ("));
        assert!(add_code < constraint);
    }

    #[test]
    fn test_index_on_rebuilt_reference_is_recreated() {
        let with_index = |reference: Reference| {
            Entity::new("Order", "orders")
                .with_attribute(Attribute::primary_key())
                .with_reference(reference)
                .with_index(Index::new("idx_customer").on("customer_id"))
        };
        let as_is = resolved(vec![customer(), with_index(customer_reference())]);
        let to_be = resolved(vec![
            customer(),
            with_index(customer_reference().on_delete(ReferentialAction::Cascade)),
        ]);

        let plan = diff_containers(&as_is, &to_be, &MySqlColumnMigrator::new());
        assert_eq!(
            plan.statements().collect::<Vec<_>>(),
            vec![
                "ALTER TABLE `orders` DROP FOREIGN KEY `orders_customer`",
                "ALTER TABLE `orders` DROP INDEX `idx_customer`",
                "ALTER TABLE `orders` DROP COLUMN `customer_id`",
                "ALTER TABLE `orders` ADD `customer_id` INT",
                "ALTER TABLE `orders` ADD CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) \
                 REFERENCES `customers` (`id`) ON DELETE CASCADE ON UPDATE RESTRICT",
                "ALTER TABLE `orders` ADD INDEX `idx_customer` (`customer_id`)",
            ]
        );

        let steps: Vec<MigrationStep> = plan.tables.iter().map(|t| t.step).collect();
        let mut sorted = steps.clone();
        sorted.sort();
        assert_eq!(steps, sorted);
    }

    #[test]
    fn test_diff_entities_edge_cases() {
        let migrator = MySqlColumnMigrator::new();
        assert!(diff_entities(None, None, &migrator).is_empty());
        assert_eq!(
            diff_entities(Some(&customer()), None, &migrator),
            vec!["DROP TABLE IF EXISTS !TABLE!"]
        );
    }
}
