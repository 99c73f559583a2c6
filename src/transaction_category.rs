//! Transaction categories, arranged as a tree of parents and children.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error, endpoints,
    resource::{Conflict, Dependent, Resource, RowsAffected},
    validation::{positive_id, required_text, row_exists, same_text},
};

/// A category such as "Food", optionally nested under a parent category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCategory {
    /// The ID of the category.
    pub id: DatabaseId,
    /// The name, unique among its siblings.
    pub name: String,
    /// The parent category, or `None` for a top-level category.
    pub parent_id: Option<DatabaseId>,
    /// The name of the parent category.
    pub parent_name: Option<String>,
}

/// The request body for creating or replacing a transaction category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionCategoryPayload {
    /// The name of the category.
    pub name: String,
    /// The parent category, or `None` for a top-level category.
    pub parent_id: Option<DatabaseId>,
}

impl Resource for TransactionCategory {
    const NAME: &'static str = "transaction category";
    const TABLE: &'static str = "transaction_category";
    const ENDPOINT: &'static str = endpoints::TRANSACTION_CATEGORY;
    const DUPLICATE: Conflict = Conflict {
        code: "duplicate_transaction_category",
        message: "category name must be unique under the same parent",
    };
    const IN_USE: Conflict = Conflict {
        code: "category_in_use",
        message: "transaction category is in use",
    };
    const MISSING_REFERENCE: &'static str = "parent category must exist";
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("transaction_category", "parent_id"),
        Dependent::new("\"transaction\"", "category_id"),
    ];

    type Payload = TransactionCategoryPayload;
    type Draft = TransactionCategoryPayload;

    fn id(&self) -> DatabaseId {
        self.id
    }

    fn normalize(payload: TransactionCategoryPayload) -> Result<TransactionCategoryPayload, Error> {
        let name = required_text(&payload.name, "name")?;
        let parent_id = payload
            .parent_id
            .map(|parent_id| positive_id(parent_id, "parent_id"))
            .transpose()?;

        Ok(TransactionCategoryPayload { name, parent_id })
    }

    fn check(
        draft: &TransactionCategoryPayload,
        id: Option<DatabaseId>,
        connection: &Connection,
    ) -> Result<(), Error> {
        if let Some(parent_id) = draft.parent_id {
            if Some(parent_id) == id {
                return Err(Error::invalid("category cannot be its own parent"));
            }

            if !row_exists(connection, Self::TABLE, parent_id)? {
                return Err(Error::invalid(Self::MISSING_REFERENCE));
            }

            if let Some(id) = id
                && is_ancestor(id, parent_id, connection)?
            {
                return Err(Error::invalid("category cannot be a descendant of itself"));
            }
        }

        let is_duplicate = connection
            .prepare(
                "SELECT name FROM transaction_category
                WHERE parent_id IS ?1 AND id IS NOT ?2",
            )?
            .query_map((draft.parent_id, id), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|name| same_text(name, &draft.name));

        if is_duplicate {
            return Err(Error::Duplicate(Self::DUPLICATE));
        }

        Ok(())
    }

    fn insert(
        draft: &TransactionCategoryPayload,
        connection: &Connection,
    ) -> Result<DatabaseId, rusqlite::Error> {
        connection.execute(
            "INSERT INTO transaction_category (name, parent_id) VALUES (?1, ?2)",
            (&draft.name, draft.parent_id),
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn replace(
        id: DatabaseId,
        draft: &TransactionCategoryPayload,
        connection: &Connection,
    ) -> Result<RowsAffected, rusqlite::Error> {
        connection.execute(
            "UPDATE transaction_category SET name = ?1, parent_id = ?2 WHERE id = ?3",
            (&draft.name, draft.parent_id, id),
        )
    }

    fn select(id: DatabaseId, connection: &Connection) -> Result<Option<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT category.id, category.name, category.parent_id, parent.name
                FROM transaction_category category
                LEFT JOIN transaction_category parent ON parent.id = category.parent_id
                WHERE category.id = ?1",
            )?
            .query_row([id], map_row)
            .optional()
    }

    fn select_all(connection: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        connection
            .prepare(
                "SELECT category.id, category.name, category.parent_id, parent.name
                FROM transaction_category category
                LEFT JOIN transaction_category parent ON parent.id = category.parent_id
                ORDER BY category.id ASC",
            )?
            .query_map([], map_row)?
            .collect()
    }
}

/// Check whether `category_id` is `descendant_id` or one of its ancestors.
fn is_ancestor(
    category_id: DatabaseId,
    descendant_id: DatabaseId,
    connection: &Connection,
) -> Result<bool, Error> {
    let ancestor = connection
        .prepare(
            "WITH RECURSIVE ancestor(id, parent_id) AS (
                SELECT id, parent_id FROM transaction_category WHERE id = ?1
                UNION
                SELECT category.id, category.parent_id
                FROM transaction_category category
                JOIN ancestor ON category.id = ancestor.parent_id
            )
            SELECT EXISTS(SELECT 1 FROM ancestor WHERE id = ?2)",
        )?
        .query_row((descendant_id, category_id), |row| row.get(0))?;

    Ok(ancestor)
}

/// Create the transaction category table.
///
/// Root categories have a NULL parent, which a plain UNIQUE constraint
/// treats as distinct, so uniqueness is enforced by an expression index.
pub fn create_transaction_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transaction_category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            parent_id INTEGER REFERENCES transaction_category(id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_transaction_category_name_parent
        ON transaction_category(name COLLATE NOCASE, IFNULL(parent_id, 0));",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<TransactionCategory, rusqlite::Error> {
    Ok(TransactionCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        parent_name: row.get(3)?,
    })
}

#[cfg(test)]
mod transaction_category_tests {
    use crate::{
        DatabaseId, Error,
        resource::{Resource, create, delete, get, list, update},
        test_utils::get_test_connection,
    };

    use super::{TransactionCategory, TransactionCategoryPayload};

    fn payload(name: &str, parent_id: Option<DatabaseId>) -> TransactionCategoryPayload {
        TransactionCategoryPayload {
            name: name.to_owned(),
            parent_id,
        }
    }

    #[test]
    fn child_reports_parent_name() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();

        let groceries =
            create::<TransactionCategory>(payload("Groceries", Some(food.id)), &connection)
                .expect("Could not create child category");

        assert_eq!(groceries.parent_id, Some(food.id));
        assert_eq!(groceries.parent_name, Some("Food".to_owned()));
        assert_eq!(food.parent_name, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        let connection = get_test_connection();

        let result = create::<TransactionCategory>(payload("   ", None), &connection);

        assert_eq!(result, Err(Error::invalid("name is required")));
    }

    #[test]
    fn non_positive_parent_is_rejected() {
        let connection = get_test_connection();

        let result = create::<TransactionCategory>(payload("Food", Some(0)), &connection);

        assert_eq!(
            result,
            Err(Error::invalid("parent_id must be a positive integer"))
        );
    }

    #[test]
    fn missing_parent_is_rejected() {
        let connection = get_test_connection();

        let result = create::<TransactionCategory>(payload("Food", Some(7)), &connection);

        assert_eq!(result, Err(Error::invalid("parent category must exist")));
    }

    #[test]
    fn names_are_unique_among_siblings_only() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();
        let travel = create::<TransactionCategory>(payload("Travel", None), &connection).unwrap();
        create::<TransactionCategory>(payload("Other", Some(food.id)), &connection).unwrap();

        let same_parent =
            create::<TransactionCategory>(payload("OTHER", Some(food.id)), &connection);
        let other_parent =
            create::<TransactionCategory>(payload("Other", Some(travel.id)), &connection);
        let root_duplicate = create::<TransactionCategory>(payload("food", None), &connection);

        assert_eq!(
            same_parent,
            Err(Error::Duplicate(TransactionCategory::DUPLICATE))
        );
        assert!(other_parent.is_ok(), "{other_parent:?}");
        assert_eq!(
            root_duplicate,
            Err(Error::Duplicate(TransactionCategory::DUPLICATE))
        );
    }

    #[test]
    fn category_cannot_be_its_own_parent() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();

        let result = update::<TransactionCategory>(food.id, payload("Food", Some(food.id)), &connection);

        assert_eq!(
            result,
            Err(Error::invalid("category cannot be its own parent"))
        );
    }

    #[test]
    fn category_cannot_move_under_its_descendant() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();
        let groceries =
            create::<TransactionCategory>(payload("Groceries", Some(food.id)), &connection)
                .unwrap();
        let fruit =
            create::<TransactionCategory>(payload("Fruit", Some(groceries.id)), &connection)
                .unwrap();

        let result = update::<TransactionCategory>(food.id, payload("Food", Some(fruit.id)), &connection);

        assert_eq!(
            result,
            Err(Error::invalid("category cannot be a descendant of itself"))
        );
    }

    #[test]
    fn category_can_move_to_another_branch() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();
        let travel = create::<TransactionCategory>(payload("Travel", None), &connection).unwrap();
        let snacks =
            create::<TransactionCategory>(payload("Snacks", Some(food.id)), &connection).unwrap();

        let moved =
            update::<TransactionCategory>(snacks.id, payload("Snacks", Some(travel.id)), &connection)
                .expect("Could not move category");

        assert_eq!(moved.parent_name, Some("Travel".to_owned()));
    }

    #[test]
    fn delete_parent_with_children_fails_but_leaf_succeeds() {
        let connection = get_test_connection();
        let food = create::<TransactionCategory>(payload("Food", None), &connection).unwrap();
        let groceries =
            create::<TransactionCategory>(payload("Groceries", Some(food.id)), &connection)
                .unwrap();

        assert_eq!(
            delete::<TransactionCategory>(food.id, &connection),
            Err(Error::InUse(TransactionCategory::IN_USE))
        );
        assert_eq!(delete::<TransactionCategory>(groceries.id, &connection), Ok(()));
        assert_eq!(
            get::<TransactionCategory>(groceries.id, &connection),
            Err(Error::NotFound("transaction category"))
        );
        assert_eq!(delete::<TransactionCategory>(food.id, &connection), Ok(()));
        assert_eq!(list::<TransactionCategory>(&connection), Ok(vec![]));
    }
}
