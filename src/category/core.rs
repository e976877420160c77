//! Defines the category model and its database queries.
//!
//! Categories form a tree at most one level deep: a category either has no
//! parent or its parent is a top-level category.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error, database_id::CategoryId, household::HouseholdId, name::Name, serde_fields::nullable,
};

/// A label for what money was spent on or earned from, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The household that owns the category.
    pub household_id: HouseholdId,
    /// The display name of the category.
    pub name: Name,
    /// The top-level category this one is grouped under.
    pub parent_id: Option<CategoryId>,
    /// Whether the category has not been deleted.
    pub is_active: bool,
}

/// The data for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    /// The display name of the category.
    pub name: Name,
    /// The top-level category to group the new category under.
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// The changes to make to a category. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    /// The new display name.
    pub name: Option<Name>,
    /// The new parent, `Some(None)` makes the category top-level.
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<CategoryId>>,
    /// Restore or delete the category.
    pub is_active: Option<bool>,
}

/// Create the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            household_id INTEGER NOT NULL REFERENCES household(id),
            name TEXT NOT NULL,
            parent_id INTEGER REFERENCES category(id),
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_category_household ON category(household_id);",
    )?;

    Ok(())
}

const CATEGORY_COLUMNS: &str = "id, household_id, name, parent_id, is_active";

/// Create an active category in the household.
///
/// # Errors
/// Returns [Error::InvalidReference] if the parent does not exist in the
/// household, or [Error::InvalidParentCategory] if the parent is not a
/// top-level category.
pub fn create_category(
    household_id: HouseholdId,
    new_category: &NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    if let Some(parent_id) = new_category.parent_id {
        validate_parent(household_id, None, parent_id, connection)?;
    }

    connection
        .prepare(&format!(
            "INSERT INTO category (household_id, name, parent_id, is_active) VALUES (?1, ?2, ?3, 1)
            RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (household_id, &new_category.name, new_category.parent_id),
            map_row,
        )
        .map_err(Error::from)
}

/// Get a category of the household by ID, whether or not it has been deleted.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to another household.
pub fn get_category(
    household_id: HouseholdId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = ?1 AND household_id = ?2"
        ))?
        .query_row((category_id, household_id), map_row)
        .map_err(Error::from)
}

/// List the household's categories ordered by ID.
pub fn list_categories(
    household_id: HouseholdId,
    include_inactive: bool,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
            WHERE household_id = ?1 AND (is_active = 1 OR ?2)
            ORDER BY id ASC"
        ))?
        .query_map((household_id, include_inactive), map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Apply `patch` to a category.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another household, and the errors of [create_category] for an invalid parent.
pub fn update_category(
    household_id: HouseholdId,
    category_id: CategoryId,
    patch: &CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = get_category(household_id, category_id, connection)?;

    let parent_id = match patch.parent_id {
        Some(Some(parent_id)) => {
            validate_parent(household_id, Some(category_id), parent_id, connection)?;
            Some(parent_id)
        }
        Some(None) => None,
        None => category.parent_id,
    };

    connection
        .prepare(&format!(
            "UPDATE category SET name = ?1, parent_id = ?2, is_active = ?3
            WHERE id = ?4 AND household_id = ?5
            RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (
                patch.name.as_ref().unwrap_or(&category.name),
                parent_id,
                patch.is_active.unwrap_or(category.is_active),
                category_id,
                household_id,
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// Mark a category as inactive. Transactions and budgets keep referring to it.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to another household.
pub fn deactivate_category(
    household_id: HouseholdId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET is_active = 0 WHERE id = ?1 AND household_id = ?2",
        (category_id, household_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Check that `parent_id` can be the parent of `category_id` (`None` for a new category).
fn validate_parent(
    household_id: HouseholdId,
    category_id: Option<CategoryId>,
    parent_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    if Some(parent_id) == category_id {
        return Err(Error::InvalidParentCategory);
    }

    let grandparent: Option<CategoryId> = connection
        .prepare("SELECT parent_id FROM category WHERE id = ?1 AND household_id = ?2")?
        .query_row((parent_id, household_id), |row| row.get(0))
        .optional()?
        .ok_or(Error::InvalidReference("parent_id"))?;

    if grandparent.is_some() {
        return Err(Error::InvalidParentCategory);
    }

    if let Some(category_id) = category_id {
        let has_children: bool = connection.query_row(
            "SELECT EXISTS(SELECT 1 FROM category WHERE parent_id = ?1)",
            [category_id],
            |row| row.get(0),
        )?;

        if has_children {
            return Err(Error::InvalidParentCategory);
        }
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        household_id: row.get(1)?,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        is_active: row.get(4)?,
    })
}
