//! SQLite implementation of [`CatalogStore`]

use super::{CatalogStore, StoreError, StoreResult};
use async_trait::async_trait;
use softstore_common::db::{Category, NewProgram, Program, ProgramBasicInfo, Statistics};
use softstore_common::time;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Catalog store backed by the shared SQLite pool
#[derive(Clone)]
pub struct SqliteCatalogStore {
    db: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn add_program(&self, program: &NewProgram) -> StoreResult<i64> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO programs (name, description, img128, img512, category_id, time_uploaded, downloads)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&program.name)
        .bind(&program.description)
        .bind(&program.img128)
        .bind(&program.img512)
        .bind(program.category.id)
        .bind(time::to_db_string(&program.statistics.time_uploaded))
        .bind(program.statistics.downloads)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = result.last_insert_rowid();
        debug!("Stored program {} as id {}", program.name, id);
        Ok(id)
    }

    async fn remove_program(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_category_by_id(&self, id: i64) -> StoreResult<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))
    }

    async fn get_all_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(categories)
    }

    async fn get_program(&self, id: i64) -> StoreResult<Program> {
        let row = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.img128, p.img512,
                   p.time_uploaded, p.downloads,
                   c.id AS category_id, c.name AS category_name
            FROM programs p
            JOIN categories c ON c.id = p.category_id
            WHERE p.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("program {}", id)))?;

        let uploaded: String = row.get("time_uploaded");
        let time_uploaded = time::from_db_string(&uploaded).map_err(|e| {
            StoreError::Corrupt(format!("program {} time_uploaded '{}': {}", id, uploaded, e))
        })?;

        Ok(Program {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            img128: row.get("img128"),
            img512: row.get("img512"),
            category: Category {
                id: row.get("category_id"),
                name: row.get("category_name"),
            },
            statistics: Statistics::new(time_uploaded, row.get("downloads")),
        })
    }

    async fn get_programs_basic_info(
        &self,
        category_id: Option<i64>,
    ) -> StoreResult<Vec<ProgramBasicInfo>> {
        let programs = sqlx::query_as::<_, ProgramBasicInfo>(
            r#"
            SELECT p.id, p.name, p.description, p.img128, p.img512,
                   c.name AS category_name, p.downloads
            FROM programs p
            JOIN categories c ON c.id = p.category_id
            WHERE ?1 IS NULL OR p.category_id = ?1
            ORDER BY p.id
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.db)
        .await?;

        Ok(programs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use softstore_common::db::init::{init_memory_database, insert_category};

    async fn setup() -> (SqliteCatalogStore, Category) {
        let pool = init_memory_database().await.unwrap();
        let id = insert_category(&pool, "Games").await.unwrap();
        (
            SqliteCatalogStore::new(pool),
            Category { id, name: "Games".to_string() },
        )
    }

    fn new_program(category: &Category) -> NewProgram {
        NewProgram {
            name: "Foo".to_string(),
            description: "Bar".to_string(),
            img128: Some("a.png".to_string()),
            img512: None,
            category: category.clone(),
            statistics: Statistics::initial(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_add_then_get_program() {
        let (store, category) = setup().await;
        let program = new_program(&category);

        let id = store.add_program(&program).await.unwrap();
        let loaded = store.get_program(id).await.unwrap();

        assert_eq!(loaded, Program::from_new(id, program));
    }

    #[tokio::test]
    async fn test_add_program_with_unknown_category_fails() {
        let (store, _) = setup().await;
        let program = new_program(&Category { id: 999, name: "Ghost".to_string() });

        let result = store.add_program(&program).await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, category) = setup().await;
        let id = store.add_program(&new_program(&category)).await.unwrap();

        assert!(store.remove_program(id).await.unwrap());
        assert!(matches!(store.get_program(id).await, Err(StoreError::NotFound(_))));
        // Second delete is a no-op
        assert!(!store.remove_program(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_category_lookup() {
        let (store, category) = setup().await;

        assert_eq!(store.get_category_by_id(category.id).await.unwrap(), category);
        assert!(matches!(
            store.get_category_by_id(category.id + 100).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_all_categories_ordered_by_id() {
        let (store, _) = setup().await;
        insert_category(store.pool(), "Office").await.unwrap();

        let names: Vec<String> = store
            .get_all_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Games", "Office"]);
    }

    #[tokio::test]
    async fn test_basic_info_listing_filters_by_category() {
        let (store, games) = setup().await;
        let office_id = insert_category(store.pool(), "Office").await.unwrap();
        let office = Category { id: office_id, name: "Office".to_string() };

        store.add_program(&new_program(&games)).await.unwrap();
        let mut spreadsheet = new_program(&office);
        spreadsheet.name = "Sheets".to_string();
        store.add_program(&spreadsheet).await.unwrap();

        let all = store.get_programs_basic_info(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let office_only = store.get_programs_basic_info(Some(office_id)).await.unwrap();
        assert_eq!(office_only.len(), 1);
        assert_eq!(office_only[0].name, "Sheets");
        assert_eq!(office_only[0].category_name, "Office");
        assert_eq!(office_only[0].downloads, 0);
    }
}
