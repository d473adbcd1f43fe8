//! Document persistence
//!
//! Every state change goes through [`commit`], which only applies when the
//! row still has the version the caller read. Two requests racing on the
//! same document cannot both win.

use chrono::Utc;
use docsign_core::Document;
use sqlx::sqlite::SqlitePool;

use crate::error::ApiError;
use crate::models::DbDocument;

const SELECT_DOCUMENT: &str = r#"
    SELECT id, title, original_path, provider_document_id, status, signed_path,
           version, created_at, updated_at
    FROM documents
"#;

/// Create a `pending` document for a freshly stored upload
pub async fn insert(db: &SqlitePool, title: &str, original_path: &str) -> Result<Document, ApiError> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO documents (title, original_path, status, version, created_at, updated_at)
        VALUES (?, ?, 'pending', 0, ?, ?)
        "#,
    )
    .bind(title)
    .bind(original_path)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(db)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!("Created document {}: {}", id, title);

    fetch(db, id).await
}

pub async fn fetch(db: &SqlitePool, id: i64) -> Result<Document, ApiError> {
    let row: Option<DbDocument> = sqlx::query_as(&format!("{SELECT_DOCUMENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await?;

    let row = row.ok_or(ApiError::DocumentNotFound(id))?;
    Ok(Document::try_from(row)?)
}

/// All documents, newest first
pub async fn list(db: &SqlitePool) -> Result<Vec<Document>, ApiError> {
    let rows: Vec<DbDocument> =
        sqlx::query_as(&format!("{SELECT_DOCUMENT} ORDER BY created_at DESC, id DESC"))
            .fetch_all(db)
            .await?;

    rows.into_iter()
        .map(|row| Document::try_from(row).map_err(ApiError::from))
        .collect()
}

/// Persist the mutable fields of `document`.
///
/// Applies only if the stored version still equals `document.version`;
/// otherwise nothing is written and [`ApiError::Conflict`] is returned.
pub async fn commit(db: &SqlitePool, document: &Document) -> Result<Document, ApiError> {
    document.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE documents
        SET provider_document_id = ?, status = ?, signed_path = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&document.provider_document_id)
    .bind(document.status.as_str())
    .bind(&document.signed_path)
    .bind(Utc::now().to_rfc3339())
    .bind(document.id)
    .bind(document.version)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            "Lost update on document {} at version {}",
            document.id,
            document.version
        );
        return Err(ApiError::Conflict(document.id));
    }

    fetch(db, document.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsign_core::DocumentStatus;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            r#"
            CREATE TABLE documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                original_path TEXT NOT NULL,
                provider_document_id TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                signed_path TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_creates_pending_document() {
        let db = pool().await;
        let doc = insert(&db, "thesis.pdf", "documents/a.pdf").await.unwrap();

        assert_eq!(doc.title, "thesis.pdf");
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert_eq!(doc.provider_document_id, None);
        assert_eq!(doc.version, 0);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let db = pool().await;
        assert!(matches!(
            fetch(&db, 99).await,
            Err(ApiError::DocumentNotFound(99))
        ));
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let db = pool().await;
        let mut doc = insert(&db, "thesis.pdf", "documents/a.pdf").await.unwrap();
        doc.mark_prepared("doc-42".into()).unwrap();

        let saved = commit(&db, &doc).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.status, DocumentStatus::SigningPrepared);
        assert_eq!(saved.provider_document_id.as_deref(), Some("doc-42"));
    }

    #[tokio::test]
    async fn stale_commit_is_rejected() {
        let db = pool().await;
        let doc = insert(&db, "thesis.pdf", "documents/a.pdf").await.unwrap();

        let mut first = doc.clone();
        first.mark_prepared("doc-1".into()).unwrap();
        commit(&db, &first).await.unwrap();

        let mut second = doc;
        second.mark_prepared("doc-2".into()).unwrap();
        assert!(matches!(
            commit(&db, &second).await,
            Err(ApiError::Conflict(_))
        ));

        let stored = fetch(&db, first.id).await.unwrap();
        assert_eq!(stored.provider_document_id.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let db = pool().await;
        let older = insert(&db, "a.pdf", "documents/a.pdf").await.unwrap();
        let newer = insert(&db, "b.pdf", "documents/b.pdf").await.unwrap();

        let ids: Vec<i64> = list(&db).await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}
