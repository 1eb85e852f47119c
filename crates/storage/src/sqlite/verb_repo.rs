use verbs_core::model::{Verb, VerbId};

use super::SqliteRepository;
use super::mapping::{conn, map_verb_row, verb_id_from_i64};
use crate::repository::{NewVerbRecord, StorageError, VerbRepository};

#[async_trait::async_trait]
impl VerbRepository for SqliteRepository {
    async fn list_verbs(&self) -> Result<Vec<Verb>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, infinitive, past_simple, past_participle, french
                FROM verbs
                ORDER BY infinitive ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_verb_row(&row)?);
        }
        Ok(out)
    }

    async fn insert_verbs(&self, verbs: &[NewVerbRecord]) -> Result<Vec<VerbId>, StorageError> {
        for verb in verbs {
            verb.validate()?;
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut ids = Vec::with_capacity(verbs.len());

        for verb in verbs {
            let res = sqlx::query(
                r"
                    INSERT INTO verbs (infinitive, past_simple, past_participle, french)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(verb.infinitive.trim())
            .bind(verb.past_simple.trim())
            .bind(verb.past_participle.trim())
            .bind(verb.french.trim())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            ids.push(verb_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit().await.map_err(conn)?;
        Ok(ids)
    }
}
