use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::EducationalModule;
use crate::repositories::listing::{self, SortKey};

const MODULE_SELECT: &str = "\
    SELECT m.id, m.order_number, m.title, m.description, m.course_id, m.author_id, \
           ARRAY(SELECT mm.material_id FROM module_materials mm \
                 WHERE mm.module_id = m.id ORDER BY mm.material_id) AS materials, \
           m.created_at, m.updated_at \
    FROM educational_modules m";

pub(crate) const ORDERING_FIELDS: &[(&str, &str)] =
    &[("title", "m.title"), ("created_at", "m.created_at")];

pub(crate) const COURSE_ORDER_CONSTRAINT: &str = "educational_modules_course_order_key";

pub(crate) struct CreateModule<'a> {
    pub(crate) order_number: i32,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) course_id: i64,
    pub(crate) author_id: i64,
    pub(crate) materials: &'a [i64],
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateModule {
    pub(crate) order_number: Option<i32>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) course_id: Option<i64>,
    /// `Some` replaces the whole material set.
    pub(crate) materials: Option<Vec<i64>>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Default)]
pub(crate) struct ListModules {
    pub(crate) title: Option<String>,
    pub(crate) author_id: Option<i64>,
    pub(crate) course_id: Option<i64>,
    pub(crate) search: Vec<String>,
    pub(crate) ordering: Vec<SortKey>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateModule<'_>,
) -> Result<EducationalModule, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let module_id: i64 = sqlx::query_scalar(
        "INSERT INTO educational_modules (
            order_number, title, description, course_id, author_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$6)
         RETURNING id",
    )
    .bind(params.order_number)
    .bind(params.title)
    .bind(params.description)
    .bind(params.course_id)
    .bind(params.author_id)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    attach_materials(&mut tx, module_id, params.materials).await?;

    let module = sqlx::query_as::<_, EducationalModule>(&format!("{MODULE_SELECT} WHERE m.id = $1"))
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(module)
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    module_id: i64,
) -> Result<Option<EducationalModule>, sqlx::Error> {
    sqlx::query_as::<_, EducationalModule>(&format!("{MODULE_SELECT} WHERE m.id = $1"))
        .bind(module_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists(pool: &PgPool, module_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM educational_modules WHERE id = $1)")
        .bind(module_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    params: ListModules,
) -> Result<Vec<EducationalModule>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("{MODULE_SELECT} WHERE TRUE"));

    if let Some(title) = params.title {
        builder.push(" AND m.title = ");
        builder.push_bind(title);
    }
    if let Some(author_id) = params.author_id {
        builder.push(" AND m.author_id = ");
        builder.push_bind(author_id);
    }
    if let Some(course_id) = params.course_id {
        builder.push(" AND m.course_id = ");
        builder.push_bind(course_id);
    }
    listing::push_search(&mut builder, &["m.title", "m.description"], params.search);
    listing::push_order_by(&mut builder, &params.ordering, "m.order_number ASC, m.id ASC");

    builder.build_query_as::<EducationalModule>().fetch_all(pool).await
}

/// Material ids from `ids` that have no row, in input order.
pub(crate) async fn missing_material_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_scalar::<_, i64>(
        "SELECT requested.id
         FROM UNNEST($1::bigint[]) WITH ORDINALITY AS requested(id, position)
         WHERE NOT EXISTS (SELECT 1 FROM materials WHERE materials.id = requested.id)
         ORDER BY requested.position",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    module_id: i64,
    params: UpdateModule,
) -> Result<Option<EducationalModule>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE educational_modules SET
            order_number = COALESCE($1, order_number),
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            course_id = COALESCE($4, course_id),
            updated_at = $5
         WHERE id = $6",
    )
    .bind(params.order_number)
    .bind(params.title)
    .bind(params.description)
    .bind(params.course_id)
    .bind(params.updated_at)
    .bind(module_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    if let Some(materials) = params.materials {
        sqlx::query("DELETE FROM module_materials WHERE module_id = $1")
            .bind(module_id)
            .execute(&mut *tx)
            .await?;
        attach_materials(&mut tx, module_id, &materials).await?;
    }

    let module = sqlx::query_as::<_, EducationalModule>(&format!("{MODULE_SELECT} WHERE m.id = $1"))
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(module))
}

pub(crate) async fn delete(pool: &PgPool, module_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM educational_modules WHERE id = $1")
        .bind(module_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn attach_materials(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    module_id: i64,
    materials: &[i64],
) -> Result<(), sqlx::Error> {
    if materials.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO module_materials (module_id, material_id)
         SELECT $1, material_id FROM UNNEST($2::bigint[]) AS material_id
         ON CONFLICT DO NOTHING",
    )
    .bind(module_id)
    .bind(materials)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
