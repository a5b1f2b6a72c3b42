//! Cursor-paginated list and detail reads for every admin entity.

use backstage_core::domain::Identified;
use backstage_core::domain::commerce::OrderStatus;
use backstage_core::listing::{ListFilter, ListQuery, ListSpec};
use backstage_core::pagination::{Page, SortDirection};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// A record served by the generic list/detail endpoints.
pub trait Listed:
    for<'r> FromRow<'r, PgRow> + Serialize + Identified + Send + Unpin + 'static
{
    const SPEC: &'static ListSpec;
}

macro_rules! listed {
    ($record:ty, $spec:expr) => {
        impl Identified for $record {
            fn id(&self) -> Uuid {
                self.id
            }
        }

        impl Listed for $record {
            const SPEC: &'static ListSpec = &$spec;
        }
    };
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrackRecord {
    pub id: Uuid,
    pub album_id: Option<Uuid>,
    pub title: String,
    pub artist_name: String,
    pub duration_secs: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AlbumRecord {
    pub id: Uuid,
    pub title: String,
    pub artist_name: String,
    pub released_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlaylistRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShowRecord {
    pub id: Uuid,
    pub title: String,
    pub host_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EpisodeRecord {
    pub id: Uuid,
    pub show_id: Uuid,
    pub title: String,
    pub duration_secs: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub product_type: String,
    pub price_cents: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

const USERS: ListSpec = ListSpec {
    name: "users",
    table: "users",
    columns: "id, name, email, role, created_at",
    search_columns: &["name", "email"],
    sort_columns: &["created_at", "name", "email"],
    ref_filters: &[],
    flag_filters: &[],
    enum_filters: &[("role", &["admin", "editor", "member"])],
};

const ARTICLES: ListSpec = ListSpec {
    name: "articles",
    table: "articles",
    columns: "id, author_id, title, slug, published, created_at",
    search_columns: &["title", "slug"],
    sort_columns: &["created_at", "title"],
    ref_filters: &["author_id"],
    flag_filters: &["published"],
    enum_filters: &[],
};

const TRACKS: ListSpec = ListSpec {
    name: "tracks",
    table: "tracks",
    columns: "id, album_id, title, artist_name, duration_secs, created_at",
    search_columns: &["title", "artist_name"],
    sort_columns: &["created_at", "title", "duration_secs"],
    ref_filters: &["album_id"],
    flag_filters: &[],
    enum_filters: &[],
};

const ALBUMS: ListSpec = ListSpec {
    name: "albums",
    table: "albums",
    columns: "id, title, artist_name, released_on, created_at",
    search_columns: &["title", "artist_name"],
    sort_columns: &["created_at", "title"],
    ref_filters: &[],
    flag_filters: &[],
    enum_filters: &[],
};

const PLAYLISTS: ListSpec = ListSpec {
    name: "playlists",
    table: "playlists",
    columns: "id, owner_id, name, is_public, created_at",
    search_columns: &["name"],
    sort_columns: &["created_at", "name"],
    ref_filters: &["owner_id"],
    flag_filters: &["is_public"],
    enum_filters: &[],
};

const SHOWS: ListSpec = ListSpec {
    name: "shows",
    table: "shows",
    columns: "id, title, host_name, created_at",
    search_columns: &["title", "host_name"],
    sort_columns: &["created_at", "title"],
    ref_filters: &[],
    flag_filters: &[],
    enum_filters: &[],
};

const EPISODES: ListSpec = ListSpec {
    name: "episodes",
    table: "episodes",
    columns: "id, show_id, title, duration_secs, created_at",
    search_columns: &["title"],
    sort_columns: &["created_at", "title", "duration_secs"],
    ref_filters: &["show_id"],
    flag_filters: &[],
    enum_filters: &[],
};

const PRODUCTS: ListSpec = ListSpec {
    name: "products",
    table: "products",
    columns: "id, name, product_type, price_cents, active, created_at",
    search_columns: &["name"],
    sort_columns: &["created_at", "name", "price_cents"],
    ref_filters: &[],
    flag_filters: &["active"],
    enum_filters: &[("product_type", &["physical", "digital", "merch", "subscription"])],
};

const ORDERS: ListSpec = ListSpec {
    name: "orders",
    table: "orders",
    columns: "id, user_id, status, total_cents, created_at",
    search_columns: &[],
    sort_columns: &["created_at", "total_cents"],
    ref_filters: &["user_id"],
    flag_filters: &[],
    enum_filters: &[("status", &OrderStatus::ALL)],
};

const POSTS: ListSpec = ListSpec {
    name: "posts",
    table: "posts",
    columns: "id, group_id, author_id, title, body, pinned, created_at",
    search_columns: &["title", "body"],
    sort_columns: &["created_at", "title"],
    ref_filters: &["group_id", "author_id"],
    flag_filters: &["pinned"],
    enum_filters: &[],
};

const COMMENTS: ListSpec = ListSpec {
    name: "comments",
    table: "comments",
    columns: "id, post_id, author_id, body, created_at",
    search_columns: &["body"],
    sort_columns: &["created_at"],
    ref_filters: &["post_id", "author_id"],
    flag_filters: &[],
    enum_filters: &[],
};

const GROUPS: ListSpec = ListSpec {
    name: "groups",
    table: "groups",
    columns: "id, name, description, is_private, created_at",
    search_columns: &["name", "description"],
    sort_columns: &["created_at", "name"],
    ref_filters: &[],
    flag_filters: &["is_private"],
    enum_filters: &[],
};

listed!(UserRecord, USERS);
listed!(ArticleRecord, ARTICLES);
listed!(TrackRecord, TRACKS);
listed!(AlbumRecord, ALBUMS);
listed!(PlaylistRecord, PLAYLISTS);
listed!(ShowRecord, SHOWS);
listed!(EpisodeRecord, EPISODES);
listed!(ProductRecord, PRODUCTS);
listed!(OrderRecord, ORDERS);
listed!(PostRecord, POSTS);
listed!(CommentRecord, COMMENTS);
listed!(GroupRecord, GROUPS);

fn like_contains(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Filters narrow the set before the cursor and the `limit + 1` window are
/// applied, so the lookahead row is always a real next row.
fn page_query(spec: &ListSpec, query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE TRUE",
        spec.columns, spec.table
    ));

    if let Some(term) = query.search.as_deref() {
        let pattern = like_contains(term);
        builder.push(" AND (");
        for (index, column) in spec.search_columns.iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            builder
                .push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\'");
        }
        builder.push(")");
    }

    for filter in &query.filters {
        match filter {
            ListFilter::Ref { column, id } => {
                builder.push(" AND ").push(*column).push(" = ").push_bind(*id);
            }
            ListFilter::Flag { column, value } => {
                builder.push(" AND ").push(*column).push(" = ").push_bind(*value);
            }
            ListFilter::Tag { column, value } => {
                builder.push(" AND ").push(*column).push(" = ").push_bind(*value);
            }
        }
    }

    let direction = query.direction.as_sql();
    if let Some(cursor) = query.page.cursor {
        let op = match query.direction {
            SortDirection::Asc => ">",
            SortDirection::Desc => "<",
        };
        builder
            .push(format!(
                " AND ({sort}, id) {op} (SELECT {sort}, id FROM {table} WHERE id = ",
                sort = query.sort_by,
                table = spec.table,
            ))
            .push_bind(cursor)
            .push(")");
    }

    builder
        .push(format!(
            " ORDER BY {sort} {direction}, id {direction} LIMIT ",
            sort = query.sort_by
        ))
        .push_bind(query.page.fetch_limit());
    builder
}

pub async fn fetch_page<T: Listed>(
    pool: &PgPool,
    query: &ListQuery,
) -> Result<Page<T>, CatalogRepoError> {
    let mut builder = page_query(T::SPEC, query);
    let rows = builder.build_query_as::<T>().fetch_all(pool).await?;
    Ok(Page::from_lookahead(rows, query.page.limit))
}

pub async fn fetch_by_id<T: Listed>(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<T>, CatalogRepoError> {
    let spec = T::SPEC;
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM {} WHERE id = ",
        spec.columns, spec.table
    ));
    builder.push_bind(id);
    let row = builder.build_query_as::<T>().fetch_optional(pool).await?;
    Ok(row)
}
