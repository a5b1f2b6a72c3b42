pub mod catalog_repo;
pub mod metrics_repo;
pub mod migrations;
pub mod pool;
pub mod store;

pub use catalog_repo::{
    AlbumRecord, ArticleRecord, CatalogRepoError, CommentRecord, EpisodeRecord, GroupRecord,
    Listed, OrderRecord, PlaylistRecord, PostRecord, ProductRecord, ShowRecord, TrackRecord,
    UserRecord, fetch_by_id, fetch_page,
};
pub use metrics_repo::MetricsRepoError;
pub use migrations::run_migrations;
pub use pool::{DbPool, DbPoolError, connect_lazy};
