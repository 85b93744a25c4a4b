use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::follow::repository::DynFollowRepository;
use crate::posts::repository::DynPostRepository;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub posts: DynPostRepository,
    pub follows: DynFollowRepository,
}
