use std::collections::HashSet;

use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info};

use crate::{
    entities::{genre, movie, movie_genre},
    error::AppResult,
    models::{MovieFilter, MovieRecord, StatusFlag, UpsertOutcome},
};

/// Keeps `IN (...)` lists well under SQLite's bound parameter limit.
const KEY_CHUNK: usize = 500;

#[derive(Clone)]
pub struct CatalogStore {
    db: DatabaseConnection,
}

impl CatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find_movie(&self, imdb_id: &str) -> AppResult<Option<movie::Model>> {
        let movie =
            movie::Entity::find().filter(movie::Column::ImdbId.eq(imdb_id)).one(&self.db).await?;
        Ok(movie)
    }

    /// Returns the ids among `imdb_ids` that are already stored with `flag` set.
    pub async fn existing_keys(
        &self,
        imdb_ids: &[String],
        flag: StatusFlag,
    ) -> AppResult<HashSet<String>> {
        let mut out = HashSet::new();

        for chunk in imdb_ids.chunks(KEY_CHUNK) {
            let found: Vec<String> = movie::Entity::find()
                .select_only()
                .column(movie::Column::ImdbId)
                .filter(movie::Column::ImdbId.is_in(chunk.iter().cloned()))
                .filter(flag_column(flag).eq(true))
                .into_tuple()
                .all(&self.db)
                .await?;
            out.extend(found);
        }

        Ok(out)
    }

    /// Sets `flag` on an existing movie without touching its descriptive fields.
    /// Returns `false` when no movie has that id.
    pub async fn mark(&self, imdb_id: &str, flag: StatusFlag) -> AppResult<bool> {
        let res = movie::Entity::update_many()
            .col_expr(flag_column(flag), Expr::value(true))
            .col_expr(movie::Column::UpdatedAt, Expr::value(now_sec()))
            .filter(movie::Column::ImdbId.eq(imdb_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Inserts the movie, its missing genres and the links between them in one
    /// transaction. Returns `None` when another writer already holds `imdb_id`.
    pub async fn create_movie(
        &self,
        record: &MovieRecord,
        flag: StatusFlag,
    ) -> AppResult<Option<movie::Model>> {
        let now = now_sec();
        let txn = self.db.begin().await?;

        let model = movie::ActiveModel {
            id: NotSet,
            imdb_id: Set(record.imdb_id.clone()),
            title: Set(record.title.clone()),
            year: Set(record.year),
            runtime: Set(record.runtime),
            language: Set(record.language.clone()),
            awards: Set(record.awards.clone()),
            poster: Set(record.poster.clone()),
            imdb_rating: Set(record.imdb_rating),
            metascore: Set(record.metascore),
            on_watchlist: Set(flag == StatusFlag::OnWatchlist),
            in_store: Set(flag == StatusFlag::InStore),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = movie::Entity::insert(model)
            .on_conflict(OnConflict::column(movie::Column::ImdbId).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;

        if inserted == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let movie = movie::Entity::find()
            .filter(movie::Column::ImdbId.eq(record.imdb_id.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("movie {}", record.imdb_id)))?;

        for title in &record.genres {
            let genre = get_or_create_genre(&txn, title).await?;
            let link =
                movie_genre::ActiveModel { movie_id: Set(movie.id), genre_id: Set(genre.id) };
            movie_genre::Entity::insert(link)
                .on_conflict(
                    OnConflict::columns([
                        movie_genre::Column::MovieId,
                        movie_genre::Column::GenreId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(Some(movie))
    }

    /// Marks an existing movie, or creates it with `flag` as its only status.
    pub async fn upsert(&self, record: &MovieRecord, flag: StatusFlag) -> AppResult<UpsertOutcome> {
        if let Some(existing) = self.find_movie(&record.imdb_id).await? {
            self.mark(&existing.imdb_id, flag).await?;
            info!(title = %existing.title, "marked \"{}\" {}", existing.title, flag.label());
            return Ok(UpsertOutcome::Marked);
        }

        match self.create_movie(record, flag).await? {
            Some(movie) => {
                info!(imdb_id = %movie.imdb_id, "added \"{}\" successfully", movie.title);
                Ok(UpsertOutcome::Created)
            },
            None => {
                debug!(imdb_id = %record.imdb_id, "movie created concurrently, marking instead");
                self.mark(&record.imdb_id, flag).await?;
                Ok(UpsertOutcome::Marked)
            },
        }
    }

    pub async fn movie_genres(&self, movie: &movie::Model) -> AppResult<Vec<String>> {
        let genres = movie
            .find_related(genre::Entity)
            .order_by_asc(genre::Column::Title)
            .all(&self.db)
            .await?;
        Ok(genres.into_iter().map(|g| g.title).collect())
    }

    /// Lists movies by ascending IMDb rating, unrated first.
    pub async fn list_movies(
        &self,
        filter: &MovieFilter,
    ) -> AppResult<Vec<(movie::Model, Vec<genre::Model>)>> {
        let mut query = movie::Entity::find();
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(movie::Column::Title.contains(search));
        }
        if filter.on_watchlist {
            query = query.filter(movie::Column::OnWatchlist.eq(true));
        }
        if filter.in_store {
            query = query.filter(movie::Column::InStore.eq(true));
        }

        let rows = query
            .order_by_asc(movie::Column::ImdbRating)
            .order_by_asc(movie::Column::Id)
            .find_with_related(genre::Entity)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn list_genres(&self) -> AppResult<Vec<genre::Model>> {
        let genres = genre::Entity::find().order_by_asc(genre::Column::Title).all(&self.db).await?;
        Ok(genres)
    }
}

/// Insert-or-ignore followed by a read, so concurrent callers converge on the
/// row that won the unique constraint on `title`.
async fn get_or_create_genre<C>(conn: &C, title: &str) -> Result<genre::Model, DbErr>
where
    C: ConnectionTrait,
{
    let now = now_sec();
    let model = genre::ActiveModel {
        id: NotSet,
        title: Set(title.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    genre::Entity::insert(model)
        .on_conflict(OnConflict::column(genre::Column::Title).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    genre::Entity::find()
        .filter(genre::Column::Title.eq(title))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("genre {title}")))
}

fn flag_column(flag: StatusFlag) -> movie::Column {
    match flag {
        StatusFlag::OnWatchlist => movie::Column::OnWatchlist,
        StatusFlag::InStore => movie::Column::InStore,
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::db;

    fn record(imdb_id: &str, title: &str, genres: &[&str]) -> MovieRecord {
        MovieRecord {
            imdb_id: imdb_id.to_string(),
            title: title.to_string(),
            year: 2010,
            runtime: 120,
            language: "English".to_string(),
            awards: String::new(),
            poster: "https://example.com/poster.jpg".to_string(),
            imdb_rating: Some(7.5),
            metascore: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    async fn store() -> CatalogStore {
        CatalogStore::new(db::connect_in_memory().await)
    }

    #[tokio::test]
    async fn creates_movie_with_genres() {
        let store = store().await;
        let rec = record("tt0000001", "First", &["Drama", "Crime"]);

        let outcome = store.upsert(&rec, StatusFlag::InStore).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let movie = store.find_movie("tt0000001").await.unwrap().unwrap();
        assert!(movie.in_store);
        assert!(!movie.on_watchlist);
        assert_eq!(movie.metascore, None);
        assert_eq!(store.movie_genres(&movie).await.unwrap(), vec!["Crime", "Drama"]);
    }

    #[tokio::test]
    async fn shared_genre_is_stored_once() {
        let store = store().await;
        store.upsert(&record("tt0000001", "First", &["Drama"]), StatusFlag::InStore).await.unwrap();
        store
            .upsert(&record("tt0000002", "Second", &["Drama", "Drama"]), StatusFlag::InStore)
            .await
            .unwrap();

        let genres = store.list_genres().await.unwrap();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].title, "Drama");
        assert_eq!(movie_genre::Entity::find().count(store.db()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn existing_movie_only_gets_flag() {
        let store = store().await;
        let original = record("tt0000001", "Original", &["Drama"]);
        store.upsert(&original, StatusFlag::InStore).await.unwrap();

        let refreshed = record("tt0000001", "Renamed", &["Comedy"]);
        let outcome = store.upsert(&refreshed, StatusFlag::OnWatchlist).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Marked);

        let movie = store.find_movie("tt0000001").await.unwrap().unwrap();
        assert_eq!(movie.title, "Original");
        assert!(movie.in_store);
        assert!(movie.on_watchlist);
        assert_eq!(store.movie_genres(&movie).await.unwrap(), vec!["Drama"]);
        assert!(store.list_genres().await.unwrap().iter().all(|g| g.title != "Comedy"));
    }

    #[tokio::test]
    async fn create_reports_conflict() {
        let store = store().await;
        let rec = record("tt0000001", "First", &["Drama"]);

        assert!(store.create_movie(&rec, StatusFlag::InStore).await.unwrap().is_some());
        assert!(store.create_movie(&rec, StatusFlag::InStore).await.unwrap().is_none());
        assert_eq!(movie::Entity::find().count(store.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_converge() {
        let store = store().await;
        let a = record("tt0000001", "Noir One", &["Film-Noir", "Crime"]);
        let b = record("tt0000002", "Noir Two", &["Film-Noir"]);

        let (ra, rb, rc) = tokio::join!(
            store.upsert(&a, StatusFlag::OnWatchlist),
            store.upsert(&b, StatusFlag::OnWatchlist),
            store.upsert(&a, StatusFlag::OnWatchlist),
        );
        ra.unwrap();
        rb.unwrap();
        rc.unwrap();

        let noir = genre::Entity::find()
            .filter(genre::Column::Title.eq("Film-Noir"))
            .count(store.db())
            .await
            .unwrap();
        assert_eq!(noir, 1);
        assert_eq!(movie::Entity::find().count(store.db()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn get_or_create_genre_is_stable() {
        let store = store().await;
        let first = get_or_create_genre(store.db(), "Western").await.unwrap();
        let second = get_or_create_genre(store.db(), "Western").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn existing_keys_respects_flag() {
        let store = store().await;
        store.upsert(&record("tt0000001", "Stored", &[]), StatusFlag::InStore).await.unwrap();
        store.upsert(&record("tt0000002", "Wanted", &[]), StatusFlag::OnWatchlist).await.unwrap();

        let keys = vec!["tt0000001".to_string(), "tt0000002".to_string(), "tt0000003".to_string()];
        let on_watchlist = store.existing_keys(&keys, StatusFlag::OnWatchlist).await.unwrap();
        assert_eq!(on_watchlist, HashSet::from(["tt0000002".to_string()]));

        let in_store = store.existing_keys(&keys, StatusFlag::InStore).await.unwrap();
        assert_eq!(in_store, HashSet::from(["tt0000001".to_string()]));
    }

    #[tokio::test]
    async fn mark_missing_movie_is_noop() {
        let store = store().await;
        assert!(!store.mark("tt9999999", StatusFlag::InStore).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_rating() {
        let store = store().await;
        let mut high = record("tt0000001", "The Dark Knight", &["Action"]);
        high.imdb_rating = Some(9.0);
        let mut low = record("tt0000002", "Knight and Day", &["Comedy"]);
        low.imdb_rating = Some(6.3);
        store.upsert(&high, StatusFlag::OnWatchlist).await.unwrap();
        store.upsert(&low, StatusFlag::InStore).await.unwrap();

        let all = store
            .list_movies(&MovieFilter { search: Some("knight".to_string()), ..Default::default() })
            .await
            .unwrap();
        let titles: Vec<_> = all.iter().map(|(m, _)| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Knight and Day", "The Dark Knight"]);
        assert_eq!(all[1].1[0].title, "Action");

        let watchlist = store
            .list_movies(&MovieFilter { on_watchlist: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(watchlist.len(), 1);
        assert_eq!(watchlist[0].0.imdb_id, "tt0000001");
    }
}
