use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_genre_genre_id")
                    .table(MovieGenre::Table)
                    .col(MovieGenre::GenreId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_imdb_rating")
                    .table(Movie::Table)
                    .col(Movie::ImdbRating)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_movie_imdb_rating").table(Movie::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop().name("idx_movie_genre_genre_id").table(MovieGenre::Table).to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    ImdbRating,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    GenreId,
}
