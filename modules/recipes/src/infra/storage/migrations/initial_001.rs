use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk(Users::Id))
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::FirstName).string_len(150).not_null())
                    .col(ColumnDef::new(Users::LastName).string_len(150).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthTokens::Key)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AuthTokens::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AuthTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut cascade_fk(
                        "fk_auth_tokens_user",
                        (AuthTokens::Table, AuthTokens::UserId),
                        (Users::Table, Users::Id),
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(pk(Subscriptions::Id))
                    .col(ColumnDef::new(Subscriptions::UserId).integer().not_null())
                    .col(ColumnDef::new(Subscriptions::AuthorId).integer().not_null())
                    .foreign_key(&mut cascade_fk(
                        "fk_subscriptions_user",
                        (Subscriptions::Table, Subscriptions::UserId),
                        (Users::Table, Users::Id),
                    ))
                    .foreign_key(&mut cascade_fk(
                        "fk_subscriptions_author",
                        (Subscriptions::Table, Subscriptions::AuthorId),
                        (Users::Table, Users::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        unique_pair(
            manager,
            "uq_subscriptions_user_author",
            Subscriptions::Table,
            Subscriptions::UserId,
            Subscriptions::AuthorId,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(pk(Tags::Id))
                    .col(
                        ColumnDef::new(Tags::Name)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Tags::Color)
                            .string_len(7)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Tags::Slug)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ingredients::Table)
                    .if_not_exists()
                    .col(pk(Ingredients::Id))
                    .col(ColumnDef::new(Ingredients::Name).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Ingredients::MeasurementUnit)
                            .string_len(16)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        unique_pair(
            manager,
            "uq_ingredients_name_unit",
            Ingredients::Table,
            Ingredients::Name,
            Ingredients::MeasurementUnit,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(Recipes::Table)
                    .if_not_exists()
                    .col(pk(Recipes::Id))
                    .col(ColumnDef::new(Recipes::AuthorId).integer().not_null())
                    .col(ColumnDef::new(Recipes::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Recipes::Image).string().not_null())
                    .col(ColumnDef::new(Recipes::Text).text().not_null())
                    .col(ColumnDef::new(Recipes::CookingTime).integer().not_null())
                    .col(
                        ColumnDef::new(Recipes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut cascade_fk(
                        "fk_recipes_author",
                        (Recipes::Table, Recipes::AuthorId),
                        (Users::Table, Users::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_recipes_created_at")
                    .table(Recipes::Table)
                    .col(Recipes::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecipeIngredients::Table)
                    .if_not_exists()
                    .col(pk(RecipeIngredients::Id))
                    .col(
                        ColumnDef::new(RecipeIngredients::RecipeId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecipeIngredients::IngredientId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecipeIngredients::Amount).integer().not_null())
                    .foreign_key(&mut cascade_fk(
                        "fk_recipe_ingredients_recipe",
                        (RecipeIngredients::Table, RecipeIngredients::RecipeId),
                        (Recipes::Table, Recipes::Id),
                    ))
                    .foreign_key(&mut cascade_fk(
                        "fk_recipe_ingredients_ingredient",
                        (RecipeIngredients::Table, RecipeIngredients::IngredientId),
                        (Ingredients::Table, Ingredients::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        unique_pair(
            manager,
            "uq_recipe_ingredients_recipe_ingredient",
            RecipeIngredients::Table,
            RecipeIngredients::RecipeId,
            RecipeIngredients::IngredientId,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecipeTags::Table)
                    .if_not_exists()
                    .col(pk(RecipeTags::Id))
                    .col(ColumnDef::new(RecipeTags::RecipeId).integer().not_null())
                    .col(ColumnDef::new(RecipeTags::TagId).integer().not_null())
                    .foreign_key(&mut cascade_fk(
                        "fk_recipe_tags_recipe",
                        (RecipeTags::Table, RecipeTags::RecipeId),
                        (Recipes::Table, Recipes::Id),
                    ))
                    .foreign_key(&mut cascade_fk(
                        "fk_recipe_tags_tag",
                        (RecipeTags::Table, RecipeTags::TagId),
                        (Tags::Table, Tags::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        unique_pair(
            manager,
            "uq_recipe_tags_recipe_tag",
            RecipeTags::Table,
            RecipeTags::RecipeId,
            RecipeTags::TagId,
        )
        .await?;

        create_user_recipe_list(manager, Favorites::Table, "favorites").await?;
        create_user_recipe_list(manager, ShoppingCart::Table, "shopping_cart").await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // children first
        for table in [
            ShoppingCart::Table.into_iden(),
            Favorites::Table.into_iden(),
            RecipeTags::Table.into_iden(),
            RecipeIngredients::Table.into_iden(),
            Recipes::Table.into_iden(),
            Ingredients::Table.into_iden(),
            Tags::Table.into_iden(),
            Subscriptions::Table.into_iden(),
            AuthTokens::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

fn pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn cascade_fk<FT, FC, TT, TC>(
    name: &str,
    from: (FT, FC),
    to: (TT, TC),
) -> ForeignKeyCreateStatement
where
    FT: IntoIden + 'static,
    FC: IntoIden + 'static,
    TT: IntoIden + 'static,
    TC: IntoIden + 'static,
{
    ForeignKey::create()
        .name(name)
        .from(from.0, from.1)
        .to(to.0, to.1)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

async fn unique_pair<T, A, B>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    a: A,
    b: B,
) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
    A: IntoIden + 'static,
    B: IntoIden + 'static,
{
    manager
        .create_index(
            Index::create()
                .name(name)
                .table(table)
                .col(a)
                .col(b)
                .unique()
                .to_owned(),
        )
        .await
}

/// Favorites and the shopping cart share one shape: unique (user, recipe) pairs.
async fn create_user_recipe_list<T>(
    manager: &SchemaManager<'_>,
    table: T,
    prefix: &str,
) -> Result<(), DbErr>
where
    T: IntoIden + Clone + 'static,
{
    manager
        .create_table(
            Table::create()
                .table(table.clone())
                .if_not_exists()
                .col(pk(UserRecipe::Id))
                .col(ColumnDef::new(UserRecipe::UserId).integer().not_null())
                .col(ColumnDef::new(UserRecipe::RecipeId).integer().not_null())
                .foreign_key(&mut cascade_fk(
                    &format!("fk_{prefix}_user"),
                    (table.clone(), UserRecipe::UserId),
                    (Users::Table, Users::Id),
                ))
                .foreign_key(&mut cascade_fk(
                    &format!("fk_{prefix}_recipe"),
                    (table.clone(), UserRecipe::RecipeId),
                    (Recipes::Table, Recipes::Id),
                ))
                .to_owned(),
        )
        .await?;
    unique_pair(
        manager,
        &format!("uq_{prefix}_user_recipe"),
        table,
        UserRecipe::UserId,
        UserRecipe::RecipeId,
    )
    .await
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    FirstName,
    LastName,
    PasswordHash,
}

#[derive(DeriveIden)]
enum AuthTokens {
    Table,
    Key,
    UserId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    AuthorId,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    Color,
    Slug,
}

#[derive(DeriveIden)]
enum Ingredients {
    Table,
    Id,
    Name,
    MeasurementUnit,
}

#[derive(DeriveIden)]
enum Recipes {
    Table,
    Id,
    AuthorId,
    Name,
    Image,
    Text,
    CookingTime,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RecipeIngredients {
    Table,
    Id,
    RecipeId,
    IngredientId,
    Amount,
}

#[derive(DeriveIden)]
enum RecipeTags {
    Table,
    Id,
    RecipeId,
    TagId,
}

#[derive(DeriveIden, Clone)]
enum Favorites {
    Table,
}

#[derive(DeriveIden, Clone)]
enum ShoppingCart {
    Table,
}

/// Columns shared by the favorites and shopping cart tables.
#[derive(DeriveIden)]
enum UserRecipe {
    Id,
    UserId,
    RecipeId,
}
