//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait + TransactionTrait`, so it works with a
//! `DatabaseConnection` on SQLite or Postgres. Multi-statement writes open their
//! own transaction and never touch `self.conn` while it is open.

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select, Set, SqlErr, TransactionTrait,
};

use crate::contract::model::{
    Composition, Ingredient, IngredientId, NewIngredient, NewTag, Recipe, RecipeId,
    RecipeIngredient, RecipeList, ShoppingListItem, Tag, TagId, User, UserId,
};
use crate::domain::repo::{
    NewRecipeRecord, NewUserRecord, RecipeQuery, RecipesRepository, UserCredentials,
};
use crate::infra::storage::entity::{
    auth_token, favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart,
    subscription, tag, user,
};
use crate::infra::storage::mapper;

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[derive(Debug, FromQueryResult)]
struct ShoppingRow {
    name: String,
    measurement_unit: String,
    total_amount: i64,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Map an insert result to "inserted?", treating a unique violation as "already there".
fn inserted_unless_duplicate<T>(res: Result<T, DbErr>) -> Result<bool, DbErr> {
    match res {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recipe ids in a user's favorites or cart.
fn list_subquery(list: RecipeList, user_id: UserId) -> SelectStatement {
    match list {
        RecipeList::Favorites => Query::select()
            .column(favorite::Column::RecipeId)
            .from(favorite::Entity)
            .and_where(favorite::Column::UserId.eq(user_id))
            .to_owned(),
        RecipeList::ShoppingCart => Query::select()
            .column(shopping_cart::Column::RecipeId)
            .from(shopping_cart::Entity)
            .and_where(shopping_cart::Column::UserId.eq(user_id))
            .to_owned(),
    }
}

/// Recipe ids carrying any of the given tag slugs.
fn tagged_subquery(slugs: &[String]) -> SelectStatement {
    Query::select()
        .column((recipe_tag::Entity, recipe_tag::Column::RecipeId))
        .from(recipe_tag::Entity)
        .inner_join(
            tag::Entity,
            Expr::col((tag::Entity, tag::Column::Id))
                .equals((recipe_tag::Entity, recipe_tag::Column::TagId)),
        )
        .and_where(Expr::col((tag::Entity, tag::Column::Slug)).is_in(slugs.iter().cloned()))
        .to_owned()
}

fn recipe_select(q: &RecipeQuery) -> Select<recipe::Entity> {
    let mut select = recipe::Entity::find();
    if let Some(author_id) = q.author_id {
        select = select.filter(recipe::Column::AuthorId.eq(author_id));
    }
    if !q.tag_slugs.is_empty() {
        select = select.filter(recipe::Column::Id.in_subquery(tagged_subquery(&q.tag_slugs)));
    }
    if let Some(user_id) = q.favorited_by {
        select = select
            .filter(recipe::Column::Id.in_subquery(list_subquery(RecipeList::Favorites, user_id)));
    }
    if let Some(user_id) = q.in_cart_of {
        select = select.filter(
            recipe::Column::Id.in_subquery(list_subquery(RecipeList::ShoppingCart, user_id)),
        );
    }
    select
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Delete the recipe's ingredient and tag rows, then insert the new sets.
/// Callers run this inside a transaction.
async fn write_composition<T>(db: &T, recipe_id: RecipeId, c: &Composition) -> Result<(), DbErr>
where
    T: ConnectionTrait,
{
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    if !c.ingredients.is_empty() {
        recipe_ingredient::Entity::insert_many(c.ingredients.iter().map(|line| {
            recipe_ingredient::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(line.ingredient_id),
                amount: Set(line.amount),
                ..Default::default()
            }
        }))
        .exec_without_returning(db)
        .await?;
    }
    if !c.tag_ids.is_empty() {
        recipe_tag::Entity::insert_many(c.tag_ids.iter().map(|tag_id| recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(*tag_id),
            ..Default::default()
        }))
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// Write the composition and commit. A foreign key violation rolls the whole
/// transaction back and yields `false`.
async fn commit_composition(
    txn: DatabaseTransaction,
    recipe_id: RecipeId,
    c: &Composition,
) -> anyhow::Result<bool> {
    match write_composition(&txn, recipe_id, c).await {
        Ok(()) => {
            txn.commit().await.context("commit failed")?;
            Ok(true)
        }
        Err(e) if is_foreign_key_violation(&e) => {
            txn.rollback().await.context("rollback failed")?;
            Ok(false)
        }
        Err(e) => Err(e).context("write composition failed"),
    }
}

#[async_trait::async_trait]
impl<C> RecipesRepository for SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    // ---- users ----

    async fn insert_user(&self, u: NewUserRecord) -> anyhow::Result<Option<User>> {
        let m = user::ActiveModel {
            email: Set(u.email),
            username: Set(u.username),
            first_name: Set(u.first_name),
            last_name: Set(u.last_name),
            password_hash: Set(u.password_hash),
            ..Default::default()
        };
        match m.insert(&self.conn).await {
            Ok(model) => Ok(Some(model.into())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("insert_user failed"),
        }
    }

    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_user failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("find_credentials_by_email failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_credentials(&self, id: UserId) -> anyhow::Result<Option<UserCredentials>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_credentials failed")?;
        Ok(found.map(Into::into))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("email_exists failed")?;
        Ok(count > 0)
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("username_exists failed")?;
        Ok(count > 0)
    }

    async fn update_password(&self, id: UserId, password_hash: String) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(id),
            password_hash: Set(password_hash),
            ..Default::default()
        };
        let _ = m.update(&self.conn).await.context("update_password failed")?;
        Ok(())
    }

    async fn list_users(&self, offset: u64, limit: u64) -> anyhow::Result<(Vec<User>, u64)> {
        let total = user::Entity::find()
            .count(&self.conn)
            .await
            .context("count users failed")?;
        let rows = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("list_users failed")?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> anyhow::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("users_by_ids failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ---- auth tokens ----

    async fn token_for_user(&self, user_id: UserId) -> anyhow::Result<Option<String>> {
        let found = auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("token_for_user failed")?;
        Ok(found.map(|t| t.key))
    }

    async fn insert_token(&self, key: &str, user_id: UserId) -> anyhow::Result<String> {
        let m = auth_token::ActiveModel {
            key: Set(key.to_string()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        let res = auth_token::Entity::insert(m)
            .exec_without_returning(&self.conn)
            .await;
        if inserted_unless_duplicate(res).context("insert_token failed")? {
            return Ok(key.to_string());
        }
        self.token_for_user(user_id)
            .await?
            .context("token vanished after a concurrent login")
    }

    async fn user_by_token(&self, key: &str) -> anyhow::Result<Option<User>> {
        let found = auth_token::Entity::find_by_id(key.to_string())
            .find_also_related(user::Entity)
            .one(&self.conn)
            .await
            .context("user_by_token failed")?;
        Ok(found.and_then(|(_, u)| u).map(Into::into))
    }

    async fn delete_tokens(&self, user_id: UserId) -> anyhow::Result<()> {
        auth_token::Entity::delete_many()
            .filter(auth_token::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("delete_tokens failed")?;
        Ok(())
    }

    // ---- subscriptions ----

    async fn insert_subscription(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> anyhow::Result<bool> {
        let m = subscription::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            ..Default::default()
        };
        let res = subscription::Entity::insert(m)
            .exec_without_returning(&self.conn)
            .await;
        inserted_unless_duplicate(res).context("insert_subscription failed")
    }

    async fn delete_subscription(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> anyhow::Result<bool> {
        let res = subscription::Entity::delete_many()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::AuthorId.eq(author_id))
            .exec(&self.conn)
            .await
            .context("delete_subscription failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn subscribed_authors(
        &self,
        user_id: UserId,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<User>, u64)> {
        let followed = Query::select()
            .column(subscription::Column::AuthorId)
            .from(subscription::Entity)
            .and_where(subscription::Column::UserId.eq(user_id))
            .to_owned();
        let select = user::Entity::find().filter(user::Column::Id.in_subquery(followed));

        let total = select
            .clone()
            .count(&self.conn)
            .await
            .context("count subscriptions failed")?;
        let rows = select
            .order_by_asc(user::Column::Username)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("subscribed_authors failed")?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn subscribed_among(
        &self,
        user_id: UserId,
        author_ids: &[UserId],
    ) -> anyhow::Result<HashSet<UserId>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<UserId> = subscription::Entity::find()
            .select_only()
            .column(subscription::Column::AuthorId)
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::AuthorId.is_in(author_ids.iter().copied()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("subscribed_among failed")?;
        Ok(ids.into_iter().collect())
    }

    // ---- tags ----

    async fn insert_tag(&self, t: NewTag) -> anyhow::Result<Tag> {
        let m = tag::ActiveModel {
            name: Set(t.name),
            color: Set(t.color),
            slug: Set(t.slug),
            ..Default::default()
        };
        let model = m.insert(&self.conn).await.context("insert_tag failed")?;
        Ok(model.into())
    }

    async fn find_tag(&self, id: TagId) -> anyhow::Result<Option<Tag>> {
        let found = tag::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_tag failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_tags(&self) -> anyhow::Result<Vec<Tag>> {
        let rows = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(&self.conn)
            .await
            .context("list_tags failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn tag_conflicts(&self, t: &NewTag) -> anyhow::Result<bool> {
        let count = tag::Entity::find()
            .filter(
                Condition::any()
                    .add(tag::Column::Name.eq(t.name.as_str()))
                    .add(tag::Column::Color.eq(t.color.as_str()))
                    .add(tag::Column::Slug.eq(t.slug.as_str())),
            )
            .count(&self.conn)
            .await
            .context("tag_conflicts failed")?;
        Ok(count > 0)
    }

    async fn existing_tag_ids(&self, ids: &[TagId]) -> anyhow::Result<HashSet<TagId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found: Vec<TagId> = tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("existing_tag_ids failed")?;
        Ok(found.into_iter().collect())
    }

    // ---- ingredients ----

    async fn insert_ingredient(&self, i: NewIngredient) -> anyhow::Result<Ingredient> {
        let m = ingredient::ActiveModel {
            name: Set(i.name),
            measurement_unit: Set(i.measurement_unit),
            ..Default::default()
        };
        let model = m
            .insert(&self.conn)
            .await
            .context("insert_ingredient failed")?;
        Ok(model.into())
    }

    async fn find_ingredient(&self, id: IngredientId) -> anyhow::Result<Option<Ingredient>> {
        let found = ingredient::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_ingredient failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> anyhow::Result<Vec<Ingredient>> {
        let mut select = ingredient::Entity::find();
        if let Some(prefix) = name_prefix {
            let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((
                    ingredient::Entity,
                    ingredient::Column::Name,
                ))))
                .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        let rows = select
            .order_by_asc(ingredient::Column::Name)
            .all(&self.conn)
            .await
            .context("list_ingredients failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ingredient_exists(&self, i: &NewIngredient) -> anyhow::Result<bool> {
        let count = ingredient::Entity::find()
            .filter(ingredient::Column::Name.eq(i.name.as_str()))
            .filter(ingredient::Column::MeasurementUnit.eq(i.measurement_unit.as_str()))
            .count(&self.conn)
            .await
            .context("ingredient_exists failed")?;
        Ok(count > 0)
    }

    async fn existing_ingredient_ids(
        &self,
        ids: &[IngredientId],
    ) -> anyhow::Result<HashSet<IngredientId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found: Vec<IngredientId> = ingredient::Entity::find()
            .select_only()
            .column(ingredient::Column::Id)
            .filter(ingredient::Column::Id.is_in(ids.iter().copied()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("existing_ingredient_ids failed")?;
        Ok(found.into_iter().collect())
    }

    // ---- recipes ----

    async fn insert_recipe(
        &self,
        r: NewRecipeRecord,
        c: &Composition,
    ) -> anyhow::Result<Option<Recipe>> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let inserted = recipe::ActiveModel {
            author_id: Set(r.author_id),
            name: Set(r.name),
            image: Set(r.image),
            text: Set(r.text),
            cooking_time: Set(r.cooking_time),
            created_at: Set(r.created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await;
        let model = match inserted {
            Ok(model) => model,
            Err(e) if is_foreign_key_violation(&e) => {
                txn.rollback().await.context("rollback failed")?;
                return Ok(None);
            }
            Err(e) => return Err(e).context("insert_recipe failed"),
        };
        if !commit_composition(txn, model.id, c).await? {
            return Ok(None);
        }
        Ok(Some(model.into()))
    }

    async fn update_recipe(&self, r: Recipe, c: &Composition) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let m = recipe::ActiveModel {
            id: Set(r.id),
            author_id: Set(r.author_id),
            name: Set(r.name),
            image: Set(r.image),
            text: Set(r.text),
            cooking_time: Set(r.cooking_time),
            created_at: Set(r.created_at),
        };
        match m.update(&txn).await {
            Ok(_) => {}
            Err(DbErr::RecordNotUpdated) => {
                txn.rollback().await.context("rollback failed")?;
                return Ok(false);
            }
            Err(e) => return Err(e).context("update_recipe failed"),
        }
        commit_composition(txn, r.id, c).await
    }

    async fn replace_composition(
        &self,
        recipe_id: RecipeId,
        c: &Composition,
    ) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await.context("begin failed")?;
        commit_composition(txn, recipe_id, c).await
    }

    async fn delete_recipe(&self, id: RecipeId) -> anyhow::Result<bool> {
        let res = recipe::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete_recipe failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn find_recipe(&self, id: RecipeId) -> anyhow::Result<Option<Recipe>> {
        let found = recipe::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_recipe failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_recipes(
        &self,
        q: &RecipeQuery,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Recipe>, u64)> {
        let total = recipe_select(q)
            .count(&self.conn)
            .await
            .context("count recipes failed")?;
        let rows = recipe_select(q)
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("list_recipes failed")?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn recipes_by_author(
        &self,
        author_id: UserId,
        limit: Option<u64>,
    ) -> anyhow::Result<Vec<Recipe>> {
        let mut select = recipe::Entity::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id);
        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        let rows = select
            .all(&self.conn)
            .await
            .context("recipes_by_author failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_recipes_by_authors(
        &self,
        author_ids: &[UserId],
    ) -> anyhow::Result<HashMap<UserId, u64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(UserId, i64)> = recipe::Entity::find()
            .select_only()
            .column(recipe::Column::AuthorId)
            .column_as(Expr::col(recipe::Column::Id).count(), "recipes_count")
            .filter(recipe::Column::AuthorId.is_in(author_ids.iter().copied()))
            .group_by(recipe::Column::AuthorId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("count_recipes_by_authors failed")?;
        Ok(rows
            .into_iter()
            .map(|(author_id, n)| (author_id, u64::try_from(n).unwrap_or(0)))
            .collect())
    }

    async fn tags_for_recipes(&self, ids: &[RecipeId]) -> anyhow::Result<Vec<(RecipeId, Tag)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = recipe_tag::Entity::find()
            .filter(recipe_tag::Column::RecipeId.is_in(ids.iter().copied()))
            .find_also_related(tag::Entity)
            .all(&self.conn)
            .await
            .context("tags_for_recipes failed")?;
        let mut out: Vec<(RecipeId, Tag)> = rows
            .into_iter()
            .filter_map(|(link, t)| t.map(|t| (link.recipe_id, Tag::from(t))))
            .collect();
        out.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        Ok(out)
    }

    async fn ingredients_for_recipes(
        &self,
        ids: &[RecipeId],
    ) -> anyhow::Result<Vec<(RecipeId, RecipeIngredient)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(ids.iter().copied()))
            .order_by_asc(recipe_ingredient::Column::Id)
            .find_also_related(ingredient::Entity)
            .all(&self.conn)
            .await
            .context("ingredients_for_recipes failed")?;
        Ok(rows
            .into_iter()
            .filter_map(|(line, item)| {
                item.map(|item| (line.recipe_id, mapper::recipe_ingredient(line, item)))
            })
            .collect())
    }

    // ---- favorites / shopping cart ----

    async fn insert_list_entry(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> anyhow::Result<bool> {
        let res = match list {
            RecipeList::Favorites => {
                favorite::Entity::insert(favorite::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    ..Default::default()
                })
                .exec_without_returning(&self.conn)
                .await
            }
            RecipeList::ShoppingCart => {
                shopping_cart::Entity::insert(shopping_cart::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    ..Default::default()
                })
                .exec_without_returning(&self.conn)
                .await
            }
        };
        inserted_unless_duplicate(res).context("insert_list_entry failed")
    }

    async fn delete_list_entry(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> anyhow::Result<bool> {
        let res = match list {
            RecipeList::Favorites => {
                favorite::Entity::delete_many()
                    .filter(favorite::Column::UserId.eq(user_id))
                    .filter(favorite::Column::RecipeId.eq(recipe_id))
                    .exec(&self.conn)
                    .await
            }
            RecipeList::ShoppingCart => {
                shopping_cart::Entity::delete_many()
                    .filter(shopping_cart::Column::UserId.eq(user_id))
                    .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                    .exec(&self.conn)
                    .await
            }
        }
        .context("delete_list_entry failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list_entries_among(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_ids: &[RecipeId],
    ) -> anyhow::Result<HashSet<RecipeId>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found: Vec<RecipeId> = recipe::Entity::find()
            .select_only()
            .column(recipe::Column::Id)
            .filter(recipe::Column::Id.is_in(recipe_ids.iter().copied()))
            .filter(recipe::Column::Id.in_subquery(list_subquery(list, user_id)))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("list_entries_among failed")?;
        Ok(found.into_iter().collect())
    }

    async fn shopping_list(&self, user_id: UserId) -> anyhow::Result<Vec<ShoppingListItem>> {
        let rows = recipe_ingredient::Entity::find()
            .select_only()
            .column_as(ingredient::Column::Name, "name")
            .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
            .column_as(
                Expr::col((recipe_ingredient::Entity, recipe_ingredient::Column::Amount)).sum(),
                "total_amount",
            )
            .join(
                JoinType::InnerJoin,
                recipe_ingredient::Relation::Ingredient.def(),
            )
            .filter(
                recipe_ingredient::Column::RecipeId
                    .in_subquery(list_subquery(RecipeList::ShoppingCart, user_id)),
            )
            .group_by(ingredient::Column::Name)
            .group_by(ingredient::Column::MeasurementUnit)
            .into_model::<ShoppingRow>()
            .all(&self.conn)
            .await
            .context("shopping_list failed")?;
        Ok(rows
            .into_iter()
            .map(|r| ShoppingListItem {
                name: r.name,
                measurement_unit: r.measurement_unit,
                total_amount: r.total_amount,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("flour"), "flour");
    }
}
