use std::collections::HashSet;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{NewUser, Page, PageRequest, User, UserId, UserView};
use crate::domain::error::DomainError;
use crate::domain::password::{hash_password, verify_password};
use crate::domain::repo::NewUserRecord;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;
const RESERVED_USERNAMES: &[&str] = &["me"];

impl Service {
    #[instrument(
        name = "recipes.service.register_user",
        skip(self, new_user),
        fields(email = %new_user.email, username = %new_user.username)
    )]
    pub async fn register_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Registering new user");

        validate_new_user(&new_user)?;

        if self.repo.email_exists(&new_user.email).await? {
            return Err(DomainError::already_exists(format!(
                "User with email '{}'",
                new_user.email
            )));
        }
        if self.repo.username_exists(&new_user.username).await? {
            return Err(DomainError::already_exists(format!(
                "User with username '{}'",
                new_user.username
            )));
        }

        let password_hash = hash_password(&new_user.password).await?;
        let user = self
            .repo
            .insert_user(NewUserRecord {
                email: new_user.email.clone(),
                username: new_user.username.clone(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                password_hash,
            })
            .await?
            // lost a race with a concurrent registration
            .ok_or_else(|| {
                DomainError::already_exists(format!(
                    "User with email '{}' or username '{}'",
                    new_user.email, new_user.username
                ))
            })?;

        info!("Successfully registered user with id={}", user.id);
        Ok(user)
    }

    /// Exchange credentials for the user's auth token, issuing one if needed.
    #[instrument(name = "recipes.service.login", skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, DomainError> {
        let creds = self
            .repo
            .find_credentials_by_email(email)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;
        if !verify_password(password, &creds.password_hash).await? {
            debug!("Password mismatch");
            return Err(DomainError::InvalidCredentials);
        }

        if let Some(token) = self.repo.token_for_user(creds.user.id).await? {
            return Ok(token);
        }
        let token = self
            .repo
            .insert_token(&Uuid::new_v4().simple().to_string(), creds.user.id)
            .await?;
        info!(user_id = creds.user.id, "Issued auth token");
        Ok(token)
    }

    #[instrument(name = "recipes.service.logout", skip(self))]
    pub async fn logout(&self, user_id: UserId) -> Result<(), DomainError> {
        self.repo.delete_tokens(user_id).await?;
        info!("Auth token revoked");
        Ok(())
    }

    /// Resolve a token to its user.
    #[instrument(name = "recipes.service.authenticate", skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<User, DomainError> {
        self.repo
            .user_by_token(token)
            .await?
            .ok_or(DomainError::Unauthenticated)
    }

    #[instrument(name = "recipes.service.set_password", skip(self, current, new_password))]
    pub async fn set_password(
        &self,
        user_id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let creds = self
            .repo
            .find_credentials(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;
        if !verify_password(current, &creds.password_hash).await? {
            return Err(DomainError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let hash = hash_password(new_password).await?;
        self.repo.update_password(user_id, hash).await?;
        info!("Password changed");
        Ok(())
    }

    #[instrument(name = "recipes.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(
        &self,
        viewer: Option<UserId>,
        id: UserId,
    ) -> Result<UserView, DomainError> {
        debug!("Getting user by id");
        let user = self
            .repo
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))?;
        let mut views = self.user_views(viewer, vec![user]).await?;
        views.pop().ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "recipes.service.list_users", skip(self))]
    pub async fn list_users(
        &self,
        viewer: Option<UserId>,
        req: PageRequest,
    ) -> Result<Page<UserView>, DomainError> {
        let window = self.config.page_window(req)?;
        let (users, total) = self.repo.list_users(window.offset, window.limit).await?;
        let views = self.user_views(viewer, users).await?;
        debug!("Listed {} of {} users", views.len(), total);
        window.into_page(views, total)
    }

    /// Attach the viewer's subscription flag to each user.
    pub(crate) async fn user_views(
        &self,
        viewer: Option<UserId>,
        users: Vec<User>,
    ) -> Result<Vec<UserView>, DomainError> {
        let followed: HashSet<UserId> = match viewer {
            Some(viewer) if !users.is_empty() => {
                let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
                self.repo.subscribed_among(viewer, &ids).await?
            }
            _ => HashSet::new(),
        };
        Ok(users
            .into_iter()
            .map(|user| UserView {
                is_subscribed: followed.contains(&user.id),
                user,
            })
            .collect())
    }
}

fn validate_new_user(u: &NewUser) -> Result<(), DomainError> {
    validate_email(&u.email)?;
    validate_username(&u.username)?;
    validate_name("first_name", &u.first_name)?;
    validate_name("last_name", &u.last_name)?;
    validate_password(&u.password)
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::validation("email", format!("'{email}' is not a valid email"));
    if email.len() > MAX_EMAIL_LEN {
        return Err(DomainError::validation(
            "email",
            format!("at most {MAX_EMAIL_LEN} characters"),
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username", "must not be empty"));
    }
    if username.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("at most {MAX_NAME_LEN} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(DomainError::validation(
            "username",
            "only letters, digits and @/./+/-/_ are allowed",
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(username))
    {
        return Err(DomainError::validation(
            "username",
            format!("'{username}' is reserved"),
        ));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            field,
            format!("at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password",
            format!("at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(
            "password",
            "must not be entirely numeric",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            email: "cook@example.com".into(),
            username: "cook.master".into(),
            first_name: "Ann".into(),
            last_name: "Cook".into(),
            password: "kitchen-secret".into(),
        }
    }

    #[test]
    fn valid_user_passes() {
        assert!(validate_new_user(&new_user()).is_ok());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a b@c.de").is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("ann_1+x@y.z-w").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
