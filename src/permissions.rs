//! Role-based access to dictionaries.
//!
//! A user relates to a dictionary as its owner, an editor or a viewer. Each
//! role grants a fixed permission set; users without a role hold nothing.

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewDictionary,
    ChangeDictionary,
    DeleteDictionary,
    ViewPhrase,
    AddPhrase,
    ChangePhrase,
    DeletePhrase,
    ViewPhraseGroup,
    AddPhraseGroup,
    ChangePhraseGroup,
    DeletePhraseGroup,
}

const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::ViewDictionary,
    Permission::ViewPhrase,
    Permission::ViewPhraseGroup,
];

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ChangeDictionary,
    Permission::AddPhrase,
    Permission::ChangePhrase,
    Permission::DeletePhrase,
    Permission::AddPhraseGroup,
    Permission::ChangePhraseGroup,
    Permission::DeletePhraseGroup,
];

/// Whether `role` grants `permission`
pub fn role_has_permission(role: Role, permission: Permission) -> bool {
    match role {
        Role::Owner => true,
        Role::Editor => {
            VIEWER_PERMISSIONS.contains(&permission) || EDITOR_PERMISSIONS.contains(&permission)
        }
        Role::Viewer => VIEWER_PERMISSIONS.contains(&permission),
    }
}

/// Strongest role the user holds on the dictionary, if any.
///
/// Inactive users hold no role.
pub async fn dictionary_role(pool: &PgPool, user_id: i64, dictionary_id: i64) -> Result<Option<Role>> {
    let row = sqlx::query(
        "SELECT
             d.user_id = u.id,
             EXISTS (SELECT 1 FROM dictionary_editors e WHERE e.dictionary_id = d.id AND e.user_id = u.id),
             EXISTS (SELECT 1 FROM dictionary_viewers v WHERE v.dictionary_id = d.id AND v.user_id = u.id)
         FROM dictionaries d, users u
         WHERE d.id = $1 AND u.id = $2 AND u.is_active",
    )
    .bind(dictionary_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to resolve dictionary role")?;

    Ok(row.and_then(|row| {
        let (owner, editor, viewer): (bool, bool, bool) = (row.get(0), row.get(1), row.get(2));
        if owner {
            Some(Role::Owner)
        } else if editor {
            Some(Role::Editor)
        } else if viewer {
            Some(Role::Viewer)
        } else {
            None
        }
    }))
}

/// Check one permission against the database
pub async fn has_permission(
    pool: &PgPool,
    user_id: i64,
    dictionary_id: i64,
    permission: Permission,
) -> Result<bool> {
    Ok(dictionary_role(pool, user_id, dictionary_id)
        .await?
        .is_some_and(|role| role_has_permission(role, permission)))
}
