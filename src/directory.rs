// ============================================================================
// Group & Contact Directory
// ============================================================================
//
// Building the group forest, importing contacts into it and binding devices
// to contacts. Bulk imports validate every row before the first write.
//
// ============================================================================

use broadcast_config::{
    MAX_CONTACT_NAME_LENGTH, MAX_DEVICE_TOKEN_LENGTH, MAX_GROUP_NAME_LENGTH,
    MAX_PHONE_NUMBER_LENGTH,
};
use broadcast_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::hierarchy::HierarchyNode;
use crate::models::{Group, GroupId};
use crate::store::DuplicateGroup;
use crate::utils::loggable_phone;

// ============================================================================
// Inputs & Outputs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupInput {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<GroupId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupRow {
    pub group_name: String,
    #[serde(default)]
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportGroupsOutput {
    pub status: &'static str,
    pub created: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRow {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportContactsOutput {
    pub status: &'static str,
    /// New contacts
    pub created: usize,
    /// New contact-group links (including those of new contacts)
    pub linked: usize,
}

#[derive(Debug, Clone)]
pub struct RegisterDeviceInput {
    pub device_id: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterDeviceOutput {
    pub status: &'static str,
    pub name: String,
    pub device_id: String,
}

// ============================================================================
// Validation Helpers
// ============================================================================

fn clean_group_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("Group name must not be empty"));
    }
    if name.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Group name exceeds {} characters",
            MAX_GROUP_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn clean_phone_number(raw: &str) -> AppResult<String> {
    let phone = raw.trim();
    if phone.is_empty() {
        return Err(AppError::validation("Phone number must not be empty"));
    }
    if phone.chars().count() > MAX_PHONE_NUMBER_LENGTH {
        return Err(AppError::validation(format!(
            "Phone number exceeds {} characters",
            MAX_PHONE_NUMBER_LENGTH
        )));
    }
    Ok(phone.to_string())
}

fn clean_contact_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("Contact name must not be empty"));
    }
    if name.chars().count() > MAX_CONTACT_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Contact name exceeds {} characters",
            MAX_CONTACT_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Prefix a row validation failure with its 1-based row number
fn row_error(index: usize, err: AppError) -> AppError {
    match err {
        AppError::Validation(msg) => AppError::validation(format!("Row {}: {}", index + 1, msg)),
        other => other,
    }
}

/// A sibling inserted between our existence check and our insert
fn group_write_error(err: anyhow::Error) -> AppError {
    match err.downcast::<DuplicateGroup>() {
        Ok(duplicate) => AppError::conflict(duplicate.to_string()),
        Err(other) => other.into(),
    }
}

/// Blank parent names mean "top level"
fn clean_parent_name(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => clean_group_name(name).map(Some),
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Render the whole forest, or the subtree of the group named `group_name`
pub async fn group_hierarchy(
    ctx: &AppContext,
    group_name: Option<&str>,
) -> AppResult<Vec<HierarchyNode>> {
    let tree = ctx.store.load_tree().await?;

    match group_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let group = tree
                .find_by_name(name)
                .ok_or_else(|| AppError::not_found("Group not found"))?;
            Ok(tree.hierarchy(Some(group.id)))
        }
        None => Ok(tree.hierarchy(None)),
    }
}

pub async fn create_group(ctx: &AppContext, input: CreateGroupInput) -> AppResult<Group> {
    let name = clean_group_name(&input.name)?;

    if let Some(parent_id) = input.parent_id {
        if ctx.store.find_group(parent_id).await?.is_none() {
            return Err(AppError::not_found("Parent group not found"));
        }
    }

    if ctx
        .store
        .find_child_group(&name, input.parent_id)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(format!(
            "Group '{}' already exists under this parent",
            name
        )));
    }

    let group = ctx
        .store
        .create_group(&name, input.parent_id)
        .await
        .map_err(group_write_error)?;
    tracing::info!(group_id = group.id, parent_id = ?group.parent_id, "Group created");
    Ok(group)
}

/// Bulk group import.
///
/// Rows apply in order, so a row may name a parent created by an earlier
/// row. A parent name resolves to the first group with exactly that name
/// and is created at the top level when missing.
pub async fn import_groups(ctx: &AppContext, rows: Vec<GroupRow>) -> AppResult<ImportGroupsOutput> {
    let mut cleaned = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let name = clean_group_name(&row.group_name)
            .map_err(|e| row_error(index, e))?;
        let parent = clean_parent_name(row.parent_name.as_deref())
            .map_err(|e| row_error(index, e))?;
        cleaned.push((name, parent));
    }

    let mut created = 0;
    for (name, parent_name) in cleaned {
        let parent_id = match parent_name {
            Some(parent_name) => match ctx.store.find_group_by_name(&parent_name).await? {
                Some(parent) => Some(parent.id),
                None => {
                    created += 1;
                    let parent = ctx
                        .store
                        .create_group(&parent_name, None)
                        .await
                        .map_err(group_write_error)?;
                    Some(parent.id)
                }
            },
            None => None,
        };

        if ctx.store.find_child_group(&name, parent_id).await?.is_none() {
            ctx.store
                .create_group(&name, parent_id)
                .await
                .map_err(group_write_error)?;
            created += 1;
        }
    }

    tracing::info!(rows = rows.len(), created = created, "Groups imported");
    Ok(ImportGroupsOutput {
        status: "Groups uploaded",
        created,
    })
}

/// Bulk contact import into one group.
///
/// Contacts are keyed by phone number; an existing contact keeps its name
/// and only gains the membership.
pub async fn import_contacts(
    ctx: &AppContext,
    group_id: GroupId,
    rows: Vec<ContactRow>,
) -> AppResult<ImportContactsOutput> {
    if ctx.store.find_group(group_id).await?.is_none() {
        return Err(AppError::not_found("Group not found"));
    }

    let mut cleaned = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let phone = clean_phone_number(&row.phone).map_err(|e| row_error(index, e))?;
        let name = clean_contact_name(&row.name).map_err(|e| row_error(index, e))?;
        cleaned.push((name, phone));
    }

    let mut created = 0;
    let mut linked = 0;
    for (name, phone) in cleaned {
        let (contact, is_new) = ctx.store.upsert_contact(&name, &phone).await?;
        if is_new {
            created += 1;
        }
        if ctx.store.add_membership(contact.id, group_id).await? {
            linked += 1;
        }
    }

    tracing::info!(
        group_id = group_id,
        rows = rows.len(),
        created = created,
        linked = linked,
        "Contacts imported"
    );
    Ok(ImportContactsOutput {
        status: "Contacts uploaded",
        created,
        linked,
    })
}

/// Bind a device push token to the contact with this phone number.
/// A token held by another contact moves to this one.
pub async fn register_device(
    ctx: &AppContext,
    input: RegisterDeviceInput,
) -> AppResult<RegisterDeviceOutput> {
    let token = input.device_id.trim();
    if token.is_empty() {
        return Err(AppError::validation("Device id must not be empty"));
    }
    if token.len() > MAX_DEVICE_TOKEN_LENGTH {
        return Err(AppError::validation(format!(
            "Device id exceeds {} characters",
            MAX_DEVICE_TOKEN_LENGTH
        )));
    }
    let phone = input.phone_number.trim();

    let logging = &ctx.config.logging;
    let phone_log = loggable_phone(phone, logging.enable_phone_numbers, &logging.hash_salt);

    let contact = ctx
        .store
        .find_contact_by_phone(phone)
        .await?
        .ok_or_else(|| AppError::not_found("No contact found with this phone number"))?;

    let updated = ctx
        .store
        .assign_device_token(contact.id, token)
        .await?
        .ok_or_else(|| AppError::not_found("No contact found with this phone number"))?;

    tracing::info!(phone = %phone_log, contact_id = updated.id, "Device registered");

    Ok(RegisterDeviceOutput {
        status: "Device registered/updated",
        name: updated.name,
        device_id: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingPush, test_context};

    fn row(group_name: &str, parent_name: Option<&str>) -> GroupRow {
        GroupRow {
            group_name: group_name.to_string(),
            parent_name: parent_name.map(str::to_string),
        }
    }

    fn contact(name: &str, phone: &str) -> ContactRow {
        ContactRow {
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_group_rules() {
        let ctx = test_context(RecordingPush::new());

        let root = create_group(
            &ctx,
            CreateGroupInput {
                name: "  Engineering ".to_string(),
                parent_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(root.name, "Engineering");

        let dup = create_group(
            &ctx,
            CreateGroupInput {
                name: "Engineering".to_string(),
                parent_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        let orphan = create_group(
            &ctx,
            CreateGroupInput {
                name: "CSE".to_string(),
                parent_id: Some(999),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(orphan, AppError::NotFound(_)));

        let blank = create_group(
            &ctx,
            CreateGroupInput {
                name: "   ".to_string(),
                parent_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_conflict() {
        let ctx = test_context(RecordingPush::new());
        ctx.store.create_group("Library", None).await.unwrap();

        // The existence check passed elsewhere; the store rejects the insert
        let err = ctx.store.create_group("Library", None).await.unwrap_err();
        let err = group_write_error(err);
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("Library")));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let other = group_write_error(anyhow::anyhow!("connection reset"));
        assert!(matches!(other, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_import_groups_builds_tree_and_is_idempotent() {
        let ctx = test_context(RecordingPush::new());
        let rows = vec![
            row("CSE", Some("Engineering")),
            row("CSE-A", Some("CSE")),
            row("Arts", None),
            row("CSE-B", Some("CSE")),
        ];

        let output = import_groups(&ctx, rows.clone()).await.unwrap();
        assert_eq!(output.status, "Groups uploaded");
        // Engineering (implicit parent), CSE, CSE-A, Arts, CSE-B
        assert_eq!(output.created, 5);

        let again = import_groups(&ctx, rows).await.unwrap();
        assert_eq!(again.created, 0);

        let tree = ctx.store.load_tree().await.unwrap();
        let cse_b = tree.find_by_name("cse-b").unwrap();
        assert_eq!(tree.path(cse_b.id).unwrap(), "Engineering/CSE/CSE-B");
    }

    #[tokio::test]
    async fn test_import_groups_rejects_blank_rows_before_writing() {
        let ctx = test_context(RecordingPush::new());
        let err = import_groups(&ctx, vec![row("Science", None), row("  ", Some("Science"))])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m.contains("Row 2")));
        assert!(ctx.store.list_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_contacts_links_existing_contacts() {
        let ctx = test_context(RecordingPush::new());
        let a = ctx.store.create_group("A", None).await.unwrap();
        let b = ctx.store.create_group("B", None).await.unwrap();

        let first = import_contacts(&ctx, a.id, vec![contact("Asha", "1111111111")])
            .await
            .unwrap();
        assert_eq!((first.created, first.linked), (1, 1));

        let second = import_contacts(
            &ctx,
            b.id,
            vec![contact("Asha Renamed", " 1111111111 "), contact("Ravi", "2222222222")],
        )
        .await
        .unwrap();
        assert_eq!(second.status, "Contacts uploaded");
        assert_eq!((second.created, second.linked), (1, 2));

        let asha = ctx
            .store
            .find_contact_by_phone("1111111111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(asha.name, "Asha");
        let mut groups = ctx.store.contact_group_ids(asha.id).await.unwrap();
        groups.sort();
        assert_eq!(groups, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_import_contacts_validation() {
        let ctx = test_context(RecordingPush::new());
        let a = ctx.store.create_group("A", None).await.unwrap();

        let missing = import_contacts(&ctx, 999, vec![contact("Asha", "1")]).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let long_phone = import_contacts(&ctx, a.id, vec![contact("Asha", &"9".repeat(21))])
            .await
            .unwrap_err();
        assert!(matches!(long_phone, AppError::Validation(_)));

        let blank = import_contacts(
            &ctx,
            a.id,
            vec![contact("Asha", "1111111111"), contact("Ravi", "  ")],
        )
        .await
        .unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));
        assert!(ctx.store.find_contact_by_phone("1111111111").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_contacts_rejects_overlong_name_before_writing() {
        let ctx = test_context(RecordingPush::new());
        let a = ctx.store.create_group("A", None).await.unwrap();

        let err = import_contacts(
            &ctx,
            a.id,
            vec![contact("Asha", "1111111111"), contact(&"n".repeat(300), "2222222222")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("Row 2:")));
        assert!(ctx.store.find_contact_by_phone("1111111111").await.unwrap().is_none());

        let exact = import_contacts(&ctx, a.id, vec![contact(&"n".repeat(255), "3333333333")])
            .await
            .unwrap();
        assert_eq!(exact.created, 1);
    }

    #[tokio::test]
    async fn test_register_device_remaps_token() {
        let ctx = test_context(RecordingPush::new());
        ctx.store.upsert_contact("Asha", "1111111111").await.unwrap();
        ctx.store.upsert_contact("Ravi", "2222222222").await.unwrap();

        let output = register_device(
            &ctx,
            RegisterDeviceInput {
                device_id: "fcm-token-1".to_string(),
                phone_number: "1111111111".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(output.status, "Device registered/updated");
        assert_eq!(output.name, "Asha");

        register_device(
            &ctx,
            RegisterDeviceInput {
                device_id: "fcm-token-1".to_string(),
                phone_number: "2222222222".to_string(),
            },
        )
        .await
        .unwrap();

        let asha = ctx.store.find_contact_by_phone("1111111111").await.unwrap().unwrap();
        assert!(asha.device_token.is_none());

        let unknown = register_device(
            &ctx,
            RegisterDeviceInput {
                device_id: "fcm-token-2".to_string(),
                phone_number: "0000000000".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_hierarchy_lookup_by_name() {
        let ctx = test_context(RecordingPush::new());
        let eng = ctx.store.create_group("Engineering", None).await.unwrap();
        ctx.store.create_group("CSE", Some(eng.id)).await.unwrap();
        ctx.store.create_group("Arts", None).await.unwrap();

        let all = group_hierarchy(&ctx, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let cse = group_hierarchy(&ctx, Some(" cse ")).await.unwrap();
        assert_eq!(cse.len(), 1);
        assert_eq!(cse[0].path, "CSE");

        let missing = group_hierarchy(&ctx, Some("Medicine")).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
