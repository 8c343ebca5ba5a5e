use crate::{customer, role, user, CrudEntity};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use anyhow::Result;

use super::setup_test_db;

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Insert through the CRUD conversions, then read back
#[tokio::test]
async fn test_user_insert_and_find() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let lastname = unique("lee");
    let input = user::NewUser {
        firstname: Some("Ann".into()),
        lastname: Some(lastname.clone()),
        dob: chrono::NaiveDate::from_ymd_opt(1990, 1, 2),
        ..Default::default()
    };
    let created = user::Entity::active_from_input(input).insert(&db).await?;
    assert!(created.id > 0);
    assert_eq!(created.email, None);

    let found = user::Entity::find()
        .filter(user::Column::Lastname.eq(lastname))
        .one(&db)
        .await?
        .expect("user present");
    assert_eq!(found, created);

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

/// Patch only touches the provided columns
#[tokio::test]
async fn test_user_patch_keeps_other_columns() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let created = user::Entity::active_from_input(user::NewUser {
        firstname: Some("Ann".into()),
        lastname: Some(unique("lee")),
        ..Default::default()
    })
    .insert(&db)
    .await?;

    let patch = user::UserPatch { email: Some("ann@example.com".into()), ..Default::default() };
    let res = user::Entity::update_many()
        .set(user::Entity::active_from_patch(patch))
        .filter(user::Column::Id.eq(created.id))
        .exec(&db)
        .await?;
    assert_eq!(res.rows_affected, 1);

    let found = user::Entity::find_by_id(created.id).one(&db).await?.expect("user present");
    assert_eq!(found.firstname.as_deref(), Some("Ann"));
    assert_eq!(found.email.as_deref(), Some("ann@example.com"));

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

/// has-one relations resolve through the entity relation definitions
#[tokio::test]
async fn test_user_related_role_and_customer() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let u = user::Entity::active_from_input(user::NewUser { firstname: Some(unique("ann")), ..Default::default() })
        .insert(&db)
        .await?;
    let r = role::Entity::active_from_input(role::NewRole {
        userid: Some(u.id),
        name: Some("admin".into()),
        ..Default::default()
    })
    .insert(&db)
    .await?;
    let c = customer::Entity::active_from_input(customer::NewCustomer {
        userid: Some(u.id),
        name: Some("Acme".into()),
        ..Default::default()
    })
    .insert(&db)
    .await?;

    let found_role = u.find_related(role::Entity).one(&db).await?;
    assert_eq!(found_role, Some(r.clone()));
    let found_customer = u.find_related(customer::Entity).one(&db).await?;
    assert_eq!(found_customer, Some(c.clone()));

    // second role for the same user violates the unique index
    let dup = role::Entity::active_from_input(role::NewRole { userid: Some(u.id), ..Default::default() })
        .insert(&db)
        .await;
    assert!(dup.is_err());

    role::Entity::delete_by_id(r.id).exec(&db).await?;
    customer::Entity::delete_by_id(c.id).exec(&db).await?;
    user::Entity::delete_by_id(u.id).exec(&db).await?;
    Ok(())
}
