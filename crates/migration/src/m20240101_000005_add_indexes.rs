use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // has-one targets: at most one row per user
        manager
            .create_index(
                Index::create()
                    .name("uniq_roles_userid")
                    .table(Roles::Table)
                    .col(Roles::Userid)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_customers_userid")
                    .table(Customers::Table)
                    .col(Customers::Userid)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auths_userid")
                    .table(Auths::Table)
                    .col(Auths::Userid)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_roles_userid").table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_customers_userid").table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_auths_userid").table(Auths::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_users_email").table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users { Table, Email }

#[derive(DeriveIden)]
enum Roles { Table, Userid }

#[derive(DeriveIden)]
enum Customers { Table, Userid }

#[derive(DeriveIden)]
enum Auths { Table, Userid }
