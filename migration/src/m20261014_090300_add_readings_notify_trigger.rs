use entity::readings::CHANGE_CHANNEL;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One NOTIFY per statement; the payload is the operation name and is
        // not inspected by listeners.
        manager
            .get_connection()
            .execute_unprepared(&notify_function_sql(CHANGE_CHANNEL))
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "DROP TRIGGER IF EXISTS readings_changed ON telemetry.readings;",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TRIGGER readings_changed
                AFTER INSERT OR UPDATE OR DELETE ON telemetry.readings
                FOR EACH STATEMENT EXECUTE FUNCTION telemetry.notify_readings_changed();",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS readings_changed ON telemetry.readings;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS telemetry.notify_readings_changed();")
            .await?;

        Ok(())
    }
}

fn notify_function_sql(channel: &str) -> String {
    format!(
        r#"
        CREATE OR REPLACE FUNCTION telemetry.notify_readings_changed()
        RETURNS trigger
        LANGUAGE plpgsql
        AS $$
        BEGIN
            PERFORM pg_notify('{channel}', TG_OP);
            RETURN NULL;
        END;
        $$;
        "#
    )
}
