use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Returns at most `limit_count` rows per room, newest first within a
        // room and rooms kept contiguous, which is the order the grouper relies on.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE FUNCTION telemetry.get_latest_readings_per_room(limit_count integer)
                RETURNS TABLE (
                    room_id bigint,
                    room_type varchar,
                    temperature_c double precision,
                    humidity_pct double precision,
                    differential_pressure_pa double precision
                )
                LANGUAGE sql STABLE
                AS $$
                    SELECT ranked.room_id,
                           ranked.room_type,
                           ranked.temperature_c,
                           ranked.humidity_pct,
                           ranked.differential_pressure_pa
                    FROM (
                        SELECT r.room_id,
                               r.room_type,
                               r.temperature_c,
                               r.humidity_pct,
                               r.differential_pressure_pa,
                               r.recorded_at,
                               row_number() OVER (
                                   PARTITION BY r.room_id
                                   ORDER BY r.recorded_at DESC, r.id DESC
                               ) AS rn
                        FROM telemetry.readings r
                    ) ranked
                    WHERE ranked.rn <= limit_count
                    ORDER BY ranked.room_id, ranked.recorded_at DESC, ranked.rn
                $$;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DROP FUNCTION IF EXISTS telemetry.get_latest_readings_per_room(integer);",
            )
            .await?;

        Ok(())
    }
}
