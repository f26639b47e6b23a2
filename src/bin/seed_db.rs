use entity_api::reading::{self as ReadingApi, ReadingInput};
use log::{error, info};
use rand::Rng;
use service::{config::Config, logging::Logger};

const ROOMS: [(i64, &str); 4] = [
    (1, "cleanroom"),
    (2, "cleanroom"),
    (3, "laboratory"),
    (4, "office"),
];

const READINGS_PER_ROOM: usize = 120;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    info!("Seeding database [{}]...", config.database_url());

    let db = match service::init_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    let mut inserted = 0usize;

    for (room_id, room_type) in ROOMS {
        for _ in 0..READINGS_PER_ROOM {
            let input = ReadingInput {
                room_id,
                room_type: room_type.to_string(),
                temperature_c: Some(rng.gen_range(18.0..24.0)),
                humidity_pct: Some(rng.gen_range(35.0..55.0)),
                // Occasionally leave a sensor gap so clients see nulls
                differential_pressure_pa: rng
                    .gen_bool(0.95)
                    .then(|| rng.gen_range(5.0..15.0)),
            };

            match ReadingApi::create(&db, input).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    error!("Failed to insert reading for room {room_id}: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("Inserted {inserted} readings across {} rooms", ROOMS.len());
}
