use std::time::Instant;

use marine_router::api::{self, GeneticRequest};
use marine_router::config::Config;
use marine_router::genetic::WeatherField;
use marine_router::oracle::Oracles;
use marine_router::ports::PortCatalog;
use marine_router::vessel::{FuelType, Vessel};
use marine_router::Coordinate;

fn main() {
    env_logger::init();
    println!("--- Marine Router CLI Debugger ---");

    let config = Config::from_env().unwrap_or_else(|e| {
        println!("DATA_DIR not set ({e}); running against degraded (open-sea) oracles");
        Config::for_tests("./data")
    });
    let oracles = Oracles::init(&config);
    let ports = PortCatalog::builtin();

    let start = ports.search("Istanbul", 1).into_iter().next().map(|p| Coordinate::new(p.latitude, p.longitude)).unwrap_or(Coordinate::new(41.0082, 28.9784));
    let end = ports.search("Napoli", 1).into_iter().next().map(|p| Coordinate::new(p.latitude, p.longitude)).unwrap_or(Coordinate::new(40.8518, 14.2681));

    let vessel = Vessel {
        name: "Debug Carrier".into(),
        vessel_type: "Container".into(),
        dwt: 50_000.0,
        length_m: 220.0,
        beam_m: 32.0,
        draft_m: 11.0,
        service_speed_kn: 18.0,
        max_speed_kn: Some(22.0),
        fuel_type: FuelType::Hfo,
        fuel_consumption_rate: 60.0,
        engine_power_kw: 18_000.0,
    };

    println!("\n--- runSimple ---");
    let started = Instant::now();
    match api::run_simple(&oracles, &vessel, start, end, config.astar_max_iterations) {
        Ok(result) => {
            println!("waypoints: {}", result.path.len());
            println!("distance: {:.1} nm, fuel: {:.2} t, co2: {:.2} t, duration: {:.1} h", result.total_distance_nm, result.total_fuel_t, result.total_co2_t, result.total_duration_h);
        }
        Err(e) => println!("runSimple failed: {e}"),
    }
    println!("elapsed: {:?}", started.elapsed());

    println!("\n--- runGenetic ---");
    let started = Instant::now();
    match api::run_genetic(&oracles, &vessel, start, end, GeneticRequest::default(), WeatherField::empty()) {
        Ok(result) => {
            println!("waypoints: {}", result.path.len());
            println!(
                "distance: {:.1} nm, fuel: {:.2} t, co2: {:.2} t, duration: {:.1} h, fitness: {:.3}",
                result.total_distance_nm, result.total_fuel_t, result.total_co2_t, result.total_duration_h, result.best_fitness.unwrap_or(0.0)
            );
        }
        Err(e) => println!("runGenetic failed: {e}"),
    }
    println!("elapsed: {:?}", started.elapsed());

    println!("\nDebug completed.");
}
