use layertrace::geom::geodetic::ecef_to_geodetic;
use layertrace::sim::{
    ContinuousLossEngine, EngineConfig, ErrorKind, FlatFrame, LayerStack, LayeredWorld,
    MaterialDatabase, MaterialLibrary, NoObserver, Observation, ParticleState, TransportConfig,
    TransportError, TransportLoop, TransportStatus, Wgs84Frame,
};
use layertrace::{Point, Vector};
use rand::SeedableRng;
use rand::rngs::StdRng;

const LATITUDE: f64 = 45.0;
const LONGITUDE: f64 = 3.0;

fn earth(library: &MaterialLibrary) -> LayeredWorld<Wgs84Frame> {
    let stack = LayerStack::new(vec![-1000.0, 0.0, 1000.0])
        .unwrap()
        .with_ceiling(2000.0)
        .unwrap();
    LayeredWorld::build(
        stack,
        Wgs84Frame::new(),
        &["StandardRock", "Water", "Air"],
        library,
    )
    .unwrap()
}

fn launch(
    world: &LayeredWorld<Wgs84Frame>,
    altitude: f64,
    azimuth: f64,
    elevation: f64,
    energy: f64,
) -> ParticleState {
    let stepper = world.stepper();
    ParticleState::new(
        stepper.position(LATITUDE, LONGITUDE, altitude),
        stepper.direction(LATITUDE, LONGITUDE, azimuth, elevation),
        energy,
    )
    .unwrap()
}

#[test]
fn test_vertical_crossing_of_rock_water_air() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let resolver = world.resolver();
    let mut rng = StdRng::seed_from_u64(1);

    let mut records: Vec<(usize, f64, f64, String)> = Vec::new();
    let mut observer = |obs: &Observation<'_>| {
        let material = match obs.medium {
            Some(m) => library.material_name(m.material).unwrap().to_string(),
            None => "(void)".to_string(),
        };
        let altitude = ecef_to_geodetic(obs.state.position).altitude;
        records.push((obs.index, obs.state.energy, altitude, material));
    };

    let state = launch(&world, -0.5, 0.0, 90.0, 1e9);
    let outcome = TransportLoop::default()
        .run(&engine, &resolver, state, &mut rng, &mut observer)
        .unwrap();

    assert_eq!(outcome.status, TransportStatus::StoppedVoid);
    assert_eq!(outcome.iterations, 3);

    let materials: Vec<&str> = records.iter().map(|r| r.3.as_str()).collect();
    assert_eq!(materials, vec!["StandardRock", "Water", "Air", "(void)"]);

    let indices: Vec<usize> = records.iter().map(|r| r.0).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    assert!((records[0].2 + 0.5).abs() < 1e-6);
    for pair in records.windows(2) {
        assert!(pair[1].2 > pair[0].2, "altitude must increase");
        assert!(pair[1].1 < pair[0].1, "energy must decrease");
    }
    assert!(records[3].2 >= 2000.0 && records[3].2 < 2000.01);
    assert!(outcome.state.energy > 0.0);
}

#[test]
fn test_upward_from_top_layer_exits() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    let state = launch(&world, 1500.0, 0.0, 90.0, 1e3);
    let outcome = TransportLoop::default()
        .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
        .unwrap();
    assert_eq!(outcome.status, TransportStatus::StoppedVoid);
    assert!(outcome.iterations <= 1);
}

#[test]
fn test_downward_exits_below_rock() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    let state = launch(&world, -0.5, 0.0, -90.0, 1e9);
    let outcome = TransportLoop::default()
        .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
        .unwrap();
    assert_eq!(outcome.status, TransportStatus::StoppedVoid);
    assert_eq!(outcome.iterations, 1);
    let altitude = ecef_to_geodetic(outcome.state.position).altitude;
    assert!(altitude < -1000.0 && altitude > -1000.01);
}

#[test]
fn test_low_energy_stops_in_rock() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    let state = launch(&world, -500.0, 30.0, 45.0, 1.0);
    let outcome = TransportLoop::default()
        .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
        .unwrap();
    assert_eq!(outcome.status, TransportStatus::StoppedEnergy);
    assert_eq!(outcome.state.energy, 0.0);
    assert!(outcome.state.distance > 0.0 && outcome.state.distance < 10.0);
}

#[test]
fn test_zero_energy_stops_without_step() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    let state = launch(&world, 500.0, 0.0, 90.0, 0.0);
    let outcome = TransportLoop::default()
        .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
        .unwrap();
    assert_eq!(outcome.status, TransportStatus::StoppedEnergy);
    assert_eq!(outcome.iterations, 0);
}

#[test]
fn test_start_in_void() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    for altitude in [-1500.0, 2000.5, 5000.0] {
        let state = launch(&world, altitude, 0.0, 90.0, 1e3);
        let position = state.position;
        let outcome = TransportLoop::default()
            .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
            .unwrap();
        assert_eq!(outcome.status, TransportStatus::StoppedVoid);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.state.position, position);
    }
}

#[test]
fn test_iteration_cap_is_an_engine_error() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let mut rng = StdRng::seed_from_u64(1);

    let mut config = TransportConfig::new();
    config.max_iterations = 1;
    let state = launch(&world, -0.5, 0.0, 90.0, 1e9);
    let err = TransportLoop::new(config)
        .run(&engine, &world.resolver(), state, &mut rng, &mut NoObserver)
        .unwrap_err();
    assert!(matches!(err, TransportError::IterationLimit(1)));
    assert_eq!(err.kind(), ErrorKind::Engine);
}

#[test]
fn test_layer_constant_below_step_bound() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let stepper = world.stepper();

    let cases = [
        (-0.5, 120.0, 90.0),
        (-700.0, 120.0, 20.0),
        (250.0, 120.0, -35.0),
        (1900.0, 120.0, 60.0),
        // Grazing rays along the meridian
        (-0.5, 0.0, 0.0),
        (-0.5, 180.0, 0.0),
        (999.5, 0.0, -0.01),
        (1999.0, 150.0, -0.5),
    ];
    for (altitude, azimuth, elevation) in cases {
        let state = launch(&world, altitude, azimuth, elevation, 1.0);
        let step = stepper.step(state.position, state.direction);
        assert!(step.length.is_finite() && step.length > 0.0);
        for fraction in [0.0, 0.1, 0.5, 0.9, 0.999] {
            let p = state.position + state.direction * (step.length * fraction);
            let inner = stepper.step(p, state.direction);
            assert_eq!(inner.layer, step.layer);
            // Remaining distance shrinks as the particle advances
            assert!(inner.length <= step.length * (1.0 - fraction) + 1e-3);
        }
        let beyond = state.position + state.direction * (step.length + 1e-3);
        assert_ne!(stepper.step(beyond, state.direction).layer, step.layer);
    }
}

#[test]
fn test_flat_world_matches_layer_count() {
    let library = MaterialLibrary::with_presets();
    let stack = LayerStack::new(vec![-1000.0, 0.0, 1000.0]).unwrap();
    let world =
        LayeredWorld::build(stack, FlatFrame, &["StandardRock", "Water", "Air"], &library).unwrap();

    let media = world.media();
    assert_eq!(media.len(), 3);
    assert!(media.medium_at(None).is_none());
    assert!(media.medium_at(Some(3)).is_none());
    for (altitude, name) in [(-999.0, "StandardRock"), (0.0, "Water"), (1e6, "Air")] {
        let medium = world.medium_at_altitude(altitude).unwrap();
        assert_eq!(library.material_name(medium.material), Some(name));
    }
    assert!(world.medium_at_altitude(-1000.001).is_none());

    let state =
        ParticleState::new(Point::new(0.0, 0.0, 10.0), Vector::new(1.0, 0.0, 0.0), 1.0).unwrap();
    let step = world.stepper().step(state.position, state.direction);
    assert!(step.length.is_infinite());
    assert_eq!(step.layer, Some(1));
}

#[test]
fn test_unknown_material_is_a_configuration_error() {
    let library = MaterialLibrary::with_presets();
    let stack = LayerStack::new(vec![0.0, 1.0]).unwrap();
    let err = LayeredWorld::build(stack, FlatFrame, &["Water", "Granite"], &library).unwrap_err();
    assert!(matches!(err, TransportError::UnknownMaterial(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_batch_is_reproducible() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let mut config = EngineConfig::new();
    config.straggling = 0.3;
    let engine = ContinuousLossEngine::new(&library, config);
    let resolver = world.resolver();

    let states = vec![launch(&world, -0.5, 0.0, 90.0, 1e3); 8];
    let energies = |seed: u64| -> Vec<f64> {
        let mut config = TransportConfig::new();
        config.seed = seed;
        TransportLoop::new(config)
            .run_batch(&engine, &resolver, states.clone())
            .into_iter()
            .map(|o| o.unwrap().state.energy)
            .collect()
    };
    let first = energies(7);
    assert_eq!(first.len(), 8);
    assert_eq!(first, energies(7));
    assert_ne!(first, energies(8));
    assert_ne!(first[0], first[1]);
}

#[test]
fn test_horizontal_launch_enters_water() {
    let library = MaterialLibrary::with_presets();
    let world = earth(&library);
    let engine = ContinuousLossEngine::new(&library, EngineConfig::new());
    let resolver = world.resolver();

    for elevation in [0.0, 0.01] {
        let mut rng = StdRng::seed_from_u64(1);
        let mut records: Vec<(f64, f64, Option<String>)> = Vec::new();
        let mut observer = |obs: &Observation<'_>| {
            let material = obs
                .medium
                .and_then(|m| library.material_name(m.material))
                .map(str::to_string);
            let altitude = ecef_to_geodetic(obs.state.position).altitude;
            records.push((altitude, obs.state.distance, material));
        };
        let state = launch(&world, -0.5, 0.0, elevation, 1e9);
        let outcome = TransportLoop::default()
            .run(&engine, &resolver, state, &mut rng, &mut observer)
            .unwrap();

        assert_eq!(outcome.status, TransportStatus::StoppedEnergy);
        assert_eq!(records[0].2.as_deref(), Some("StandardRock"));
        assert_eq!(records[1].2.as_deref(), Some("Water"));
        assert!(records[1].0 >= 0.0 && records[1].0 < 1e-3);
        assert_eq!(records.len(), 3);
        if elevation == 0.0 {
            assert!((records[1].1 - 2523.37).abs() < 0.05);
        }
    }
}
