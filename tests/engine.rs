use episim::contact::ContactModel;
use episim::engine::{RunState, SimulationEngine};
use episim::model::{Agent, Arena, HealthState};
use episim::params::{ConfigError, ParamsDelta, SimulationParameters};
use episim::stats::HISTORY_CAPACITY;

fn new_engine(params: SimulationParameters, seed: u64) -> SimulationEngine {
    SimulationEngine::new(params, Arena::default(), ContactModel::default(), Some(seed))
        .expect("failed to construct engine")
}

fn crowded_params() -> SimulationParameters {
    SimulationParameters {
        population: 150,
        infection_rate: 80.0,
        recovery_rate: 0.5,
        vaccination_rate: 20.0,
        protection_adoption: 30,
        speed: 2.0,
    }
}

fn crowded_engine(seed: u64) -> SimulationEngine {
    let arena = Arena {
        width: 200.0,
        height: 150.0,
    };
    SimulationEngine::new(crowded_params(), arena, ContactModel::default(), Some(seed))
        .expect("failed to construct engine")
}

#[test]
fn counts_always_sum_to_population() {
    let mut engine = crowded_engine(11);
    engine.start();
    for _ in 0..2_000 {
        let snapshot = engine.tick().expect("engine is running");
        assert_eq!(snapshot.counts.total(), 150);
        assert_eq!(snapshot.agents.len(), 150);
    }
    for entry in engine.history() {
        assert_eq!(entry.counts.total(), 150);
    }
}

#[test]
fn agents_stay_inside_the_arena() {
    let arena = Arena {
        width: 120.0,
        height: 90.0,
    };
    let params = SimulationParameters {
        speed: 9.0,
        ..crowded_params()
    };
    let mut engine = SimulationEngine::new(params, arena, ContactModel::default(), Some(5))
        .expect("failed to construct engine");
    engine.start();
    for _ in 0..1_000 {
        let snapshot = engine.tick().expect("engine is running");
        for agt in &snapshot.agents {
            assert!(arena.contains(agt.x, agt.y), "agent at ({}, {})", agt.x, agt.y);
        }
    }
}

#[test]
fn peak_infected_never_decreases() {
    let mut engine = crowded_engine(12);
    engine.start();
    let mut peak = 0;
    for _ in 0..3_000 {
        let snapshot = engine.tick().expect("engine is running");
        assert!(snapshot.peak_infected >= peak);
        peak = snapshot.peak_infected;
    }
    let history = engine.history();
    let max_infected = history.iter().map(|entry| entry.counts.infected).max();
    assert_eq!(max_infected, Some(peak));
}

#[test]
fn start_and_pause_twice_equal_once() {
    let mut engine = new_engine(SimulationParameters::default(), 13);
    engine.start();
    engine.start();
    assert_eq!(engine.run_state(), RunState::Running);
    assert!(engine.tick().is_some());

    engine.pause();
    engine.pause();
    assert_eq!(engine.run_state(), RunState::Stopped);
    let before = engine.snapshot();
    assert!(engine.tick().is_none());
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn single_agent_eventually_recovers() {
    let params = SimulationParameters {
        population: 1,
        infection_rate: 100.0,
        recovery_rate: 6.0,
        vaccination_rate: 0.0,
        ..SimulationParameters::default()
    };
    let mut engine = new_engine(params, 14);
    assert_eq!(engine.counts().infected, 1);
    assert_eq!(engine.population().agents()[0].state(), HealthState::Infected);

    engine.start();
    for _ in 0..1_000 {
        engine.tick();
    }
    assert_eq!(engine.population().agents()[0].state(), HealthState::Recovered);
}

#[test]
fn zero_infection_rate_never_infects() {
    let params = SimulationParameters {
        population: 100,
        infection_rate: 0.0,
        recovery_rate: 0.0,
        speed: 5.0,
        ..SimulationParameters::default()
    };
    let arena = Arena {
        width: 60.0,
        height: 60.0,
    };
    let mut engine = SimulationEngine::new(params, arena, ContactModel::default(), Some(15))
        .expect("failed to construct engine");
    engine.start();
    for _ in 0..2_000 {
        engine.tick();
        assert_eq!(engine.population().count(HealthState::Infected), 1);
    }
}

#[test]
fn certain_transmission_after_one_tick() {
    let params = SimulationParameters {
        population: 2,
        infection_rate: 100.0,
        recovery_rate: 0.0,
        vaccination_rate: 0.0,
        protection_adoption: 0,
        speed: 60.0,
    };
    let mut infected = Agent::new((200.0, 200.0), (0.5, -0.25), false);
    infected.infect();
    let healthy = Agent::new((200.0, 200.0), (0.5, -0.25), false);
    let mut engine = SimulationEngine::with_population(
        params,
        Arena::default(),
        ContactModel::default(),
        vec![infected, healthy],
        Some(16),
    )
    .expect("failed to construct engine");

    engine.start();
    let snapshot = engine.tick().expect("engine is running");
    assert_eq!(snapshot.agents[1].state, HealthState::Infected);
    assert_eq!(snapshot.day, 1);
    assert_eq!(snapshot.counts.infected, 2);
    assert_eq!(snapshot.peak_infected, 2);
    assert_eq!(engine.history()[0].day, 0);
}

#[test]
fn agents_breaking_population_invariants_are_rejected() {
    let params = SimulationParameters {
        population: 2,
        ..SimulationParameters::default()
    };
    let build = |agt_vec: Vec<Agent>| {
        SimulationEngine::with_population(
            params.clone(),
            Arena::default(),
            ContactModel::default(),
            agt_vec,
            Some(20),
        )
    };
    let mut infected = Agent::new((200.0, 200.0), (0.0, 0.0), false);
    infected.infect();
    let healthy = Agent::new((210.0, 200.0), (0.0, 0.0), false);
    let stray = Agent::new((-500.0, 9000.0), (0.0, 0.0), false);

    let err = build(vec![stray]).err().expect("wrong agent count");
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::PopulationMismatch {
            expected: 2,
            actual: 1
        })
    );

    let err = build(vec![infected, stray]).err().expect("agent outside arena");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::AgentOutsideArena { index: 1, .. })
    ));

    let err = build(vec![healthy, healthy]).err().expect("no infected agent");
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::SeedInfected { count: 0 })
    );

    assert!(build(vec![infected, healthy]).is_ok());
}

#[test]
fn history_is_capped_and_drops_oldest_days() {
    let params = SimulationParameters {
        speed: 60.0,
        ..SimulationParameters::default()
    };
    let mut engine = new_engine(params, 17);
    engine.start();
    for _ in 0..=HISTORY_CAPACITY {
        engine.tick();
    }
    let history = engine.history();
    assert_eq!(engine.day(), HISTORY_CAPACITY as u64 + 1);
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(history[0].day, 1);
    assert_eq!(history[HISTORY_CAPACITY - 1].day, HISTORY_CAPACITY as u64);
}

#[test]
fn reset_returns_to_initial_state() {
    let mut engine = crowded_engine(18);
    engine.start();
    for _ in 0..500 {
        engine.tick();
    }
    assert!(engine.day() > 0);
    assert!(!engine.history().is_empty());

    engine.reset();
    assert_eq!(engine.run_state(), RunState::Stopped);
    assert_eq!(engine.day(), 0);
    assert_eq!(engine.peak_infected(), 0);
    assert!(engine.history().is_empty());
    assert_eq!(engine.population().len(), 150);
    assert_eq!(engine.population().count(HealthState::Infected), 1);
    assert_eq!(engine.counts().infected, 1);
    assert_eq!(engine.counts().total(), 150);
}

#[test]
fn configuration_changes_while_running() {
    let mut engine = crowded_engine(19);
    engine.start();
    for _ in 0..100 {
        engine.tick();
    }

    let delta = ParamsDelta {
        population: Some(20),
        speed: Some(2.0),
        ..ParamsDelta::default()
    };
    engine.configure(&delta).expect("valid delta");
    assert_eq!(engine.population().len(), 150);
    assert_eq!(engine.params().speed, 2.0);
    assert!(engine.tick().is_some());

    let invalid = ParamsDelta {
        vaccination_rate: Some(-3.0),
        ..ParamsDelta::default()
    };
    assert!(engine.configure(&invalid).is_err());
    assert_eq!(engine.params().vaccination_rate, 20.0);

    engine.reset();
    assert_eq!(engine.population().len(), 20);
}

#[test]
fn seeded_runs_are_deterministic() {
    fn run(seed: u64) -> Vec<episim::stats::HistoryEntry> {
        let mut engine = crowded_engine(seed);
        engine.start();
        for _ in 0..1_500 {
            engine.tick();
        }
        engine.history()
    }

    assert_eq!(run(21), run(21), "identical seeds should produce identical histories");
    assert_ne!(run(21), run(22), "different seeds should produce different histories");
}
