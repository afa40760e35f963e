//! Integration tests exercising end-to-end day-loop behaviour: single-ward
//! burnout, cross-ward spread over a work link, scripted seed events,
//! parameter-sweep overrides, and multi-demographic population conservation.

use metapop_engine::{Dest, Disease, Network, Parameters, Ward, Wards};
use metapop_engine::{Demographic, Demographics, Networks};
use metapop_engine::{Infections, Model, Stage, StageContext};
use metapop_engine::runner::Simulation;
use metapop_engine::stage::{compose_functions, FunctionProvider};
use metapop_engine::extract::DefaultExtractor;
use metapop_engine::iterate::DefaultIterator;
use metapop_engine::mix::DefaultMixer;
use metapop_engine::mover::DefaultMover;
use metapop_engine::rng::{create_thread_generators, seed_ran_binomial};

fn disease(beta: [f64; 4], progress: [f64; 4], too_ill_to_move: [f64; 4], contrib_foi: [f64; 4]) -> Disease {
    Disease {
        beta: beta.to_vec(),
        progress: progress.to_vec(),
        too_ill_to_move: too_ill_to_move.to_vec(),
        contrib_foi: contrib_foi.to_vec(),
        name: Some("test".to_string()),
        version: None,
        author: None,
        contact: None,
        reference: None,
    }
}

fn params_with(disease: Disease) -> Parameters {
    Parameters {
        length_day: 1.0,
        plength_day: 1.0,
        initial_inf: 1,
        static_play_at_home: 0.0,
        dyn_play_at_home: 0.0,
        data_dist_cutoff: 10_000.0,
        dyn_dist_cutoff: 10_000.0,
        play_to_work: 0.0,
        work_to_play: 0.0,
        local_vaccination_threshold: 0.0,
        global_detection_threshold: 0.0,
        daily_ward_vaccination_capacity: 0.0,
        neighbour_weight_threshold: 0.0,
        daily_imports: 0.0,
        uv: 1.0,
        input_files: vec![],
        disease_params: disease,
        additional_seeds: vec![],
        name: None,
        version: None,
        author: None,
        contact: None,
        reference: None,
    }
}

/// Run one full day by hand (mover++iterator++mixer++extractor for every
/// stage), so tests can inspect `ctx.population` after each day rather than
/// only the final one `Simulation::run` leaves behind.
fn run_one_day(ctx: &mut StageContext, day: u32) {
    let mover = DefaultMover::default();
    let iterator = DefaultIterator;
    let mixer = DefaultMixer;
    let extractor = DefaultExtractor;
    ctx.day = day;
    for stage in [Stage::Setup, Stage::Foi, Stage::Infect, Stage::Analyse] {
        ctx.stage = stage;
        for f in compose_functions(stage, &mover, &iterator, &mixer, &extractor) {
            f(ctx).unwrap();
        }
    }
}

/// Scenario 1: single self-contained ward, 1 initial infection, 30 days.
/// Infected count must monotonically non-increase after day ~20, and
/// susceptibles + removed must equal 100 every day.
#[test]
fn scenario1_single_ward_burns_out_and_conserves_population() {
    let d = disease([0.0, 0.5, 0.5, 0.0], [1.0, 0.5, 0.5, 0.0], [0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 1.0, 0.0]);
    let mut wards = Wards::new();
    let mut ward = Ward::new().with_id(1).unwrap();
    ward.add_workers(100, Dest::Id(1)).unwrap();
    wards.insert(ward).unwrap();
    wards.resolve().unwrap();

    let network = Network::compile(&wards, params_with(d), 2).unwrap();
    let self_w = network.nodes[1].self_w as usize;
    let mut infections = Infections::build(&network);
    infections.work[0][self_w] = 1;

    let mut master = seed_ran_binomial(Some(15324));
    let rngs = create_thread_generators(&mut master, 2);
    let mut ctx = StageContext::new(Model::Single(network), infections, rngs, 2);

    let mut infected_trajectory = Vec::new();
    for day in 0..30 {
        run_one_day(&mut ctx, day);
        infected_trajectory.push(ctx.population.total_infected());
        assert_eq!(ctx.population.total(), 100);
    }

    for window in infected_trajectory[20..].windows(2) {
        assert!(window[1] <= window[0], "infected count rose after day 20: {:?}", infected_trajectory);
    }
}

/// Scenario 2: two wards linked by a single work link, `too_ill_to_move`
/// uniformly 0. Seeding ward 1's work-link infections drives ward 2's
/// susceptibles strictly down over the following days.
#[test]
fn scenario2_work_link_spreads_infection_to_destination_ward() {
    let d = disease([0.0, 0.0, 0.9, 0.0], [1.0, 0.3, 0.3, 0.0], [0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]);
    let mut wards = Wards::new();
    let mut a = Ward::new().with_id(1).unwrap().with_num_players(200);
    a.add_workers(50, Dest::Id(2)).unwrap();
    let b = Ward::new().with_id(2).unwrap().with_num_players(200);
    wards.insert(a).unwrap();
    wards.insert(b).unwrap();
    wards.resolve().unwrap();

    let network = Network::compile(&wards, params_with(d), 1).unwrap();
    let link_1_to_2 = network
        .to_links
        .iter()
        .position(|l| l.ifrom == 1 && l.ito == 2)
        .unwrap();

    let mut infections = Infections::build(&network);
    infections.work[2][link_1_to_2] = 10;

    let mut master = seed_ran_binomial(Some(15324));
    let rngs = create_thread_generators(&mut master, 1);
    let mut ctx = StageContext::new(Model::Single(network), infections, rngs, 1);

    let mut ward2_susceptibles = Vec::new();
    for day in 0..5 {
        run_one_day(&mut ctx, day);
        let network = ctx.model.overall();
        let suscept = network.to_links[link_1_to_2].suscept as i64 + network.nodes[2].play_suscept.round() as i64;
        ward2_susceptibles.push(suscept);
    }

    for window in ward2_susceptibles.windows(2) {
        assert!(window[1] < window[0], "ward 2 susceptibles did not strictly decrease: {:?}", ward2_susceptibles);
    }
}

/// Scenario 3: an additional-seeds file scheduling 5 infections at ward 2
/// on day 10 lands exactly those 5 in `play[0][2]` and drains 5 play
/// susceptibles, with no effect on any other day.
#[test]
fn scenario3_additional_seed_event_applies_on_its_scheduled_day() {
    use metapop_engine::seeds::{load_additional_seeds, SeedEvent};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seeds.csv");
    std::fs::write(&path, "10, 5, 2\n").unwrap();

    let d = disease([0.0, 0.5, 0.5, 0.0], [1.0, 0.5, 0.5, 0.0], [0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 1.0, 0.0]);
    let mut wards = Wards::new();
    wards.insert(Ward::new().with_id(1).unwrap().with_num_players(50)).unwrap();
    wards.insert(Ward::new().with_id(2).unwrap().with_num_players(50)).unwrap();
    wards.resolve().unwrap();

    let network = Network::compile(&wards, params_with(d), 1).unwrap();
    let events: Vec<SeedEvent> = load_additional_seeds(&path, &wards, None).unwrap();
    assert_eq!(events, vec![SeedEvent { day: 10, count: 5, ward: 2, demographic: None }]);

    let infections = Infections::build(&network);
    let mut master = seed_ran_binomial(Some(15324));
    let rngs = create_thread_generators(&mut master, 1);
    let mut ctx = StageContext::new(Model::Single(network), infections, rngs, 1);
    ctx.seed_events = events;

    for day in 0..=10 {
        run_one_day(&mut ctx, day);
        if day == 9 {
            assert_eq!(ctx.infections.play[0][2], 0);
        }
        if day == 10 {
            assert_eq!(ctx.infections.play[0][2], 5);
            assert_eq!(ctx.model.overall().nodes[2].play_suscept, 45.0);
        }
    }
}

/// Scenario 4: a VariableSet override touches only the named fields.
#[test]
fn scenario4_variable_overrides_touch_only_named_fields() {
    use metapop_engine::VariableSet;

    let base = params_with(disease(
        [0.0, 0.5, 0.7, 0.0],
        [1.0, 0.5, 0.5, 0.0],
        [0.0, 0.0, 1.0, 1.0],
        [0.0, 1.0, 1.0, 0.0],
    ));
    let mut overrides = VariableSet::new();
    overrides.insert("beta[2]", 0.95);
    overrides.insert("progress[1]", 0.19);

    let updated = base.with_overrides(&overrides).unwrap();
    assert_eq!(updated.disease_params.beta[2], 0.95);
    assert_eq!(updated.disease_params.progress[1], 0.19);
    assert_eq!(updated.disease_params.beta[1], base.disease_params.beta[1]);
    assert_eq!(updated.disease_params.too_ill_to_move, base.disease_params.too_ill_to_move);
}

/// Scenario 5: running two demographics through several days of infection,
/// the per-ward sum of subnet play population (susceptible + infected +
/// removed) equals the overall network's compiled total, every day.
#[test]
fn scenario5_multi_demographic_population_sums_to_overall_every_day() {
    let d = disease([0.0, 0.4, 0.6, 0.0], [1.0, 0.4, 0.4, 0.0], [0.0, 0.0, 0.0, 0.0], [0.0, 1.0, 1.0, 0.0]);
    let mut wards = Wards::new();
    wards.insert(Ward::new().with_id(1).unwrap().with_num_players(400)).unwrap();
    wards.resolve().unwrap();
    let overall = Network::compile(&wards, params_with(d), 1).unwrap();

    let mut demographics = Demographics::new();
    demographics.push(Demographic { name: "young".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
    demographics.push(Demographic { name: "old".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
    let networks = Networks::build(overall, demographics).unwrap();
    let overall_play_suscept = networks.overall.nodes[1].play_suscept;

    let infections = Infections::build_for_networks(&networks);
    let mut master = seed_ran_binomial(Some(42));
    let rngs = create_thread_generators(&mut master, 1);
    let mut ctx = StageContext::new(Model::Multi(networks), infections, rngs, 1);
    ctx.infections.sub_plays[0][0][1] = 30;

    for day in 0..10 {
        run_one_day(&mut ctx, day);

        let total: f64 = (0..ctx.network_count())
            .map(|idx| {
                let net = ctx.model.network(idx);
                let suscept = net.nodes[1].play_suscept;
                let infected: f64 = ctx.infections.sub_plays[idx].iter().map(|stage| stage[1] as f64).sum();
                let removed = ctx.infections.sub_play_removed[idx][1] as f64;
                suscept + infected + removed
            })
            .sum();

        assert!(
            (total - overall_play_suscept).abs() < 1e-6,
            "day {day}: subnet total {total} != overall {overall_play_suscept}"
        );
    }
}

/// `Simulation::run` terminates and the conservation invariant (§4.7) holds
/// across a short multi-demographic run driven through the top-level API.
#[test]
fn simulation_run_keeps_multi_demographic_invariant_through_conservation_check() {
    let d = disease([0.0, 0.5, 0.5, 0.0], [1.0, 0.5, 0.5, 0.0], [0.0, 0.0, 0.0, 0.0], [0.0, 1.0, 1.0, 0.0]);
    let mut wards = Wards::new();
    wards.insert(Ward::new().with_id(1).unwrap().with_num_players(200)).unwrap();
    wards.resolve().unwrap();
    let overall = Network::compile(&wards, params_with(d), 1).unwrap();

    let mut demographics = Demographics::new();
    demographics.push(Demographic { name: "a".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
    demographics.push(Demographic { name: "b".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
    let networks = Networks::build(overall, demographics).unwrap();

    let mut infections = Infections::build_for_networks(&networks);
    infections.sub_plays[0][0][1] = 5;

    let mut master = seed_ran_binomial(Some(7));
    let rngs = create_thread_generators(&mut master, 1);
    let mut ctx = StageContext::new(Model::Multi(networks), infections, rngs, 1);

    let sim = Simulation::with_defaults(20);
    sim.run(&mut ctx).unwrap();
    assert!(!ctx.stop || ctx.day <= 20);
}
