use proptest::prelude::*;
use sith_core::SimulationConfig;
use sith_export::ResultProjector;
use sith_world::Simulation;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn frequency_vector_sums_to_mutation_burden(
        target in 1u64..200,
        u in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let config = SimulationConfig {
            population_target: target,
            birth_rate: 1.0,
            death_rate: 0.2,
            mutation_prob: u,
            driver_prob: 0.3,
            selection: 0.1,
            seed,
            lattice_side: Some(61),
            max_events: Some(10_000),
            ..Default::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();

        let projector = ResultProjector::new();
        let projection = projector.project(&sim).unwrap();

        let burden: u64 = sim
            .cells()
            .iter()
            .map(|cell| sim.genotype_length(cell).unwrap() as u64)
            .sum();
        prop_assert_eq!(projection.mutation_frequencies.iter().sum::<u64>(), burden);
        prop_assert_eq!(projection.cells.len() as u64, sim.population());
        prop_assert_eq!(projection, projector.project(&sim).unwrap());
    }
}
